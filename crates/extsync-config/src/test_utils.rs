/// Runs `f` with `set` exported and `unset` removed, restoring the previous environment after.
pub fn with_env<F>(set: &[(&str, &str)], unset: &[&str], f: F)
where
    F: FnOnce(),
{
    let touched: Vec<_> = set
        .iter()
        .map(|(k, _)| *k)
        .chain(unset.iter().copied())
        .map(|k| (k, std::env::var(k).ok()))
        .collect();

    for (key, value) in set {
        std::env::set_var(key, value);
    }
    for key in unset {
        std::env::remove_var(key);
    }

    f();

    for (key, old_value) in touched {
        match old_value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
}
