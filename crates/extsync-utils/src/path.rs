use std::{
    env,
    path::{Path, PathBuf},
};

use crate::error::{PathError, PathResult};

pub trait PathResolver {
    /// Resolves a path string that may contain environment variables
    ///
    /// This method expands environment variables in the format `$VAR` or `${VAR}`, resolves tilde
    /// (`~`) to the user's home directory when it appears at the start of the path, and converts
    /// relative paths to absolute paths based on the current working directory.
    ///
    /// # Errors
    ///
    /// * [`PathError::Empty`] if the path is empty
    /// * [`PathError::CurrentDir`] if the current directory cannot be determined
    /// * [`PathError::MissingEnvVar`] if a referenced environment variable is undefined
    /// * [`PathError::UnclosedVariable`] if a `${` expression is never closed
    ///
    /// # Example
    ///
    /// ```
    /// use extsync_utils::error::PathResult;
    /// use extsync_utils::path::{PathResolver, SystemPathResolver};
    ///
    /// fn main() -> PathResult<()> {
    ///     let resolver = SystemPathResolver;
    ///     let resolved = resolver.resolve_path("~/.mozilla/firefox/default")?;
    ///     assert!(resolved.is_absolute());
    ///     Ok(())
    /// }
    /// ```
    fn resolve_path(&self, path: &str) -> PathResult<PathBuf>;

    /// Returns the user's home directory
    ///
    /// This method checks the `HOME` environment variable. If not set, it falls back to
    /// `/home/$USER`, and to `/` when even that is unknown.
    fn home_dir(&self) -> PathBuf;

    /// Returns `XDG_CONFIG_HOME`, defaulting to `$HOME/.config`
    fn xdg_config_home(&self) -> PathBuf;

    /// Returns `XDG_DATA_HOME`, defaulting to `$HOME/.local/share`
    fn xdg_data_home(&self) -> PathBuf;
}

/// Resolves paths against the process environment.
pub struct SystemPathResolver;

impl SystemPathResolver {
    fn lookup(&self, var: &str) -> Option<String> {
        match var {
            "HOME" => Some(self.home_dir().to_string_lossy().into_owned()),
            "XDG_CONFIG_HOME" => Some(self.xdg_config_home().to_string_lossy().into_owned()),
            "XDG_DATA_HOME" => Some(self.xdg_data_home().to_string_lossy().into_owned()),
            _ => env::var(var).ok(),
        }
    }
}

impl PathResolver for SystemPathResolver {
    fn resolve_path(&self, path: &str) -> PathResult<PathBuf> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let home = self.home_dir();
        let expanded = PathBuf::from(expand(path, &home, |var| self.lookup(var))?);
        if expanded.is_absolute() {
            return Ok(expanded);
        }

        let cwd = env::current_dir().map_err(|source| PathError::CurrentDir { source })?;
        Ok(cwd.join(expanded))
    }

    fn home_dir(&self) -> PathBuf {
        if let Ok(home) = env::var("HOME") {
            return PathBuf::from(home);
        }
        match env::var("USER") {
            Ok(user) => Path::new("/home").join(user),
            Err(_) => PathBuf::from("/"),
        }
    }

    fn xdg_config_home(&self) -> PathBuf {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.home_dir().join(".config"))
    }

    fn xdg_data_home(&self) -> PathBuf {
        env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.home_dir().join(".local").join("share"))
    }
}

fn is_var_char(c: &char) -> bool {
    c.is_ascii_alphanumeric() || *c == '_'
}

/// Expands a leading `~` and every `$VAR` / `${VAR}` in `input`.
///
/// `~` is only replaced when it stands for the whole first component. A `$` that is not
/// followed by a variable name is kept as is.
fn expand<F>(input: &str, home: &Path, lookup: F) -> PathResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    if let Some(after) = rest.strip_prefix('~') {
        if after.is_empty() || after.starts_with('/') {
            out.push_str(&home.to_string_lossy());
            rest = after;
        }
    }

    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let name: String = if chars.next_if_eq(&'{').is_some() {
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => name.push(c),
                    None => {
                        return Err(PathError::UnclosedVariable {
                            input: format!("${{{name}"),
                        })
                    }
                }
            }
            if name.is_empty() {
                out.push_str("${}");
                continue;
            }
            name
        } else {
            std::iter::from_fn(|| chars.next_if(is_var_char)).collect()
        };

        if name.is_empty() {
            out.push('$');
            continue;
        }

        let value = lookup(&name).ok_or_else(|| {
            PathError::MissingEnvVar {
                var: name.clone(),
                input: input.to_string(),
            }
        })?;
        out.push_str(&value);
    }

    Ok(out)
}

/// Resolves a path string using the system path resolver.
///
/// See [`PathResolver::resolve_path`] for detailed documentation.
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    SystemPathResolver.resolve_path(path)
}

/// Returns the user's home directory using the system path resolver.
pub fn home_dir() -> PathBuf {
    SystemPathResolver.home_dir()
}

/// Returns the user's config directory using the system path resolver.
pub fn xdg_config_home() -> PathBuf {
    SystemPathResolver.xdg_config_home()
}

/// Returns the user's data directory using the system path resolver.
pub fn xdg_data_home() -> PathBuf {
    SystemPathResolver.xdg_data_home()
}
