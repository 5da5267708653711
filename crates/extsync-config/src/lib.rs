pub mod config;
pub mod error;
pub mod extension;

#[cfg(test)]
pub mod test_utils;
