use error::ExtensionError;

pub mod error;
pub mod manifest;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub type ExtensionResult<T> = std::result::Result<T, ExtensionError>;
