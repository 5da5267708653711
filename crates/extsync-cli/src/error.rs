use extsync_config::error::ConfigError;
use miette::Diagnostic;
use thiserror::Error;

/// Failures that stop the program before any extension is synchronized.
#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid proxy `{proxy}`: {source}")]
    #[diagnostic(
        code(extsync::invalid_proxy),
        help("Use a proxy URL such as http://host:port or socks5://host:port")
    )]
    Proxy {
        proxy: String,
        #[source]
        source: ureq::Error,
    },
}
