use clap::{Parser, ValueHint};

#[derive(Parser)]
#[command(
    name = "extsync",
    author,
    about,
    disable_version_flag = true,
    help_template = "{before-help}{name}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Args {
    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Output logs as json
    #[arg(short, long)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long)]
    pub no_color: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Provide custom config file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Set proxy
    #[arg(required = false, long, short = 'P')]
    pub proxy: Option<String>,

    /// Set user agent
    #[arg(required = false, long, short = 'A')]
    pub user_agent: Option<String>,

    /// Download cached Chromium packages again
    #[arg(short, long)]
    pub force: bool,

    /// Write an example configuration file and exit
    #[arg(long)]
    pub defconfig: bool,

    /// Print version information
    #[arg(short = 'V', long)]
    pub version: bool,
}
