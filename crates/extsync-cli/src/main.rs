use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use cli::Args;
use error::CliError;
use extsync_config::{
    config::{default_config_path, generate_default_config, Config},
    error::ConfigError,
};
use extsync_dl::http_client::configure_http_client;
use extsync_events::{ChannelSink, EventSinkHandle, NullSink};
use extsync_operations::{group_requests, synchronize, RunSummary, SyncContext, FATAL_EXIT_CODE};
use extsync_utils::path::resolve_path;
use logging::{parse_level, setup_logging};
use nu_ansi_term::Color::{Green, Red, Yellow};
use progress::{spawn_event_handler, ProgressGuard};
use tracing::{debug, info, warn};
use ureq::Proxy;
use utils::{progress_enabled, set_color, set_progress, Colored};

mod cli;
mod error;
mod logging;
mod progress;
mod utils;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const COMMIT: &str = match option_env!("EXTSYNC_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

const BUILD_DATE: &str = match option_env!("EXTSYNC_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

fn version_line() -> String {
    format!("extsync version={VERSION}, commit={COMMIT}, date={BUILD_DATE}")
}

fn create_context(
    config: &Config,
    refresh: bool,
) -> Result<(SyncContext, Option<ProgressGuard>), ConfigError> {
    if progress_enabled() {
        let (sink, receiver) = ChannelSink::new();
        let events: EventSinkHandle = Arc::new(sink);
        let ctx = SyncContext::from_config(config, refresh, events)?;
        Ok((ctx, Some(spawn_event_handler(receiver))))
    } else {
        let events: EventSinkHandle = Arc::new(NullSink);
        Ok((SyncContext::from_config(config, refresh, events)?, None))
    }
}

fn config_path(args: &Args) -> Result<PathBuf, ConfigError> {
    match &args.config {
        Some(path) => Ok(resolve_path(path)?),
        None => Ok(default_config_path()),
    }
}

fn report_summary(summary: &RunSummary) {
    let errors = if summary.errors > 0 {
        Colored(Red, summary.errors)
    } else {
        Colored(Green, summary.errors)
    };

    info!(
        updates = summary.updates,
        skipped = summary.skipped,
        errors = summary.errors,
        duration_ms = summary.duration.as_millis() as u64,
        "Updated: {}, skipped: {}, errors: {} ({:.2?})",
        Colored(Green, summary.updates),
        Colored(Yellow, summary.skipped),
        errors,
        summary.duration
    );
}

/// Loads the configuration, runs one synchronization and returns the process status.
async fn handle_cli(args: &Args) -> Result<u8, CliError> {
    let config_path = config_path(args)?;

    if args.defconfig {
        generate_default_config(&config_path)?;
        info!("Default configuration written to {}", config_path.display());
        return Ok(0);
    }

    let config = Config::load(&config_path)?;

    let proxy = args
        .proxy
        .as_deref()
        .map(|proxy| {
            Proxy::new(proxy).map_err(|source| {
                CliError::Proxy {
                    proxy: proxy.to_string(),
                    source,
                }
            })
        })
        .transpose()?;
    let user_agent = args.user_agent.clone();
    let timeout = config.get_http_timeout();

    configure_http_client(|client| {
        if proxy.is_some() {
            client.proxy = proxy;
        }
        if user_agent.is_some() {
            client.user_agent = user_agent;
        }
        if timeout.is_some() {
            client.timeout = timeout;
        }
    });

    let requests = group_requests(&config.extensions)?;
    if requests.is_empty() {
        warn!("No extensions configured in {}", config_path.display());
    }
    debug!(
        "{} unique extensions, parallel limit {}",
        requests.len(),
        config.get_parallel_limit()
    );

    let (ctx, progress_guard) = create_context(&config, args.force)?;
    let summary = synchronize(&ctx, requests).await;

    // the context holds the event sender; drop it so the progress thread can drain and exit
    drop(ctx);
    if let Some(guard) = progress_guard {
        guard.finish();
    }
    progress::stop();

    report_summary(&summary);
    Ok(summary.exit_code())
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    let args = Args::parse();

    if args.version {
        println!("{}", version_line());
        return ExitCode::SUCCESS;
    }

    let Some(level) = parse_level(&args.log_level) else {
        eprintln!(
            "Invalid log level `{}`: expected one of trace, debug, info, warn, error",
            args.log_level
        );
        return ExitCode::from(1);
    };

    if args.no_color {
        set_color(false);
    }
    if args.no_progress || args.json {
        set_progress(false);
    }

    setup_logging(level, args.json);

    match handle_cli(&args).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            report_summary(&RunSummary::default());
            ExitCode::from(FATAL_EXIT_CODE)
        }
    }
}
