// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod types;
pub mod watch;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::config::Settings;
use crate::errors::{FseventError, Result};
use crate::logging::Logger;
use crate::watch::WatchTarget;

/// High-level entry point used by `main.rs`.
///
/// Resolves the watch path from `args` and runs a watch session on it until
/// `shutdown` is cancelled or the backend closes its streams.
pub async fn run(
    args: CliArgs,
    settings: &Settings,
    logger: &Logger,
    shutdown: CancellationToken,
) -> Result<()> {
    logger.in_scope(|| {
        debug!(
            default_watch_file = %settings.watch_file,
            log_format = ?settings.log_format(),
            "resolved settings"
        )
    });

    let path = args.path.ok_or(FseventError::MissingWatchPath)?;
    let target = WatchTarget::resolve(&path)?;

    watch::run_watch(shutdown, &target, logger).await
}

/// Cancel `token` on the first Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken, logger: Logger) -> JoinHandle<()> {
    tokio::spawn(logger.scope(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => token.cancel(),
            Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
        }
    }))
}
