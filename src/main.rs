// src/main.rs

use fsevent::config::Settings;
use fsevent::{cli, logging, run};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() {
    let args = cli::parse();
    let settings = Settings::from_env();
    let logger = logging::build_logger(
        std::io::stderr,
        settings.log_format(),
        &logging::application_name(),
    );

    let shutdown = CancellationToken::new();
    let _interrupt = fsevent::cancel_on_ctrl_c(shutdown.clone(), logger.clone());

    if let Err(err) = run(args, &settings, &logger, shutdown).await {
        logger.in_scope(|| info!(error = %err, "run error"));
        std::process::exit(1);
    }
}
