pub mod capture;
pub mod fake_backend;

use std::sync::OnceLock;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use crate::capture::CapturedLogs;

/// Upper bound for any single wait in these tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Records that reached the process-wide subscriber.
///
/// Sessions under test log through their own `Logger`; anything landing here
/// bypassed it. The subscriber is installed on first call, filtered by
/// `RUST_LOG` (default `info`).
pub fn global_logs() -> &'static CapturedLogs {
    static GLOBAL: OnceLock<CapturedLogs> = OnceLock::new();
    GLOBAL.get_or_init(|| {
        let logs = CapturedLogs::new();
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(logs.clone())
            .init();
        logs
    })
}

/// Await `f`, panicking once [`TEST_TIMEOUT`] has passed.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(out) => out,
        Err(_) => panic!("no result within {TEST_TIMEOUT:?}"),
    }
}

/// Poll `cond` every 10ms until it holds, within [`TEST_TIMEOUT`].
pub async fn wait_until<F>(mut cond: F)
where
    F: FnMut() -> bool,
{
    with_timeout(async {
        while !cond() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
}
