use std::path::PathBuf;

use fsevent::cli::CliArgs;
use fsevent::config::{LogFormat, Settings};
use fsevent::errors::FseventError;
use fsevent::logging::{build_logger, Logger};
use fsevent::run;
use fsevent_test_utils::capture::CapturedLogs;
use fsevent_test_utils::{wait_until, with_timeout};
use tokio_util::sync::CancellationToken;

fn text_logger() -> (Logger, CapturedLogs) {
    let logs = CapturedLogs::new();
    let logger = build_logger(logs.clone(), LogFormat::Text, "fsevent-test");
    (logger, logs)
}

#[tokio::test]
async fn test_missing_path_is_a_startup_error() {
    let (logger, logs) = text_logger();
    let args = CliArgs { path: None };

    let result = run(args, &Settings::default(), &logger, CancellationToken::new()).await;

    assert!(matches!(result, Err(FseventError::MissingWatchPath)));
    assert_eq!(logs.count("added watch"), 0);
}

#[tokio::test]
async fn test_nonexistent_path_fails_registration() {
    let (logger, logs) = text_logger();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let args = CliArgs {
        path: Some(missing.clone()),
    };

    let token = CancellationToken::new();
    let result = with_timeout(run(args, &Settings::default(), &logger, token)).await;

    match result {
        Err(FseventError::Registration { path, .. }) => assert_eq!(path, missing),
        other => panic!("Expected Registration error, got: {:?}", other),
    }
    assert_eq!(logs.count("added watch"), 0);
    assert_eq!(logs.count("watch session finished"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_run_returns_ok() {
    let (logger, logs) = text_logger();
    let dir = tempfile::tempdir().unwrap();
    let args = CliArgs {
        path: Some(PathBuf::from(dir.path())),
    };

    let token = CancellationToken::new();
    let handle = tokio::spawn({
        let logger = logger.clone();
        let token = token.clone();
        async move { run(args, &Settings::default(), &logger, token).await }
    });

    wait_until(|| logs.count("added watch") == 1).await;
    token.cancel();

    let result = with_timeout(handle).await.unwrap();
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(logs.count("cancellation requested"), 1);
    assert_eq!(logs.count("watch session finished"), 1);
}
