//! Engine integration tests: load errors, lifecycle and end-to-end delivery.

use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use flowline_core::types::WriteRequest;
use flowline_engine::{Engine, EngineError, RunOptions};

fn options(storage: &std::path::Path) -> RunOptions {
    RunOptions {
        listen_addr: "127.0.0.1:0".to_owned(),
        storage_path: storage.to_path_buf(),
    }
}

async fn write_config(dir: &std::path::Path, source: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    tokio::fs::write(&path, source).await.unwrap();
    path
}

#[tokio::test]
async fn missing_config_reports_no_such_file() {
    let storage = tempfile::tempdir().unwrap();
    let err = Engine::load("does_not_exist.toml", options(storage.path()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "does_not_exist.toml: no such file or directory");
}

#[tokio::test]
async fn invalid_config_reports_initial_load_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "[[scrape]]\nname = \"a\"\ntargets = [\"self\"]\nforward_to = [\"nowhere\"]\n",
    )
    .await;

    let err = Engine::load(&path, options(dir.path())).await.unwrap_err();
    assert!(matches!(err, EngineError::InitialLoad(_)));
    assert!(
        err.to_string()
            .starts_with("could not perform the initial load successfully"),
        "got: {err}"
    );
}

#[tokio::test]
async fn empty_config_runs_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "").await;
    let storage = dir.path().join("data");

    let engine = Engine::load(&path, options(&storage)).await.unwrap();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(engine.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished(), "an empty pipeline must keep running");
    assert!(storage.is_dir(), "storage directory is created on start");

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), task).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}

#[tokio::test]
async fn occupied_listen_address_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "").await;
    let blocker = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let engine = Engine::load(
        &path,
        RunOptions {
            listen_addr: blocker.local_addr().unwrap().to_string(),
            storage_path: dir.path().join("data"),
        },
    )
    .await
    .unwrap();

    let err = engine.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::Bind { .. }), "got: {err}");
}

#[tokio::test]
async fn self_scrape_is_delivered_to_the_endpoint() {
    let endpoint = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let source = format!(
        r#"
[[scrape]]
name = "agent_self"
targets = ["self"]
interval_ms = 50
forward_to = ["default"]

[[remote_write]]
name = "default"
endpoint = "{}"
"#,
        endpoint.local_addr().unwrap()
    );
    let path = write_config(dir.path(), &source).await;
    let storage = dir.path().join("data");

    let engine = Engine::load(&path, options(&storage)).await.unwrap();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(engine.run(cancel.clone()));

    let (stream, _) = tokio::time::timeout(Duration::from_secs(5), endpoint.accept())
        .await
        .expect("engine never connected")
        .unwrap();
    let mut lines = tokio::io::BufReader::new(stream).lines();
    let line = lines.next_line().await.unwrap().expect("connection closed");
    let request: WriteRequest = serde_json::from_str(&line).unwrap();

    assert_eq!(request.component_id, "prometheus.remote_write.default");
    let up = request
        .samples
        .iter()
        .find(|s| s.name == "up")
        .expect("every scrape carries an up sample");
    assert_eq!(up.value, 1.0);
    assert_eq!(up.label("job"), Some("agent_self"));

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), task).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
    assert!(storage.join("wal").join("default").is_dir());
}
