//! Server lifecycle: start against a scratch database, then shut down cleanly.

use refuge::config::Config;
use refuge::server::run_server;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

#[tokio::test]
async fn test_server_starts_and_shuts_down() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("refuge.db");
    let config = Config::test_config(db_path.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(run_server(config, shutdown_rx));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(db_path.exists(), "database file should be created on startup");

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop in time")
        .unwrap();
    assert!(result.is_ok());
}
