//! Driver-path tests against a live server.

use tempfile::TempDir;
use warehouse_extract::config::ConnectionConfig;
use warehouse_extract::db::{DatabaseClient, VerticaClient};
use warehouse_extract::export::{export_via_driver, read_parquet, ExportTarget};
use warehouse_extract::sql::QueryText;

/// Helper to get the test server config from the environment.
fn get_test_config() -> Option<ConnectionConfig> {
    let url = std::env::var("VERTICA_TEST_URL").ok()?;
    ConnectionConfig::from_connection_string(&url).ok()
}

#[tokio::test]
async fn test_connect_with_valid_credentials() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: VERTICA_TEST_URL not set");
        return;
    };

    let client = VerticaClient::connect(&config).await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_export_round_trip() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: VERTICA_TEST_URL not set");
        return;
    };

    let dir = TempDir::new().unwrap();
    let target = ExportTarget::new(dir.path().join("out.parquet"), false);
    let query =
        QueryText::new("-- two rows\nSELECT 1 AS id, 'a' AS name\nUNION ALL\nSELECT 2, 'b'\n");

    let summary = export_via_driver(&config, &query, &target).await.unwrap();
    let reloaded = read_parquet(&summary.path).unwrap();

    assert_eq!(summary.rows, Some(2));
    assert_eq!(reloaded.column_names(), vec!["id", "name"]);
    assert_eq!(reloaded.row_count, 2);
}

#[tokio::test]
async fn test_query_error_is_reported() {
    let Some(config) = get_test_config() else {
        eprintln!("Skipping test: VERTICA_TEST_URL not set");
        return;
    };

    let client = VerticaClient::connect(&config).await.unwrap();
    let err = client
        .execute_query("SELECT * FROM nonexistent_table_xyz")
        .await
        .unwrap_err();
    assert_eq!(err.category(), "Query Error");
    client.close().await.unwrap();
}
