//! External-process export through fake vsql scripts.
#![cfg(unix)]

use super::common::{fake_vsql, gunzip, ECHO_ARGS};
use tempfile::TempDir;
use warehouse_extract::config::{ConnectionConfig, ProjectPaths};
use warehouse_extract::export::{export_via_vsql, ExportStrategy, ExportTarget, VsqlExporter};
use warehouse_extract::sql::QueryText;

fn config() -> ConnectionConfig {
    ConnectionConfig {
        host: Some("warehouse.example.com".to_string()),
        database: Some("advana".to_string()),
        user: Some("analyst".to_string()),
        password: Some("it's secret".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_pipeline_writes_gzip_under_raw_dir() {
    let project = TempDir::new().unwrap();
    let vsql = fake_vsql(project.path(), ECHO_ARGS);
    let exporter = VsqlExporter::new().with_vsql(&vsql);
    let paths = ProjectPaths::new(project.path());
    let query = QueryText::new("SELECT 1; -- comment\n");

    let summary = export_via_vsql(
        &exporter,
        &config(),
        &query,
        &ExportTarget::new("one.csv.gz", false),
        &paths,
    )
    .unwrap();

    assert_eq!(summary.strategy, ExportStrategy::Vsql);
    assert_eq!(summary.path, paths.raw_data_dir().join("one.csv.gz"));

    let args: Vec<String> = gunzip(&summary.path).lines().map(String::from).collect();
    assert_eq!(
        args,
        vec![
            "-h",
            "warehouse.example.com",
            "-d",
            "advana",
            "-U",
            "analyst",
            "-w",
            "it's secret",
            "-F",
            "|",
            "-At",
            "-c",
            "SELECT 1;",
        ]
    );
}

#[test]
fn test_pipeline_header_flag() {
    let project = TempDir::new().unwrap();
    let vsql = fake_vsql(project.path(), ECHO_ARGS);
    let exporter = VsqlExporter::new().with_vsql(&vsql);
    let output = project.path().join("out").join("with_header.gz");

    export_via_vsql(
        &exporter,
        &config(),
        &QueryText::new("SELECT 1"),
        &ExportTarget::new(&output, true),
        &ProjectPaths::new(project.path()),
    )
    .unwrap();

    let text = gunzip(&output);
    assert!(text.lines().any(|line| line == "-A"));
    assert!(!text.lines().any(|line| line == "-At"));
}

#[test]
fn test_vsql_failure_is_reported() {
    let project = TempDir::new().unwrap();
    let vsql = fake_vsql(
        project.path(),
        "echo 'ERROR 4566: Relation \"nope\" does not exist' >&2\nexit 1",
    );
    let exporter = VsqlExporter::new().with_vsql(&vsql);
    let output = project.path().join("failed.gz");

    let err = export_via_vsql(
        &exporter,
        &config(),
        &QueryText::new("SELECT * FROM nope"),
        &ExportTarget::new(&output, false),
        &ProjectPaths::new(project.path()),
    )
    .unwrap_err();

    assert_eq!(err.category(), "Process Error");
    assert!(err.to_string().contains("ERROR 4566"));
    assert!(!output.exists());
}

#[test]
fn test_missing_gzip_is_reported() {
    let project = TempDir::new().unwrap();
    let vsql = fake_vsql(project.path(), ECHO_ARGS);
    let exporter = VsqlExporter::new()
        .with_vsql(&vsql)
        .with_gzip(project.path().join("no-gzip"));
    let output = project.path().join("never.gz");

    let err = export_via_vsql(
        &exporter,
        &config(),
        &QueryText::new("SELECT 1"),
        &ExportTarget::new(&output, false),
        &ProjectPaths::new(project.path()),
    )
    .unwrap_err();

    assert_eq!(err.category(), "Process Error");
    assert!(err.to_string().contains("no-gzip"));
}
