//! CLI Output Tests
//!
//! Tests for the command-line contract:
//! - stdout carries exactly one JSON object per invocation
//! - Log records go to stderr, never to stdout

use std::fs;
use std::process::Command;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn corpus_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("data.bin"), b"0123456789").unwrap();
    fs::write(
        dir.path().join("corpus.json"),
        r#"{
            "name": "demo",
            "indices": [
                {"id": "blocks", "strategy": "fixed-size", "source": {"files": ["data.bin"]}}
            ]
        }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{"logging": {"enabled": true, "min_severity": "trace"}}"#,
    )
    .unwrap();
    dir
}

fn corpusdb(dir: &TempDir, args: &[&str]) -> (std::process::Output, serde_json::Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_corpusdb"))
        .args(args)
        .arg("--manifest")
        .arg(dir.path().join("corpus.json"))
        .arg("--config")
        .arg(dir.path().join("config.json"))
        .output()
        .unwrap();

    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    assert_eq!(stdout.lines().count(), 1, "stdout was: {}", stdout);
    let value = serde_json::from_str(&stdout).unwrap();
    (output, value)
}

// =============================================================================
// Output Channels
// =============================================================================

/// Lifecycle logging stays on stderr while stdout holds the response.
#[test]
fn test_build_writes_single_response() {
    let dir = corpus_dir();
    let (output, response) = corpusdb(&dir, &["build"]);

    assert!(output.status.success());
    assert_eq!(response["status"], "ok");
    assert_eq!(response["data"]["indices"][0]["chunks"], 1);

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("SEGMENT_LOADED"));
    for line in stderr.lines() {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(record["event"].is_string());
    }
}

/// Failing commands also answer with one JSON object and exit non-zero.
#[test]
fn test_failed_read_writes_single_error() {
    let dir = corpus_dir();
    let (output, response) = corpusdb(&dir, &["read", "--index", "blocks", "--chunk", "5"]);

    assert!(!output.status.success());
    assert_eq!(response["status"], "error");
    assert_eq!(response["code"], "CORPUS_INDEX_OUT_OF_BOUNDS");
}
