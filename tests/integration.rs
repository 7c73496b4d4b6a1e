use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use noteless::config::RecordsConfig;
use noteless::sqlite_store::SqliteRecordStore;
use noteless::{db, migrate};
use noteless_core::models::{Detection, NoteRecord};
use noteless_core::store::RecordStore;

fn noteless_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("noteless");
    path
}

fn write_config(root: &Path, ocr_binary: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[records]
path = "{root}/data/noteless.sqlite"

[blobs]
backend = "filesystem"
root = "{root}/data/blobs"

[ocr]
provider = "tesseract"
binary = "{ocr_binary}"
timeout_secs = 10

[commands]
confidence_threshold = 90.0
"#,
        root = root.display(),
        ocr_binary = ocr_binary,
    );

    let config_path = config_dir.join("noteless.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "tesseract");
    (tmp, config_path)
}

fn run_noteless(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = noteless_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env("RUST_LOG", "noteless=warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run noteless binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Write note records straight into the SQLite store, as earlier intakes would have.
fn seed_records(root: &Path, notes: &[&[(&str, f64)]]) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let pool = db::connect(&RecordsConfig {
            path: root.join("data").join("noteless.sqlite"),
        })
        .await
        .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let store = SqliteRecordStore::new(pool);
        for detections in notes {
            let record = NoteRecord::new(
                uuid::Uuid::new_v4(),
                detections
                    .iter()
                    .map(|(t, c)| Detection::new(*t, *c))
                    .collect(),
            );
            store
                .put(&record.snapid.to_string(), &record.to_document().unwrap())
                .await
                .unwrap();
        }
    });
}

#[test]
fn test_init_creates_database_and_blob_root() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_noteless(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/noteless.sqlite").exists());
    assert!(tmp.path().join("data/blobs").is_dir());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_noteless(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_noteless(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_noteless(&tmp.path().join("nope.toml"), &["rules"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_rules_prints_vocabulary_and_threshold() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_noteless(&config_path, &["rules"]);
    assert!(success, "rules failed: {}", stderr);
    for word in ["go", "stop", "on", "off", "left", "right", "up", "down", "to"] {
        assert!(stdout.contains(&format!("\"{}\"", word)), "missing {}", word);
    }
    assert!(stdout.contains("90.0"));
}

#[test]
fn test_commands_on_empty_database() {
    let (_tmp, config_path) = setup_test_env();
    run_noteless(&config_path, &["init"]);

    let (stdout, stderr, success) = run_noteless(&config_path, &["commands"]);
    assert!(success, "commands failed: {}", stderr);
    assert_eq!(stdout.trim(), "[]");
}

#[test]
fn test_commands_from_seeded_records() {
    let (tmp, config_path) = setup_test_env();
    seed_records(
        tmp.path(),
        &[
            &[("GO", 95.0), ("Go", 95.0), ("stop", 50.0)],
            &[("banana", 99.0), ("to", 90.0), ("to", 90.01)],
        ],
    );

    let (stdout, stderr, success) = run_noteless(&config_path, &["commands"]);
    assert!(success, "commands failed: {}", stderr);
    let commands: Vec<String> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(commands, vec!["go (95.00%)", "to (90.01%)"]);
}

#[test]
fn test_audit_reports_records_without_images() {
    let (tmp, config_path) = setup_test_env();
    run_noteless(&config_path, &["init"]);
    seed_records(tmp.path(), &[&[("go", 99.0)]]);

    let (stdout, stderr, success) = run_noteless(&config_path, &["audit", "--json"]);
    assert!(success, "audit failed: {}", stderr);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["notes"], 0);
    assert_eq!(report["orphan_records"].as_array().unwrap().len(), 1);
    assert!(report["orphan_blobs"].as_array().unwrap().is_empty());
}

#[test]
fn test_intake_with_missing_ocr_binary_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "/nonexistent/tesseract");
    let image = tmp.path().join("snap.png");
    fs::write(&image, b"\x89PNG").unwrap();

    let (_, stderr, success) =
        run_noteless(&config_path, &["intake", image.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Can't detect text"));
    assert!(!tmp.path().join("data/blobs/raw").exists());
}

/// Full local flow with a stand-in OCR binary that prints Tesseract TSV.
#[cfg(unix)]
#[test]
fn test_intake_commands_and_audit_end_to_end() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let script = tmp.path().join("fake-tesseract");
    fs::write(
        &script,
        "#!/bin/sh\ncat > /dev/null\nprintf 'level\\tpage_num\\tblock_num\\tpar_num\\tline_num\\tword_num\\tleft\\ttop\\twidth\\theight\\tconf\\ttext\\n5\\t1\\t1\\t1\\t1\\t1\\t10\\t10\\t50\\t20\\t96.5\\tGO\\n5\\t1\\t1\\t1\\t1\\t2\\t70\\t10\\t50\\t20\\t40\\tright\\n'\n",
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let config_path = write_config(tmp.path(), script.to_str().unwrap());
    let image = tmp.path().join("snap.png");
    fs::write(&image, b"\x89PNG fake").unwrap();

    let (stdout, stderr, success) =
        run_noteless(&config_path, &["intake", image.to_str().unwrap()]);
    assert!(success, "intake failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Found 2 fragments"));

    let stored: Vec<_> = fs::read_dir(tmp.path().join("data/blobs/raw"))
        .unwrap()
        .collect();
    assert_eq!(stored.len(), 1);

    let (stdout, _, success) = run_noteless(&config_path, &["commands"]);
    assert!(success);
    let commands: Vec<String> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(commands, vec!["go (96.50%)"]);

    let (stdout, _, success) = run_noteless(&config_path, &["audit"]);
    assert!(success);
    assert!(stdout.contains("Notes: 1"));
    assert!(stdout.contains("Orphan images: 0"));
    assert!(stdout.contains("Orphan records: 0"));
}
