//! End-to-end tests for the `cpm` binary.

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CHANNELS: &str = "CH Name,RX Freq,TX Freq,CH mode,Color Code,Time Slot,Talkgroup\n\
    Simplex,146.520,146.520,FM,,,\n\
    Hotspot,438.800,438.800,DMR,1,2,Local 9\n";

fn cpm(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cpm").unwrap();
    cmd.env("CPM_DB", db)
        .env_remove("RUST_LOG")
        .args(["--json", "--quiet"]);
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn import_list_and_export_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("codeplug.db");
    let input = dir.path().join("channels.csv");
    fs::write(&input, CHANNELS).unwrap();

    cpm(&db).arg("init").assert().success();

    let report = stdout_json(cpm(&db).args(["import", "--dialect", "generic"]).arg(&input));
    assert_eq!(report["members"][0]["stats"]["created"], 2);
    assert_eq!(report["members"][0]["placeholders"], 1);

    let listed = stdout_json(cpm(&db).args(["channel", "list"]));
    assert_eq!(listed["count"], 2);

    let out = dir.path().join("at890");
    let export = stdout_json(cpm(&db).args(["export", "--dialect", "anytone"]).arg(&out));
    assert!(export["manifest"].is_string());
    assert!(out.join("Channel.CSV").is_file());
}

#[test]
fn missing_database_exits_with_database_category() {
    let dir = TempDir::new().unwrap();
    let output = cpm(&dir.path().join("none.db"))
        .args(["channel", "list"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "NOT_INITIALIZED");
}

#[test]
fn renumber_mismatch_exits_with_precondition_category() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("codeplug.db");
    let input = dir.path().join("channels.csv");
    fs::write(&input, CHANNELS).unwrap();
    cpm(&db).arg("init").assert().success();
    cpm(&db).arg("import").arg(&input).assert().success();

    cpm(&db)
        .args(["channel", "reorder", "2"])
        .assert()
        .failure()
        .code(5);
}
