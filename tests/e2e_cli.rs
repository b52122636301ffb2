//! E2E tests for the `u2j` binary: `convert` and `keys`, config layering and
//! error reporting.

mod common;

use common::{Workspace, read_csv};
use predicates::prelude::*;
use serde_json::Value;

#[test]
fn e2e_convert_writes_csv_and_moves_attachments() {
    let workspace = Workspace::new();

    workspace
        .u2j()
        .args(["convert", "--project-key", "ACME"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 epics, 3 stories, 22 columns"))
        .stdout(predicate::str::contains("Attachments: 2 moved, 0 already in place"));

    let rows = read_csv(&workspace.join("output.csv"));
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[3][1], "ACME-3");

    // Default output root is the source attachments dir.
    let issue_dir = workspace.join("backup.complete/media/attachments/ACME/ACME-3");
    assert!(issue_dir.join("10_shot.png").is_file());
    assert!(issue_dir.join("11_trace.log").is_file());
}

#[test]
fn e2e_convert_twice_skips_relocated_attachments() {
    let workspace = Workspace::new();
    workspace.u2j().arg("convert").assert().success();

    workspace
        .u2j()
        .arg("convert")
        .assert()
        .success()
        .stdout(predicate::str::contains("Attachments: 0 moved, 2 already in place"));
}

#[test]
fn e2e_convert_dry_run_json() {
    let workspace = Workspace::new();

    let output = workspace
        .u2j()
        .args(["convert", "--dry-run", "--json"])
        .output()
        .expect("run u2j");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let summary: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(summary["project_key"], "LUTEST");
    assert_eq!(summary["dry_run"], true);
    assert_eq!(summary["export"]["tickets"], 3);
    assert_eq!(summary["attachments"]["planned"], 2);
    assert_eq!(summary["attachments"]["moved"], 0);

    assert!(workspace.join("backup.complete/media/attachments/10").is_file());
}

#[test]
fn e2e_convert_skip_attachments() {
    let workspace = Workspace::new();

    workspace
        .u2j()
        .args(["convert", "--skip-attachments"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Attachments: skipped"));

    assert!(workspace.join("output.csv").is_file());
    assert!(workspace.join("backup.complete/media/attachments/10").is_file());
}

#[test]
fn e2e_keys_with_offset_from_config_file() {
    let workspace = Workspace::new();
    workspace.write(
        "u2j.yaml",
        "project-key: WID\nissue-number-offset: 10\nuser-mappings:\n  ann: anne\n",
    );

    let output = workspace.u2j().args(["keys", "--json"]).output().expect("run u2j");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let entries: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let keys: Vec<&str> = entries
        .as_array()
        .expect("array")
        .iter()
        .map(|entry| entry["issue_key"].as_str().expect("key"))
        .collect();
    assert_eq!(keys, vec!["WID-12", "WID-1", "WID-2", "WID-3", "WID-4"]);
    assert_eq!(entries[3]["kind"], "milestone");
    assert_eq!(entries[3]["source"], "m1");
}

#[test]
fn e2e_cli_flag_overrides_config_file() {
    let workspace = Workspace::new();
    workspace.write("u2j.yaml", "project-key: WID\n");

    workspace
        .u2j()
        .args(["keys", "--project-key", "CLI"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CLI-3"))
        .stdout(predicate::str::contains("WID-").not());
}

#[test]
fn e2e_user_mapping_flag_renames_people() {
    let workspace = Workspace::new();

    workspace
        .u2j()
        .args(["convert", "--skip-attachments", "--user-mapping", "ann=anne"])
        .assert()
        .success();

    let rows = read_csv(&workspace.join("output.csv"));
    assert_eq!(rows[3][5], "anne");
}

#[test]
fn e2e_missing_backup_fails() {
    let workspace = Workspace::new();

    workspace
        .u2j()
        .args(["convert", "--backup-file", "nope.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn e2e_missing_attachment_fails() {
    let workspace = Workspace::new();
    std::fs::remove_file(workspace.join("backup.complete/media/attachments/11")).unwrap();

    workspace
        .u2j()
        .arg("convert")
        .assert()
        .failure()
        .stderr(predicate::str::contains("attachment 11 not found"));
}

#[test]
fn e2e_invalid_offset_fails() {
    let workspace = Workspace::new();
    workspace.write("u2j.yaml", "issue-number-offset: many\n");

    workspace
        .u2j()
        .arg("keys")
        .assert()
        .failure()
        .stderr(predicate::str::contains("issue-number-offset"));
}
