//! Integration tests for the tp-import CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a tp-import command isolated from the user's config
fn tp_import(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tp-import").unwrap();
    cmd.current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"))
        .env_remove("TP_IMPORT_URL")
        .env_remove("TP_IMPORT_TOKEN")
        .env_remove("TP_IMPORT_FILE")
        .env_remove("RUST_LOG");
    cmd
}

const EXPORT: &str = "\
Program,Product,Product / Program,Project / Operations,Project State,Project Area / Activity
Games,Alpha,Alpha,Launch,Closed,Level design
,Beta,Beta,Refactor,,Cleanup
";

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Targetprocess"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("template"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tp-import"));
}

#[test]
fn test_unknown_command_fails() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp).arg("export").assert().failure();
}

// ============================================================================
// Template / Registry Tests
// ============================================================================

#[test]
fn test_template_lists_all_columns() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp)
        .arg("template")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Program,Product,Product State"))
        .stdout(predicate::str::contains("Project Area / Activity"));
}

#[test]
fn test_template_single_stage() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp)
        .args(["template", "programs"])
        .assert()
        .success()
        .stdout("Program\n");
}

#[test]
fn test_template_unknown_stage_fails() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp)
        .args(["template", "stories"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stories"));
}

#[test]
fn test_registry_stage_order() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp)
        .args(["registry", "--order"])
        .assert()
        .success()
        .stdout("programs → projects → epics → features → epic state fix\n");
}

#[test]
fn test_registry_prints_yaml() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp)
        .arg("registry")
        .assert()
        .success()
        .stdout(predicate::str::contains("name_column: Program"))
        .stdout(predicate::str::contains("entityType.id"));
}

#[test]
fn test_registry_file_with_cycle_fails() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("registry.yaml"),
        "\
entity_types:
  - entity: a
    resource: as
    name_column: A
    linked:
      - target_type: b
        column: B
  - entity: b
    resource: bs
    name_column: B
    linked:
      - target_type: a
        column: A
",
    )
    .unwrap();

    tp_import(&tmp)
        .args(["registry", "--registry", "registry.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
}

#[test]
fn test_registry_file_reorders_template() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("registry.yaml"),
        "\
entity_types:
  - entity: team
    resource: teams
    name_column: Team
    unique_by_name: true
    custom_fields:
      - name: Lead
        column: Team Lead
",
    )
    .unwrap();

    tp_import(&tmp)
        .args(["--registry", "registry.yaml", "template"])
        .assert()
        .success()
        .stdout("Team,Team Lead\n");
}

// ============================================================================
// Import Tests
// ============================================================================

#[test]
fn test_import_dry_run_without_server() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("export.csv"), EXPORT).unwrap();

    tp_import(&tmp)
        .args([
            "import",
            "--url",
            "http://127.0.0.1:9",
            "--file",
            "export.csv",
            "--timeout",
            "5",
            "--dry-run",
            "--quiet",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would create programs"))
        .stdout(predicate::str::contains("\"name\":\"Games\""))
        .stdout(predicate::str::contains("Would create features"))
        .stdout(predicate::str::contains("Completed!"));

    // Every query failed; the failures are logged, not fatal
    let log = fs::read_to_string(tmp.path().join("import.log")).unwrap();
    assert!(log.contains("Fail to get program entities"));
}

#[test]
fn test_import_dry_run_skips_blank_names() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("export.csv"), EXPORT).unwrap();

    let output = tp_import(&tmp)
        .args([
            "import",
            "--url",
            "http://127.0.0.1:9",
            "--file",
            "export.csv",
            "--timeout",
            "5",
            "--dry-run",
            "--quiet",
        ])
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let programs = stdout
        .lines()
        .filter(|l| l.contains("Would create programs"))
        .count();
    assert_eq!(programs, 1);
}

#[test]
fn test_import_missing_file_fails() {
    let tmp = TempDir::new().unwrap();

    tp_import(&tmp)
        .args([
            "import",
            "--url",
            "http://127.0.0.1:9",
            "--file",
            "missing.csv",
            "--timeout",
            "5",
            "--quiet",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import aborted"));
}

#[test]
fn test_import_rejects_bad_stage_file() {
    let tmp = TempDir::new().unwrap();

    tp_import(&tmp)
        .args(["import", "--stage-file", "epics.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("STAGE=PATH"));
}

#[test]
fn test_import_log_file_location() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("export.csv"), EXPORT).unwrap();

    tp_import(&tmp)
        .args([
            "import",
            "--url",
            "http://127.0.0.1:9",
            "--file",
            "export.csv",
            "--log-file",
            "run.log",
            "--timeout",
            "5",
            "--dry-run",
            "--quiet",
        ])
        .assert()
        .success();

    assert!(tmp.path().join("run.log").exists());
    assert!(!tmp.path().join("import.log").exists());
}

// ============================================================================
// Completions Tests
// ============================================================================

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    tp_import(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tp-import"));
}

#[test]
fn test_import_warns_when_discovery_meets_registry_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("registry.yaml"),
        "entity_types:\n  - entity: team\n    resource: teams\n    name_column: Team\n",
    )
    .unwrap();
    fs::write(tmp.path().join("teams.csv"), "Team\nCore\n").unwrap();

    tp_import(&tmp)
        .args([
            "--registry",
            "registry.yaml",
            "import",
            "--url",
            "http://127.0.0.1:9",
            "--file",
            "teams.csv",
            "--timeout",
            "5",
            "--discover-type-ids",
            "--dry-run",
            "--quiet",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "--discover-type-ids is ignored when a registry file is used",
        ))
        .stdout(predicate::str::contains("Would create teams"));
}

#[test]
fn test_import_reports_problem_count_once() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("export.csv"), EXPORT).unwrap();

    let output = tp_import(&tmp)
        .args([
            "import",
            "--url",
            "http://127.0.0.1:9",
            "--file",
            "export.csv",
            "--timeout",
            "5",
            "--dry-run",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("problem(s) logged to").count(), 1);
    assert!(!stdout.contains("Diagnostics:"));
    assert!(stdout.contains("Import Summary"));
}
