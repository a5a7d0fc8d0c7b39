use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn faultline() -> Command {
    let mut cmd = Command::cargo_bin("faultline").expect("binary exists");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn project_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/project")
}

fn patch_file() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/Calculator.diff")
}

// ---------------------------------------------------------------------------
// CLI smoke tests
// ---------------------------------------------------------------------------

#[test]
fn test_help_output() {
    faultline()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fault localization"));
}

#[test]
fn test_version_output() {
    faultline()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("faultline"));
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[test]
fn test_report_json_output() {
    let output = faultline()
        .args(["-p", project_dir(), "-f", "json", "report"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["primary_algorithm"], "ochiai");
    assert_eq!(report["algorithms"], serde_json::json!(["ochiai", "tarantula"]));
    assert_eq!(report["tests"]["total"], 3);
    assert_eq!(report["tests"]["failed"], 1);

    let blocks = report["blocks"].as_array().unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["start_line"], 10);
    assert_eq!(blocks[0]["end_line"], 14);
    assert_eq!(
        blocks[0]["path"],
        "src/main/java/org/example/Calculator.java"
    );
    assert_eq!(blocks[1]["method"], "org.example$Calculator#Calculator()");

    let tarantula = &report["sections"][1];
    assert_eq!(tarantula["algorithm"], "tarantula");
    assert_eq!(tarantula["lines"].as_array().unwrap().len(), 3);
}

#[test]
fn test_report_markdown_output() {
    faultline()
        .args(["-p", project_dir(), "-f", "markdown", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "src/main/java/org/example/Calculator.java#L10-L14",
        ))
        .stdout(predicate::str::contains("| Block | **ochiai** | tarantula |"))
        .stdout(predicate::str::contains("org.example.CalculatorTest#testDivide"));
}

#[test]
fn test_report_text_output() {
    faultline()
        .args(["-p", project_dir(), "-f", "text", "report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Suspicious blocks"))
        .stdout(predicate::str::contains("Calculator.java"));
}

#[test]
fn test_report_order_by_override() {
    let output = faultline()
        .args(["-p", project_dir(), "-f", "json", "report", "--order-by", "tarantula"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["algorithms"][0], "tarantula");
}

#[test]
fn test_report_unknown_order_fails() {
    faultline()
        .args(["-p", project_dir(), "report", "--order-by", "dstar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dstar"));
}

#[test]
fn test_report_missing_inputs_fails() {
    let temp = TempDir::new().unwrap();
    faultline()
        .args(["-p", temp.path().to_str().unwrap(), "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_report_inconsistent_matrix_fails() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("target");
    std::fs::create_dir_all(&out).unwrap();
    let src = std::path::Path::new(project_dir()).join("target/sfl/txt");
    for name in ["tests.csv", "spectra.csv", "ochiai.ranking.csv", "statistics.csv"] {
        std::fs::copy(src.join(name), out.join(name)).unwrap();
    }
    std::fs::write(out.join("matrix.txt"), "1 1 1 0 0 0 0 +\n").unwrap();

    faultline()
        .args(["-p", temp.path().to_str().unwrap(), "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Matrix has 1 rows but 3 tests"));
}

#[test]
fn test_missing_config_file_fails() {
    faultline()
        .args(["-c", "/nonexistent/faultline.toml", "report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ---------------------------------------------------------------------------
// Diff positions
// ---------------------------------------------------------------------------

#[test]
fn test_position_text_output() {
    faultline()
        .args(["-f", "text", "position", "--patch", patch_file(), "--line", "13", "--line", "14", "--line", "15"])
        .assert()
        .success()
        .stdout("13\t4\n14\t6\n15\t7\n");
}

#[test]
fn test_position_json_output() {
    let output = faultline()
        .args(["-f", "json", "position", "--patch", patch_file(), "--line", "10"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let positions: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(positions, serde_json::json!([{ "line": 10, "position": 1 }]));
}

#[test]
fn test_position_outside_hunk_fails() {
    faultline()
        .args(["position", "--patch", patch_file(), "--line", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Line 3 is not part of any diff hunk"));
}

#[test]
fn test_position_missing_patch_fails() {
    faultline()
        .args(["position", "--patch", "/nonexistent.diff", "--line", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read patch"));
}
