//! End-to-end coverage for the `run_ingestion` CLI entry point: runs the
//! compiled binary against a small fixture repository and checks both its
//! exit code and its `Yielded` stdout contract.

use std::fs;
use std::process::Command;

fn canopy_bin() -> &'static str {
    env!("CARGO_BIN_EXE_canopy")
}

#[test]
fn ingests_a_small_repository_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/main.rs"),
        "fn helper() {}\n\nfn main() {\n    helper();\n}\n",
    )
    .unwrap();

    let output = Command::new(canopy_bin())
        .arg(dir.path())
        .arg("--repo-id")
        .arg("fixture-repo")
        .output()
        .expect("failed to run canopy binary");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.lines().any(|l| l.contains("Type=Repository")));
    assert!(stdout.lines().any(|l| l.contains("Type=SourceFile")));
    assert!(stdout.lines().any(|l| l.contains("Type=CodeEntity")));
    for line in stdout.lines() {
        assert!(line.starts_with("Yielded "), "unexpected stdout line: {line}");
    }
}

#[test]
fn rejects_a_nonexistent_target_with_exit_code_one() {
    let output = Command::new(canopy_bin())
        .arg("/no/such/path/does-not-exist")
        .output()
        .expect("failed to run canopy binary");

    assert_eq!(output.status.code(), Some(1));
}
