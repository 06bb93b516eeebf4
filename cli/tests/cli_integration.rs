use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use varsolve_core::variables::Constant;

fn run_varsolve(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_varsolve"))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn varsolve");

    child
        .stdin
        .take()
        .expect("stdin handle")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for varsolve")
}

fn temp_input(tag: &str, contents: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let path = std::env::temp_dir().join(format!(
        "varsolve_cli_{tag}_{}_{}.txt",
        std::process::id(),
        ts
    ));
    fs::write(&path, contents).expect("write temp input");
    path
}

#[test]
fn resolves_forward_references_from_stdin() {
    let output = run_varsolve(&[], "2\nB=A+1\nA=2\n");

    assert!(output.status.success(), "process failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "A = 2.000000\nB = 3.000000\n");
}

#[test]
fn reads_input_file() {
    let path = temp_input("file", "3\nz=y!\ny=x+1\nx=2\n");
    let output = run_varsolve(&[path.to_str().expect("utf-8 path")], "");
    let _ = fs::remove_file(&path);

    assert!(output.status.success(), "process failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "X = 2.000000\nY = 3.000000\nZ = 6.000000\n");
}

#[test]
fn circular_dependency_fails() {
    let output = run_varsolve(&[], "2\nA=B+1\nB=A+1\n");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Circular dependency detected or undefined variables"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn invalid_syntax_fails() {
    let output = run_varsolve(&[], "1\nA 5\n");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid assignment syntax"), "unexpected stderr: {stderr}");
}

#[test]
fn strict_mode_reports_evaluation_error() {
    let output = run_varsolve(&["--strict"], "1\nA=1/0\n");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Division by zero"), "unexpected stderr: {stderr}");
}

#[test]
fn json_output() {
    let output = run_varsolve(&["--json"], "1\nA=PI\n");

    assert!(output.status.success(), "process failed: {output:?}");
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid json output");
    assert_eq!(value["variables"][0]["name"], "A");
    assert_eq!(value["variables"][0]["value"], Constant::Pi.value());
    assert_eq!(value["passes"], 1);
}
