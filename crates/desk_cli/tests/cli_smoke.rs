use std::process::Command;

#[test]
fn cli_smoke_help() {
    let exe = env!("CARGO_BIN_EXE_desk");
    let output = Command::new(exe)
        .arg("--help")
        .output()
        .expect("failed to run desk --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("timer"));
}

#[test]
fn cli_rejects_unknown_command() {
    let exe = env!("CARGO_BIN_EXE_desk");
    let output = Command::new(exe)
        .arg("frobnicate")
        .output()
        .expect("failed to run desk");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}
