//! Run the chess_coach binary with scripted stdin

use std::io::Write;
use std::process::{Command, Stdio};

fn run_shell(input: &str) -> String {
    let exe = env!("CARGO_BIN_EXE_chess_coach");
    let mut child = Command::new(exe)
        .args(["--config", "no-such-config.toml", "--engine", "/nonexistent/engine"])
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn chess_coach");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let out = child.wait_with_output().expect("chess_coach did not exit");
    assert!(out.status.success());
    String::from_utf8(out.stdout).unwrap()
}

#[test]
fn test_missing_engine_falls_back_to_two_players() {
    let out = run_shell("e2\ne4\ne7\ne5\nquit\n");
    assert!(out.contains("Engine unavailable"));
    assert!(out.contains("You: e4"));
    assert!(out.contains("You: e5"));
    assert!(out.contains("Moves: 1. e4 e5"));
    assert!(out.ends_with("Bye\n"));
}

#[test]
fn test_bad_input_keeps_running() {
    let out = run_shell("castle\nskill\nhelp\n");
    assert!(out.contains("unknown command or square \"castle\""));
    assert!(out.contains("skill needs a level"));
    // EOF quits
    assert!(out.ends_with("Bye\n"));
}
