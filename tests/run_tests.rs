use std::io::Read;
use std::process::Stdio;
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn lc3vm() -> Command {
    let mut cmd = Command::cargo_bin("lc3vm").unwrap();
    cmd.env_remove("LC3VM_STEP_LIMIT").env_remove("LC3VM_MINIMAL");
    cmd
}

#[test]
fn runs_hello_world() {
    lc3vm()
        .arg("tests/files/hello.obj")
        .assert()
        .success()
        .stdout(contains("Hello, world!"))
        .stdout(contains("Halted"))
        .stderr(contains("Completed"));
}

#[test]
fn minimal_run_is_quiet() {
    lc3vm()
        .arg("tests/files/hello.obj")
        .arg("--minimal")
        .assert()
        .success()
        .stdout("Hello, world!\n\nHalted\n")
        .stderr("");
}

#[test]
fn echoes_piped_input() {
    lc3vm()
        .arg("tests/files/echo.obj")
        .arg("--minimal")
        .write_stdin("ok")
        .assert()
        .success()
        .stdout("ok\nHalted\n");
}

#[test]
fn fails_when_input_runs_out() {
    lc3vm()
        .arg("tests/files/echo.obj")
        .write_stdin("o")
        .assert()
        .failure()
        .stderr(contains("standard input closed"));
}

#[test]
fn keyboard_status_does_not_wait_for_input() {
    // LDI R1, #1 ; HALT ; .FILL xFE00
    // Stdin stays open and empty the whole time, so the poll must not block on it.
    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("lc3vm"))
        .arg("tests/files/poll.obj")
        .arg("--minimal")
        .env_remove("LC3VM_STEP_LIMIT")
        .env_remove("LC3VM_MINIMAL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let stdin = child.stdin.take();

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("polling the keyboard blocked on open stdin");
        }
        thread::sleep(Duration::from_millis(20));
    };
    drop(stdin);

    let mut stdout = String::new();
    child.stdout.take().unwrap().read_to_string(&mut stdout).unwrap();
    assert!(status.success());
    assert_eq!(stdout, "\nHalted\n");
}

#[test]
fn reserved_opcode_is_fatal() {
    lc3vm()
        .arg("tests/files/rti.obj")
        .assert()
        .failure()
        .stderr(contains("RTI").and(contains("0x3000")));
}

#[test]
fn unknown_trap_is_fatal() {
    lc3vm()
        .arg("tests/files/badtrap.obj")
        .assert()
        .failure()
        .stderr(contains("x30"));
}

#[test]
fn step_limit_stops_runaway_program() {
    lc3vm()
        .arg("tests/files/spin.obj")
        .args(["--step-limit", "1000"])
        .assert()
        .failure()
        .stderr(contains("did not halt within 1000 instructions"));

    lc3vm()
        .arg("tests/files/spin.obj")
        .env("LC3VM_STEP_LIMIT", "50")
        .assert()
        .failure()
        .stderr(contains("did not halt within 50 instructions"));
}

#[test]
fn prints_final_registers() {
    lc3vm()
        .arg("tests/files/regs.obj")
        .args(["--minimal", "--registers"])
        .assert()
        .success()
        .stderr(contains("R1 7\n").and(contains("PC 16386\n")).and(contains("CC 001\n")));
}

#[test]
fn rejects_bad_images() {
    lc3vm()
        .arg("tests/files/odd.obj")
        .assert()
        .failure()
        .stderr(contains("not aligned to 16 bits"));

    lc3vm()
        .arg("tests/files/missing.obj")
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}

#[test]
fn requires_a_path() {
    lc3vm().assert().failure();
}
