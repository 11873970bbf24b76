use std::error::Error;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::Stdio;

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command;
use predicates::prelude::*;
use rand::Rng;

type TestResult = Result<(), Box<dyn Error>>;

const PRG: &str = "tailf";
const EMPTY: &str = "tests/inputs/empty.txt";
const THREE: &str = "tests/inputs/three.txt";
const TWENTY: &str = "tests/inputs/twenty.txt";
const INVALID: &str = "tests/inputs/invalid.txt";
const UNTERMINATED: &str = "tests/inputs/unterminated.txt";

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn random_line() -> String {
    let mut rng = rand::thread_rng();
    let body: String = (0..20)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("{}\n", body)
}

fn random_file(lines: usize) -> Result<(tempfile::TempDir, PathBuf, Vec<String>), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("file.txt");
    let content: Vec<String> = (0..lines).map(|_| random_line()).collect();
    fs::write(&path, content.concat())?;
    Ok((dir, path, content))
}

fn run(args: &[&str], expected: &str) -> TestResult {
    Command::cargo_bin(PRG)?
        .args(args)
        .assert()
        .success()
        .stdout(expected.to_string());
    Ok(())
}

#[test]
fn dies_no_args() -> TestResult {
    Command::cargo_bin(PRG)?
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}

#[test]
fn dies_bad_line_count() -> TestResult {
    Command::cargo_bin(PRG)?
        .args([THREE, "-n", "foo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("illegal line count -- foo"));
    Ok(())
}

#[test]
fn dies_bad_sleep_interval() -> TestResult {
    Command::cargo_bin(PRG)?
        .args([THREE, "-f", "-s", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("illegal sleep interval -- 0"));
    Ok(())
}

#[test]
fn dies_missing_file() -> TestResult {
    Command::cargo_bin(PRG)?
        .arg("tests/inputs/does-not-exist.txt")
        .assert()
        .failure()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("tests/inputs/does-not-exist.txt"));
    Ok(())
}

#[test]
fn dies_missing_file_when_following() -> TestResult {
    Command::cargo_bin(PRG)?
        .args(["-f", "tests/inputs/does-not-exist.txt"])
        .assert()
        .failure()
        .stdout("");
    Ok(())
}

#[test]
fn random_twenty_default_ten() -> TestResult {
    let (_dir, path, content) = random_file(20)?;
    let expected = content[10..].concat();
    run(&[path.to_str().unwrap(), "-n", "10"], &expected)?;
    run(&[path.to_str().unwrap()], &expected)
}

#[test]
fn empty() -> TestResult {
    run(&[EMPTY], "")?;
    run(&[EMPTY, "-n", "10"], "")
}

#[test]
fn three_fewer_than_requested() -> TestResult {
    run(&[THREE, "-n", "10"], "one\ntwo\nthree\n")
}

#[test]
fn three_n1() -> TestResult {
    run(&[THREE, "-n", "1"], "three\n")
}

#[test]
fn three_n0() -> TestResult {
    run(&[THREE, "-n", "0"], "")
}

#[test]
fn twenty_long_option() -> TestResult {
    run(
        &[TWENTY, "--number-of-lines", "3"],
        "line 18\nline 19\nline 20\n",
    )
}

#[test]
fn twenty_all() -> TestResult {
    let expected = fs::read_to_string(TWENTY)?;
    run(&[TWENTY, "-n", "100"], &expected)
}

#[test]
fn invalid_utf8_is_replaced() -> TestResult {
    run(&[INVALID], "ok\n\u{FFFD}bad\n")
}

#[test]
fn unterminated_last_line() -> TestResult {
    run(&[UNTERMINATED, "-n", "1"], "last without newline")?;
    run(&[UNTERMINATED], "first\nlast without newline")
}

#[test]
fn closed_output_exits_quietly() -> TestResult {
    let (_dir, path, _) = random_file(50_000)?;

    let mut child = std::process::Command::cargo_bin(PRG)?
        .args(["-n", "50000"])
        .arg(&path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let mut stdout = BufReader::new(child.stdout.take().ok_or("stdout was not captured")?);
        let mut first = String::new();
        stdout.read_line(&mut first)?;
        assert_eq!(first.len(), 21);
    }

    let output = child.wait_with_output()?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stderr), "");
    Ok(())
}
