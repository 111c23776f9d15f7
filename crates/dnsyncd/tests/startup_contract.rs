//! Contract: daemon startup and exit codes
//!
//! These tests run the real `dnsyncd` binary with a cleared environment so
//! nothing from the host leaks into the configuration.

use std::io::{BufRead, BufReader};
use std::process::{Command, Output, Stdio};

fn dnsyncd() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_dnsyncd"));
    command.env_clear();
    command
}

/// Base environment for a dry-run against a static value
fn dry_run_env(command: &mut Command) -> &mut Command {
    command
        .env("DDNS_PROVIDER", "hetzner")
        .env("DDNS_AUTH_TOKEN", "startup-test-token")
        .env("DDNS_RECORD_NAME", "home.example.com")
        .env("DDNS_RECORD_CONTENT", "192.0.2.10")
        .env("DDNS_DRY_RUN", "true")
}

fn run(command: &mut Command) -> Output {
    command.output().expect("dnsyncd runs")
}

#[test]
fn test_missing_config_exits_before_any_attempt() {
    let output = run(&mut dnsyncd());

    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("DDNS_PROVIDER"), "stderr: {}", stderr);
    assert!(!stdout.contains("sync attempt"));
}

#[test]
fn test_invalid_interval_is_config_error() {
    let output = run(dry_run_env(&mut dnsyncd()).env("DDNS_UPDATE_INTERVAL_SECONDS", "0"));

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("DDNS_UPDATE_INTERVAL_SECONDS"));
}

#[test]
fn test_run_once_success_exits_clean() {
    let output = run(dry_run_env(&mut dnsyncd()).env("DDNS_RUN_ONCE", "1"));

    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("sync attempt succeeded").count(), 1);
    assert!(!stdout.contains("startup-test-token"));
}

#[test]
fn test_run_once_failure_exits_with_runtime_error() {
    let output = run(dry_run_env(&mut dnsyncd())
        .env("DDNS_DRY_RUN", "false")
        .env("DDNS_LEXICON_BIN", "/nonexistent/dnsync-test/lexicon")
        .env("DDNS_RUN_ONCE", "true"));

    assert_eq!(output.status.code(), Some(2));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("sync attempt failed").count(), 1);
    assert!(stdout.contains("/nonexistent/dnsync-test/lexicon"));
}

#[test]
fn test_json_log_format() {
    let output = run(dry_run_env(&mut dnsyncd())
        .env("DDNS_RUN_ONCE", "true")
        .env("DDNS_LOG_FORMAT", "json"));

    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains("sync attempt succeeded"))
        .expect("success line");
    let event: serde_json::Value = serde_json::from_str(line).expect("line is JSON");
    assert_eq!(event["fields"]["status"], "success");
    assert_eq!(event["fields"]["provider"], "hetzner");
}

/// Start a long-interval daemon, wait for its first attempt, send `signal`
/// and collect the remaining stdout lines and the exit code.
#[cfg(unix)]
fn stop_with(signal: &str) -> (Option<i32>, Vec<String>) {
    let mut child = dry_run_env(&mut dnsyncd())
        .env("DDNS_UPDATE_INTERVAL_SECONDS", "3600")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("dnsyncd starts");

    // Wait for the first attempt, which runs immediately.
    let stdout = child.stdout.take().expect("piped stdout");
    let mut lines = BufReader::new(stdout).lines();
    let first = lines
        .by_ref()
        .map_while(|line| line.ok())
        .find(|line| line.contains("sync attempt"));
    assert!(first.is_some_and(|l| l.contains("succeeded")));

    let killed = Command::new("kill")
        .arg(format!("-{}", signal))
        .arg(child.id().to_string())
        .status()
        .expect("kill runs");
    assert!(killed.success());

    let rest: Vec<String> = lines.map_while(|line| line.ok()).collect();
    let status = child.wait().expect("dnsyncd exits");

    (status.code(), rest)
}

#[cfg(unix)]
#[test]
fn test_sigterm_is_clean_shutdown() {
    let (code, rest) = stop_with("TERM");

    assert_eq!(code, Some(0));
    assert!(rest.iter().any(|l| l.contains("SIGTERM")));
    assert!(!rest.iter().any(|l| l.contains("sync attempt")));
}

#[cfg(unix)]
#[test]
fn test_sigint_is_clean_shutdown() {
    let (code, rest) = stop_with("INT");

    assert_eq!(code, Some(0));
    assert!(rest.iter().any(|l| l.contains("SIGINT")));
    assert!(rest.iter().any(|l| l.contains("Log flushed")));
    assert!(!rest.iter().any(|l| l.contains("sync attempt")));
}
