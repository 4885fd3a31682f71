//! Blackbox driver tests (`SPEC_FULL.md` section 9 "Test tooling"):
//! invokes the built `msc` binary against the concrete scenarios from
//! section 8, the same way `faxc-drv/tests/e2e/cli_tests.rs` drives `faxc`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn msc_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_msc"))
}

/// Writes `source` to `<name>.ms` inside a fresh temp directory and returns
/// both, so the directory isn't dropped (and the file deleted) before the
/// command runs.
fn write_script(name: &str, source: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join(format!("{name}.ms"));
    std::fs::write(&path, source).expect("write fixture script");
    (dir, path)
}

#[test]
fn hello_string_export_prints_the_returned_value() {
    let (_dir, path) = write_script(
        "hello",
        r#"function GetAuthorName() : string
             return "Alice";
           end"#,
    );

    Command::new(msc_bin())
        .arg(&path)
        .arg("--export")
        .arg("GetAuthorName")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"GetAuthorName = "Alice""#));
}

#[test]
fn arithmetic_promotion_exports_a_float() {
    let (_dir, path) = write_script("promote", "function f() : float return 1 + 2.5; end");

    Command::new(msc_bin())
        .arg(&path)
        .arg("--export")
        .arg("f")
        .assert()
        .success()
        .stdout(predicate::str::contains("f = 3.5"));
}

#[test]
fn if_else_reachability_takes_the_true_branch() {
    let (_dir, path) = write_script(
        "reach",
        r#"function g() : int
             if (true) then return 1; else return 2; end
             return 3;
           end"#,
    );

    Command::new(msc_bin())
        .arg(&path)
        .arg("--export")
        .arg("g")
        .assert()
        .success()
        .stdout(predicate::str::contains("g = 1"));
}

#[test]
fn while_with_break_stops_at_five() {
    let (_dir, path) = write_script(
        "loop",
        r#"function h() : int
             int i = 0;
             while (i < 10) do
               if (i == 5) then break; end
               i = i + 1;
             end
             return i;
           end"#,
    );

    Command::new(msc_bin())
        .arg(&path)
        .arg("--export")
        .arg("h")
        .assert()
        .success()
        .stdout(predicate::str::contains("h = 5"));
}

#[test]
fn precedence_groups_multiply_before_equality() {
    let (_dir, path) = write_script("prec", "function p() : bool return 1 + 2 * 3 == 7; end");

    Command::new(msc_bin())
        .arg(&path)
        .arg("--export")
        .arg("p")
        .assert()
        .success()
        .stdout(predicate::str::contains("p = true"));
}

#[test]
fn missing_closing_quote_is_a_compile_error_not_a_crash() {
    let (_dir, path) = write_script("bad", "function f() : string return \"abc; end");

    Command::new(msc_bin())
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected").or(predicate::str::contains("unterminated")));
}
