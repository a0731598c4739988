//! The restricted rewrite modes operate on real .il files and need no
//! external toolchain, so they are exercised end-to-end here.

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

const IL_SAMPLE: &str = "\
.typelist
{
Foo.Widget
}
.assembly Foo
{
.publickey = (00 24 00 00 )
.hash algorithm 0x00008004
.ver 1:0:0:0
}
.module Foo.dll
IL_0000: ldc.r4 inf
 newobj instance void Foo.Widget::.ctor()
";

fn write_sample(dir: &tempfile::TempDir) -> PathBuf {
    let il = dir.path().join("Acme.Foo.il");
    fs::write(&il, IL_SAMPLE).expect("write il sample");
    il
}

#[test]
fn nsfix_rewrites_namespaces_only() {
    let dir = tempdir().expect("tempdir");
    let il = write_sample(&dir);

    cargo_bin_cmd!("ilprefix")
        .arg("Acme")
        .arg("--nsfix")
        .arg(&il)
        .assert()
        .success()
        .stdout(predicate::str::contains("prefixed 1 namespace(s)"));

    let contents = fs::read_to_string(&il).expect("read back");
    assert!(contents.contains("void Acme.Foo.Widget"));
    // Everything else is untouched in this mode.
    assert!(contents.contains(".publickey"));
    assert!(contents.contains("ldc.r4 inf"));
}

#[test]
fn ilfix_applies_literal_fixes_only() {
    let dir = tempdir().expect("tempdir");
    let il = write_sample(&dir);

    cargo_bin_cmd!("ilprefix")
        .arg("Acme")
        .arg("--ilfix")
        .arg(&il)
        .assert()
        .success()
        .stdout(predicate::str::contains("IL fixes have been applied"));

    let contents = fs::read_to_string(&il).expect("read back");
    assert!(contents.contains("ldc.r4 (00 00 80 7F)"));
    assert!(contents.contains("void Foo.Widget"));
    assert!(contents.contains(".publickey"));
}

#[test]
fn remove_pk_strips_the_key_block_only() {
    let dir = tempdir().expect("tempdir");
    let il = write_sample(&dir);

    cargo_bin_cmd!("ilprefix")
        .arg("Acme")
        .arg("--remove-pk")
        .arg(&il)
        .assert()
        .success()
        .stdout(predicate::str::contains("removed public key block"));

    let contents = fs::read_to_string(&il).expect("read back");
    assert!(!contents.contains(".publickey"));
    assert!(!contents.contains(".hash algorithm"));
    assert!(contents.contains("ldc.r4 inf"));
    assert!(contents.contains("void Foo.Widget"));
}

#[test]
fn resfix_renames_companion_resources() {
    let dir = tempdir().expect("tempdir");
    let il = write_sample(&dir);
    fs::write(dir.path().join("Foo.resources"), b"res").expect("write resource");

    cargo_bin_cmd!("ilprefix")
        .arg("Acme")
        .arg("--resfix")
        .arg(&il)
        .assert()
        .success()
        .stdout(predicate::str::contains("renamed"));

    assert!(dir.path().join("Acme.Foo.resources").is_file());
    assert!(!dir.path().join("Foo.resources").exists());
}

/// The argument dump requested by `--debug` goes to stdout.
#[test]
fn debug_dumps_parsed_arguments_to_stdout() {
    let dir = tempdir().expect("tempdir");
    let il = write_sample(&dir);

    cargo_bin_cmd!("ilprefix")
        .arg("Acme")
        .arg("--nsfix")
        .arg("--debug")
        .arg(&il)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cli {"));
}

/// A missing input file fails that file but exits through the normal
/// failure path (code 1, diagnostic on stderr).
#[test]
fn missing_input_file_fails_with_diagnostic() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("nope.il");

    cargo_bin_cmd!("ilprefix")
        .arg("Acme")
        .arg("--nsfix")
        .arg(&missing)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nope.il"));
}

/// Batch behavior: the second file is still attempted after the first one
/// fails, and the final exit status is non-zero.
#[test]
fn one_bad_file_does_not_stop_the_batch() {
    let dir = tempdir().expect("tempdir");
    let good = write_sample(&dir);
    let missing = dir.path().join("nope.il");

    cargo_bin_cmd!("ilprefix")
        .arg("Acme")
        .arg("--nsfix")
        .arg(&missing)
        .arg(&good)
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("prefixed 1 namespace(s)"));

    let contents = fs::read_to_string(&good).expect("read back");
    assert!(contents.contains("Acme.Foo.Widget"));
}
