#![cfg(unix)]

mod common;

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{fake_radare, fake_tool, framework, write_config};
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn missing_required_tool_exits_two() {
    let tmp = tempdir().expect("tempdir");
    let components = tmp.path().join("PrivateFrameworks");
    framework(&components, "Foo");
    let missing = tmp.path().join("bin").join("r2");
    let config = write_config(tmp.path(), &components, &missing, &missing);

    cargo_bin_cmd!("bundle-probe")
        .env_remove("PROBE_R2_BIN")
        .env_remove("PROBE_RABIN2_BIN")
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--output")
        .arg(tmp.path().join("out"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("required tool r2 is not available"));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn failing_version_probe_counts_as_missing() {
    let tmp = tempdir().expect("tempdir");
    let bin = tmp.path().join("bin");
    let (r2, _) = fake_radare(&bin);
    let rabin2 = fake_tool(&bin, "rabin2", "exit 3");
    let config = write_config(tmp.path(), &tmp.path().join("none"), &r2, &rabin2);

    cargo_bin_cmd!("bundle-probe")
        .env_remove("PROBE_R2_BIN")
        .env_remove("PROBE_RABIN2_BIN")
        .arg("--config")
        .arg(&config)
        .arg("check-tools")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("- r2: OK"))
        .stdout(predicate::str::contains("- rabin2: MISSING"));
}

#[test]
fn no_bundles_exits_one() {
    let tmp = tempdir().expect("tempdir");
    let (r2, rabin2) = fake_radare(&tmp.path().join("bin"));
    let config = write_config(tmp.path(), &tmp.path().join("none"), &r2, &rabin2);

    cargo_bin_cmd!("bundle-probe")
        .env_remove("PROBE_R2_BIN")
        .env_remove("PROBE_RABIN2_BIN")
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--output")
        .arg(tmp.path().join("out"))
        .assert()
        .code(1);
}

#[test]
fn run_writes_reports_and_history_lists_them() {
    let tmp = tempdir().expect("tempdir");
    let components = tmp.path().join("PrivateFrameworks");
    framework(&components, "Foo");
    fs::create_dir_all(components.join("Hollow.framework/Resources")).unwrap();
    fs::create_dir_all(tmp.path().join("dependents")).unwrap();
    let (r2, rabin2) = fake_radare(&tmp.path().join("bin"));
    let config = write_config(tmp.path(), &components, &r2, &rabin2);
    let out = tmp.path().join("out");

    cargo_bin_cmd!("bundle-probe")
        .env_remove("PROBE_R2_BIN")
        .env_remove("PROBE_RABIN2_BIN")
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Analysed 1 frameworks"))
        .stdout(predicate::str::contains("Skipped Hollow.framework"));

    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("data/Foo.json")).unwrap()).unwrap();
    assert_eq!(record["framework"], "Foo.framework");
    assert_eq!(record["static"]["binary_info"]["info"]["value"]["info"]["bintype"], "mach0");
    assert_eq!(record["usage"], serde_json::json!([]));
    let status = record["runtime"]["load"]["status"].as_str().unwrap();
    assert!(matches!(status, "loaded" | "load_failed"), "unexpected status {status}");

    assert!(out.join("content/docs/Foo.md").is_file());
    assert!(!out.join("data/Hollow.json").exists());

    cargo_bin_cmd!("bundle-probe")
        .arg("history")
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Runs (1):"))
        .stdout(predicate::str::contains("- Foo ["));
}

#[test]
fn limit_caps_analysed_bundles() {
    let tmp = tempdir().expect("tempdir");
    let components = tmp.path().join("PrivateFrameworks");
    for name in ["A", "B", "C"] {
        framework(&components, name);
    }
    let (r2, rabin2) = fake_radare(&tmp.path().join("bin"));
    let config = write_config(tmp.path(), &components, &r2, &rabin2);
    let out = tmp.path().join("out");

    cargo_bin_cmd!("bundle-probe")
        .env_remove("PROBE_R2_BIN")
        .env_remove("PROBE_RABIN2_BIN")
        .arg("--config")
        .arg(&config)
        .arg("run")
        .arg("--output")
        .arg(&out)
        .arg("--limit")
        .arg("1")
        .assert()
        .success();

    assert!(out.join("data/A.json").is_file());
    assert!(!out.join("data/B.json").exists());
}
