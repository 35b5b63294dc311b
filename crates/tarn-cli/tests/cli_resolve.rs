use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// `tarn` with an empty home so no user config leaks in.
fn tarn_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tarn").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("TARN_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_resolve_prints_plan_in_install_order() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .arg("resolve")
        .arg("web")
        .arg("--index")
        .arg(fixture("index.toml"))
        .assert()
        .success()
        .stdout(predicate::str::diff("core 2.0\nweb 2.0\n"))
        .stderr(predicate::str::contains("core-2.0 web-2.0"));
}

#[test]
fn test_resolve_backtracks() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "web", "pinned-core", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("core 1.5"))
        .stdout(predicate::str::contains("web 1.0"));
}

#[test]
fn test_resolve_pre_includes_prereleases() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "core", "--pre", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .success()
        .stdout(predicate::str::diff("core 2.1a1\n"));
}

#[test]
fn test_resolve_conflict_is_explained() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "pinned-core", "core>=2", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("The conflict is caused by:"))
        .stderr(predicate::str::contains("pinned-core 1.0 depends on core<2"))
        .stderr(predicate::str::contains("The user requested core>=2"));
}

#[test]
fn test_resolve_unknown_package() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "nothere", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching distribution found for nothere"));
}

#[test]
fn test_resolve_requirements_and_constraints_files() {
    let home = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("requirements.txt"), "web\n-c constraints.txt\n").unwrap();
    fs::write(tmp.path().join("constraints.txt"), "core<2\n").unwrap();

    tarn_cmd(&home)
        .current_dir(tmp.path())
        .args(["resolve", "-r", "requirements.txt", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .success()
        .stdout(predicate::str::diff("core 1.5\nweb 1.0\n"));
}

#[test]
fn test_resolve_keeps_satisfying_installed_packages() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "core", "--index"])
        .arg(fixture("index.toml"))
        .arg("--installed")
        .arg(fixture("installed.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("All requirements are already satisfied."));
}

#[test]
fn test_resolve_upgrade_replaces_installed() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "core", "-U", "--index"])
        .arg(fixture("index.toml"))
        .arg("--installed")
        .arg(fixture("installed.toml"))
        .assert()
        .success()
        .stdout(predicate::str::diff("core 2.0 (replaces 1.0)\n"))
        .stderr(predicate::str::contains(
            "legacy 1.0 requires core<2, but you'll have core 2.0 which is incompatible.",
        ));
}

#[test]
fn test_resolve_no_check_skips_warnings() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "core>=2", "--no-check", "--index"])
        .arg(fixture("index.toml"))
        .arg("--installed")
        .arg(fixture("installed.toml"))
        .assert()
        .success()
        .stderr(predicate::str::contains("incompatible").not());
}

#[test]
fn test_resolve_writes_report() {
    let home = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let report = tmp.path().join("report.json");

    tarn_cmd(&home)
        .args(["resolve", "web", "--index"])
        .arg(fixture("index.toml"))
        .arg("--report")
        .arg(&report)
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    let install = json["install"].as_array().unwrap();
    assert_eq!(install.len(), 2);
    assert_eq!(install[0]["name"], "core");
    assert_eq!(install[0]["requested"], false);
    assert_eq!(install[1]["name"], "web");
    assert_eq!(install[1]["version"], "2.0");
    assert_eq!(install[1]["requested"], true);
    assert_eq!(install[1]["url"], "https://pypi.example.org/simple/web/web-2.0.tar.gz");
    assert_eq!(install[1]["requires-dist"][0], "core>=2");
}

#[test]
fn test_resolve_uses_config_environment() {
    let home = TempDir::new().unwrap();
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("config.toml");
    fs::write(&config, "[environment]\npython-full-version = \"3.7.0\"\npython-version = \"3.7\"\n").unwrap();

    tarn_cmd(&home)
        .args(["resolve", "fancy", "--index"])
        .arg(fixture("index.toml"))
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching distribution found for fancy"));

    tarn_cmd(&home)
        .args(["resolve", "fancy", "--ignore-requires-python", "--index"])
        .arg(fixture("index.toml"))
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::diff("fancy 0.3\n"));
}

#[test]
fn test_resolve_index_from_config() {
    let home = TempDir::new().unwrap();
    let tarn_dir = home.path().join(".tarn");
    fs::create_dir_all(&tarn_dir).unwrap();
    fs::write(
        tarn_dir.join("config.toml"),
        format!("[index]\npath = {:?}\n", fixture("index.toml").display().to_string()),
    )
    .unwrap();

    tarn_cmd(&home)
        .args(["resolve", "core"])
        .assert()
        .success()
        .stdout(predicate::str::diff("core 2.0\n"));
}

#[test]
fn test_resolve_without_index_fails() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "core"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--index"));
}

#[test]
fn test_resolve_without_requirements_fails() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["resolve", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one requirement"));
}
