use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn tarn_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tarn").unwrap();
    cmd.env("HOME", home.path()).env_remove("TARN_CONFIG");
    cmd
}

#[test]
fn test_tree_prints_resolved_graph() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["tree", "web", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .success()
        .stdout(predicate::str::diff("<root>\n└── web 2.0\n    └── core 2.0\n"));
}

#[test]
fn test_tree_depth_limit() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["tree", "web", "--depth", "1", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .success()
        .stdout(predicate::str::diff("<root>\n└── web 2.0\n"));
}

#[test]
fn test_tree_why() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["tree", "web", "--why", "core", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Path to core:\n<root>\n  web 2.0\n    core 2.0\n",
        ));
}

#[test]
fn test_tree_why_unknown() {
    let home = TempDir::new().unwrap();
    tarn_cmd(&home)
        .args(["tree", "web", "--why", "nothere", "--index"])
        .arg(fixture("index.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("not found in the graph"));
}
