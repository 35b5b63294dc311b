use tarn_core::config::{dirs_path, GlobalConfig, UpgradeStrategy};

#[test]
fn test_global_config_defaults() {
    let config = GlobalConfig::default();
    assert_eq!(config.resolver.upgrade_strategy, UpgradeStrategy::OnlyIfNeeded);
    assert!(!config.resolver.pre);
    assert_eq!(config.resolver.max_rounds, 200_000);
    assert!(config.index.path.is_none());
}

#[test]
fn test_global_config_empty_toml_uses_defaults() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.resolver.max_rounds, 200_000);
    assert_eq!(config.environment.python_version, "3.12");
}

#[test]
fn test_dirs_path_contains_tarn() {
    assert!(dirs_path().ends_with(".tarn"));
    assert!(GlobalConfig::default_path().ends_with(".tarn/config.toml"));
}

#[test]
fn test_global_config_parse_from_toml() {
    let toml = r#"
[resolver]
upgrade-strategy = "eager"
pre = true
max-rounds = 50

[environment]
python-version = "3.8"
python-full-version = "3.8.18"
sys-platform = "win32"

[index]
path = "/data/index.toml"
"#;
    let config: GlobalConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.resolver.upgrade_strategy, UpgradeStrategy::Eager);
    assert!(config.resolver.pre);
    assert_eq!(config.resolver.max_rounds, 50);
    assert_eq!(config.environment.sys_platform, "win32");
    assert_eq!(config.environment.os_name, "posix");
    assert_eq!(config.index.path.as_deref(), Some("/data/index.toml"));
}

#[test]
fn test_load_from_missing_file_returns_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = GlobalConfig::load_from(&dir.path().join("config.toml")).unwrap();
    assert_eq!(config.resolver.upgrade_strategy, UpgradeStrategy::OnlyIfNeeded);
}

#[test]
fn test_load_from_invalid_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[resolver]\nupgrade-strategy = \"sometimes\"\n").unwrap();
    assert!(GlobalConfig::load_from(&path).is_err());
}

#[test]
fn test_upgrade_strategy_from_str() {
    assert_eq!("eager".parse::<UpgradeStrategy>().unwrap(), UpgradeStrategy::Eager);
    assert_eq!(
        "to-satisfy-only".parse::<UpgradeStrategy>().unwrap(),
        UpgradeStrategy::ToSatisfyOnly
    );
    assert!("lazy".parse::<UpgradeStrategy>().is_err());
    assert_eq!(UpgradeStrategy::OnlyIfNeeded.to_string(), "only-if-needed");
}
