use checksize::config::{Config, ConfigError};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config.io_threads, 1);
    assert!(config.progress);
}

#[test]
fn test_config_load_from_env() {
    // Private prefix so concurrent run_app tests never see these values
    std::env::set_var("CHECKSIZE_ENVTEST_SKIP_HIDDEN", "true");
    std::env::set_var("CHECKSIZE_ENVTEST_MIN_SIZE", "4096");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("CHECKSIZE_ENVTEST_"))
        .extract()
        .unwrap();

    std::env::remove_var("CHECKSIZE_ENVTEST_SKIP_HIDDEN");
    std::env::remove_var("CHECKSIZE_ENVTEST_MIN_SIZE");

    assert!(config.skip_hidden);
    assert_eq!(config.min_size, Some(4096));
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
io_threads = 8
follow_symlinks = true
media_only = true
max_size = 1000000
ignore_patterns = ["*.tmp", "thumbs/"]
progress = false
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.io_threads, 8);
    assert!(config.follow_symlinks);
    assert!(config.media_only);
    assert_eq!(config.max_size, Some(1_000_000));
    assert_eq!(config.ignore_patterns, vec!["*.tmp", "thumbs/"]);
    assert!(!config.progress);
}

#[test]
fn test_config_unknown_keys_are_tolerated() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_thread = 8\nmedia_only = true\n").unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.io_threads, 1);
    assert!(config.media_only);
}

#[test]
fn test_config_invalid_values_rejected() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "min_size = 10\nmax_size = 5\n").unwrap();

    assert!(matches!(
        Config::load(Some(&config_path)),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_config_invalid_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "invalid = = toml").unwrap();

    let result: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract();
    assert!(result.is_err());
}

#[test]
fn test_config_serializes_to_toml() {
    let config = Config {
        io_threads: 2,
        ..Default::default()
    };
    let content = toml::to_string_pretty(&config).unwrap();
    assert!(content.contains("io_threads = 2"));
    assert!(content.contains("progress = true"));
}
