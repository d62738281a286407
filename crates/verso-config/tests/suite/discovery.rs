use std::ffi::{OsStr, OsString};
use std::path::Path;

use tempfile::tempdir;
use verso_config::{
    discover_config_path, load_for_workspace, with_config_env_lock, ConfigError, VersoConfig,
    VERSO_CONFIG_ENV_VAR,
};

// Puts the previous value back even if the test body panics.
struct RestoreConfigEnv(Option<OsString>);

impl Drop for RestoreConfigEnv {
    fn drop(&mut self) {
        match self.0.take() {
            Some(value) => std::env::set_var(VERSO_CONFIG_ENV_VAR, value),
            None => std::env::remove_var(VERSO_CONFIG_ENV_VAR),
        }
    }
}

/// Runs `f` with `VERSO_CONFIG_PATH` set to `value` (or unset), holding the config env lock.
fn with_config_env<R>(value: Option<&OsStr>, f: impl FnOnce() -> R) -> R {
    with_config_env_lock(|| {
        let _restore = RestoreConfigEnv(std::env::var_os(VERSO_CONFIG_ENV_VAR));
        match value {
            Some(value) => std::env::set_var(VERSO_CONFIG_ENV_VAR, value),
            None => std::env::remove_var(VERSO_CONFIG_ENV_VAR),
        }
        f()
    })
}

fn canonical(path: &Path) -> std::path::PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[test]
fn discovers_verso_toml_in_workspace_root() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("verso.toml");
    std::fs::write(&config_path, "[resolve]\nsymlinks = false\n").unwrap();

    let discovered = with_config_env(None, || discover_config_path(dir.path()));
    assert_eq!(discovered, Some(canonical(&config_path)));
}

#[test]
fn verso_toml_wins_over_dotfile() {
    let dir = tempdir().unwrap();
    let primary = dir.path().join("verso.toml");
    std::fs::write(&primary, "[resolve]\nsymlinks = false\n").unwrap();
    std::fs::write(dir.path().join(".verso.toml"), "[resolve]\nsymlinks = true\n").unwrap();

    let (config, path) = with_config_env(None, || load_for_workspace(dir.path())).unwrap();
    assert!(!config.resolve.symlinks);
    assert_eq!(path, Some(canonical(&primary)));
}

#[test]
fn dotfile_is_used_when_alone() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(".verso.toml"), "[logging]\nlevel = \"trace\"\n").unwrap();

    let (config, path) = with_config_env(None, || load_for_workspace(dir.path())).unwrap();
    assert_eq!(config.logging.level, "trace");
    assert!(path.is_some());
}

#[test]
fn relative_env_override_is_taken_from_workspace_root() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("verso.toml"), "[resolve]\nsymlinks = true\n").unwrap();
    let override_path = dir.path().join("override.toml");
    std::fs::write(
        &override_path,
        "[resolve]\nsymlinks = false\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let (config, path) = with_config_env(Some(OsStr::new("override.toml")), || {
        load_for_workspace(dir.path())
    })
    .unwrap();
    assert!(!config.resolve.symlinks);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(path, Some(canonical(&override_path)));
}

#[test]
fn absolute_env_override_is_used_as_is() {
    let dir = tempdir().unwrap();
    let elsewhere = tempdir().unwrap();
    let override_path = elsewhere.path().join("override.toml");
    std::fs::write(&override_path, "[resolve]\nsymlinks = false\n").unwrap();

    let (config, path) = with_config_env(Some(override_path.as_os_str()), || {
        load_for_workspace(dir.path())
    })
    .unwrap();
    assert!(!config.resolve.symlinks);
    assert_eq!(path, Some(canonical(&override_path)));
}

#[test]
fn env_override_to_missing_file_is_an_io_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = with_config_env(Some(missing.as_os_str()), || load_for_workspace(dir.path()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err:?}");
}

#[test]
fn missing_config_returns_defaults() {
    let dir = tempdir().unwrap();

    let (config, path) = with_config_env(None, || load_for_workspace(dir.path())).unwrap();
    assert_eq!(path, None);
    assert_eq!(config, VersoConfig::default());
}

#[test]
fn env_var_is_restored_after_each_override() {
    let before = with_config_env_lock(|| std::env::var_os(VERSO_CONFIG_ENV_VAR));
    with_config_env(Some(OsStr::new("x.toml")), || {
        assert_eq!(
            std::env::var_os(VERSO_CONFIG_ENV_VAR),
            Some(OsString::from("x.toml"))
        );
    });
    let after = with_config_env_lock(|| std::env::var_os(VERSO_CONFIG_ENV_VAR));
    assert_eq!(before, after);
}
