//! Centralized path functions for tabops configuration locations.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Overrides the config file location.
pub const ENV_CONFIG: &str = "TABOPS_CONFIG";

/// App config root: `~/.config/tabops/` (Linux) or `~/Library/Application Support/tabops/` (macOS).
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tabops"))
}

/// Default config file: `<app_config_dir>/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    app_config_dir().map(|d| d.join("config.toml"))
}

/// Pick the config file to load.
///
/// Priority:
/// 1. explicit path (command line)
/// 2. `TABOPS_CONFIG` as returned by `env`
/// 3. `<app_config_dir>/config.toml`
pub fn resolve_config_path(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env(ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
        return Ok(PathBuf::from(path));
    }
    default_config_path().ok_or(ConfigError::ConfigDirNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve_config_path(Some(Path::new("/tmp/a.toml")), |_| {
            Some("/tmp/b.toml".to_string())
        })
        .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/a.toml"));
    }

    #[test]
    fn test_env_path_used_when_no_explicit() {
        let path = resolve_config_path(None, |k| {
            (k == ENV_CONFIG).then(|| "/etc/tabops.toml".to_string())
        })
        .unwrap();
        assert_eq!(path, PathBuf::from("/etc/tabops.toml"));
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("tabops/config.toml"));
        }
    }
}
