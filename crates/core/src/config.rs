//! Runtime configuration, resolved once per process.
//!
//! Everything environment-specific (which Tableau servers exist, where the
//! vault lives, which certificates to present, where the constants database
//! is) comes from one TOML file. A couple of environment variables override
//! individual keys; nothing re-reads the environment after [`Config::load`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Overrides `environment`.
pub const ENV_TIER: &str = "TABOPS_ENV";
/// Overrides `tableau.api_version`.
pub const ENV_API_VERSION: &str = "TABOPS_TABLEAU_API_VERSION";

/// Deployment tier the process runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Test,
    Prod,
}

impl Environment {
    pub fn is_prod(self) -> bool {
        matches!(self, Environment::Prod)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Dev => "dev",
            Environment::Test => "test",
            Environment::Prod => "prod",
        })
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "dev" | "development" => Ok(Environment::Dev),
            "t" | "test" | "preprod" => Ok(Environment::Test),
            "p" | "prod" | "production" => Ok(Environment::Prod),
            other => Err(ConfigError::invalid(
                "environment",
                format!("unknown tier '{other}' (expected dev, test or prod)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub tableau: TableauConfig,
    #[serde(default)]
    pub vault: Option<VaultConfig>,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub paths: PathRules,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableauConfig {
    /// REST API version segment, e.g. `3.19` in `/api/3.19/...`.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    /// Skip TLS verification. Some internal servers present self-signed certs.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retries while another refresh holds the workbook.
    #[serde(default = "default_refresh_retry")]
    pub refresh_retry: RetryPolicy,
    /// Status polls while a job runs.
    #[serde(default = "default_poll_retry")]
    pub poll_retry: RetryPolicy,
    #[serde(default)]
    pub auth: Option<TableauAuth>,
}

fn default_api_version() -> String {
    "3.19".into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// 10 attempts, 60s apart: roughly ten minutes waiting on a running refresh.
fn default_refresh_retry() -> RetryPolicy {
    RetryPolicy::new(10, 60)
}

/// 600 polls, 30s apart: about five hours of job runtime.
fn default_poll_retry() -> RetryPolicy {
    RetryPolicy::new(600, 30)
}

impl Default for TableauConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            servers: Vec::new(),
            accept_invalid_certs: false,
            request_timeout_secs: default_request_timeout_secs(),
            refresh_retry: default_refresh_retry(),
            poll_retry: default_poll_retry(),
            auth: None,
        }
    }
}

/// One Tableau server and the site content URLs it hosts (`""` is the default site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub url: String,
    #[serde(default = "default_sites")]
    pub sites: Vec<String>,
    #[serde(default)]
    pub tier: Environment,
}

fn default_sites() -> Vec<String> {
    vec![String::new()]
}

/// Where Tableau sign-in credentials come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableauAuth {
    /// Properties file with `username=` / `password=` lines.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Service account whose password is fetched from the vault.
    #[serde(default)]
    pub vault_account: Option<String>,
    #[serde(default)]
    pub vault_system: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Base URL of the non-production appliance.
    pub host: String,
    /// Base URL used when running in the prod tier. Falls back to `host`.
    #[serde(default)]
    pub prod_host: Option<String>,
    /// Directory holding the CA bundle and client certificates.
    pub cert_dir: PathBuf,
    /// CA bundle file name inside `cert_dir`.
    #[serde(default)]
    pub ca_file: Option<String>,
    #[serde(default)]
    pub identities: VaultIdentities,
    /// Use the big-data identities instead of the service ones.
    #[serde(default)]
    pub bde: bool,
}

/// Base names of the client certificate pairs (`<name>.pem` + `<name>.key.pem`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultIdentities {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub service_dev: Option<String>,
    #[serde(default)]
    pub bde: Option<String>,
    #[serde(default)]
    pub bde_dev: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the `um_constants` table.
    pub path: PathBuf,
}

/// UNC share prefixes rewritten to local mount points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRules {
    #[serde(default)]
    pub share_prefixes: Vec<ShareRewrite>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRewrite {
    /// Prefix after backslash normalisation, e.g. `//fileserver.example.com/`.
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub json: bool,
    /// Directory for daily-rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Config {
    /// Parse a config document without touching the environment.
    pub fn from_toml_str(source: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(source).map_err(|e| ConfigError::MalformedToml {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let mut config = Self::from_toml_str(&source, path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        tracing::debug!(path = %path.display(), environment = %config.environment, "loaded config");
        Ok(config)
    }

    /// Apply `TABOPS_*` overrides using `lookup` as the variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tier) = lookup(ENV_TIER).filter(|v| !v.trim().is_empty()) {
            self.environment = tier.parse()?;
        }
        if let Some(version) = lookup(ENV_API_VERSION).filter(|v| !v.trim().is_empty()) {
            self.tableau.api_version = version.trim().to_string();
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tableau;
        if t.api_version.trim().is_empty() {
            return Err(ConfigError::invalid("tableau.api_version", "must not be empty"));
        }
        if t.refresh_retry.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "tableau.refresh_retry.max_attempts",
                "must be at least 1",
            ));
        }
        if t.poll_retry.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "tableau.poll_retry.max_attempts",
                "must be at least 1",
            ));
        }
        for server in &t.servers {
            if !(server.url.starts_with("https://") || server.url.starts_with("http://")) {
                return Err(ConfigError::invalid(
                    "tableau.servers.url",
                    format!("'{}' is not an http(s) URL", server.url),
                ));
            }
        }
        Ok(())
    }
}

impl TableauConfig {
    /// Servers visible from `environment` when running as `login`.
    ///
    /// Dev servers are always candidates. The test tier adds pre-production
    /// servers. Production servers are only offered in the prod tier and only
    /// to service accounts (login names starting with `svc`).
    pub fn candidate_servers(&self, environment: Environment, login: &str) -> Vec<&ServerEntry> {
        let service_account = login.to_ascii_lowercase().starts_with("svc");
        self.servers
            .iter()
            .filter(|s| match s.tier {
                Environment::Dev => true,
                Environment::Test => environment == Environment::Test,
                Environment::Prod => environment.is_prod() && service_account,
            })
            .collect()
    }

    /// Sites configured for `url`, if the server is known.
    pub fn sites_for(&self, url: &str) -> Option<&[String]> {
        let wanted = url.trim_end_matches('/');
        self.servers
            .iter()
            .find(|s| s.url.trim_end_matches('/') == wanted)
            .map(|s| s.sites.as_slice())
    }
}
