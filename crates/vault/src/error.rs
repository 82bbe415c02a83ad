// crates/vault/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to the Safeguard appliance
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing vault setting: {0}")]
    MissingConfig(String),

    #[error("Vault login failed: {0}")]
    Login(String),

    #[error("Vault returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Could not fetch A2A registration id")]
    NoRegistration,

    #[error("Account {account} not found{}", system_suffix(.system))]
    AccountNotFound {
        account: String,
        system: Option<String>,
    },

    #[error("The account name {account} appears in the vault multiple times; specify a system name")]
    Ambiguous { account: String },

    #[error("Malformed vault response: {0}")]
    Malformed(String),
}

fn system_suffix(system: &Option<String>) -> String {
    system
        .as_deref()
        .map(|s| format!(" on system {s}"))
        .unwrap_or_default()
}

impl VaultError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
