// crates/cli/src/auth.rs
//! Where Tableau sign-in credentials come from.

use anyhow::{bail, Context, Result};
use tabops_core::{Config, Credentials, TableauAuth};
use tabops_vault::{SafeguardClient, VaultEndpoint};
use tracing::info;

/// Log in to the vault configured for the current tier.
pub fn connect_vault(config: &Config) -> Result<SafeguardClient> {
    let vault = config
        .vault
        .as_ref()
        .context("no [vault] section in config")?;
    let endpoint = VaultEndpoint::resolve(vault, config.environment)?;
    info!(host = %endpoint.base_url, "connecting to vault");
    Ok(SafeguardClient::connect(&endpoint)?)
}

/// Credentials for Tableau sign-in: a properties file if configured,
/// otherwise the vault account's current password.
pub fn tableau_credentials(config: &Config) -> Result<Credentials> {
    let auth = config
        .tableau
        .auth
        .as_ref()
        .context("no [tableau.auth] section in config")?;

    match source(auth)? {
        Source::File => {
            let path = auth.credentials_file.as_deref().context("credentials_file")?;
            Credentials::from_properties_file(path)
                .with_context(|| format!("reading credentials from {}", path.display()))
        }
        Source::Vault(account) => {
            let password = connect_vault(config)?
                .get_password(account, auth.vault_system.as_deref())
                .with_context(|| format!("fetching password for {account}"))?;
            Ok(Credentials::new(account, password))
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Source<'a> {
    File,
    Vault(&'a str),
}

fn source(auth: &TableauAuth) -> Result<Source<'_>> {
    if auth.credentials_file.is_some() {
        return Ok(Source::File);
    }
    match auth.vault_account.as_deref() {
        Some(account) if !account.trim().is_empty() => Ok(Source::Vault(account)),
        _ => bail!("[tableau.auth] needs credentials_file or vault_account"),
    }
}
