//! Account listings and the rules for picking one entry out of them.

use serde::Deserialize;

use crate::error::VaultError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct A2aRegistration {
    pub id: u64,
}

/// Entry of `A2ARegistrations/{id}/RetrievableAccounts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetrievableAccount {
    pub account_name: String,
    #[serde(default)]
    pub asset_name: String,
    pub api_key: String,
}

/// Entry of `AssetAccounts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssetAccount {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub asset: Option<AssetRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssetRef {
    pub name: String,
}

/// Something with an account name living on an asset (system).
pub trait NamedAccount {
    fn account_name(&self) -> &str;
    fn system_name(&self) -> &str;
}

impl NamedAccount for RetrievableAccount {
    fn account_name(&self) -> &str {
        &self.account_name
    }

    fn system_name(&self) -> &str {
        &self.asset_name
    }
}

impl NamedAccount for AssetAccount {
    fn account_name(&self) -> &str {
        &self.name
    }

    fn system_name(&self) -> &str {
        self.asset.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

/// Find `account` (case-insensitive), optionally restricted to `system`.
///
/// Without a system the name must be unique in the listing; with one, the
/// first entry matching both wins.
pub fn select_account<'a, A: NamedAccount>(
    accounts: &'a [A],
    account: &str,
    system: Option<&str>,
) -> Result<&'a A, VaultError> {
    let not_found = || VaultError::AccountNotFound {
        account: account.to_string(),
        system: system.map(str::to_string),
    };

    match system {
        Some(system) => accounts
            .iter()
            .find(|a| {
                a.account_name().eq_ignore_ascii_case(account)
                    && a.system_name().eq_ignore_ascii_case(system)
            })
            .ok_or_else(not_found),
        None => {
            let mut matches = accounts
                .iter()
                .filter(|a| a.account_name().eq_ignore_ascii_case(account));
            let first = matches.next().ok_or_else(not_found)?;
            if matches.next().is_some() {
                return Err(VaultError::Ambiguous {
                    account: account.to_string(),
                });
            }
            Ok(first)
        }
    }
}
