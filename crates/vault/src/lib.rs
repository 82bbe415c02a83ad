// crates/vault/src/lib.rs
pub mod accounts;
pub mod client;
pub mod endpoint;
pub mod error;

pub use accounts::{select_account, AssetAccount, NamedAccount, RetrievableAccount};
pub use client::SafeguardClient;
pub use endpoint::{ClientIdentity, VaultEndpoint};
pub use error::VaultError;
