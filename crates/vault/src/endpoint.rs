//! Which appliance to call and which certificates to present.

use std::path::PathBuf;

use tabops_core::{Environment, VaultConfig};

use crate::error::VaultError;

/// Client certificate + private key pair, both PEM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultEndpoint {
    pub base_url: String,
    pub ca_file: Option<PathBuf>,
    pub identity: Option<ClientIdentity>,
}

impl VaultEndpoint {
    /// Pick host and certificates for `environment`.
    ///
    /// The prod tier talks to `prod_host` (falling back to `host`). The
    /// identity is one of four names chosen by tier and the `bde` flag.
    pub fn resolve(config: &VaultConfig, environment: Environment) -> Result<Self, VaultError> {
        let prod = environment.is_prod();
        let host = if prod {
            config.prod_host.as_deref().unwrap_or(&config.host)
        } else {
            &config.host
        };

        let ids = &config.identities;
        let (key, name) = match (prod, config.bde) {
            (true, true) => ("bde", &ids.bde),
            (false, true) => ("bde_dev", &ids.bde_dev),
            (true, false) => ("service", &ids.service),
            (false, false) => ("service_dev", &ids.service_dev),
        };
        let name = name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| VaultError::MissingConfig(format!("vault.identities.{key}")))?;

        Ok(Self {
            base_url: normalize_base_url(host),
            ca_file: config.ca_file.as_ref().map(|f| config.cert_dir.join(f)),
            identity: Some(ClientIdentity {
                cert_file: config.cert_dir.join(format!("{name}.pem")),
                key_file: config.cert_dir.join(format!("{name}.key.pem")),
            }),
        })
    }

    /// Endpoint without TLS material, for appliances reached over plain HTTP.
    pub fn plain(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            ca_file: None,
            identity: None,
        }
    }
}

/// Bare host names get `https://`; trailing slashes are dropped.
fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabops_core::VaultIdentities;

    fn config(bde: bool) -> VaultConfig {
        VaultConfig {
            host: "https://safeguard.dev.example.com/".into(),
            prod_host: Some("safeguard.example.com".into()),
            cert_dir: PathBuf::from("/etc/tabops/certs"),
            ca_file: Some("ca-bundle.pem".into()),
            identities: VaultIdentities {
                service: Some("dai".into()),
                service_dev: Some("dai_dev".into()),
                bde: Some("bdh".into()),
                bde_dev: None,
            },
            bde,
        }
    }

    #[test]
    fn test_dev_service_identity() {
        let ep = VaultEndpoint::resolve(&config(false), Environment::Dev).unwrap();
        assert_eq!(ep.base_url, "https://safeguard.dev.example.com");
        assert_eq!(ep.ca_file, Some(PathBuf::from("/etc/tabops/certs/ca-bundle.pem")));
        let id = ep.identity.unwrap();
        assert_eq!(id.cert_file, PathBuf::from("/etc/tabops/certs/dai_dev.pem"));
        assert_eq!(id.key_file, PathBuf::from("/etc/tabops/certs/dai_dev.key.pem"));
    }

    #[test]
    fn test_prod_bde_identity_and_host() {
        let ep = VaultEndpoint::resolve(&config(true), Environment::Prod).unwrap();
        assert_eq!(ep.base_url, "https://safeguard.example.com");
        assert_eq!(
            ep.identity.unwrap().cert_file,
            PathBuf::from("/etc/tabops/certs/bdh.pem")
        );
    }

    #[test]
    fn test_test_tier_uses_non_prod_host() {
        let ep = VaultEndpoint::resolve(&config(false), Environment::Test).unwrap();
        assert_eq!(ep.base_url, "https://safeguard.dev.example.com");
    }

    #[test]
    fn test_missing_identity() {
        let err = VaultEndpoint::resolve(&config(true), Environment::Dev).unwrap_err();
        assert_eq!(err.to_string(), "Missing vault setting: vault.identities.bde_dev");
    }

    #[test]
    fn test_plain_endpoint() {
        let ep = VaultEndpoint::plain("http://127.0.0.1:1234/");
        assert_eq!(ep.base_url, "http://127.0.0.1:1234");
        assert!(ep.identity.is_none());
    }
}
