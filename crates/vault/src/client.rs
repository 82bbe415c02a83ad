//! Safeguard REST client: certificate login, A2A credential retrieval and
//! password updates.
//!
//! Login is two steps. The client certificate is exchanged for an STS
//! access token at `/RSTS/oauth2/token`, which is then traded for a user
//! token at `Token/LoginResponse`. Core API calls carry the user token as a
//! bearer; A2A retrieval instead authenticates with the account's API key.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::accounts::{select_account, A2aRegistration, AssetAccount, RetrievableAccount};
use crate::endpoint::VaultEndpoint;
use crate::error::VaultError;

const STS_SCOPE: &str = "rsts:sts:primaryproviderid:certificate";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct StsToken {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoginResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    user_token: Option<String>,
}

pub struct SafeguardClient {
    http: Client,
    base_url: String,
    user_token: String,
}

impl std::fmt::Debug for SafeguardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeguardClient")
            .field("base_url", &self.base_url)
            .field("user_token", &"<redacted>")
            .finish()
    }
}

impl SafeguardClient {
    /// Build the TLS client for `endpoint` and log in with its certificate.
    pub fn connect(endpoint: &VaultEndpoint) -> Result<Self, VaultError> {
        let http = build_http(endpoint)?;
        let base_url = endpoint.base_url.clone();

        let sts: StsToken = json_or_error(
            http.post(format!("{base_url}/RSTS/oauth2/token"))
                .header(ACCEPT, "application/json")
                .form(&[("grant_type", "client_credentials"), ("scope", STS_SCOPE)])
                .send()?,
        )
        .map_err(|e| VaultError::Login(format!("STS token request failed: {e}")))?;

        let login: LoginResponse = json_or_error(
            http.post(format!("{base_url}/service/core/v4/Token/LoginResponse"))
                .header(ACCEPT, "application/json")
                .json(&serde_json::json!({ "StsAccessToken": sts.access_token }))
                .send()?,
        )
        .map_err(|e| VaultError::Login(format!("user token exchange failed: {e}")))?;

        let user_token = match (login.status.as_deref(), login.user_token) {
            (Some(status), Some(token)) if status.eq_ignore_ascii_case("success") => token,
            (status, _) => {
                return Err(VaultError::Login(format!(
                    "login status {}",
                    status.unwrap_or("<missing>")
                )))
            }
        };

        info!(host = %base_url, "vault login succeeded");
        Ok(Self {
            http,
            base_url,
            user_token,
        })
    }

    fn core_get(&self, endpoint: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/service/core/v4/{}", self.base_url, endpoint))
            .header(ACCEPT, "application/json")
            .bearer_auth(&self.user_token)
    }

    fn core_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, VaultError> {
        debug!(endpoint, "vault core GET");
        json_or_error(self.core_get(endpoint).send()?)
    }

    /// Id of the first A2A registration visible to this certificate user.
    pub fn a2a_registration_id(&self) -> Result<u64, VaultError> {
        let registrations: Vec<A2aRegistration> = self.core_json("A2ARegistrations")?;
        registrations
            .first()
            .map(|r| r.id)
            .ok_or(VaultError::NoRegistration)
    }

    /// A2A API key of `account`, optionally restricted to `system`.
    pub fn api_key_for(
        &self,
        registration_id: u64,
        account: &str,
        system: Option<&str>,
    ) -> Result<String, VaultError> {
        let accounts: Vec<RetrievableAccount> = self.core_json(&format!(
            "A2ARegistrations/{registration_id}/RetrievableAccounts"
        ))?;
        Ok(select_account(&accounts, account, system)?.api_key.clone())
    }

    /// Asset-account id used for password updates.
    pub fn account_id(&self, account: &str, system: Option<&str>) -> Result<u64, VaultError> {
        let accounts: Vec<AssetAccount> = self.core_json("AssetAccounts")?;
        Ok(select_account(&accounts, account, system)?.id)
    }

    /// Current password of `account` through A2A retrieval.
    pub fn get_password(&self, account: &str, system: Option<&str>) -> Result<String, VaultError> {
        let registration = self.a2a_registration_id()?;
        let api_key = self.api_key_for(registration, account, system)?;

        let response = self
            .http
            .get(format!("{}/service/a2a/v4/Credentials", self.base_url))
            .query(&[("type", "Password")])
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("A2A {api_key}"))
            .send()?;
        let password: String = json_or_error(response)?;
        info!(account, "password retrieved from vault");
        Ok(password)
    }

    /// Set a new password for `account`. The appliance answers 204.
    pub fn update_password(
        &self,
        account: &str,
        password: &str,
        system: Option<&str>,
    ) -> Result<(), VaultError> {
        let id = self.account_id(account, system)?;
        let body = serde_json::to_string(password)
            .map_err(|e| VaultError::Malformed(e.to_string()))?;

        let response = self
            .http
            .put(format!(
                "{}/service/core/v4/AssetAccounts/{}/Password",
                self.base_url, id
            ))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&self.user_token)
            .body(body)
            .send()?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            return Err(VaultError::Service {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        info!(account, id, "vault password updated");
        Ok(())
    }
}

fn build_http(endpoint: &VaultEndpoint) -> Result<Client, VaultError> {
    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT).use_rustls_tls();

    if let Some(ca) = &endpoint.ca_file {
        let pem = read(ca)?;
        builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
    }
    if let Some(identity) = &endpoint.identity {
        let mut pem = read(&identity.cert_file)?;
        pem.push(b'\n');
        pem.extend(read(&identity.key_file)?);
        builder = builder.identity(reqwest::Identity::from_pem(&pem)?);
    }

    Ok(builder.build()?)
}

fn read(path: &Path) -> Result<Vec<u8>, VaultError> {
    fs::read(path).map_err(|e| VaultError::io(path, e))
}

fn json_or_error<T: DeserializeOwned>(response: Response) -> Result<T, VaultError> {
    let status = response.status();
    let body = response.bytes()?;
    if !status.is_success() {
        return Err(VaultError::Service {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }
    serde_json::from_slice(&body).map_err(|e| VaultError::Malformed(e.to_string()))
}
