//! Tableau session: server address, auth token, site.
//!
//! A [`TableauClient`] is bound to one server at construction. Signing in
//! fills in the [`Session`]; every later request carries its token in the
//! `x-tableau-auth` header. Dropping a signed-in client signs out.

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use tabops_core::{Credentials, RetryPolicy, Sleeper, TableauConfig, ThreadSleeper};

use crate::error::TableauError;
use crate::transport::{ApiRequest, HttpTransport, RawResponse, Transport, AUTH_HEADER};
use crate::wire::{sign_in_body, SignInDocument, SiteDocument};

/// Auth context established by sign-in. `Debug` hides the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub site_id: String,
    pub site_content_url: String,
    pub user_id: String,
    pub site_name: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("site_content_url", &self.site_content_url)
            .field("user_id", &self.user_id)
            .field("site_name", &self.site_name)
            .finish()
    }
}

pub struct TableauClient<T: Transport = HttpTransport> {
    pub(crate) transport: T,
    pub(crate) server: String,
    pub(crate) api_version: String,
    pub(crate) session: Option<Session>,
    pub(crate) sleeper: Box<dyn Sleeper>,
    pub(crate) refresh_policy: RetryPolicy,
    pub(crate) poll_policy: RetryPolicy,
}

impl TableauClient<HttpTransport> {
    /// Client for `server` over a blocking HTTP transport built from `config`.
    pub fn new(server: &str, config: &TableauConfig) -> Result<Self, TableauError> {
        let transport = HttpTransport::new(
            Duration::from_secs(config.request_timeout_secs),
            config.accept_invalid_certs,
        )?;
        Ok(Self::with_transport(transport, server, config))
    }
}

impl<T: Transport> TableauClient<T> {
    pub fn with_transport(transport: T, server: &str, config: &TableauConfig) -> Self {
        Self {
            transport,
            server: server.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            session: None,
            sleeper: Box::new(ThreadSleeper),
            refresh_policy: config.refresh_retry,
            poll_policy: config.poll_retry,
        }
    }

    /// Replace the thread sleeper used between retries and polls.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// Adopt an existing session instead of signing in.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Host part of the server URL, without scheme or path.
    pub fn server_name(&self) -> &str {
        let rest = self
            .server
            .strip_prefix("https://")
            .or_else(|| self.server.strip_prefix("http://"))
            .unwrap_or(&self.server);
        rest.split('/').next().unwrap_or(rest)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub(crate) fn require_session(&self) -> Result<&Session, TableauError> {
        self.session.as_ref().ok_or(TableauError::NotSignedIn)
    }

    /// `{server}/api/{version}/{path}`
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.server, self.api_version, path)
    }

    /// `{server}/api/{version}/sites/{site_id}/{path}`
    pub(crate) fn site_url(&self, path: &str) -> Result<String, TableauError> {
        let session = self.require_session()?;
        Ok(self.api_url(&format!("sites/{}/{}", session.site_id, path)))
    }

    /// Request with the session token attached.
    pub(crate) fn authed(&self, method: Method, url: String) -> Result<ApiRequest, TableauError> {
        let session = self.require_session()?;
        Ok(ApiRequest::new(method, url).header(AUTH_HEADER, session.token.clone()))
    }

    pub(crate) fn send(&self, request: ApiRequest) -> Result<RawResponse, TableauError> {
        tracing::debug!(method = %request.method, url = %request.url, "tableau request");
        self.transport.execute(request)
    }

    /// Sign in to `site_content_url` (`""` for the default site).
    ///
    /// On success the session holds the token, site id and user id; the
    /// site's display name is looked up afterwards on a best-effort basis.
    pub fn sign_in(
        &mut self,
        credentials: &Credentials,
        site_content_url: &str,
    ) -> Result<&Session, TableauError> {
        tracing::info!(
            server = %self.server,
            site = site_content_url,
            user = %credentials.username,
            "signing in to Tableau"
        );
        let request = ApiRequest::new(Method::POST, self.api_url("auth/signin")).json_body(
            &sign_in_body(&credentials.username, &credentials.password, site_content_url),
        );
        let response = self.send(request)?;
        if response.status != 200 {
            let err = TableauError::service(&response);
            tracing::error!(status = response.status, error = %err, "Tableau sign-in failed");
            return Err(err);
        }

        let doc: SignInDocument = serde_json::from_slice(&response.body)
            .map_err(|e| TableauError::malformed(format!("sign-in document: {e}")))?;
        let creds = doc.credentials;
        self.session = Some(Session {
            token: creds.token,
            site_id: creds.site.id,
            site_content_url: creds.site.content_url,
            user_id: creds.user.id,
            site_name: None,
        });

        let site_name = match self.query_site() {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "could not look up site name");
                None
            }
        };
        if let Some(name) = &site_name {
            tracing::info!(site_name = %name, "signed in");
        }
        let session = self.session.as_mut().ok_or(TableauError::NotSignedIn)?;
        session.site_name = site_name;
        Ok(session)
    }

    /// Display name of the signed-in site.
    pub fn query_site(&self) -> Result<Option<String>, TableauError> {
        let session = self.require_session()?;
        let url = self.api_url(&format!("sites/{}", session.site_id));
        let response = self.send(self.authed(Method::GET, url)?)?;
        if response.status != 200 {
            return Err(TableauError::service(&response));
        }
        let doc: SiteDocument = serde_json::from_slice(&response.body)
            .map_err(|e| TableauError::malformed(format!("site document: {e}")))?;
        Ok(doc.site.name)
    }

    /// End the session. The token is discarded even if the request fails.
    pub fn sign_out(&mut self) -> Result<(), TableauError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        tracing::info!(server = %self.server, "disconnecting from Tableau");
        let request = ApiRequest::new(Method::POST, self.api_url("auth/signout"))
            .header(AUTH_HEADER, session.token);
        let response = self.send(request)?;
        if !response.is_success() {
            return Err(TableauError::service(&response));
        }
        Ok(())
    }
}

impl<T: Transport> Drop for TableauClient<T> {
    fn drop(&mut self) {
        if self.session.is_some() {
            if let Err(e) = self.sign_out() {
                tracing::warn!(error = %e, "failed to sign out");
            }
        }
    }
}
