//! JSON documents exchanged with the Tableau REST API.
//!
//! Field names follow the server's camelCase spelling. Tableau serialises
//! several numeric attributes (`progress`, `finishCode`, error `code`) as
//! strings in some versions and numbers in others, so those go through
//! [`lenient_string`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub struct SignInDocument {
    pub credentials: CredentialsDoc,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsDoc {
    pub token: String,
    pub site: SiteRef,
    pub user: UserRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRef {
    pub id: String,
    #[serde(default)]
    pub content_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UserRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct SiteDocument {
    pub site: SiteDoc,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDoc {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JobDocument {
    pub job: JobDoc,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDoc {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, rename = "type")]
    pub job_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub progress: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub finish_code: Option<String>,
    #[serde(default)]
    pub extract_refresh_job: Option<ExtractRefreshDoc>,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRefreshDoc {
    #[serde(default)]
    pub workbook: Option<WorkbookRef>,
}

#[derive(Debug, Deserialize)]
pub struct WorkbookRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDocument {
    pub error: ErrorDoc,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDoc {
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Accept a JSON string, number or null as `Option<String>`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}

/// Request body for `POST /auth/signin`.
pub fn sign_in_body(name: &str, password: &str, site_content_url: &str) -> serde_json::Value {
    serde_json::json!({
        "credentials": {
            "name": name,
            "password": password,
            "site": { "contentUrl": site_content_url }
        }
    })
}
