// Shared fixtures for tabops-tableau integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tabops_core::{RecordingSleeper, RetryPolicy, TableauConfig};
use tabops_tableau::{ApiRequest, RawResponse, Session, TableauClient, TableauError, Transport};

pub const SERVER: &str = "https://tableau.example.com";

/// Replays canned responses in order and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<RawResponse>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: ApiRequest) -> Result<RawResponse, TableauError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TableauError::malformed("script exhausted"))
    }
}

pub fn response(status: u16, body: &str) -> RawResponse {
    RawResponse {
        status,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: body.as_bytes().to_vec(),
    }
}

pub fn accepted(job_id: &str) -> RawResponse {
    response(
        202,
        &format!(
            r#"{{"job":{{"id":"{job_id}","mode":"Asynchronous","type":"RefreshExtract","createdAt":"2024-03-01T10:00:00Z"}}}}"#
        ),
    )
}

pub fn conflict() -> RawResponse {
    response(
        409,
        r#"{"error":{"summary":"Conflict","detail":"Refresh already queued","code":"409093"}}"#,
    )
}

pub fn in_progress(job_id: &str, progress: Option<u8>) -> RawResponse {
    let progress = progress
        .map(|p| format!(r#","progress":"{p}""#))
        .unwrap_or_default();
    response(
        200,
        &format!(r#"{{"job":{{"id":"{job_id}","mode":"Asynchronous","type":"RefreshExtract"{progress}}}}}"#),
    )
}

pub fn finished(job_id: &str, finish_code: &str) -> RawResponse {
    response(
        200,
        &format!(
            r#"{{"job":{{"id":"{job_id}","mode":"Asynchronous","type":"RefreshExtract","progress":"100","finishCode":"{finish_code}","completedAt":"2024-03-01T10:20:00Z"}}}}"#
        ),
    )
}

pub fn session() -> Session {
    Session {
        token: "tok-123".to_string(),
        site_id: "site-1".to_string(),
        site_content_url: "BranchAnalytics".to_string(),
        user_id: "user-1".to_string(),
        site_name: Some("Branch Analytics".to_string()),
    }
}

pub fn config() -> TableauConfig {
    TableauConfig::default()
}

/// Signed-in client over a scripted transport with a recording sleeper.
pub fn scripted_client(
    config: &TableauConfig,
    responses: impl IntoIterator<Item = RawResponse>,
) -> (TableauClient<ScriptedTransport>, ScriptedTransport, RecordingSleeper) {
    let transport = ScriptedTransport::new(responses);
    let sleeper = RecordingSleeper::new();
    let client = TableauClient::with_transport(transport.clone(), SERVER, config)
        .with_sleeper(sleeper.clone())
        .with_session(session());
    (client, transport, sleeper)
}

pub fn policy(max_attempts: u32, delay_secs: u64) -> RetryPolicy {
    RetryPolicy::new(max_attempts, delay_secs)
}
