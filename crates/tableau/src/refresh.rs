//! Extract refresh: trigger, poll, cancel.
//!
//! ```text
//! start_refresh ──(job id)──▶ poll_until_terminal ──▶ Complete | Error | Cancelled
//!      │ 403/409: sleep, retry          │ unset finishCode: sleep, poll again
//!      ▼ other: fail                     ▼ non-200: fail (never retried)
//! ```

use reqwest::Method;
use tabops_core::{retry_with_backoff, RetryError, Step};

use crate::client::TableauClient;
use crate::error::{RetryPhase, TableauError};
use crate::job::{JobHandle, JobStatus};
use crate::transport::{RawResponse, Transport};
use crate::wire::JobDocument;

impl<T: Transport> TableauClient<T> {
    /// Ask the server to refresh the extracts behind `workbook_id`.
    ///
    /// Retries while another refresh is already running for the workbook
    /// (403/409), up to the configured ceiling. Any other non-202 response is
    /// fatal and carries the raw body.
    pub fn start_refresh(&self, workbook_id: &str) -> Result<JobHandle, TableauError> {
        tracing::info!(workbook_id, "initiating extract refresh");
        let url = self.site_url(&format!(
            "workbooks/{}/refresh",
            urlencoding::encode(workbook_id)
        ))?;
        let policy = self.refresh_policy;

        let result = retry_with_backoff(
            &policy,
            self.sleeper.as_ref(),
            |attempt| {
                let request = self
                    .authed(Method::POST, url.clone())?
                    .json_body(&serde_json::json!({}));
                let response = self.send(request)?;
                match classify_refresh(&response) {
                    Ok(job_id) => Ok(Step::Done(job_id)),
                    Err(e) if e.is_retryable() => {
                        tracing::info!(
                            workbook_id,
                            attempt,
                            max_attempts = policy.max_attempts,
                            "refresh already in progress, retrying"
                        );
                        Err(e)
                    }
                    Err(e) => Err(e),
                }
            },
            TableauError::is_retryable,
        );

        match result {
            Ok(job_id) => {
                tracing::info!(workbook_id, job_id = %job_id, "refresh job accepted");
                Ok(JobHandle {
                    job_id,
                    workbook_id: workbook_id.to_string(),
                })
            }
            Err(RetryError::Exhausted { attempts }) => {
                tracing::error!(workbook_id, attempts, "max retries reached starting refresh");
                Err(TableauError::RetriesExhausted {
                    phase: RetryPhase::Refresh,
                    attempts,
                })
            }
            Err(RetryError::Failed(e)) => {
                tracing::error!(workbook_id, error = %e, "refresh request failed");
                Err(e)
            }
        }
    }

    /// One status query for `job_id`. Non-200 is a `Service` error.
    pub fn query_job(&self, job_id: &str) -> Result<JobStatus, TableauError> {
        let url = self.site_url(&format!("jobs/{}", urlencoding::encode(job_id)))?;
        let response = self.send(self.authed(Method::GET, url)?)?;
        if response.status != 200 {
            return Err(TableauError::service(&response));
        }
        JobStatus::from_document(&response.body)
    }

    /// Poll `job_id` until it reports a finish code.
    ///
    /// Success, error and cancellation are all returned as a terminal
    /// [`JobStatus`]; deciding whether an errored job is a failure is up to
    /// the caller. A failed query ends the loop at once.
    pub fn poll_until_terminal(&self, job_id: &str) -> Result<JobStatus, TableauError> {
        let policy = self.poll_policy;
        let result = retry_with_backoff(
            &policy,
            self.sleeper.as_ref(),
            |attempt| {
                let status = self.query_job(job_id)?;
                let label = status.status_label();
                tracing::info!(
                    job_id,
                    progress = status.progress.unwrap_or(0),
                    status = %label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    "job status check"
                );
                if status.is_terminal() {
                    Ok(Step::Done(status))
                } else {
                    Ok(Step::Again)
                }
            },
            |_: &TableauError| false,
        );

        match result {
            Ok(status) => Ok(status),
            Err(RetryError::Exhausted { attempts }) => {
                tracing::error!(job_id, attempts, "max retries reached polling job");
                Err(TableauError::RetriesExhausted {
                    phase: RetryPhase::Poll,
                    attempts,
                })
            }
            Err(RetryError::Failed(e)) => {
                tracing::error!(job_id, error = %e, "unable to retrieve job status");
                Err(e)
            }
        }
    }

    /// Trigger a refresh and wait for the job to finish.
    pub fn refresh_and_wait(&self, workbook_id: &str) -> Result<JobStatus, TableauError> {
        let handle = self.start_refresh(workbook_id)?;
        self.poll_until_terminal(&handle.job_id)
    }

    /// Ask the server to cancel `job_id`.
    ///
    /// Sends exactly one request and returns the response untouched; it
    /// neither checks that the job stopped nor polls afterwards. Only a
    /// transport failure is reported as an error.
    pub fn cancel_job(&self, job_id: &str) -> Result<RawResponse, TableauError> {
        let url = self.site_url(&format!("jobs/{}", urlencoding::encode(job_id)))?;
        let response = self.send(self.authed(Method::PUT, url)?)?;
        tracing::info!(
            job_id,
            status = response.status,
            headers = ?response.headers,
            body = %response.text(),
            "cancel job response"
        );
        Ok(response)
    }
}

/// 202 → job id; 403/409 → `Conflict`; anything else → `Service`.
fn classify_refresh(response: &RawResponse) -> Result<String, TableauError> {
    match response.status {
        202 => {
            let doc: JobDocument = serde_json::from_slice(&response.body)
                .map_err(|e| TableauError::malformed(format!("refresh response: {e}")))?;
            doc.job
                .id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| TableauError::malformed("refresh response has no job id"))
        }
        403 | 409 => Err(TableauError::Conflict {
            status: response.status,
            body: response.text().into_owned(),
        }),
        _ => Err(TableauError::service(response)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_classify_accepted() {
        let job = classify_refresh(&response(202, r#"{"job":{"id":"j-1","mode":"Asynchronous"}}"#));
        assert_eq!(job.unwrap(), "j-1");
    }

    #[test]
    fn test_classify_accepted_without_id() {
        let err = classify_refresh(&response(202, r#"{"job":{}}"#)).unwrap_err();
        assert!(matches!(err, TableauError::MalformedResponse(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_conflicts() {
        for status in [403, 409] {
            let err = classify_refresh(&response(status, "busy")).unwrap_err();
            assert!(matches!(err, TableauError::Conflict { .. }), "status {status}");
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_classify_other_statuses_are_fatal() {
        for status in [200, 400, 401, 404, 500] {
            let err = classify_refresh(&response(status, "nope")).unwrap_err();
            assert!(matches!(err, TableauError::Service { .. }), "status {status}");
        }
    }
}
