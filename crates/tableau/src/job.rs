//! Asynchronous job identity and status snapshots.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::TableauError;
use crate::wire::JobDocument;

/// A refresh job the server accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_id: String,
    pub workbook_id: String,
}

/// Terminal-state indicator reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishCode {
    /// Field absent or empty: the job is still queued or running.
    Unset,
    Success,
    Error,
    Cancelled,
}

impl FinishCode {
    /// Map the wire value. Absent/empty is `Unset`; `0`, `1`, `2` are the
    /// terminal codes; anything else is rejected rather than guessed at.
    pub fn from_wire(raw: Option<&str>) -> Result<Self, TableauError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(FinishCode::Unset),
            Some("0") => Ok(FinishCode::Success),
            Some("1") => Ok(FinishCode::Error),
            Some("2") => Ok(FinishCode::Cancelled),
            Some(other) => Err(TableauError::malformed(format!(
                "unrecognized finishCode '{other}'"
            ))),
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, FinishCode::Unset)
    }
}

/// Caller-facing label, derived purely from the finish code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    InProgress,
    Error,
    Cancelled,
    Complete,
}

impl From<FinishCode> for StatusLabel {
    fn from(code: FinishCode) -> Self {
        match code {
            FinishCode::Unset => StatusLabel::InProgress,
            FinishCode::Success => StatusLabel::Complete,
            FinishCode::Error => StatusLabel::Error,
            FinishCode::Cancelled => StatusLabel::Cancelled,
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusLabel::InProgress => "In Progress",
            StatusLabel::Error => "Error",
            StatusLabel::Cancelled => "Cancelled",
            StatusLabel::Complete => "Complete",
        })
    }
}

/// One poll's view of a job. A new snapshot is built per query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub id: String,
    pub mode: Option<String>,
    pub job_type: Option<String>,
    /// 0–100; `None` while the server omits it (typically while queued).
    pub progress: Option<u8>,
    pub finish_code: FinishCode,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub workbook_id: Option<String>,
    pub workbook_name: Option<String>,
}

impl JobStatus {
    /// Parse a `{"job": {...}}` document.
    pub fn from_document(body: &[u8]) -> Result<Self, TableauError> {
        let doc: JobDocument = serde_json::from_slice(body)
            .map_err(|e| TableauError::malformed(format!("job document: {e}")))?;
        let job = doc.job;

        let id = job
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TableauError::malformed("job document has no id"))?;
        let finish_code = FinishCode::from_wire(job.finish_code.as_deref())?;
        let progress = parse_progress(job.progress.as_deref())?;
        let (workbook_id, workbook_name) = match job.extract_refresh_job.and_then(|r| r.workbook) {
            Some(wb) => (Some(wb.id), wb.name),
            None => (None, None),
        };

        Ok(JobStatus {
            id,
            mode: job.mode,
            job_type: job.job_type,
            progress,
            finish_code,
            created_at: job.created_at,
            updated_at: job.updated_at,
            completed_at: job.completed_at,
            workbook_id,
            workbook_name,
        })
    }

    pub fn status_label(&self) -> StatusLabel {
        self.finish_code.into()
    }

    /// Terminal iff the finish code is set, whatever `progress` says.
    pub fn is_terminal(&self) -> bool {
        self.finish_code.is_terminal()
    }
}

fn parse_progress(raw: Option<&str>) -> Result<Option<u8>, TableauError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => match s.parse::<u8>() {
            Ok(p) if p <= 100 => Ok(Some(p)),
            _ => Err(TableauError::malformed(format!("progress '{s}' is not 0-100"))),
        },
    }
}
