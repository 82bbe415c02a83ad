//! Blocking client for the Tableau Server REST API.
//!
//! Covers sign-in/sign-out, extract refresh with job polling and
//! cancellation, and view/workbook export.

pub mod client;
pub mod error;
pub mod export;
pub mod job;
mod refresh;
pub mod transport;
mod wire;

pub use client::{Session, TableauClient};
pub use error::{RetryPhase, TableauError};
pub use export::{Orientation, PageType, PdfOptions};
pub use job::{FinishCode, JobHandle, JobStatus, StatusLabel};
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport, AUTH_HEADER};
