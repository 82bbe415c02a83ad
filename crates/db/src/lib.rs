// crates/db/src/lib.rs
// SQLite-backed lookup of site constants (`um_constants`) and the path
// rewriting applied to the values it returns.

pub mod constants;
pub mod translate;

pub use constants::{ConstantLookup, ConstantStore};
pub use translate::{convert_windows_path_to_unix, substitute_destination};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot open constants database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("No constant named {code}")]
    NotFound { code: String },

    #[error("More than one row for constant {code}, unable to determine correct value")]
    Ambiguous { code: String },

    #[error("Constant {code} has no value")]
    NullValue { code: String },

    #[error("Invalid pattern: {0}")]
    Pattern(String),
}

pub type DbResult<T> = Result<T, DbError>;
