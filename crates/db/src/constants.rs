//! Read-only access to the `um_constants` table.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};
use tabops_core::PathRules;
use tracing::{debug, info};

use crate::translate::convert_windows_path_to_unix;
use crate::{DbError, DbResult};

const LOOKUP_SQL: &str =
    "SELECT char_constant_tx FROM um_constants WHERE UPPER(constant_cd) = UPPER(?1)";

/// Anything that can resolve a constant code to its (translated) value.
pub trait ConstantLookup {
    fn get_constant_value(&self, code: &str) -> DbResult<String>;
}

/// Handle on a SQLite file holding `um_constants(constant_cd, char_constant_tx)`.
#[derive(Debug)]
pub struct ConstantStore {
    conn: Connection,
    path: PathBuf,
    rules: PathRules,
}

impl ConstantStore {
    /// Open an existing database read-only. A missing file is an error.
    pub fn open(path: &Path, rules: PathRules) -> DbResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| DbError::Open {
            path: path.to_owned(),
            source,
        })?;
        info!("Constants database opened at {}", path.display());
        Ok(Self {
            conn,
            path: path.to_owned(),
            rules,
        })
    }

    /// Wrap an already-open connection (in-memory databases in tests).
    pub fn from_connection(conn: Connection, rules: PathRules) -> Self {
        Self {
            conn,
            path: PathBuf::new(),
            rules,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw value of `code` without path translation.
    pub fn raw_value(&self, code: &str) -> DbResult<String> {
        let mut stmt = self.conn.prepare_cached(LOOKUP_SQL)?;
        let rows = stmt
            .query_map(params![code], |row| row.get::<_, Option<String>>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(code, rows = rows.len(), "constant lookup");
        match rows.as_slice() {
            [] => Err(DbError::NotFound { code: code.into() }),
            [Some(value)] => Ok(value.clone()),
            [None] => Err(DbError::NullValue { code: code.into() }),
            _ => Err(DbError::Ambiguous { code: code.into() }),
        }
    }
}

impl ConstantLookup for ConstantStore {
    fn get_constant_value(&self, code: &str) -> DbResult<String> {
        let value = self.raw_value(code)?;
        Ok(convert_windows_path_to_unix(&value, &self.rules))
    }
}
