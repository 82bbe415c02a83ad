// File-backed constants database: open, look up, substitute.

use pretty_assertions::assert_eq;
use rusqlite::{params, Connection};
use tabops_core::{PathRules, ShareRewrite};
use tabops_db::{substitute_destination, ConstantLookup, ConstantStore, DbError};
use tempfile::TempDir;

fn seed(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("constants.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE um_constants (constant_cd TEXT NOT NULL, char_constant_tx TEXT);",
    )
    .unwrap();
    for (code, value) in [
        ("%dest_branch%", r"\\fileserver.example.com\branch\reports"),
        ("%dest_finance%", r"\\nas02.dev.example.com\finance"),
        ("BATCH_HOME", "/opt/batch"),
    ] {
        conn.execute(
            "INSERT INTO um_constants VALUES (?1, ?2)",
            params![code, value],
        )
        .unwrap();
    }
    path
}

fn rules() -> PathRules {
    PathRules {
        share_prefixes: vec![
            ShareRewrite {
                from: "//fileserver.example.com/".into(),
                to: "/NAS/".into(),
            },
            ShareRewrite {
                from: "//nas02.dev.example.com/".into(),
                to: "/NAS/".into(),
            },
        ],
    }
}

#[test]
fn open_and_lookup_from_file() {
    let dir = TempDir::new().unwrap();
    let path = seed(&dir);

    let store = ConstantStore::open(&path, rules()).unwrap();

    assert_eq!(store.path(), path.as_path());
    assert_eq!(store.get_constant_value("batch_home").unwrap(), "/opt/batch");
    assert_eq!(
        store.get_constant_value("%DEST_BRANCH%").unwrap(),
        "/NAS/branch/reports"
    );
}

#[test]
fn substitute_against_file_store() {
    let dir = TempDir::new().unwrap();
    let store = ConstantStore::open(&seed(&dir), rules()).unwrap();

    let out = substitute_destination("%Dest_Branch%/q3.pdf|%dest_finance%/q3.xlsx", &store).unwrap();

    assert_eq!(out, "/NAS/branch/reports/q3.pdf|/NAS/finance/q3.xlsx");
}

#[test]
fn missing_database_file_is_open_error() {
    let dir = TempDir::new().unwrap();
    let err = ConstantStore::open(&dir.path().join("absent.db"), PathRules::default()).unwrap_err();
    assert!(matches!(err, DbError::Open { .. }), "got {err:?}");
}
