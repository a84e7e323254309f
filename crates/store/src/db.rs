//! Opens the eight named SQLite databases under `<data_dir>/databases/`
//! (spec §6), applying each one's schema idempotently on open.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::schema;
use crate::StoreError;

pub(crate) fn open_named(data_dir: &Path, name: &str, schema_sql: &str) -> Result<Mutex<Connection>, StoreError> {
    let databases_dir = data_dir.join("databases");
    std::fs::create_dir_all(&databases_dir).map_err(|e| {
        StoreError::InvariantViolation(format!("failed to create {}: {e}", databases_dir.display()))
    })?;
    let path = databases_dir.join(format!("{name}.sqlite3"));
    let conn = Connection::open(path)?;
    schema::apply_schema(&conn, schema_sql)?;
    Ok(Mutex::new(conn))
}
