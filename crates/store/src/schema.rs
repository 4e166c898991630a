use rusqlite::Connection;

use crate::error::StoreError;

/// Bumped whenever the on-disk table layout changes; checked against the
/// `schema_info` table on open.
pub const SCHEMA_VERSION: i64 = 1;

fn full_delta_tables(conn: &Connection, kind: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {kind}_full (
             id      TEXT PRIMARY KEY,
             bytes   BLOB NOT NULL
         );
         CREATE TABLE IF NOT EXISTS {kind}_delta (
             id      TEXT NOT NULL,
             base    TEXT NOT NULL,
             delta   BLOB NOT NULL,
             PRIMARY KEY (id, base)
         );
         CREATE INDEX IF NOT EXISTS {kind}_delta_base_idx ON {kind}_delta(base);"
    ))
}

/// Creates every table this store needs if they are not already present,
/// and checks the recorded schema version against [`SCHEMA_VERSION`].
pub fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_info (
             id      INTEGER PRIMARY KEY CHECK (id = 0),
             version INTEGER NOT NULL
         );",
    )?;

    let existing: Option<i64> = conn
        .query_row("SELECT version FROM schema_info WHERE id = 0", [], |row| row.get(0))
        .ok();
    match existing {
        None => {
            conn.execute(
                "INSERT INTO schema_info (id, version) VALUES (0, ?1)",
                [SCHEMA_VERSION],
            )?;
        }
        Some(found) if found != SCHEMA_VERSION => {
            return Err(StoreError::SchemaMismatch {
                found,
                expected: SCHEMA_VERSION,
            });
        }
        Some(_) => {}
    }

    full_delta_tables(conn, "file")?;
    full_delta_tables(conn, "manifest")?;
    full_delta_tables(conn, "revision")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS certs (
             cert_hash   TEXT PRIMARY KEY,
             target      TEXT NOT NULL,
             name        TEXT NOT NULL,
             value       BLOB NOT NULL,
             signer      TEXT NOT NULL,
             signature   BLOB NOT NULL
         );
         CREATE INDEX IF NOT EXISTS certs_target_idx ON certs(target);
         CREATE INDEX IF NOT EXISTS certs_name_idx ON certs(name);

         CREATE TABLE IF NOT EXISTS keys (
             name        TEXT PRIMARY KEY,
             public_key  BLOB NOT NULL,
             private_key BLOB
         );",
    )?;

    Ok(())
}
