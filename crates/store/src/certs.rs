use rusqlite::{params, Connection, OptionalExtension};

use revctl_hash::Hash;

use crate::error::StoreError;

/// The raw, unverified row shape for a stored cert. This
/// crate persists the five fields verbatim; deciding whether a cert's
/// signature verifies, and whether a verifying cert should be *trusted*, is
/// `revctl-cert`'s job — the store only knows how to keep rows and look
/// them up by target or by cert hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertRow {
    /// Hash of this cert's five canonical fields; the cert's own identity.
    pub cert_hash: Hash,
    /// The revision this cert is attached to.
    pub target: Hash,
    /// The cert name, e.g. `branch`, `author`, `date`.
    pub name: String,
    /// The asserted value, raw bytes (UTF-8 text for the standard cert
    /// names, but the store does not assume that).
    pub value: Vec<u8>,
    /// `localname@domain` identifying the signing key.
    pub signer: String,
    /// The signature bytes over the canonical signable text.
    pub signature: Vec<u8>,
}

/// Inserts `cert` if its `cert_hash` is not already present.
pub fn put_cert(conn: &Connection, cert: &CertRow) -> Result<crate::blob::PutOutcome, StoreError> {
    let already: i64 = conn.query_row(
        "SELECT COUNT(*) FROM certs WHERE cert_hash = ?1",
        params![cert.cert_hash.to_string()],
        |row| row.get(0),
    )?;
    if already > 0 {
        return Ok(crate::blob::PutOutcome::AlreadyPresent);
    }
    conn.execute(
        "INSERT INTO certs (cert_hash, target, name, value, signer, signature)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            cert.cert_hash.to_string(),
            cert.target.to_string(),
            cert.name,
            cert.value,
            cert.signer,
            cert.signature,
        ],
    )?;
    Ok(crate::blob::PutOutcome::Inserted)
}

fn row_to_cert(row: &rusqlite::Row<'_>) -> rusqlite::Result<CertRow> {
    let cert_hash: String = row.get(0)?;
    let target: String = row.get(1)?;
    let name: String = row.get(2)?;
    let value: Vec<u8> = row.get(3)?;
    let signer: String = row.get(4)?;
    let signature: Vec<u8> = row.get(5)?;
    Ok(CertRow {
        cert_hash: cert_hash.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(0, "cert_hash".into(), rusqlite::types::Type::Text)
        })?,
        target: target.parse().map_err(|_| {
            rusqlite::Error::InvalidColumnType(1, "target".into(), rusqlite::types::Type::Text)
        })?,
        name,
        value,
        signer,
        signature,
    })
}

/// All certs attached to `target`, in no particular order; trust filtering
/// happens one layer up in `revctl-cert`.
pub fn certs_for_target(conn: &Connection, target: Hash) -> Result<Vec<CertRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT cert_hash, target, name, value, signer, signature FROM certs WHERE target = ?1",
    )?;
    let rows = stmt
        .query_map(params![target.to_string()], row_to_cert)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// All revisions carrying at least one cert named `name`, deduplicated.
pub fn targets_with_cert_name(conn: &Connection, name: &str) -> Result<Vec<Hash>, StoreError> {
    let mut stmt = conn.prepare("SELECT DISTINCT target FROM certs WHERE name = ?1")?;
    let rows = stmt
        .query_map(params![name], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|s| s.parse().map_err(StoreError::from))
        .collect()
}

/// Stores or replaces the public (and, for locally-controlled signing
/// identities, encrypted private) key material for `name`. The private-key
/// wire format is an embedder concern; this store only
/// keeps whatever bytes it is handed.
pub fn put_key(
    conn: &Connection,
    name: &str,
    public_key: &[u8],
    private_key: Option<&[u8]>,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO keys (name, public_key, private_key) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET public_key = excluded.public_key, private_key = excluded.private_key",
        params![name, public_key, private_key],
    )?;
    Ok(())
}

/// The public key bytes stored under `name`, if any.
pub fn get_public_key(conn: &Connection, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
    conn.query_row("SELECT public_key FROM keys WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
    .optional()
    .map_err(StoreError::from)
}

/// The private key bytes stored under `name`, if any were supplied to
/// [`put_key`].
pub fn get_private_key(conn: &Connection, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
    conn.query_row("SELECT private_key FROM keys WHERE name = ?1", params![name], |row| {
        row.get(0)
    })
    .optional()
    .map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::ensure_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn put_and_fetch_certs_for_target() {
        let conn = setup();
        let target = Hash::of(b"revision");
        let cert = CertRow {
            cert_hash: Hash::of(b"cert-1"),
            target,
            name: "branch".to_string(),
            value: b"net.example.project".to_vec(),
            signer: "alice@example.com".to_string(),
            signature: vec![1, 2, 3],
        };
        put_cert(&conn, &cert).unwrap();
        let found = certs_for_target(&conn, target).unwrap();
        assert_eq!(found, vec![cert]);
    }

    #[test]
    fn duplicate_cert_is_absorbed() {
        let conn = setup();
        let cert = CertRow {
            cert_hash: Hash::of(b"cert-1"),
            target: Hash::of(b"rev"),
            name: "author".to_string(),
            value: b"bob".to_vec(),
            signer: "bob@example.com".to_string(),
            signature: vec![9],
        };
        assert_eq!(put_cert(&conn, &cert).unwrap(), crate::blob::PutOutcome::Inserted);
        assert_eq!(
            put_cert(&conn, &cert).unwrap(),
            crate::blob::PutOutcome::AlreadyPresent
        );
    }

    #[test]
    fn keys_round_trip() {
        let conn = setup();
        put_key(&conn, "alice@example.com", b"pub-bytes", Some(b"priv-bytes")).unwrap();
        assert_eq!(get_public_key(&conn, "alice@example.com").unwrap().unwrap(), b"pub-bytes");
        assert_eq!(get_private_key(&conn, "alice@example.com").unwrap().unwrap(), b"priv-bytes");
        assert!(get_public_key(&conn, "unknown@example.com").unwrap().is_none());
    }
}
