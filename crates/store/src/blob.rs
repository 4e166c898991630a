use std::collections::{HashMap, HashSet, VecDeque};

use rusqlite::{params, Connection, OptionalExtension};

use revctl_hash::{apply as delta_apply, diff as delta_diff, Delta, Hash, PiecewiseApplicator};

use crate::error::StoreError;
use crate::kind::Kind;

/// The outcome of a `put_*` call: whether it actually wrote a new row, or
/// found the target already present and absorbed the call as a non-fatal
/// no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    /// The object was not previously present and has now been written.
    Inserted,
    /// The object was already present; nothing was written.
    AlreadyPresent,
}

fn full_bytes(conn: &Connection, kind: Kind, id: Hash) -> Result<Option<Vec<u8>>, StoreError> {
    conn.query_row(
        &format!("SELECT bytes FROM {} WHERE id = ?1", kind.full_table()),
        params![id.to_string()],
        |row| row.get(0),
    )
    .optional()
    .map_err(StoreError::from)
}

fn full_exists(conn: &Connection, kind: Kind, id: Hash) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", kind.full_table()),
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn delta_rows_from(conn: &Connection, kind: Kind, id: Hash) -> Result<Vec<(Hash, Delta)>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT base, delta FROM {} WHERE id = ?1",
        kind.delta_table()
    ))?;
    let rows = stmt
        .query_map(params![id.to_string()], |row| {
            let base: String = row.get(0)?;
            let delta: Vec<u8> = row.get(1)?;
            Ok((base, delta))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(base, delta)| {
            let base: Hash = base.parse().map_err(StoreError::from)?;
            let delta = Delta::decode(&delta).map_err(|source| StoreError::CorruptDelta { id, source })?;
            Ok((base, delta))
        })
        .collect()
}

/// Reconstructs the bytes for `id`: a direct hit on the full table, or a
/// breadth-first walk along delta edges to the nearest full ancestor,
/// replayed forward through [`PiecewiseApplicator`].
pub fn reconstruct(conn: &Connection, kind: Kind, id: Hash) -> Result<Vec<u8>, StoreError> {
    if let Some(bytes) = full_bytes(conn, kind, id)? {
        return Ok(bytes);
    }

    let mut visited: HashSet<Hash> = HashSet::new();
    visited.insert(id);
    let mut queue: VecDeque<Hash> = VecDeque::new();
    queue.push_back(id);
    // parent[base] = (newer_node, delta) s.t. apply(delta, bytes(base)) == bytes(newer_node).
    let mut parent: HashMap<Hash, (Hash, Delta)> = HashMap::new();
    let mut root: Option<Hash> = None;

    'bfs: while let Some(current) = queue.pop_front() {
        for (base, delta) in delta_rows_from(conn, kind, current)? {
            if visited.contains(&base) {
                return Err(StoreError::CorruptStore {
                    id,
                    detail: format!("delta chain cycle revisits {base}"),
                });
            }
            visited.insert(base);
            parent.insert(base, (current, delta));
            if full_exists(conn, kind, base)? {
                root = Some(base);
                break 'bfs;
            }
            queue.push_back(base);
        }
    }

    let Some(root) = root else {
        return Err(StoreError::MissingObject { id });
    };

    let mut hops = Vec::new();
    let mut cursor = root;
    while cursor != id {
        let (child, delta) = parent
            .remove(&cursor)
            .expect("every non-root node on the discovered path has a parent entry");
        hops.push(delta);
        cursor = child;
    }

    let root_bytes =
        full_bytes(conn, kind, root)?.expect("root was confirmed present in the full table above");
    let result = if hops.len() == 1 {
        delta_apply(&hops[0], &root_bytes).map_err(|source| StoreError::CorruptDelta { id, source })?
    } else {
        let mut applicator = PiecewiseApplicator::begin(&root_bytes);
        let last = hops.len() - 1;
        for (i, hop) in hops.iter().enumerate() {
            applicator
                .apply(hop)
                .map_err(|source| StoreError::CorruptDelta { id, source })?;
            if i != last {
                applicator = applicator.next();
            }
        }
        applicator.finish().map_err(|source| StoreError::CorruptDelta { id, source })?
    };

    if Hash::of(&result) != id {
        return Err(StoreError::CorruptStore {
            id,
            detail: "reconstructed bytes do not hash back to the requested id".to_string(),
        });
    }
    Ok(result)
}

/// True if `id` is known to the store, either as a full blob or via any
/// delta row.
pub fn exists(conn: &Connection, kind: Kind, id: Hash) -> Result<bool, StoreError> {
    if full_exists(conn, kind, id)? {
        return Ok(true);
    }
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", kind.delta_table()),
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Inserts `bytes` as a full blob under `id`. The caller's claimed `id` must
/// match `hash(bytes)`; an id already present is absorbed as a no-op.
pub fn put_full(conn: &Connection, kind: Kind, id: Hash, bytes: &[u8]) -> Result<PutOutcome, StoreError> {
    let computed = Hash::of(bytes);
    if computed != id {
        return Err(StoreError::HashMismatch { supplied: id, computed });
    }
    if full_exists(conn, kind, id)? {
        return Ok(PutOutcome::AlreadyPresent);
    }
    conn.execute(
        &format!("INSERT OR IGNORE INTO {} (id, bytes) VALUES (?1, ?2)", kind.full_table()),
        params![id.to_string(), bytes],
    )?;
    Ok(PutOutcome::Inserted)
}

/// Records `delta` as a reverse delta from `new_id` (the base, already a
/// full row) back to `old_id`, then deletes `old_id`'s full row if present.
/// Inserting `new_id`'s full row is the caller's responsibility; see
/// [`put_version`] for the convenience wrapper that does both.
///
/// # Errors
///
/// Returns [`StoreError::DeltaBaseNotFull`] if `new_id` has no full row yet.
pub fn put_delta(
    conn: &Connection,
    kind: Kind,
    old_id: Hash,
    new_id: Hash,
    delta: &Delta,
) -> Result<PutOutcome, StoreError> {
    if !full_exists(conn, kind, new_id)? {
        return Err(StoreError::DeltaBaseNotFull { new_id });
    }
    let already: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM {} WHERE id = ?1 AND base = ?2",
            kind.delta_table()
        ),
        params![old_id.to_string(), new_id.to_string()],
        |row| row.get(0),
    )?;
    if already > 0 {
        return Ok(PutOutcome::AlreadyPresent);
    }
    conn.execute(
        &format!(
            "INSERT INTO {} (id, base, delta) VALUES (?1, ?2, ?3)",
            kind.delta_table()
        ),
        params![old_id.to_string(), new_id.to_string(), delta.encode()],
    )?;
    conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1", kind.full_table()),
        params![old_id.to_string()],
    )?;
    Ok(PutOutcome::Inserted)
}

/// Writes `new_bytes` as the newest version superseding `old_id`: inserts
/// the new content as a full row, diffs it against the reconstructed bytes
/// of `old_id`, and rewrites `old_id` as a delta against the new id. Returns
/// the new id.
pub fn put_version(conn: &Connection, kind: Kind, old_id: Hash, new_bytes: &[u8]) -> Result<Hash, StoreError> {
    let new_id = Hash::of(new_bytes);
    put_full(conn, kind, new_id, new_bytes)?;
    let old_bytes = reconstruct(conn, kind, old_id)?;
    let delta = delta_diff(new_bytes, &old_bytes);
    put_delta(conn, kind, old_id, new_id, &delta)?;
    Ok(new_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::schema::ensure_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn full_round_trips() {
        let conn = setup();
        let bytes = b"hello\n";
        let id = Hash::of(bytes);
        put_full(&conn, Kind::File, id, bytes).unwrap();
        assert_eq!(reconstruct(&conn, Kind::File, id).unwrap(), bytes);
    }

    #[test]
    fn duplicate_full_put_is_absorbed() {
        let conn = setup();
        let bytes = b"hello\n";
        let id = Hash::of(bytes);
        assert_eq!(put_full(&conn, Kind::File, id, bytes).unwrap(), PutOutcome::Inserted);
        assert_eq!(
            put_full(&conn, Kind::File, id, bytes).unwrap(),
            PutOutcome::AlreadyPresent
        );
    }

    #[test]
    fn version_chain_reconstructs_every_link() {
        let conn = setup();
        let v1 = b"A\nB\nC\n";
        let id1 = Hash::of(v1);
        put_full(&conn, Kind::File, id1, v1).unwrap();

        let v2 = b"A\nX\nC\n";
        let id2 = put_version(&conn, Kind::File, id1, v2).unwrap();

        assert!(full_exists(&conn, Kind::File, id2).unwrap());
        assert!(!full_exists(&conn, Kind::File, id1).unwrap());
        assert_eq!(reconstruct(&conn, Kind::File, id1).unwrap(), v1);
        assert_eq!(reconstruct(&conn, Kind::File, id2).unwrap(), v2);
    }

    #[test]
    fn long_chain_reconstructs_every_predecessor() {
        let conn = setup();
        let mut prev = Hash::of(b"line 0\n");
        put_full(&conn, Kind::File, prev, b"line 0\n").unwrap();
        let mut ids = vec![(prev, b"line 0\n".to_vec())];
        for i in 1..200 {
            let bytes = format!("line {i}\n").into_bytes();
            let id = put_version(&conn, Kind::File, prev, &bytes).unwrap();
            ids.push((id, bytes));
            prev = id;
        }
        for (id, bytes) in &ids {
            assert_eq!(reconstruct(&conn, Kind::File, *id).unwrap(), *bytes);
        }
    }

    #[test]
    fn missing_object_is_reported() {
        let conn = setup();
        let id = Hash::of(b"never written");
        assert!(matches!(
            reconstruct(&conn, Kind::File, id),
            Err(StoreError::MissingObject { .. })
        ));
    }

    #[test]
    fn delta_against_non_full_base_is_rejected() {
        let conn = setup();
        let old = Hash::of(b"old");
        let new = Hash::of(b"new");
        let delta = delta_diff(b"new", b"old");
        assert!(matches!(
            put_delta(&conn, Kind::File, old, new, &delta),
            Err(StoreError::DeltaBaseNotFull { .. })
        ));
    }

    #[test]
    fn hash_mismatch_on_full_put_is_rejected() {
        let conn = setup();
        let wrong_id = Hash::of(b"not these bytes");
        assert!(matches!(
            put_full(&conn, Kind::File, wrong_id, b"hello"),
            Err(StoreError::HashMismatch { .. })
        ));
    }
}
