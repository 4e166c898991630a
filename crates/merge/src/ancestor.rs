//! Ancestor queries over the revision DAG.

use std::collections::{HashMap, HashSet, VecDeque};

use revctl_hash::Hash;
use revctl_store::SqliteStore;

use crate::error::MergeError;
use crate::revision::Revision;

/// Loads and parses the revision stored under `id`.
pub(crate) fn load_revision(store: &SqliteStore, id: Hash) -> Result<Revision, MergeError> {
    let bytes = store.get_revision(id)?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| MergeError::CorruptRevision { id, detail: e.to_string() })?;
    Revision::from_canonical_text(text).map_err(|detail| MergeError::CorruptRevision { id, detail })
}

/// The non-null parent revisions of `id`.
fn parents_of(store: &SqliteStore, id: Hash) -> Result<Vec<Hash>, MergeError> {
    let revision = load_revision(store, id)?;
    Ok(revision
        .edges
        .iter()
        .filter_map(|edge| edge.parent_revision)
        .collect())
}

/// True if `a` is an ancestor of `b` (or `a == b`), via reverse BFS over
/// revision edges starting at `b`.
///
/// # Errors
///
/// Returns [`MergeError`] if a revision on the walked path is missing or
/// fails to parse.
pub fn is_ancestor(store: &SqliteStore, a: Hash, b: Hash) -> Result<bool, MergeError> {
    if a == b {
        return Ok(true);
    }
    let mut visited: HashSet<Hash> = HashSet::from([b]);
    let mut frontier: VecDeque<Hash> = VecDeque::from([b]);
    while let Some(current) = frontier.pop_front() {
        for parent in parents_of(store, current)? {
            if parent == a {
                return Ok(true);
            }
            if visited.insert(parent) {
                frontier.push_back(parent);
            }
        }
    }
    Ok(false)
}

/// BFS ancestor depths of `start`, including `start` itself at depth 0.
fn ancestor_depths(store: &SqliteStore, start: Hash) -> Result<HashMap<Hash, usize>, MergeError> {
    let mut depths = HashMap::from([(start, 0usize)]);
    let mut frontier = VecDeque::from([start]);
    while let Some(current) = frontier.pop_front() {
        let depth = depths[&current];
        for parent in parents_of(store, current)? {
            if !depths.contains_key(&parent) {
                depths.insert(parent, depth + 1);
                frontier.push_back(parent);
            }
        }
    }
    Ok(depths)
}

/// Finds the common ancestor of `a` and `b`.
///
/// Enumerates ancestors of each by BFS depth; among revisions reachable from
/// both, picks the one with the smallest combined depth (the generation
/// closest to both inputs). Ties are broken by the candidate with the most
/// other candidates strictly deeper than it (approximating "greatest number
/// of shared descendants" among the candidate set), then by ascending
/// lexicographic id order.
///
/// Returns `None` if `a` and `b` share no common ancestor (including the
/// null revision, which is never itself returned — the null revision is
/// represented by the absence of a parent edge, not a hash this function can
/// produce).
///
/// # Errors
///
/// Returns [`MergeError`] if a revision on either ancestry walk is missing
/// or fails to parse.
pub fn common_ancestor(store: &SqliteStore, a: Hash, b: Hash) -> Result<Option<Hash>, MergeError> {
    let depths_a = ancestor_depths(store, a)?;
    let depths_b = ancestor_depths(store, b)?;

    let mut candidates: Vec<Hash> = depths_a
        .keys()
        .filter(|id| depths_b.contains_key(*id))
        .copied()
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }
    candidates.sort();

    let combined = |id: &Hash| depths_a[id] + depths_b[id];
    let min_combined = candidates.iter().map(combined).min().expect("non-empty");
    let closest: Vec<Hash> = candidates
        .iter()
        .copied()
        .filter(|id| combined(id) == min_combined)
        .collect();
    if closest.len() == 1 {
        return Ok(Some(closest[0]));
    }

    let shared_descendants = |id: &Hash| {
        closest
            .iter()
            .filter(|other| *other != id && combined(other) > combined(id))
            .count()
    };
    let mut best = closest[0];
    let mut best_score = shared_descendants(&best);
    for candidate in &closest[1..] {
        let score = shared_descendants(candidate);
        if score > best_score || (score == best_score && *candidate < best) {
            best = *candidate;
            best_score = score;
        }
    }
    Ok(Some(best))
}

#[cfg(test)]
mod tests {
    use super::*;
    use revctl_changeset::{ChangeSet, Manifest, Path};
    use revctl_store::SqliteStore;

    fn commit_root(store: &SqliteStore, path: &str, content: &[u8]) -> Hash {
        let hash = Hash::of(content);
        let txn = store.transaction().unwrap();
        store.put_file_full(hash, content).unwrap();
        let cs = ChangeSet::builder().add_file(Path::new(path).unwrap(), hash).build();
        let manifest = cs.apply_to_manifest(&Manifest::empty()).unwrap();
        store.put_manifest_full(manifest.canonical_hash(), &manifest.to_canonical_bytes()).unwrap();
        let rev = Revision {
            new_manifest: manifest.canonical_hash(),
            edges: vec![crate::revision::Edge {
                parent_revision: None,
                parent_manifest: None,
                change_set: cs,
            }],
        };
        let id = rev.id();
        store.put_revision_full(id, rev.to_canonical_text().as_bytes()).unwrap();
        txn.commit().unwrap();
        id
    }

    fn commit_child(
        store: &SqliteStore,
        parent: Hash,
        parent_manifest: Hash,
        path: &str,
        new_content: &[u8],
        old_content: &[u8],
    ) -> Hash {
        let old_hash = Hash::of(old_content);
        let new_hash = Hash::of(new_content);
        let txn = store.transaction().unwrap();
        store.put_file_version(old_hash, new_content).unwrap();
        let parent_m = Manifest::from_canonical_bytes(&store.get_manifest(parent_manifest).unwrap()).unwrap();
        let cs = ChangeSet::builder()
            .patch(Path::new(path).unwrap(), old_hash, new_hash)
            .build();
        let new_manifest = cs.apply_to_manifest(&parent_m).unwrap();
        store
            .put_manifest_version(parent_manifest, &new_manifest.to_canonical_bytes())
            .unwrap();
        let rev = Revision {
            new_manifest: new_manifest.canonical_hash(),
            edges: vec![crate::revision::Edge {
                parent_revision: Some(parent),
                parent_manifest: Some(parent_manifest),
                change_set: cs,
            }],
        };
        let id = rev.id();
        store.put_revision_full(id, rev.to_canonical_text().as_bytes()).unwrap();
        txn.commit().unwrap();
        id
    }

    #[test]
    fn root_is_ancestor_of_its_descendants() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = commit_root(&store, "p", b"1\n");
        let root_rev = load_revision(&store, root).unwrap();
        let child = commit_child(&store, root, root_rev.new_manifest, "p", b"2\n", b"1\n");
        assert!(is_ancestor(&store, root, child).unwrap());
        assert!(!is_ancestor(&store, child, root).unwrap());
    }

    #[test]
    fn common_ancestor_of_two_children_is_their_shared_root() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = commit_root(&store, "p", b"1\n");
        let root_rev = load_revision(&store, root).unwrap();
        let left = commit_child(&store, root, root_rev.new_manifest, "p", b"1L\n", b"1\n");
        let right = commit_child(&store, root, root_rev.new_manifest, "p", b"1R\n", b"1\n");
        assert_eq!(common_ancestor(&store, left, right).unwrap(), Some(root));
    }

    #[test]
    fn common_ancestor_is_none_for_disjoint_histories() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = commit_root(&store, "p", b"a\n");
        let b = commit_root(&store, "q", b"b\n");
        assert_eq!(common_ancestor(&store, a, b).unwrap(), None);
    }
}
