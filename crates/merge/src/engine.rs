//! The merge engine's public surface: wraps ancestor queries, manifest/
//! content merging and annotation behind one handle over the store.

use revctl_changeset::{ChangeSet, Manifest, Path};
use revctl_hash::Hash;
use revctl_store::SqliteStore;

use crate::ancestor::{self, load_revision};
use crate::annotate::{self, AnnotateResult};
use crate::error::MergeError;
use crate::manifest_merge::{self, ManifestConflict, ManifestMergeResult};
use crate::revision::{Edge, Revision};

/// The result of [`MergeEngine::merge_heads`].
#[derive(Debug)]
pub enum MergeOutcome {
    /// The merge was clean; the assembled (and already stored) merge
    /// revision.
    Merged(Revision),
    /// At least one conflict; no revision was written.
    Conflict(Vec<ManifestConflict>),
}

/// Merge and ancestry operations over a single object store.
///
/// This type intentionally writes only the merge *revision* on success; it
/// attaches no certs. Standard certs (author, date, branch, changelog) are
/// the `revctl` facade's responsibility, since attaching them requires
/// `revctl-cert`, which this crate does not depend on.
pub struct MergeEngine<'a> {
    store: &'a SqliteStore,
}

impl<'a> MergeEngine<'a> {
    /// Wraps `store` for merge and ancestry operations.
    #[must_use]
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// See [`crate::is_ancestor`].
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] if a revision on the walked path is missing or
    /// fails to parse.
    pub fn is_ancestor(&self, a: Hash, b: Hash) -> Result<bool, MergeError> {
        ancestor::is_ancestor(self.store, a, b)
    }

    /// See [`crate::common_ancestor`].
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] if a revision on either ancestry walk is
    /// missing or fails to parse.
    pub fn common_ancestor(&self, a: Hash, b: Hash) -> Result<Option<Hash>, MergeError> {
        ancestor::common_ancestor(self.store, a, b)
    }

    /// See [`crate::annotate`].
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] if a revision or manifest on the walked
    /// ancestry is missing or fails to parse.
    pub fn annotate(&self, revision: Hash, path: &Path) -> Result<AnnotateResult, MergeError> {
        annotate::annotate(self.store, revision, path)
    }

    fn manifest_of(&self, revision: &Revision) -> Result<Manifest, MergeError> {
        let bytes = self.store.get_manifest(revision.new_manifest)?;
        Manifest::from_canonical_bytes(&bytes)
            .map_err(|detail| MergeError::CorruptManifest { id: revision.new_manifest, detail })
    }

    /// Merges `left` and `right`.
    ///
    /// Computes their common ancestor, three-way merges the manifests
    /// (resolving per-file content conflicts with [`crate::three_way_merge`]
    /// along the way), and on a clean result assembles, hashes and writes the
    /// merge revision transactionally. On conflict, nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] if a revision or manifest involved is missing
    /// or fails to parse, or if the store write fails.
    pub fn merge_heads(&self, left: Hash, right: Hash) -> Result<MergeOutcome, MergeError> {
        let left_rev = load_revision(self.store, left)?;
        let right_rev = load_revision(self.store, right)?;

        let ancestor_manifest = match self.common_ancestor(left, right)? {
            Some(id) => self.manifest_of(&load_revision(self.store, id)?)?,
            None => Manifest::empty(),
        };
        let left_manifest = self.manifest_of(&left_rev)?;
        let right_manifest = self.manifest_of(&right_rev)?;

        let merged_manifest =
            match manifest_merge::merge_manifests(self.store, &ancestor_manifest, &left_manifest, &right_manifest)? {
                ManifestMergeResult::Conflict(conflicts) => return Ok(MergeOutcome::Conflict(conflicts)),
                ManifestMergeResult::Clean(manifest) => manifest,
            };

        let cs_left_to_merged = ChangeSet::diff_manifests(&left_manifest, &merged_manifest);
        let cs_right_to_merged = ChangeSet::diff_manifests(&right_manifest, &merged_manifest);

        let revision = Revision {
            new_manifest: merged_manifest.canonical_hash(),
            edges: vec![
                Edge {
                    parent_revision: Some(left),
                    parent_manifest: Some(left_rev.new_manifest),
                    change_set: cs_left_to_merged,
                },
                Edge {
                    parent_revision: Some(right),
                    parent_manifest: Some(right_rev.new_manifest),
                    change_set: cs_right_to_merged,
                },
            ],
        };
        let id = revision.id();

        let txn = self.store.transaction()?;
        self.store
            .put_manifest_full(merged_manifest.canonical_hash(), &merged_manifest.to_canonical_bytes())?;
        self.store.put_revision_full(id, revision.to_canonical_text().as_bytes())?;
        txn.commit()?;

        Ok(MergeOutcome::Merged(revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_root(store: &SqliteStore, path: &str, content: &[u8]) -> Hash {
        let hash = Hash::of(content);
        let txn = store.transaction().unwrap();
        store.put_file_full(hash, content).unwrap();
        let cs = ChangeSet::builder().add_file(Path::new(path).unwrap(), hash).build();
        let manifest = cs.apply_to_manifest(&Manifest::empty()).unwrap();
        store.put_manifest_full(manifest.canonical_hash(), &manifest.to_canonical_bytes()).unwrap();
        let rev = Revision {
            new_manifest: manifest.canonical_hash(),
            edges: vec![Edge { parent_revision: None, parent_manifest: None, change_set: cs }],
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
        old_content: &[u8],
        new_content: &[u8],
    ) -> Hash {
        let old_hash = Hash::of(old_content);
        let new_hash = Hash::of(new_content);
        let txn = store.transaction().unwrap();
        store.put_file_version(old_hash, new_content).unwrap();
        let parent_m = Manifest::from_canonical_bytes(&store.get_manifest(parent_manifest).unwrap()).unwrap();
        let cs = ChangeSet::builder().patch(Path::new(path).unwrap(), old_hash, new_hash).build();
        let new_manifest = cs.apply_to_manifest(&parent_m).unwrap();
        store.put_manifest_version(parent_manifest, &new_manifest.to_canonical_bytes()).unwrap();
        let rev = Revision {
            new_manifest: new_manifest.canonical_hash(),
            edges: vec![Edge {
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
    fn merge_of_disjoint_edits_writes_a_two_edge_revision() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = commit_root(&store, "p", b"1\n2\n3\n");
        let root_manifest = load_revision(&store, root).unwrap().new_manifest;
        let left = commit_child(&store, root, root_manifest, "p", b"1\n2\n3\n", b"1L\n2\n3\n");
        let right = commit_child(&store, root, root_manifest, "p", b"1\n2\n3\n", b"1\n2\n3R\n");

        let engine = MergeEngine::new(&store);
        match engine.merge_heads(left, right).unwrap() {
            MergeOutcome::Merged(rev) => {
                assert!(rev.is_merge());
                let manifest = Manifest::from_canonical_bytes(&store.get_manifest(rev.new_manifest).unwrap()).unwrap();
                let merged_hash = manifest.get(&Path::new("p").unwrap()).unwrap();
                assert_eq!(store.get_file(merged_hash).unwrap(), b"1L\n2\n3R\n");
                assert!(store.revision_exists(rev.id()).unwrap());
            }
            MergeOutcome::Conflict(c) => panic!("expected a clean merge, got {c:?}"),
        }
    }

    #[test]
    fn merge_of_overlapping_edits_reports_conflict_and_writes_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = commit_root(&store, "p", b"1\n2\n3\n");
        let root_manifest = load_revision(&store, root).unwrap().new_manifest;
        let left = commit_child(&store, root, root_manifest, "p", b"1\n2\n3\n", b"1\n2L\n3\n");
        let right = commit_child(&store, root, root_manifest, "p", b"1\n2\n3\n", b"1\n2R\n3\n");

        let engine = MergeEngine::new(&store);
        match engine.merge_heads(left, right).unwrap() {
            MergeOutcome::Conflict(conflicts) => assert_eq!(conflicts.len(), 1),
            MergeOutcome::Merged(_) => panic!("expected a conflict"),
        }
    }
}
