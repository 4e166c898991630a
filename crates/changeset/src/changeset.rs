use std::collections::{BTreeMap, BTreeSet};

use revctl_hash::Hash;

use crate::error::ChangeSetError;
use crate::manifest::Manifest;
use crate::path::Path;

/// The transition from one manifest to another: a path rearrangement
/// followed by a set of per-file content deltas.
///
/// Change-sets are value types: they own their rearrangement sets and delta
/// map outright and carry no reference back to a containing revision or to
/// the manifests they were computed against.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub(crate) added_files: BTreeMap<Path, Hash>,
    pub(crate) deleted_files: BTreeSet<Path>,
    pub(crate) deleted_dirs: BTreeSet<Path>,
    pub(crate) renamed_files: BTreeMap<Path, Path>,
    pub(crate) renamed_dirs: BTreeMap<Path, Path>,
    /// Destination path → (old hash, new hash).
    pub(crate) deltas: BTreeMap<Path, (Hash, Hash)>,
}

impl ChangeSet {
    /// The empty change-set: applying it to any manifest returns that
    /// manifest unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// True if this change-set has no effect on any manifest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_files.is_empty()
            && self.deleted_files.is_empty()
            && self.deleted_dirs.is_empty()
            && self.renamed_files.is_empty()
            && self.renamed_dirs.is_empty()
            && self.deltas.is_empty()
    }

    /// Starts building a change-set by hand (used by the merge engine to
    /// assemble the two edges of a merge revision).
    #[must_use]
    pub fn builder() -> ChangeSetBuilder {
        ChangeSetBuilder::default()
    }

    /// Paths added by this change-set, with the hash of their initial
    /// content.
    pub fn added_files(&self) -> impl Iterator<Item = (&Path, &Hash)> {
        self.added_files.iter()
    }

    /// Paths deleted by this change-set.
    pub fn deleted_files(&self) -> impl Iterator<Item = &Path> {
        self.deleted_files.iter()
    }

    /// Directories deleted wholesale by this change-set.
    pub fn deleted_dirs(&self) -> impl Iterator<Item = &Path> {
        self.deleted_dirs.iter()
    }

    /// File renames, source → destination.
    pub fn renamed_files(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.renamed_files.iter()
    }

    /// Directory renames, source → destination.
    pub fn renamed_dirs(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.renamed_dirs.iter()
    }

    /// Per-file content deltas, keyed by destination path, as
    /// `(old_hash, new_hash)`.
    pub fn deltas(&self) -> impl Iterator<Item = (&Path, &(Hash, Hash))> {
        self.deltas.iter()
    }

    /// Applies the rearrangement (deletes, then renames, then adds), then
    /// the deltas, to `input`, producing the destination manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError`] if a rename or delete names an absent
    /// source path, an add or rename collides with an existing path, or a
    /// delta's declared source hash does not match.
    pub fn apply_to_manifest(&self, input: &Manifest) -> Result<Manifest, ChangeSetError> {
        let mut out = input.clone();

        for dir in &self.deleted_dirs {
            out.remove_subtree(dir);
        }
        for path in &self.deleted_files {
            out.remove(path).ok_or_else(|| ChangeSetError::MissingSource {
                op: "delete",
                path: path.to_string(),
            })?;
        }

        for (src, dst) in &self.renamed_dirs {
            let entries = out.remove_subtree(src);
            if entries.is_empty() {
                return Err(ChangeSetError::MissingSource {
                    op: "rename_dir",
                    path: src.to_string(),
                });
            }
            for (old_path, hash) in entries {
                let new_path = old_path.rebase(src, dst);
                if out.insert(new_path.clone(), hash).is_some() {
                    return Err(ChangeSetError::DuplicateTarget(new_path.to_string()));
                }
            }
        }
        for (src, dst) in &self.renamed_files {
            let hash = out.remove(src).ok_or_else(|| ChangeSetError::MissingSource {
                op: "rename_file",
                path: src.to_string(),
            })?;
            if out.insert(dst.clone(), hash).is_some() {
                return Err(ChangeSetError::DuplicateTarget(dst.to_string()));
            }
        }
        for (path, hash) in &self.added_files {
            if out.insert(path.clone(), *hash).is_some() {
                return Err(ChangeSetError::DuplicateTarget(path.to_string()));
            }
        }

        for (path, (old, new)) in &self.deltas {
            let current = out
                .get(path)
                .ok_or_else(|| ChangeSetError::DeltaOnAbsentPath(path.to_string()))?;
            if current != *old {
                return Err(ChangeSetError::DeltaMismatch {
                    path: path.to_string(),
                    expected: *old,
                    found: current,
                });
            }
            out.insert(path.clone(), *new);
        }

        Ok(out)
    }

    /// Computes a change-set taking `old` to `new`:
    /// symmetric difference, then cross-indexing by hash to classify each
    /// pair as a rename (add+delete sharing a hash) or a delta (same path,
    /// different hash), biasing toward the simplest classification (a true
    /// add plus a true delete) when more than one pairing is possible.
    #[must_use]
    pub fn diff_manifests(old: &Manifest, new: &Manifest) -> Self {
        let mut removed: BTreeMap<Path, Hash> = BTreeMap::new();
        let mut added: BTreeMap<Path, Hash> = BTreeMap::new();
        let mut deltas: BTreeMap<Path, (Hash, Hash)> = BTreeMap::new();

        for (path, old_hash) in old.iter() {
            match new.get(path) {
                Some(new_hash) if new_hash == *old_hash => {}
                Some(new_hash) => {
                    deltas.insert(path.clone(), (*old_hash, new_hash));
                }
                None => {
                    removed.insert(path.clone(), *old_hash);
                }
            }
        }
        for (path, new_hash) in new.iter() {
            if old.get(path).is_none() {
                added.insert(path.clone(), *new_hash);
            }
        }

        // Cross-index by hash: an add and a delete sharing a hash pair up as
        // a rename. Each hash and each path is used in at most one pairing;
        // ties are broken by choosing the lexicographically smallest source
        // path first, biasing determinism toward simple add+delete over a
        // speculative rename when several candidates share a hash.
        let mut by_hash: BTreeMap<Hash, Vec<Path>> = BTreeMap::new();
        for (path, hash) in &removed {
            by_hash.entry(*hash).or_default().push(path.clone());
        }
        for paths in by_hash.values_mut() {
            paths.sort();
        }

        let mut renamed_files = BTreeMap::new();
        let mut consumed_adds = BTreeSet::new();
        let mut consumed_removes = BTreeSet::new();
        for (dst, hash) in &added {
            if consumed_adds.contains(dst) {
                continue;
            }
            if let Some(candidates) = by_hash.get(hash) {
                if let Some(src) = candidates
                    .iter()
                    .find(|p| !consumed_removes.contains(*p))
                {
                    renamed_files.insert(src.clone(), dst.clone());
                    consumed_adds.insert(dst.clone());
                    consumed_removes.insert(src.clone());
                }
            }
        }

        let added_files: BTreeMap<Path, Hash> = added
            .into_iter()
            .filter(|(p, _)| !consumed_adds.contains(p))
            .collect();
        let deleted_files: BTreeSet<Path> = removed
            .into_iter()
            .filter(|(p, _)| !consumed_removes.contains(p))
            .map(|(p, _)| p)
            .collect();

        Self {
            added_files,
            deleted_files,
            deleted_dirs: BTreeSet::new(),
            renamed_files,
            renamed_dirs: BTreeMap::new(),
            deltas,
        }
    }

    /// Composes `self` then `other`: `apply_to_manifest(concatenate(a,b), m)
    /// == apply_to_manifest(b, apply_to_manifest(a, m))` for every `m` on
    /// which both sides are defined.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::InconsistentConcat`] if `other` operates on
    /// a path in a way inconsistent with what `self` already did to it (for
    /// example, renaming a path `self` already deleted).
    pub fn concatenate(&self, other: &Self) -> Result<Self, ChangeSetError> {
        // The path each final slot traces back to in `self`'s own
        // rearrangement, so `other`'s operations can be reinterpreted in
        // terms of `self`'s source paths where a chain needs collapsing.
        let mut added_files = self.added_files.clone();
        let mut deleted_files = self.deleted_files.clone();
        let mut deleted_dirs = self.deleted_dirs.clone();
        let mut renamed_files = self.renamed_files.clone();
        let mut renamed_dirs = self.renamed_dirs.clone();
        let mut deltas = self.deltas.clone();

        // Directory-level rearrangement in `other` does not need to chain
        // through `self`'s directory operations: this implementation does
        // not track directory renames across more than one composition
        // step, matching the simplification noted in DESIGN.md.
        deleted_dirs.extend(other.deleted_dirs.iter().cloned());
        renamed_dirs.extend(other.renamed_dirs.iter().cloned());

        let forward_rename = |path: &Path, map: &BTreeMap<Path, Path>| -> Option<Path> {
            map.iter()
                .find(|(_, dst)| *dst == path)
                .map(|(src, _)| src.clone())
        };

        for (src, dst) in &other.renamed_files {
            if let Some(original_src) = forward_rename(src, &renamed_files) {
                renamed_files.remove(&original_src);
                renamed_files.insert(original_src, dst.clone());
            } else if added_files.contains_key(src) {
                let hash = added_files.remove(src).expect("checked above");
                added_files.insert(dst.clone(), hash);
            } else if deleted_files.contains(src) {
                return Err(ChangeSetError::InconsistentConcat(format!(
                    "rename of {src} in second change-set, but first change-set already deleted it"
                )));
            } else {
                renamed_files.insert(src.clone(), dst.clone());
            }
        }

        for path in &other.deleted_files {
            if let Some(original_src) = forward_rename(path, &renamed_files) {
                renamed_files.remove(&original_src);
                deleted_files.insert(original_src);
            } else if added_files.remove(path).is_some() {
                // add then delete cancels
            } else if deleted_files.contains(path) {
                return Err(ChangeSetError::InconsistentConcat(format!(
                    "{path} deleted twice across composed change-sets"
                )));
            } else {
                deleted_files.insert(path.clone());
            }
            deltas.remove(path);
        }

        for (path, hash) in &other.added_files {
            let occupied = added_files.contains_key(path)
                || renamed_files.values().any(|d| d == path)
                || renamed_dirs.values().any(|d| path.is_under(d));
            if occupied {
                return Err(ChangeSetError::InconsistentConcat(format!(
                    "add of {path} in second change-set collides with first change-set's output"
                )));
            }
            added_files.insert(path.clone(), *hash);
        }

        for (path, (old, new)) in &other.deltas {
            if let Some(existing_hash) = added_files.get(path) {
                if *existing_hash != *old {
                    return Err(ChangeSetError::InconsistentConcat(format!(
                        "delta at {path} does not chain onto the add produced by the first change-set"
                    )));
                }
                added_files.insert(path.clone(), *new);
            } else if let Some((first_old, first_new)) = deltas.get(path).copied() {
                if first_new != *old {
                    return Err(ChangeSetError::InconsistentConcat(format!(
                        "delta at {path} does not chain onto the first change-set's delta"
                    )));
                }
                deltas.insert(path.clone(), (first_old, *new));
            } else {
                deltas.insert(path.clone(), (*old, *new));
            }
        }

        Ok(Self {
            added_files,
            deleted_files,
            deleted_dirs,
            renamed_files,
            renamed_dirs,
            deltas,
        })
    }

    /// Inverts `self`, given the manifest `self` was computed *against* (its
    /// pre-state). A deleted path's hash only survives in that pre-state
    /// manifest, since the state `self` produces no longer carries it, so
    /// this is the only manifest from which `self` can actually be inverted.
    ///
    /// `apply_to_manifest(invert(cs, m), apply_to_manifest(cs, m)) == m`.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError`] if `self` could not actually have been
    /// computed against `pre_manifest` (a deleted path's hash does not match,
    /// for instance).
    pub fn invert(&self, pre_manifest: &Manifest) -> Result<Self, ChangeSetError> {
        let mut added_files = BTreeMap::new();
        let mut deleted_files = BTreeSet::new();
        let renamed_files: BTreeMap<Path, Path> = self
            .renamed_files
            .iter()
            .map(|(src, dst)| (dst.clone(), src.clone()))
            .collect();
        let renamed_dirs: BTreeMap<Path, Path> = self
            .renamed_dirs
            .iter()
            .map(|(src, dst)| (dst.clone(), src.clone()))
            .collect();
        let deltas: BTreeMap<Path, (Hash, Hash)> = self
            .deltas
            .iter()
            .map(|(path, (old, new))| (path.clone(), (*new, *old)))
            .collect();

        for (path, hash) in &self.added_files {
            deleted_files.insert(path.clone());
            let _ = hash;
        }
        for path in &self.deleted_files {
            let hash = pre_manifest
                .get(path)
                .ok_or_else(|| ChangeSetError::MissingSource {
                    op: "invert(delete)",
                    path: path.to_string(),
                })?;
            added_files.insert(path.clone(), hash);
        }

        let mut deleted_dirs = BTreeSet::new();
        let mut renamed_dir_adds: Vec<(Path, Hash)> = Vec::new();
        for dir in &self.deleted_dirs {
            let mut scratch = pre_manifest.clone();
            let entries = scratch.remove_subtree(dir);
            if entries.is_empty() {
                return Err(ChangeSetError::MissingSource {
                    op: "invert(delete_dir)",
                    path: dir.to_string(),
                });
            }
            renamed_dir_adds.extend(entries);
        }
        for (path, hash) in renamed_dir_adds {
            added_files.insert(path, hash);
        }
        for dir in self.renamed_dirs.values() {
            deleted_dirs.insert(dir.clone());
        }

        Ok(Self {
            added_files,
            deleted_files,
            deleted_dirs,
            renamed_files,
            renamed_dirs,
            deltas,
        })
    }

    /// Set-theoretic merge of two change-sets sharing a source manifest.
    /// Conflicts are returned as a list rather than resolved; callers
    /// (the merge engine) decide how to surface them.
    #[must_use]
    pub fn merge(a: &Self, b: &Self) -> (Self, Vec<MergeConflict>) {
        let mut conflicts = Vec::new();
        let mut added_files = a.added_files.clone();
        for (path, hash) in &b.added_files {
            match added_files.get(path) {
                Some(existing) if existing != hash => {
                    conflicts.push(MergeConflict::AddAdd {
                        path: path.clone(),
                        left: *existing,
                        right: *hash,
                    });
                }
                Some(_) => {}
                None => {
                    added_files.insert(path.clone(), *hash);
                }
            }
        }

        let mut deleted_files = a.deleted_files.clone();
        for path in &b.deleted_files {
            deleted_files.insert(path.clone());
        }
        if let Some(path) = a
            .deleted_files
            .iter()
            .find(|p| b.deltas.contains_key(p))
        {
            conflicts.push(MergeConflict::DeleteDelta { path: path.clone() });
        }
        if let Some(path) = b
            .deleted_files
            .iter()
            .find(|p| a.deltas.contains_key(p))
        {
            conflicts.push(MergeConflict::DeleteDelta { path: path.clone() });
        }

        let mut renamed_files = a.renamed_files.clone();
        for (src, dst) in &b.renamed_files {
            match renamed_files.get(src) {
                Some(existing) if existing != dst => {
                    conflicts.push(MergeConflict::RenameRename {
                        src: src.clone(),
                        left: existing.clone(),
                        right: dst.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    renamed_files.insert(src.clone(), dst.clone());
                }
            }
        }

        let mut deltas = a.deltas.clone();
        for (path, (old, new)) in &b.deltas {
            match deltas.get(path) {
                Some((existing_old, existing_new)) if existing_new != new => {
                    conflicts.push(MergeConflict::ContentConflict {
                        path: path.clone(),
                        ancestor: *existing_old,
                        left: *existing_new,
                        right: *new,
                    });
                }
                Some(_) => {}
                None => {
                    deltas.insert(path.clone(), (*old, *new));
                }
            }
        }

        let merged = Self {
            added_files,
            deleted_files,
            deleted_dirs: a.deleted_dirs.union(&b.deleted_dirs).cloned().collect(),
            renamed_files,
            renamed_dirs: {
                let mut m = a.renamed_dirs.clone();
                m.extend(b.renamed_dirs.clone());
                m
            },
            deltas,
        };
        (merged, conflicts)
    }
}

/// A structured path-level conflict surfaced by [`ChangeSet::merge`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeConflict {
    /// The same path was added by both sides with different content.
    AddAdd {
        /// The conflicting path.
        path: Path,
        /// The hash added on the left.
        left: Hash,
        /// The hash added on the right.
        right: Hash,
    },
    /// One side deleted a path the other side edited.
    DeleteDelta {
        /// The conflicting path.
        path: Path,
    },
    /// The same source path was renamed to two different destinations.
    RenameRename {
        /// The shared source path.
        src: Path,
        /// The destination chosen on the left.
        left: Path,
        /// The destination chosen on the right.
        right: Path,
    },
    /// The same path was edited by both sides to different content.
    ContentConflict {
        /// The conflicting path.
        path: Path,
        /// The shared ancestor hash.
        ancestor: Hash,
        /// The hash produced on the left.
        left: Hash,
        /// The hash produced on the right.
        right: Hash,
    },
}

/// Incrementally assembles a [`ChangeSet`] by hand.
#[derive(Default)]
pub struct ChangeSetBuilder {
    inner: ChangeSet,
}

impl ChangeSetBuilder {
    /// Records a file add.
    #[must_use]
    pub fn add_file(mut self, path: Path, hash: Hash) -> Self {
        self.inner.added_files.insert(path, hash);
        self
    }

    /// Records a file delete.
    #[must_use]
    pub fn delete_file(mut self, path: Path) -> Self {
        self.inner.deleted_files.insert(path);
        self
    }

    /// Records a directory delete.
    #[must_use]
    pub fn delete_dir(mut self, path: Path) -> Self {
        self.inner.deleted_dirs.insert(path);
        self
    }

    /// Records a file rename.
    #[must_use]
    pub fn rename_file(mut self, src: Path, dst: Path) -> Self {
        self.inner.renamed_files.insert(src, dst);
        self
    }

    /// Records a directory rename.
    #[must_use]
    pub fn rename_dir(mut self, src: Path, dst: Path) -> Self {
        self.inner.renamed_dirs.insert(src, dst);
        self
    }

    /// Records a content delta at an existing path.
    #[must_use]
    pub fn patch(mut self, path: Path, old: Hash, new: Hash) -> Self {
        self.inner.deltas.insert(path, (old, new));
        self
    }

    /// Finishes the builder, returning the assembled change-set.
    #[must_use]
    pub fn build(self) -> ChangeSet {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::new(s).unwrap()
    }

    #[test]
    fn apply_add_delete_rename_and_patch() {
        let mut m = Manifest::empty();
        m.insert(p("a"), Hash::of(b"a"));
        m.insert(p("b"), Hash::of(b"b"));

        let cs = ChangeSet::builder()
            .delete_file(p("a"))
            .rename_file(p("b"), p("c"))
            .add_file(p("d"), Hash::of(b"d"))
            .patch(p("c"), Hash::of(b"b"), Hash::of(b"b2"))
            .build();

        let out = cs.apply_to_manifest(&m).unwrap();
        assert_eq!(out.get(&p("a")), None);
        assert_eq!(out.get(&p("c")), Some(Hash::of(b"b2")));
        assert_eq!(out.get(&p("d")), Some(Hash::of(b"d")));
    }

    #[test]
    fn diff_manifests_classifies_rename() {
        let mut old = Manifest::empty();
        old.insert(p("a"), Hash::of(b"x"));
        let mut new = Manifest::empty();
        new.insert(p("b"), Hash::of(b"x"));

        let cs = ChangeSet::diff_manifests(&old, &new);
        assert_eq!(
            cs.renamed_files().collect::<Vec<_>>(),
            vec![(&p("a"), &p("b"))]
        );
        assert!(cs.deleted_files().next().is_none());
        assert!(cs.added_files().next().is_none());
    }

    #[test]
    fn diff_manifests_classifies_delta() {
        let mut old = Manifest::empty();
        old.insert(p("a"), Hash::of(b"x"));
        let mut new = Manifest::empty();
        new.insert(p("a"), Hash::of(b"y"));

        let cs = ChangeSet::diff_manifests(&old, &new);
        let deltas: Vec<_> = cs.deltas().collect();
        assert_eq!(deltas, vec![(&p("a"), &(Hash::of(b"x"), Hash::of(b"y")))]);
    }

    #[test]
    fn diff_then_apply_round_trips() {
        let mut old = Manifest::empty();
        old.insert(p("a"), Hash::of(b"x"));
        old.insert(p("keep"), Hash::of(b"k"));
        let mut new = Manifest::empty();
        new.insert(p("b"), Hash::of(b"x"));
        new.insert(p("keep"), Hash::of(b"k"));
        new.insert(p("fresh"), Hash::of(b"f"));

        let cs = ChangeSet::diff_manifests(&old, &new);
        assert_eq!(cs.apply_to_manifest(&old).unwrap(), new);
    }

    #[test]
    fn invert_round_trips() {
        let mut m = Manifest::empty();
        m.insert(p("a"), Hash::of(b"x"));
        m.insert(p("b"), Hash::of(b"y"));

        let cs = ChangeSet::builder()
            .delete_file(p("a"))
            .patch(p("b"), Hash::of(b"y"), Hash::of(b"y2"))
            .add_file(p("c"), Hash::of(b"c"))
            .build();

        let applied = cs.apply_to_manifest(&m).unwrap();
        let inv = cs.invert(&m).unwrap();
        let back = inv.apply_to_manifest(&applied).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn concatenate_composes_sequential_application() {
        let mut m = Manifest::empty();
        m.insert(p("a"), Hash::of(b"1"));

        let cs_a = ChangeSet::builder()
            .patch(p("a"), Hash::of(b"1"), Hash::of(b"2"))
            .build();
        let cs_b = ChangeSet::builder()
            .patch(p("a"), Hash::of(b"2"), Hash::of(b"3"))
            .build();

        let composed = cs_a.concatenate(&cs_b).unwrap();
        let direct = cs_b.apply_to_manifest(&cs_a.apply_to_manifest(&m).unwrap()).unwrap();
        assert_eq!(composed.apply_to_manifest(&m).unwrap(), direct);
    }

    #[test]
    fn concatenate_cancels_add_then_delete() {
        let cs_a = ChangeSet::builder().add_file(p("x"), Hash::of(b"x")).build();
        let cs_b = ChangeSet::builder().delete_file(p("x")).build();
        let composed = cs_a.concatenate(&cs_b).unwrap();
        assert!(composed.is_empty());
    }

    #[test]
    fn concatenate_rejects_rename_of_already_deleted_path() {
        let cs_a = ChangeSet::builder().delete_file(p("x")).build();
        let cs_b = ChangeSet::builder().rename_file(p("x"), p("y")).build();
        assert!(matches!(
            cs_a.concatenate(&cs_b),
            Err(ChangeSetError::InconsistentConcat(_))
        ));
    }

    #[test]
    fn merge_reports_add_add_conflict_on_differing_content() {
        let a = ChangeSet::builder().add_file(p("x"), Hash::of(b"1")).build();
        let b = ChangeSet::builder().add_file(p("x"), Hash::of(b"2")).build();
        let (_, conflicts) = ChangeSet::merge(&a, &b);
        assert_eq!(conflicts.len(), 1);
        assert!(matches!(conflicts[0], MergeConflict::AddAdd { .. }));
    }

    #[test]
    fn merge_is_clean_when_both_sides_agree() {
        let a = ChangeSet::builder().add_file(p("x"), Hash::of(b"1")).build();
        let b = ChangeSet::builder().add_file(p("x"), Hash::of(b"1")).build();
        let (merged, conflicts) = ChangeSet::merge(&a, &b);
        assert!(conflicts.is_empty());
        assert_eq!(merged.added_files().count(), 1);
    }
}
