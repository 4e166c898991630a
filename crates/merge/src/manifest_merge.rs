//! Three-way manifest merge: projects two per-manifest
//! change-sets against their common ancestor, resolves the resulting
//! content conflicts with [`crate::content_merge`], and surfaces whatever
//! cannot be resolved as structured conflicts rather than silently dropping
//! it.

use revctl_changeset::{ChangeSet, ChangeSetError, Manifest, MergeConflict as CsConflict, Path};
use revctl_hash::Hash;
use revctl_store::SqliteStore;

use crate::content_merge::{three_way_merge, ContentMergeOutcome};
use crate::error::MergeError;

/// One conflict surfaced by [`merge_manifests`]: either a path-level
/// rearrangement conflict passed through from `revctl-changeset`'s
/// change-set merge, a genuine line-level content conflict, or a
/// structural violation (duplicate destination, orphaned path) caught by
/// applying the tentative merged change-set back against the ancestor.
#[derive(Debug, PartialEq, Eq)]
pub enum ManifestConflict {
    /// The same path was added by both sides with different content.
    AddAdd {
        /// The conflicting path.
        path: Path,
        /// Hash added on the left.
        left: Hash,
        /// Hash added on the right.
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
        /// Destination chosen on the left.
        left: Path,
        /// Destination chosen on the right.
        right: Path,
    },
    /// Both sides edited the same path's content in overlapping ways; the
    /// LCS three-way merge could not produce a clean result.
    Content {
        /// The conflicting path.
        path: Path,
        /// The marked-up text, with `<<<<<<<`/`=======`/`>>>>>>>` hunks,
        /// for external resolution.
        marked_text: Vec<u8>,
    },
    /// The tentative merged change-set, applied back to the ancestor
    /// manifest, violated a structural invariant (a duplicate destination
    /// path, or a rename/add landing under a directory the other side
    /// deleted).
    Structural(String),
}

/// The result of a three-way manifest merge.
#[derive(Debug)]
pub enum ManifestMergeResult {
    /// No conflicts; the merged manifest.
    Clean(Manifest),
    /// At least one conflict; nothing is safe to commit as a single
    /// manifest.
    Conflict(Vec<ManifestConflict>),
}

/// Rewrites `editor`'s deltas so that any delta keyed at a path `renamer`
/// renamed is re-keyed to the rename's destination — "preserve the rename,
/// apply the edit" when a rename and an edit on the same file reach the
/// merge from different sides.
fn rekey_deltas_through_renames(renamer: &ChangeSet, editor: &ChangeSet) -> ChangeSet {
    let rename_map: std::collections::BTreeMap<&Path, &Path> = renamer.renamed_files().collect();
    let mut builder = ChangeSet::builder();
    for (path, hash) in editor.added_files() {
        builder = builder.add_file(path.clone(), *hash);
    }
    for path in editor.deleted_files() {
        builder = builder.delete_file(path.clone());
    }
    for path in editor.deleted_dirs() {
        builder = builder.delete_dir(path.clone());
    }
    for (src, dst) in editor.renamed_files() {
        builder = builder.rename_file(src.clone(), dst.clone());
    }
    for (src, dst) in editor.renamed_dirs() {
        builder = builder.rename_dir(src.clone(), dst.clone());
    }
    for (path, (old, new)) in editor.deltas() {
        let target = rename_map.get(path).copied().unwrap_or(path);
        builder = builder.patch(target.clone(), *old, *new);
    }
    builder.build()
}

fn cs_conflict_to_manifest_conflict(c: CsConflict) -> Option<ManifestConflict> {
    match c {
        CsConflict::AddAdd { path, left, right } => Some(ManifestConflict::AddAdd { path, left, right }),
        CsConflict::DeleteDelta { path } => Some(ManifestConflict::DeleteDelta { path }),
        CsConflict::RenameRename { src, left, right } => {
            Some(ManifestConflict::RenameRename { src, left, right })
        }
        // Content conflicts are handled separately, by attempting an actual
        // three-way line merge rather than just reporting the hash clash.
        CsConflict::ContentConflict { .. } => None,
    }
}

/// Computes the three-way merge of `left` and `right` against their common
/// ancestor `anc`.
///
/// # Errors
///
/// Returns [`MergeError`] if a file referenced by a content conflict cannot
/// be read back from `store`.
pub fn merge_manifests(
    store: &SqliteStore,
    anc: &Manifest,
    left: &Manifest,
    right: &Manifest,
) -> Result<ManifestMergeResult, MergeError> {
    let cs_left_orig = ChangeSet::diff_manifests(anc, left);
    let cs_right_orig = ChangeSet::diff_manifests(anc, right);
    let cs_left = rekey_deltas_through_renames(&cs_right_orig, &cs_left_orig);
    let cs_right = rekey_deltas_through_renames(&cs_left_orig, &cs_right_orig);
    let (merged_cs, raw_conflicts) = ChangeSet::merge(&cs_left, &cs_right);

    let mut conflicts: Vec<ManifestConflict> =
        raw_conflicts.iter().cloned().filter_map(cs_conflict_to_manifest_conflict).collect();

    // Resolve content conflicts (modified/modified paths) with an actual
    // three-way line merge; paths that merge cleanly get a resolved delta,
    // paths that don't become a reported Content conflict.
    let mut resolved: Vec<(Path, Hash, Hash)> = Vec::new(); // (path, old_hash, merged_hash)
    for c in &raw_conflicts {
        let CsConflict::ContentConflict { path, ancestor, left: left_hash, right: right_hash } = c else {
            continue;
        };
        let anc_bytes = store.get_file(*ancestor)?;
        let left_bytes = store.get_file(*left_hash)?;
        let right_bytes = store.get_file(*right_hash)?;
        match three_way_merge(&anc_bytes, &left_bytes, &right_bytes) {
            ContentMergeOutcome::Clean(bytes) => {
                let merged_hash = Hash::of(&bytes);
                let txn = store.transaction()?;
                store.put_file_full(merged_hash, &bytes)?;
                txn.commit()?;
                resolved.push((path.clone(), *ancestor, merged_hash));
            }
            ContentMergeOutcome::Conflict(marked_text) => {
                conflicts.push(ManifestConflict::Content { path: path.clone(), marked_text });
            }
        }
    }

    // Rebuild the change-set through its public builder, since `ChangeSet`
    // carries no setter for an individual delta: keep every entry from the
    // raw merge except the content-conflicted deltas, which get the
    // resolved (three-way merged) hash instead.
    let resolved_paths: std::collections::BTreeSet<&Path> = resolved.iter().map(|(p, _, _)| p).collect();
    let mut builder = ChangeSet::builder();
    for (path, hash) in merged_cs.added_files() {
        builder = builder.add_file(path.clone(), *hash);
    }
    for path in merged_cs.deleted_files() {
        builder = builder.delete_file(path.clone());
    }
    for path in merged_cs.deleted_dirs() {
        builder = builder.delete_dir(path.clone());
    }
    for (src, dst) in merged_cs.renamed_files() {
        builder = builder.rename_file(src.clone(), dst.clone());
    }
    for (src, dst) in merged_cs.renamed_dirs() {
        builder = builder.rename_dir(src.clone(), dst.clone());
    }
    for (path, (old, new)) in merged_cs.deltas() {
        if resolved_paths.contains(path) {
            continue;
        }
        builder = builder.patch(path.clone(), *old, *new);
    }
    for (path, old, merged_hash) in resolved {
        builder = builder.patch(path, old, merged_hash);
    }
    let final_cs = builder.build();

    if !conflicts.is_empty() {
        return Ok(ManifestMergeResult::Conflict(conflicts));
    }

    match final_cs.apply_to_manifest(anc) {
        Ok(manifest) => Ok(ManifestMergeResult::Clean(manifest)),
        Err(e) => Ok(ManifestMergeResult::Conflict(vec![ManifestConflict::Structural(
            structural_detail(&e),
        )])),
    }
}

fn structural_detail(e: &ChangeSetError) -> String {
    e.to_string()
}
