//! Blame/annotate: attributes each line of a file's content at
//! some revision to the revision that introduced it.
//!
//! Walks the revision DAG backward from the revision being annotated (the
//! "ultimate descendant of interest", or UDOI) carrying a lineage mapping
//! from each visited revision's line positions back to the UDOI's line
//! indices. A line is finalised at the first revision, walking
//! backward, where it is present but not copied unchanged from any parent.

use std::collections::{HashMap, HashSet, VecDeque};

use revctl_changeset::{Manifest, Path};
use revctl_hash::{lcs_indices, Hash};
use revctl_store::SqliteStore;

use crate::ancestor::load_revision;
use crate::content_merge::split_lines;
use crate::error::MergeError;

/// The result of [`annotate`]: one revision id per line of the UDOI content,
/// plus whether every line was finalised by a touched-and-not-copied event
/// or whether some were assigned by the fallback rule in
/// step 4 after the ancestry was exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateResult {
    /// `lines[i]` is the revision credited with introducing UDOI line `i`.
    pub lines: Vec<Hash>,
    /// True if at least one line could not be finalised by the normal rule
    /// and fell back to the earliest revision that touched it.
    pub incomplete: bool,
}

struct LineInterner {
    ids: HashMap<Vec<u8>, u32>,
    next: u32,
}

impl LineInterner {
    fn new() -> Self {
        Self { ids: HashMap::new(), next: 0 }
    }

    fn intern_all(&mut self, lines: &[Vec<u8>]) -> Vec<u32> {
        lines
            .iter()
            .map(|line| {
                if let Some(&id) = self.ids.get(line) {
                    id
                } else {
                    let id = self.next;
                    self.next += 1;
                    self.ids.insert(line.clone(), id);
                    id
                }
            })
            .collect()
    }
}

fn file_lines_at(store: &SqliteStore, revision: Hash, path: &Path) -> Result<Vec<Vec<u8>>, MergeError> {
    let rev = load_revision(store, revision)?;
    let manifest_bytes = store.get_manifest(rev.new_manifest)?;
    let manifest = Manifest::from_canonical_bytes(&manifest_bytes)
        .map_err(|detail| MergeError::CorruptManifest { id: rev.new_manifest, detail })?;
    match manifest.get(path) {
        Some(hash) => {
            let bytes = store.get_file(hash)?;
            Ok(split_lines(&bytes).into_iter().map(<[u8]>::to_vec).collect())
        }
        None => Ok(Vec::new()),
    }
}

/// Annotates `path`'s content at `udoi`.
///
/// # Errors
///
/// Returns [`MergeError`] if a revision or manifest on the walked ancestry
/// is missing or fails to parse.
pub fn annotate(store: &SqliteStore, udoi: Hash, path: &Path) -> Result<AnnotateResult, MergeError> {
    let udoi_lines = file_lines_at(store, udoi, path)?;
    let line_count = udoi_lines.len();

    let mut assigned: Vec<Option<Hash>> = vec![None; line_count];
    let mut first_seen: Vec<Option<Hash>> = vec![None; line_count];
    let mut remaining = line_count;

    let mut visited: HashSet<Hash> = HashSet::new();
    let mut queue: VecDeque<(Hash, Vec<Vec<u8>>, Vec<Option<usize>>)> = VecDeque::new();
    queue.push_back((udoi, udoi_lines, (0..line_count).map(Some).collect()));

    while let Some((rev_id, lines, lineage)) = queue.pop_front() {
        if remaining == 0 {
            break;
        }
        if !visited.insert(rev_id) {
            continue;
        }
        let revision = load_revision(store, rev_id)?;

        // For each edge, the LCS between this revision's lines and that
        // parent's lines tells us which positions are copied unchanged from
        // that parent. A position copied by *any* parent is not credited to
        // this revision.
        let mut copied_by_any = vec![false; lines.len()];
        let mut per_edge: Vec<(Option<Hash>, Vec<Vec<u8>>, HashMap<usize, usize>)> = Vec::new();
        for edge in &revision.edges {
            let parent_lines = match edge.parent_revision {
                Some(parent_id) => file_lines_at(store, parent_id, path)?,
                None => Vec::new(),
            };
            let mut interner = LineInterner::new();
            let child_ids = interner.intern_all(&lines);
            let parent_ids = interner.intern_all(&parent_lines);
            let map: HashMap<usize, usize> = lcs_indices(&child_ids, &parent_ids).into_iter().collect();
            for &child_idx in map.keys() {
                copied_by_any[child_idx] = true;
            }
            per_edge.push((edge.parent_revision, parent_lines, map));
        }

        for (child_idx, udoi_idx) in lineage.iter().enumerate() {
            let Some(udoi_idx) = *udoi_idx else { continue };
            if assigned[udoi_idx].is_some() {
                continue;
            }
            first_seen[udoi_idx].get_or_insert(rev_id);
            if !copied_by_any[child_idx] {
                assigned[udoi_idx] = Some(rev_id);
                remaining -= 1;
            }
        }

        // Carry the lineage backward through every parent that copied a
        // position unchanged; lines the parent does not share with the
        // child get no lineage.
        for (parent_id, parent_lines, map) in per_edge {
            let Some(parent_id) = parent_id else { continue };
            let mut parent_lineage = vec![None; parent_lines.len()];
            for (child_idx, parent_idx) in map {
                parent_lineage[parent_idx] = lineage[child_idx];
            }
            queue.push_back((parent_id, parent_lines, parent_lineage));
        }
    }

    let incomplete = remaining > 0;
    let lines = (0..line_count)
        .map(|i| {
            assigned[i]
                .or(first_seen[i])
                .expect("every UDOI line is touched at least once, at the UDOI revision itself")
        })
        .collect();
    Ok(AnnotateResult { lines, incomplete })
}

#[cfg(test)]
mod tests {
    use super::*;
    use revctl_changeset::ChangeSet;
    use revctl_store::SqliteStore;

    fn commit_root(store: &SqliteStore, path: &str, content: &[u8]) -> Hash {
        let hash = Hash::of(content);
        let txn = store.transaction().unwrap();
        store.put_file_full(hash, content).unwrap();
        let cs = ChangeSet::builder().add_file(Path::new(path).unwrap(), hash).build();
        let manifest = cs.apply_to_manifest(&Manifest::empty()).unwrap();
        store.put_manifest_full(manifest.canonical_hash(), &manifest.to_canonical_bytes()).unwrap();
        let rev = crate::revision::Revision {
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
        let rev = crate::revision::Revision {
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
    fn annotates_small_file_as_in_scenario_s6() {
        let store = SqliteStore::open_in_memory().unwrap();
        let r1 = commit_root(&store, "f", b"A\nB\nC\n");
        let r1_manifest = load_revision(&store, r1).unwrap().new_manifest;
        let r2 = commit_child(&store, r1, r1_manifest, "f", b"A\nB\nC\n", b"A\nB\nC\nD\n");
        let r2_manifest = load_revision(&store, r2).unwrap().new_manifest;
        let r3 = commit_child(&store, r2, r2_manifest, "f", b"A\nB\nC\nD\n", b"A\nE\nC\nD\n");

        let result = annotate(&store, r3, &Path::new("f").unwrap()).unwrap();
        assert!(!result.incomplete);
        assert_eq!(result.lines, vec![r1, r3, r1, r2]);
    }

    #[test]
    fn annotates_root_revision_entirely_to_itself() {
        let store = SqliteStore::open_in_memory().unwrap();
        let r1 = commit_root(&store, "f", b"A\nB\n");
        let result = annotate(&store, r1, &Path::new("f").unwrap()).unwrap();
        assert!(!result.incomplete);
        assert_eq!(result.lines, vec![r1, r1]);
    }
}
