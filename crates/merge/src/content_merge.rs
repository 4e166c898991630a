//! Line-level three-way file content merge.
//!
//! Uses the classic diff3 alignment: lines of the ancestor that appear, in
//! order, in both the ancestor→left and the ancestor→right LCS are
//! synchronisation anchors. Between two consecutive anchors, the ancestor,
//! left and right each contribute a (possibly empty) "gap"; a gap is
//! resolved without conflict when only one side changed it, or when both
//! sides changed it identically, and raises a conflict otherwise.
//!
//! Lines are interned to `u32` before the LCS runs; the interner is scoped
//! to a single call and never outlives it.

use std::collections::HashMap;

use revctl_hash::lcs_indices;

/// Splits `data` into lines, each slice including its trailing `\n` except
/// possibly the final line.
pub(crate) fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, &b) in data.iter().enumerate() {
        if b == b'\n' {
            out.push(&data[start..=i]);
            start = i + 1;
        }
    }
    if start < data.len() {
        out.push(&data[start..]);
    }
    out
}

/// A scoped interner mapping line bytes to small integers for cheap LCS
/// comparison; its lifetime is exactly one [`three_way_merge`] call.
struct Interner<'a> {
    ids: HashMap<&'a [u8], u32>,
}

impl<'a> Interner<'a> {
    fn new() -> Self {
        Self { ids: HashMap::new() }
    }

    fn intern_all(&mut self, lines: &[&'a [u8]]) -> Vec<u32> {
        let mut next = self.ids.len() as u32;
        lines
            .iter()
            .map(|line| {
                *self.ids.entry(line).or_insert_with(|| {
                    let id = next;
                    next += 1;
                    id
                })
            })
            .collect()
    }
}

/// The outcome of a clean three-way merge, or the conflicting regions of one
/// that was not clean.
#[derive(Debug, PartialEq, Eq)]
pub enum ContentMergeOutcome {
    /// No overlapping edits; the merged byte sequence.
    Clean(Vec<u8>),
    /// At least one hunk was edited differently by both sides. Carries the
    /// fully marked-up text, a conflict indicator with the marked text left
    /// for external resolution.
    Conflict(Vec<u8>),
}

/// Runs the three-way LCS merge on byte content.
#[must_use]
pub fn three_way_merge(ancestor: &[u8], left: &[u8], right: &[u8]) -> ContentMergeOutcome {
    let anc_lines = split_lines(ancestor);
    let left_lines = split_lines(left);
    let right_lines = split_lines(right);

    let mut interner = Interner::new();
    let anc_ids = interner.intern_all(&anc_lines);
    let left_ids = interner.intern_all(&left_lines);
    let right_ids = interner.intern_all(&right_lines);

    let lcs_left = lcs_indices(&anc_ids, &left_ids);
    let lcs_right = lcs_indices(&anc_ids, &right_ids);

    let left_map: HashMap<usize, usize> = lcs_left.iter().copied().collect();
    let right_map: HashMap<usize, usize> = lcs_right.iter().copied().collect();

    // Anchors: ancestor indices matched in *both* LCSs, i.e. lines that
    // reached both left and right unchanged, plus virtual start/end anchors.
    let mut anchors: Vec<(isize, isize, isize)> = vec![(-1, -1, -1)];
    for &anc_idx in left_map.keys() {
        if let Some(&right_idx) = right_map.get(&anc_idx) {
            anchors.push((anc_idx as isize, left_map[&anc_idx] as isize, right_idx as isize));
        }
    }
    anchors.push((
        anc_lines.len() as isize,
        left_lines.len() as isize,
        right_lines.len() as isize,
    ));
    anchors.sort_unstable();

    let mut merged = Vec::new();
    let mut conflicted = false;

    for window in anchors.windows(2) {
        let (a0, l0, r0) = window[0];
        let (a1, l1, r1) = window[1];

        // The anchor line itself (when not a virtual boundary) is common
        // to all three and belongs in the output exactly once.
        if a0 >= 0 {
            merged.extend_from_slice(anc_lines[a0 as usize]);
        }

        let anc_gap = &anc_lines[(a0 + 1) as usize..a1 as usize];
        let left_gap = &left_lines[(l0 + 1) as usize..l1 as usize];
        let right_gap = &right_lines[(r0 + 1) as usize..r1 as usize];

        if left_gap == anc_gap {
            for line in right_gap {
                merged.extend_from_slice(line);
            }
        } else if right_gap == anc_gap {
            for line in left_gap {
                merged.extend_from_slice(line);
            }
        } else if left_gap == right_gap {
            for line in left_gap {
                merged.extend_from_slice(line);
            }
        } else {
            conflicted = true;
            merged.extend_from_slice(b"<<<<<<< left\n");
            for line in left_gap {
                merged.extend_from_slice(line);
            }
            merged.extend_from_slice(b"=======\n");
            for line in right_gap {
                merged.extend_from_slice(line);
            }
            merged.extend_from_slice(b">>>>>>> right\n");
        }
    }

    if conflicted {
        ContentMergeOutcome::Conflict(merged)
    } else {
        ContentMergeOutcome::Clean(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_edits_merge_cleanly() {
        let anc = b"1\n2\n3\n";
        let left = b"1L\n2\n3\n";
        let right = b"1\n2\n3R\n";
        match three_way_merge(anc, left, right) {
            ContentMergeOutcome::Clean(bytes) => assert_eq!(bytes, b"1L\n2\n3R\n"),
            ContentMergeOutcome::Conflict(_) => panic!("expected a clean merge"),
        }
    }

    #[test]
    fn overlapping_edits_conflict() {
        let anc = b"1\n2\n3\n";
        let left = b"1\n2L\n3\n";
        let right = b"1\n2R\n3\n";
        match three_way_merge(anc, left, right) {
            ContentMergeOutcome::Conflict(bytes) => {
                let text = String::from_utf8(bytes).unwrap();
                assert!(text.contains("<<<<<<< left"));
                assert!(text.contains("2L\n"));
                assert!(text.contains("======="));
                assert!(text.contains("2R\n"));
                assert!(text.contains(">>>>>>> right"));
            }
            ContentMergeOutcome::Clean(_) => panic!("expected a conflict"),
        }
    }

    #[test]
    fn identical_edits_on_both_sides_merge_cleanly() {
        let anc = b"1\n2\n3\n";
        let left = b"1\n2X\n3\n";
        let right = b"1\n2X\n3\n";
        match three_way_merge(anc, left, right) {
            ContentMergeOutcome::Clean(bytes) => assert_eq!(bytes, b"1\n2X\n3\n"),
            ContentMergeOutcome::Conflict(_) => panic!("expected a clean merge"),
        }
    }

    #[test]
    fn one_sided_insertion_is_clean() {
        let anc = b"1\n2\n";
        let left = b"1\n1.5\n2\n";
        let right = b"1\n2\n";
        match three_way_merge(anc, left, right) {
            ContentMergeOutcome::Clean(bytes) => assert_eq!(bytes, b"1\n1.5\n2\n"),
            ContentMergeOutcome::Conflict(_) => panic!("expected a clean merge"),
        }
    }

    #[test]
    fn unchanged_file_merges_to_itself() {
        let anc = b"same\n";
        match three_way_merge(anc, anc, anc) {
            ContentMergeOutcome::Clean(bytes) => assert_eq!(bytes, anc),
            ContentMergeOutcome::Conflict(_) => panic!("expected a clean merge"),
        }
    }
}
