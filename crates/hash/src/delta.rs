use crate::error::DeltaError;
use crate::lcs::lcs_indices;

/// Splits `data` into lines, each slice including its terminating `\n` except
/// possibly the last, which is bare if `data` does not end in a newline.
/// Concatenating the returned slices reproduces `data` exactly.
fn split_lines(data: &[u8]) -> Vec<&[u8]> {
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

/// A single directive in a [`Delta`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaOp {
    /// `a P N` — after flushing the base through line `pos`, insert `lines`
    /// literally without consuming any base input.
    Add {
        /// Number of base lines already flushed when this directive fires.
        pos: usize,
        /// Literal lines to insert, each including its own trailing `\n`
        /// except possibly the final line of the delta.
        lines: Vec<Vec<u8>>,
    },
    /// `d P N` — after flushing the base through line `P - 1`, skip the next
    /// `count` base lines without emitting them.
    Delete {
        /// 1-based base line through which the flush proceeds before the
        /// skip begins (the directive's `P`).
        pos: usize,
        /// Number of base lines to skip.
        count: usize,
    },
}

/// A binary patch transforming a `base` byte sequence into a `derived` one.
///
/// `apply(diff(base, target), base) == target` for any compliant encoder;
/// this codec additionally guarantees the specific directive sequence
/// produced by [`diff`] is the LCS-minimal one, but [`apply`] accepts any
/// well-formed sequence of [`DeltaOp`]s, not just ones this crate produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    ops: Vec<DeltaOp>,
}

impl Delta {
    /// An empty delta: `apply(Delta::identity(), base) == base`.
    #[must_use]
    pub fn identity() -> Self {
        Self { ops: Vec::new() }
    }

    /// The directives that make up this delta, in application order.
    #[must_use]
    pub fn ops(&self) -> &[DeltaOp] {
        &self.ops
    }

    /// Encodes the delta into its canonical textual directive form.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for op in &self.ops {
            match op {
                DeltaOp::Add { pos, lines } => {
                    out.extend_from_slice(format!("a {pos} {}\n", lines.len()).as_bytes());
                    for line in lines {
                        out.extend_from_slice(line);
                        if !line.ends_with(b"\n") {
                            out.push(b'\n');
                        }
                    }
                }
                DeltaOp::Delete { pos, count } => {
                    out.extend_from_slice(format!("d {pos} {count}\n").as_bytes());
                }
            }
        }
        out
    }

    /// Decodes a delta from its canonical textual directive form.
    pub fn decode(bytes: &[u8]) -> Result<Self, DeltaError> {
        let mut ops = Vec::new();
        let mut i = 0;
        let lines = split_lines(bytes);
        while i < lines.len() {
            let header = strip_newline(lines[i]);
            i += 1;
            let header =
                std::str::from_utf8(header).map_err(|_| header_err(lines.get(i - 1)))?;
            let mut fields = header.split_whitespace();
            let tag = fields.next().ok_or_else(|| header_err(None))?;
            let pos: usize = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| DeltaError::MalformedDirective(header.to_string()))?;
            match tag {
                "a" => {
                    let n: usize = fields
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| DeltaError::MalformedDirective(header.to_string()))?;
                    let mut literal = Vec::with_capacity(n);
                    for _ in 0..n {
                        let line = lines.get(i).ok_or(DeltaError::TruncatedLiteral {
                            declared: n,
                            found: literal.len(),
                        })?;
                        literal.push((*line).to_vec());
                        i += 1;
                    }
                    ops.push(DeltaOp::Add { pos, lines: literal });
                }
                "d" => {
                    let count: usize = fields
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| DeltaError::MalformedDirective(header.to_string()))?;
                    ops.push(DeltaOp::Delete { pos, count });
                }
                _ => return Err(DeltaError::MalformedDirective(header.to_string())),
            }
        }
        Ok(Self { ops })
    }
}

fn strip_newline(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

fn header_err(_line: Option<&&[u8]>) -> DeltaError {
    DeltaError::MalformedDirective("non-UTF8 directive header".to_string())
}

/// Computes a [`Delta`] such that `apply(&delta, base) == target`.
///
/// Uses the LCS of `base` and `target`'s lines to find the minimal set of
/// insert/skip hunks; the implementation is shared with the three-way merge
/// engine one layer up (see `revctl-merge`).
#[must_use]
pub fn diff(base: &[u8], target: &[u8]) -> Delta {
    let base_lines = split_lines(base);
    let target_lines = split_lines(target);
    let matches = lcs_indices(&base_lines, &target_lines);

    let mut ops = Vec::new();
    let (mut bi, mut ti) = (0usize, 0usize);
    for (mb, mt) in matches.into_iter().chain(std::iter::once((
        base_lines.len(),
        target_lines.len(),
    ))) {
        if mb > bi {
            ops.push(DeltaOp::Delete {
                pos: bi + 1,
                count: mb - bi,
            });
        }
        if mt > ti {
            ops.push(DeltaOp::Add {
                pos: mb,
                lines: target_lines[ti..mt].iter().map(|l| (*l).to_vec()).collect(),
            });
        }
        bi = mb + 1;
        ti = mt + 1;
    }
    Delta { ops }
}

/// Applies `delta` to `base` in a single pass, equivalent to
/// [`PiecewiseApplicator::begin`]/`apply`/`finish` with one link.
pub fn apply(delta: &Delta, base: &[u8]) -> Result<Vec<u8>, DeltaError> {
    let mut applicator = PiecewiseApplicator::begin(base);
    applicator.apply(delta)?;
    applicator.finish()
}

/// Byte ranges of each line in `data`, in the same convention as
/// [`split_lines`] but as indices rather than borrowed slices, so they can
/// outlive a borrow of the buffer they were computed from.
fn split_line_ranges(data: &[u8]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, &b) in data.iter().enumerate() {
        if b == b'\n' {
            out.push((start, i + 1));
            start = i + 1;
        }
    }
    if start < data.len() {
        out.push((start, data.len()));
    }
    out
}

/// A streaming delta applicator for long reverse-delta chains: linear time,
/// O(1) peak memory beyond the current intermediate. Buffers exactly one
/// source image and one destination image at a time.
///
/// Owns its base buffer outright (rather than borrowing it) so that
/// [`Self::next`] can hand the previous link's output to the next link
/// without reaching for an unbounded lifetime.
pub struct PiecewiseApplicator {
    base: Vec<u8>,
    base_line_ranges: Option<Vec<(usize, usize)>>,
    out: Vec<u8>,
    flushed: usize,
}

impl PiecewiseApplicator {
    /// Begins a piecewise application over `base`.
    #[must_use]
    pub fn begin(base: &[u8]) -> Self {
        Self {
            base: base.to_vec(),
            base_line_ranges: None,
            out: Vec::new(),
            flushed: 0,
        }
    }

    fn line_ranges(&mut self) -> &[(usize, usize)] {
        self.base_line_ranges
            .get_or_insert_with(|| split_line_ranges(&self.base))
    }

    /// Applies one delta link, appending its result to the accumulated
    /// output. Errors leave the applicator in a usable but incomplete state.
    pub fn apply(&mut self, delta: &Delta) -> Result<(), DeltaError> {
        let base_len = self.line_ranges().len();
        for op in delta.ops() {
            match op {
                DeltaOp::Add { pos, lines } => {
                    if *pos < self.flushed {
                        return Err(DeltaError::PositionOutOfRange {
                            position: *pos,
                            base_len,
                        });
                    }
                    self.flush_through(*pos, base_len)?;
                    for line in lines {
                        self.out.extend_from_slice(line);
                    }
                }
                DeltaOp::Delete { pos, count } => {
                    if *pos == 0 {
                        return Err(DeltaError::MalformedDirective(format!(
                            "delete directive position must be >= 1, got {pos}"
                        )));
                    }
                    self.flush_through(pos - 1, base_len)?;
                    let end = self.flushed + count;
                    if end > base_len {
                        return Err(DeltaError::PositionOutOfRange {
                            position: end,
                            base_len,
                        });
                    }
                    self.flushed = end;
                }
            }
        }
        Ok(())
    }

    fn flush_through(&mut self, target: usize, base_len: usize) -> Result<(), DeltaError> {
        if target > base_len {
            return Err(DeltaError::PositionOutOfRange {
                position: target,
                base_len,
            });
        }
        if target > self.flushed {
            let ranges = self.line_ranges()[self.flushed..target].to_vec();
            for (start, end) in ranges {
                self.out.extend_from_slice(&self.base[start..end]);
            }
            self.flushed = target;
        }
        Ok(())
    }

    /// Advances to the next link in the chain: the output accumulated so far
    /// becomes the base for the next `apply` call.
    #[must_use]
    pub fn next(self) -> PiecewiseApplicator {
        PiecewiseApplicator {
            base: self.out,
            base_line_ranges: None,
            out: Vec::new(),
            flushed: 0,
        }
    }

    /// Finishes the current link, flushing any remaining base lines and
    /// returning the fully materialised result.
    pub fn finish(mut self) -> Result<Vec<u8>, DeltaError> {
        let base_len = self.line_ranges().len();
        self.flush_through(base_len, base_len)?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_then_apply_round_trips() {
        let old = b"A\nB\nC\n";
        let new = b"A\nX\nC\n";
        let delta = diff(new, old); // base = new file, target = old file (reverse-delta convention)
        assert_eq!(apply(&delta, new).unwrap(), old);
    }

    #[test]
    fn diff_handles_pure_insertion() {
        let base = b"A\nB\n";
        let target = b"A\nZ\nB\n";
        let delta = diff(base, target);
        assert_eq!(apply(&delta, base).unwrap(), target);
    }

    #[test]
    fn diff_handles_pure_deletion() {
        let base = b"A\nB\nC\n";
        let target = b"A\nC\n";
        let delta = diff(base, target);
        assert_eq!(apply(&delta, base).unwrap(), target);
    }

    #[test]
    fn diff_handles_trailing_line_without_newline() {
        let base = b"A\nB";
        let target = b"A\nB\nC";
        let delta = diff(base, target);
        assert_eq!(apply(&delta, base).unwrap(), target);
    }

    #[test]
    fn identity_delta_is_a_no_op() {
        let base = b"A\nB\nC\n";
        assert_eq!(apply(&Delta::identity(), base).unwrap(), base);
    }

    #[test]
    fn encode_decode_round_trips() {
        let delta = diff(b"A\nB\nC\n", b"A\nX\nC\n");
        let decoded = Delta::decode(&delta.encode()).unwrap();
        assert_eq!(delta, decoded);
    }

    #[test]
    fn out_of_range_delete_is_corrupt_delta() {
        let delta = Delta {
            ops: vec![DeltaOp::Delete { pos: 1, count: 100 }],
        };
        assert!(matches!(
            apply(&delta, b"A\n"),
            Err(DeltaError::PositionOutOfRange { .. })
        ));
    }

    #[test]
    fn long_chain_reconstructs_piecewise() {
        // Build a chain of 1200 single-character edits, applying them one
        // link at a time the way the object store's BFS reconstruction does.
        let mut versions = vec![b"line\n".to_vec()];
        for i in 0..1200 {
            let prev = versions.last().unwrap();
            let next = format!("line{i}\n").into_bytes();
            versions.push(next);
            let _ = prev;
        }
        let mut deltas = Vec::new();
        for w in versions.windows(2) {
            deltas.push(diff(&w[0], &w[1]));
        }
        let mut applicator = PiecewiseApplicator::begin(&versions[0]);
        let mut result = Vec::new();
        for (link, delta) in deltas.iter().enumerate() {
            applicator.apply(delta).unwrap();
            if link + 1 == deltas.len() {
                result = applicator.finish().unwrap();
                break;
            }
            applicator = applicator.next();
        }
        assert_eq!(result, *versions.last().unwrap());
    }
}
