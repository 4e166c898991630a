use std::collections::BTreeMap;

use revctl_hash::Hash;

use crate::path::Path;

/// An immutable snapshot of path→file-hash bindings.
///
/// Backed by a `BTreeMap` so iteration order is always the canonical
/// ascending-path order the serialisation format requires; no separate sort
/// step is needed before serialising.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<Path, Hash>,
}

impl Manifest {
    /// The empty manifest.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a manifest directly from an already-deduplicated path→hash
    /// mapping.
    #[must_use]
    pub fn from_entries(entries: BTreeMap<Path, Hash>) -> Self {
        Self { entries }
    }

    /// The hash bound to `path`, if tracked.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Hash> {
        self.entries.get(path).copied()
    }

    /// True if `path` is tracked by this manifest.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Iterates entries in canonical ascending-path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Hash)> {
        self.entries.iter()
    }

    /// Number of tracked paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if this manifest tracks no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, path: Path, hash: Hash) -> Option<Hash> {
        self.entries.insert(path, hash)
    }

    pub(crate) fn remove(&mut self, path: &Path) -> Option<Hash> {
        self.entries.remove(path)
    }

    /// Removes every entry at or underneath `dir`, returning the removed
    /// entries. Used to implement directory deletes and renames over the
    /// flat path→hash representation.
    pub(crate) fn remove_subtree(&mut self, dir: &Path) -> Vec<(Path, Hash)> {
        let doomed: Vec<Path> = self
            .entries
            .keys()
            .filter(|p| p.is_under(dir))
            .cloned()
            .collect();
        doomed
            .into_iter()
            .map(|p| {
                let hash = self.entries.remove(&p).expect("key came from entries");
                (p, hash)
            })
            .collect()
    }

    /// The canonical serialisation: `<hash>␠␠<path>\n` lines sorted by path
    /// ascending, no trailing blank line, empty manifest serialises to an
    /// empty byte string.
    #[must_use]
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (path, hash) in &self.entries {
            out.extend_from_slice(hash.to_string().as_bytes());
            out.extend_from_slice(b"  ");
            out.extend_from_slice(path.as_str().as_bytes());
            out.push(b'\n');
        }
        out
    }

    /// The hash of [`Self::to_canonical_bytes`].
    #[must_use]
    pub fn canonical_hash(&self) -> Hash {
        Hash::of(&self.to_canonical_bytes())
    }

    /// Parses a manifest from its canonical serialisation.
    ///
    /// # Errors
    ///
    /// Returns a parse error string if a line is malformed, a hash fails to
    /// parse, or a path fails validation.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
        let mut entries = BTreeMap::new();
        for line in text.split_inclusive('\n') {
            let line = line.strip_suffix('\n').unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            let (hash_text, path_text) = line
                .split_once("  ")
                .ok_or_else(|| format!("malformed manifest line: {line:?}"))?;
            let hash: Hash = hash_text.parse().map_err(|e| format!("{e}"))?;
            let path = Path::new(path_text).map_err(|e| format!("{e}"))?;
            entries.insert(path, hash);
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manifest_serialises_to_empty_bytes() {
        let m = Manifest::empty();
        assert_eq!(m.to_canonical_bytes(), Vec::<u8>::new());
        assert_eq!(m.canonical_hash(), Hash::of_empty());
    }

    #[test]
    fn serialises_sorted_by_path() {
        let mut m = Manifest::empty();
        m.insert(Path::new("b").unwrap(), Hash::of(b"b"));
        m.insert(Path::new("a").unwrap(), Hash::of(b"a"));
        let text = String::from_utf8(m.to_canonical_bytes()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("  a"));
        assert!(lines[1].ends_with("  b"));
    }

    #[test]
    fn round_trips_through_canonical_bytes() {
        let mut m = Manifest::empty();
        m.insert(Path::new("src/lib.rs").unwrap(), Hash::of(b"x"));
        m.insert(Path::new("Cargo.toml").unwrap(), Hash::of(b"y"));
        let bytes = m.to_canonical_bytes();
        let parsed = Manifest::from_canonical_bytes(&bytes).unwrap();
        assert_eq!(m, parsed);
    }

    #[test]
    fn remove_subtree_collects_descendants_only() {
        let mut m = Manifest::empty();
        m.insert(Path::new("src/a.rs").unwrap(), Hash::of(b"a"));
        m.insert(Path::new("src/b.rs").unwrap(), Hash::of(b"b"));
        m.insert(Path::new("srcfoo.rs").unwrap(), Hash::of(b"c"));
        let dir = Path::new("src").unwrap();
        let removed = m.remove_subtree(&dir);
        assert_eq!(removed.len(), 2);
        assert_eq!(m.len(), 1);
    }
}
