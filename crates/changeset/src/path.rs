use std::fmt;
use std::str::FromStr;

use crate::error::PathError;

/// The bookkeeping directory name reserved by the embedder's workspace layer
///; no tracked path may begin with this component.
pub const RESERVED_BOOKKEEPING_DIR: &str = "_MTN";

/// A validated, slash-separated relative path.
///
/// Wraps a `Box<str>` rather than a raw `PathBuf` so the representation is
/// always the canonical forward-slash form regardless of host platform, and
/// so construction is the single place validation happens.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Box<str>);

impl Path {
    /// Validates and constructs a `Path` from its slash-separated text form.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if `text` is empty, absolute, contains a `..`
    /// or empty component, contains a NUL byte, or begins with the reserved
    /// bookkeeping directory name.
    pub fn new(text: impl Into<String>) -> Result<Self, PathError> {
        let text = text.into();
        if text.is_empty() {
            return Err(PathError::Empty);
        }
        if text.contains('\0') {
            return Err(PathError::ContainsNul);
        }
        if text.starts_with('/') {
            return Err(PathError::Absolute);
        }
        let mut components = text.split('/');
        let first = components.clone().next().unwrap_or_default();
        if first == RESERVED_BOOKKEEPING_DIR {
            return Err(PathError::InReservedDirectory);
        }
        for component in components.by_ref() {
            if component.is_empty() {
                return Err(PathError::EmptyComponent);
            }
            if component == ".." {
                return Err(PathError::ParentComponent);
            }
        }
        Ok(Self(text.into_boxed_str()))
    }

    /// The path's slash-separated text form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `self` names a path at or underneath `dir`, i.e. `self == dir`
    /// or `self` starts with `dir` followed by a `/`. Used to implement
    /// directory-scoped rearrangement operations over the flat path→hash
    /// manifest representation.
    #[must_use]
    pub fn is_under(&self, dir: &Path) -> bool {
        self.0.as_ref() == dir.0.as_ref()
            || self
                .0
                .strip_prefix(dir.0.as_ref())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Rewrites the `from` prefix of `self` to `to`, used when applying a
    /// directory rename to a path known to lie under `from`.
    #[must_use]
    pub fn rebase(&self, from: &Path, to: &Path) -> Path {
        if self.0.as_ref() == from.0.as_ref() {
            return to.clone();
        }
        let rest = &self.0[from.0.len()..];
        Path(format!("{}{rest}", to.0).into_boxed_str())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({:?})", self.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_relative_paths() {
        assert!(Path::new("src/lib.rs").is_ok());
        assert!(Path::new("README.md").is_ok());
    }

    #[test]
    fn rejects_absolute_paths() {
        assert!(matches!(Path::new("/etc/passwd"), Err(PathError::Absolute)));
    }

    #[test]
    fn rejects_parent_components() {
        assert!(matches!(
            Path::new("a/../b"),
            Err(PathError::ParentComponent)
        ));
    }

    #[test]
    fn rejects_empty_components() {
        assert!(matches!(
            Path::new("a//b"),
            Err(PathError::EmptyComponent)
        ));
    }

    #[test]
    fn rejects_reserved_bookkeeping_directory() {
        assert!(matches!(
            Path::new("_MTN/revision"),
            Err(PathError::InReservedDirectory)
        ));
    }

    #[test]
    fn rejects_nul_bytes() {
        assert!(matches!(
            Path::new("a\0b"),
            Err(PathError::ContainsNul)
        ));
    }

    #[test]
    fn is_under_matches_self_and_descendants_only() {
        let dir = Path::new("src").unwrap();
        assert!(Path::new("src").unwrap().is_under(&dir));
        assert!(Path::new("src/lib.rs").unwrap().is_under(&dir));
        assert!(!Path::new("srcfoo").unwrap().is_under(&dir));
    }

    #[test]
    fn rebase_rewrites_prefix() {
        let from = Path::new("old").unwrap();
        let to = Path::new("new").unwrap();
        let p = Path::new("old/a.rs").unwrap();
        assert_eq!(p.rebase(&from, &to).as_str(), "new/a.rs");
    }
}
