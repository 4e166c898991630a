//! The revision DAG node type and its canonical serialisation.
//!
//! A [`Revision`] binds a new manifest to zero or more parents through
//! [`Edge`]s. This type lives in `revctl-merge` rather than the facade
//! crate because the ancestor walk and merge-revision assembly below are
//! the operations that actually need to construct and parse it; the
//! `revctl` facade re-exports it unchanged as part of its public surface.

use std::fmt::Write as _;

use revctl_changeset::{parse_canonical_text, ChangeSet};
use revctl_hash::Hash;

/// One parent edge of a [`Revision`]: the parent's revision and manifest
/// hashes (`None` for the null root ancestor) plus the change-set that
/// carries the parent's manifest to this revision's [`Revision::new_manifest`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    /// The parent revision, or `None` for the distinguished null revision
    /// that is the root ancestor of every history.
    pub parent_revision: Option<Hash>,
    /// The parent's manifest, or `None` alongside a `None` parent revision.
    pub parent_manifest: Option<Hash>,
    /// The change-set taking `parent_manifest` to the owning revision's
    /// `new_manifest`.
    pub change_set: ChangeSet,
}

/// An immutable node in the history DAG: a manifest plus one or more parent
/// edges. Two or more edges make this a merge revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revision {
    /// The manifest this revision introduces.
    pub new_manifest: Hash,
    /// One or more parent edges. Exactly one edge with both hashes `None`
    /// represents the initial revision of a history.
    pub edges: Vec<Edge>,
}

fn hash_field(h: Option<Hash>) -> String {
    h.map(|h| h.to_string()).unwrap_or_default()
}

fn parse_hash_field(text: &str) -> Result<Option<Hash>, String> {
    if text.is_empty() {
        Ok(None)
    } else {
        text.parse().map(Some).map_err(|e| format!("{e}"))
    }
}

impl Revision {
    /// True if this revision has two or more parent edges.
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.edges.len() >= 2
    }

    /// Renders the canonical serialisation:
    ///
    /// ```text
    /// new_manifest [hash]
    /// old_revision [hash]
    /// old_manifest [hash]
    ///   <change-set stanzas>
    /// [repeated for each edge]
    /// ```
    ///
    /// Edges are emitted sorted by parent-revision hash text (the null
    /// parent, rendered as an empty field, sorts first), so two `Revision`
    /// values built with edges in a different order but otherwise equal
    /// still hash identically.
    #[must_use]
    pub fn to_canonical_text(&self) -> String {
        let mut edges: Vec<&Edge> = self.edges.iter().collect();
        edges.sort_by_key(|e| hash_field(e.parent_revision));

        let mut out = String::new();
        let _ = writeln!(out, "new_manifest {}", self.new_manifest);
        for edge in edges {
            let _ = writeln!(out, "old_revision {}", hash_field(edge.parent_revision));
            let _ = writeln!(out, "old_manifest {}", hash_field(edge.parent_manifest));
            for line in edge.change_set.to_canonical_text().lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// The revision's identity: the hash of [`Self::to_canonical_text`].
    #[must_use]
    pub fn id(&self) -> Hash {
        Hash::of(self.to_canonical_text().as_bytes())
    }

    /// Parses a revision from its canonical text form.
    ///
    /// # Errors
    ///
    /// Returns a human-readable error string on any malformed line.
    pub fn from_canonical_text(text: &str) -> Result<Self, String> {
        let mut lines = text.lines().peekable();
        let header = lines.next().ok_or("empty revision text")?;
        let new_manifest = header
            .strip_prefix("new_manifest ")
            .ok_or_else(|| format!("expected new_manifest header, got {header:?}"))?
            .parse()
            .map_err(|e| format!("{e}"))?;

        let mut edges = Vec::new();
        while let Some(line) = lines.next() {
            let parent_revision = parse_hash_field(
                line.strip_prefix("old_revision ")
                    .ok_or_else(|| format!("expected old_revision line, got {line:?}"))?,
            )?;
            let manifest_line = lines
                .next()
                .ok_or("revision text truncated after old_revision line")?;
            let parent_manifest = parse_hash_field(
                manifest_line
                    .strip_prefix("old_manifest ")
                    .ok_or_else(|| format!("expected old_manifest line, got {manifest_line:?}"))?,
            )?;

            let mut stanza_text = String::new();
            while let Some(next) = lines.peek() {
                if next.starts_with("old_revision ") {
                    break;
                }
                let stripped = next.strip_prefix("  ").unwrap_or(next);
                stanza_text.push_str(stripped);
                stanza_text.push('\n');
                lines.next();
            }
            let change_set = parse_canonical_text(&stanza_text)?;
            edges.push(Edge {
                parent_revision,
                parent_manifest,
                change_set,
            });
        }
        if edges.is_empty() {
            return Err("revision has no edges".to_string());
        }
        Ok(Self { new_manifest, edges })
    }
}
