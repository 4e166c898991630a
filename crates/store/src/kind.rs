/// The three object kinds that share the full/delta reverse-delta schema
///. Certs and keys live in their own single-relation tables and
/// are handled by dedicated methods instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, std::hash::Hash)]
pub enum Kind {
    /// A file blob.
    File,
    /// A serialised manifest.
    Manifest,
    /// A serialised revision.
    Revision,
}

impl Kind {
    pub(crate) fn full_table(self) -> &'static str {
        match self {
            Self::File => "file_full",
            Self::Manifest => "manifest_full",
            Self::Revision => "revision_full",
        }
    }

    pub(crate) fn delta_table(self) -> &'static str {
        match self {
            Self::File => "file_delta",
            Self::Manifest => "manifest_delta",
            Self::Revision => "revision_delta",
        }
    }
}
