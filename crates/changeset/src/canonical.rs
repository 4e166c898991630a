//! Canonical textual form of a [`ChangeSet`]: stanzas in a fixed
//! order — `delete_file`, `delete_dir`, `rename_file`, `rename_dir`,
//! `add_file`, `patch` — each field quoted, used both for human inspection
//! and as input to revision hashing.

use crate::changeset::ChangeSet;
use crate::path::Path;

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

impl ChangeSet {
    /// Renders the canonical stanza form.
    #[must_use]
    pub fn to_canonical_text(&self) -> String {
        let mut out = String::new();
        for path in &self.deleted_files {
            out.push_str(&format!("delete_file {}\n", quote(path.as_str())));
        }
        for path in &self.deleted_dirs {
            out.push_str(&format!("delete_dir {}\n", quote(path.as_str())));
        }
        for (src, dst) in &self.renamed_files {
            out.push_str(&format!(
                "rename_file {} {}\n",
                quote(src.as_str()),
                quote(dst.as_str())
            ));
        }
        for (src, dst) in &self.renamed_dirs {
            out.push_str(&format!(
                "rename_dir {} {}\n",
                quote(src.as_str()),
                quote(dst.as_str())
            ));
        }
        for (path, hash) in &self.added_files {
            out.push_str(&format!(
                "add_file {} {}\n",
                quote(path.as_str()),
                quote(&hash.to_string())
            ));
        }
        for (path, (old, new)) in &self.deltas {
            out.push_str(&format!(
                "patch {} {} {}\n",
                quote(path.as_str()),
                quote(&old.to_string()),
                quote(&new.to_string())
            ));
        }
        out
    }
}

/// Splits one quoted token off the front of `rest`, returning the unescaped
/// token text and what remains after it and any following whitespace.
fn take_token(rest: &str) -> Option<(String, &str)> {
    let rest = rest.trim_start();
    let mut chars = rest.char_indices();
    let (_, first) = chars.next()?;
    if first != '"' {
        return None;
    }
    let mut token = String::new();
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            token.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return Some((token, &rest[i + 1..])),
            _ => token.push(c),
        }
    }
    None
}

/// Parses a change-set from its canonical stanza form.
///
/// # Errors
///
/// Returns a human-readable error string on any malformed stanza, unknown
/// keyword, or invalid embedded path/hash.
pub fn parse_canonical_text(text: &str) -> Result<ChangeSet, String> {
    let mut builder = ChangeSet::builder();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (keyword, rest) = line
            .split_once(' ')
            .ok_or_else(|| format!("malformed change-set stanza: {line:?}"))?;
        match keyword {
            "delete_file" => {
                let (path, _) = take_token(rest).ok_or_else(|| bad(line))?;
                builder = builder.delete_file(Path::new(path).map_err(|e| e.to_string())?);
            }
            "delete_dir" => {
                let (path, _) = take_token(rest).ok_or_else(|| bad(line))?;
                builder = builder.delete_dir(Path::new(path).map_err(|e| e.to_string())?);
            }
            "rename_file" | "rename_dir" => {
                let (src, rest) = take_token(rest).ok_or_else(|| bad(line))?;
                let (dst, _) = take_token(rest).ok_or_else(|| bad(line))?;
                let src = Path::new(src).map_err(|e| e.to_string())?;
                let dst = Path::new(dst).map_err(|e| e.to_string())?;
                builder = if keyword == "rename_file" {
                    builder.rename_file(src, dst)
                } else {
                    builder.rename_dir(src, dst)
                };
            }
            "add_file" => {
                let (path, rest) = take_token(rest).ok_or_else(|| bad(line))?;
                let (hash, _) = take_token(rest).ok_or_else(|| bad(line))?;
                let path = Path::new(path).map_err(|e| e.to_string())?;
                let hash = hash.parse().map_err(|e| format!("{e}"))?;
                builder = builder.add_file(path, hash);
            }
            "patch" => {
                let (path, rest) = take_token(rest).ok_or_else(|| bad(line))?;
                let (old, rest) = take_token(rest).ok_or_else(|| bad(line))?;
                let (new, _) = take_token(rest).ok_or_else(|| bad(line))?;
                let path = Path::new(path).map_err(|e| e.to_string())?;
                let old = old.parse().map_err(|e| format!("{e}"))?;
                let new = new.parse().map_err(|e| format!("{e}"))?;
                builder = builder.patch(path, old, new);
            }
            other => return Err(format!("unknown change-set stanza keyword: {other:?}")),
        }
    }
    Ok(builder.build())
}

fn bad(line: &str) -> String {
    format!("malformed change-set stanza: {line:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use revctl_hash::Hash;

    #[test]
    fn round_trips_through_canonical_text() {
        let cs = ChangeSet::builder()
            .delete_file(Path::new("old").unwrap())
            .rename_file(Path::new("a").unwrap(), Path::new("b").unwrap())
            .add_file(Path::new("new").unwrap(), Hash::of(b"n"))
            .patch(Path::new("b").unwrap(), Hash::of(b"x"), Hash::of(b"y"))
            .build();

        let text = cs.to_canonical_text();
        let parsed = parse_canonical_text(&text).unwrap();
        assert_eq!(cs, parsed);
    }

    #[test]
    fn stanzas_appear_in_fixed_order() {
        let cs = ChangeSet::builder()
            .add_file(Path::new("new").unwrap(), Hash::of(b"n"))
            .delete_file(Path::new("old").unwrap())
            .build();
        let text = cs.to_canonical_text();
        let delete_pos = text.find("delete_file").unwrap();
        let add_pos = text.find("add_file").unwrap();
        assert!(delete_pos < add_pos);
    }
}
