//! Tag partitions.
//!
//! A set of tags maps to one sub-directory of the cache root, so flushing every
//! entry stored under exactly that set is a directory wipe.

use std::fmt::Write;

/// Separator between escaped tag names in a partition segment
pub const TAG_SEPARATOR: char = '+';

/// Segments longer than this are replaced by a digest to stay under file-name limits
pub const MAX_SEGMENT_LEN: usize = 200;

/// The tag names selected for one cache view.
///
/// Names are sorted and deduplicated, so `["people", "animals"]` and
/// `["animals", "people", "people"]` land in the same partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TagSet {
    names: Vec<String>,
}

impl TagSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Sub-directory for this set, `None` when no tags were given
    pub fn segment(&self) -> Option<String> {
        resolve_tags(self)
    }
}

/// Compute the partition sub-directory for a tag set.
///
/// Each name is escaped so that only `[A-Za-z0-9_-]` survive verbatim (everything
/// else, including `.` and `/`, becomes `%XX`), then the names are joined with
/// [`TAG_SEPARATOR`]. An empty name is written as a lone `%`, which no escape
/// produces. The escaping keeps distinct sets on distinct segments and keeps
/// path traversal out; no non-empty set resolves to the root.
pub fn resolve_tags(tags: &TagSet) -> Option<String> {
    if tags.is_empty() {
        return None;
    }

    let mut segment = String::new();
    for (i, name) in tags.names().iter().enumerate() {
        if i > 0 {
            segment.push(TAG_SEPARATOR);
        }
        escape_into(&mut segment, name);
    }

    if segment.len() > MAX_SEGMENT_LEN {
        segment = format!("t-{}", blake3::hash(segment.as_bytes()).to_hex());
    }

    Some(segment)
}

fn escape_into(out: &mut String, name: &str) {
    if name.is_empty() {
        out.push('%');
        return;
    }

    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{:02X}", byte);
        }
    }
}
