use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// File-name fingerprint of a cache key: blake3, 64 hex chars
pub fn fingerprint(key: &str) -> String {
    blake3::hash(key.as_bytes()).to_hex().to_string()
}

/// Cheap non-cryptographic hash used only to name temp files
pub fn fast_hash(key: &str) -> String {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Lowercase ASCII slug: runs of anything that isn't alphanumeric collapse
/// into a single `-`, leading and trailing dashes are dropped.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
