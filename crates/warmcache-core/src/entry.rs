use std::time::Duration;

use crate::codec::{self, Value};
use crate::error::CodecError;

/// Expiry sentinel for entries that never expire
pub const NEVER_EXPIRES: u64 = 9_999_999_999;

const EXPIRES_PREFIX: &str = "expires_at = ";
const VALUE_PREFIX: &str = "value = ";

/// One persisted record: absolute expiry plus the value.
///
/// On disk it is two assignments, one per line:
///
/// ```text
/// expires_at = 1760000000;
/// value = {"t":"str","v":"hello"};
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub expires_at: u64,
    pub value: Value,
}

impl CacheEntry {
    pub fn new(expires_at: u64, value: Value) -> Self {
        Self { expires_at, value }
    }

    pub fn never_expiring(value: Value) -> Self {
        Self::new(NEVER_EXPIRES, value)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at < now
    }

    pub fn is_forever(&self) -> bool {
        self.expires_at >= NEVER_EXPIRES
    }

    /// Push the expiry back by `extra`. Entries that never expire stay that way.
    pub fn extended(mut self, extra: Duration) -> Self {
        if !self.is_forever() {
            self.expires_at = self
                .expires_at
                .saturating_add(extra.as_secs())
                .min(NEVER_EXPIRES);
        }
        self
    }

    pub fn to_text(&self) -> Result<String, CodecError> {
        let value = codec::encode(&self.value)?;
        Ok(format!(
            "{}{};\n{}{};\n",
            EXPIRES_PREFIX, self.expires_at, VALUE_PREFIX, value
        ))
    }

    /// Parse entry text. Anything short of both complete assignments is corrupt.
    pub fn from_text(text: &str) -> Result<Self, CodecError> {
        let (first, rest) = text
            .split_once('\n')
            .ok_or_else(|| CodecError::corrupt("missing value line"))?;

        let expires_at = first
            .strip_prefix(EXPIRES_PREFIX)
            .and_then(|s| s.strip_suffix(';'))
            .ok_or_else(|| CodecError::corrupt("malformed expiry line"))?
            .parse::<u64>()
            .map_err(|e| CodecError::corrupt(format!("bad expiry: {}", e)))?;

        let encoded = rest
            .strip_suffix('\n')
            .unwrap_or(rest)
            .strip_prefix(VALUE_PREFIX)
            .and_then(|s| s.strip_suffix(';'))
            .ok_or_else(|| CodecError::corrupt("malformed value line"))?;

        let value = codec::decode(encoded)?;

        Ok(Self { expires_at, value })
    }
}

/// Absolute expiry for a ttl measured from `now`. A zero ttl never expires;
/// partial seconds round up so a short ttl never means "already expired".
pub fn expiry_for(now: u64, ttl: Duration) -> u64 {
    if ttl.is_zero() {
        return NEVER_EXPIRES;
    }

    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    now.saturating_add(secs).min(NEVER_EXPIRES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_entry_text_layout() {
        let entry = CacheEntry::new(1_760_000_000, Value::from("hello"));

        assert_eq!(
            entry.to_text().unwrap(),
            indoc! {r#"
                expires_at = 1760000000;
                value = {"t":"str","v":"hello"};
            "#}
        );
    }

    #[test]
    fn test_entry_text_roundtrip() {
        let value: Value = vec![("a", 1)].into_iter().collect();
        let entry = CacheEntry::never_expiring(value);

        let parsed = CacheEntry::from_text(&entry.to_text().unwrap()).unwrap();
        assert_eq!(parsed, entry);
        assert!(parsed.is_forever());
    }

    #[test]
    fn test_value_containing_newlines_and_semicolons() {
        let entry = CacheEntry::new(5, Value::from("line one;\nline two;"));
        let parsed = CacheEntry::from_text(&entry.to_text().unwrap()).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_truncated_entries_are_corrupt() {
        let text = CacheEntry::new(5, Value::from(vec![1, 2, 3]))
            .to_text()
            .unwrap();

        for cut in [0, 10, text.len() / 2, text.len() - 3] {
            assert!(
                CacheEntry::from_text(&text[..cut]).is_err(),
                "prefix of length {} should not parse",
                cut
            );
        }
    }

    #[test]
    fn test_bad_expiry_is_corrupt() {
        let text = "expires_at = soon;\nvalue = {\"t\":\"null\"};\n";
        assert!(matches!(
            CacheEntry::from_text(text),
            Err(CodecError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_expiry_for() {
        assert_eq!(expiry_for(100, Duration::ZERO), NEVER_EXPIRES);
        assert_eq!(expiry_for(100, Duration::from_secs(120)), 220);
        assert_eq!(expiry_for(100, Duration::from_millis(100)), 101);
        assert_eq!(expiry_for(100, Duration::from_secs(u64::MAX)), NEVER_EXPIRES);
    }

    #[test]
    fn test_is_expired_boundary() {
        let entry = CacheEntry::new(200, Value::Null);
        assert!(!entry.is_expired(199));
        assert!(!entry.is_expired(200));
        assert!(entry.is_expired(201));
    }

    #[test]
    fn test_extended_keeps_forever() {
        let entry = CacheEntry::new(200, Value::Null).extended(Duration::from_secs(10));
        assert_eq!(entry.expires_at, 210);

        let forever = CacheEntry::never_expiring(Value::Null).extended(Duration::from_secs(10));
        assert_eq!(forever.expires_at, NEVER_EXPIRES);
    }
}
