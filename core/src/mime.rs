//! MIME type parsing and wildcard matching for Accept / Content-Type checks.

use std::fmt;

/// A parsed `type/subtype` pair, lower-cased, parameters stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeType {
    pub kind: String,
    pub subtype: String,
}

impl MimeType {
    /// Parse a single media type such as `application/json; charset=utf-8`.
    ///
    /// Returns `None` when there is no `type/subtype` pair before the
    /// parameters.
    pub fn parse(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() || subtype.contains('/') {
            return None;
        }
        Some(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
        })
    }

    /// Parse a comma separated Accept header. Quality values play no part in
    /// matching and malformed entries are skipped.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',').filter_map(Self::parse).collect()
    }

    /// Wildcard-aware match: `*` in either position on either side matches
    /// anything in that position.
    pub fn matches(&self, other: &MimeType) -> bool {
        fn part(a: &str, b: &str) -> bool {
            a == "*" || b == "*" || a == b
        }
        part(&self.kind, &other.kind) && part(&self.subtype, &other.subtype)
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)
    }
}
