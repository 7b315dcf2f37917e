//! Header transformation rules applied to outbound provider requests.

use ascii::AsciiString;
use serde::Deserialize;

/// A single name or a regex-like prefix/suffix pattern matching several header names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NameOrPattern {
    /// Matches exactly one header name.
    Name(AsciiString),
    /// Matches any header name satisfying the pattern.
    Pattern(NamePattern),
}

/// A simple glob-ish pattern over header names (`x-*`, `*-id`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct NamePattern {
    /// The raw pattern string.
    pub pattern: String,
}

impl NamePattern {
    /// Whether `name` satisfies this pattern.
    pub fn is_match(&self, name: &str) -> bool {
        match (self.pattern.strip_suffix('*'), self.pattern.strip_prefix('*')) {
            (Some(prefix), _) => name.starts_with(prefix),
            (_, Some(suffix)) => name.ends_with(suffix),
            _ => name == self.pattern,
        }
    }
}

/// Forward a header from the inbound client request to the upstream provider.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderForward {
    /// Header name (or pattern) to forward.
    pub name: NameOrPattern,
    /// Name to use on the upstream side, if different.
    #[serde(default)]
    pub rename: Option<AsciiString>,
    /// Whether the header must be present for the request to proceed.
    #[serde(default)]
    pub required: bool,
}

/// Insert a fixed header into the upstream request, overwriting any existing value.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderInsert {
    /// Header name to insert.
    pub name: AsciiString,
    /// Header value to insert.
    pub value: String,
}

/// Remove a header before the request reaches the upstream provider.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderRemove {
    /// Header name (or pattern) to remove.
    pub name: NameOrPattern,
}

/// Rename a header, keeping the original value.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderRenameDuplicate {
    /// Original header name.
    pub name: AsciiString,
    /// New header name; the original is kept alongside it.
    pub rename: AsciiString,
}

/// A single step in the per-provider header transformation pipeline.
///
/// Rules run in declaration order; later rules see the effect of earlier ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HeaderRule {
    /// Forward a client header to the upstream.
    Forward(HeaderForward),
    /// Insert a fixed header.
    Insert(HeaderInsert),
    /// Remove a header.
    Remove(HeaderRemove),
    /// Duplicate a header under a new name.
    RenameDuplicate(HeaderRenameDuplicate),
}
