//! Engine-wide tunables not hardcoded elsewhere: size limits and the
//! bulk-build / rule-cache population policy.
use serde::{Deserialize, Serialize};

/// The configuration of a [`crate::engine::LexiconEngine`]. Covers ground the
/// data model itself is silent on: how big a key or record is allowed to
/// get, and how eagerly the engine should populate its caches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Config {
    /// Maximum accepted length, in bytes, of a dictionary key (the surface
    /// word before packing). The default is `50`.
    pub max_key_size: usize,
    /// Maximum accepted length, in bytes, of a stored pronunciation value
    /// before it is diff-encoded. The default is `200`.
    pub max_record_size: usize,
    /// Maximum accepted length, in bytes, of one holder/stream-filter input
    /// line. The default is `256`.
    pub max_line_size: usize,
    /// Whether `open` in `Create` mode against a path that does not yet
    /// exist builds the two dictionaries into an in-memory scratch store
    /// first, dumping them sorted into the real tables on close. The
    /// default is `true`.
    pub bulk_build: bool,
    /// Whether a rule program compiles every one of its rules on first use
    /// rather than lazily, one pattern at a time, as each index is first
    /// matched against. The default is `false`: lazy compilation avoids
    /// paying for rules a given corpus never exercises.
    pub eager_rule_compile: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_key_size: 50,
            max_record_size: 200,
            max_line_size: 256,
            bulk_build: true,
            eager_rule_compile: false,
        }
    }
}
