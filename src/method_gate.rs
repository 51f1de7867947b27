//! Per-method authentication policy

use std::collections::HashSet;

/// Methods that may proceed without proof of identity. They only return
/// static capability and discovery metadata, never graph data.
pub const DEFAULT_OPEN_METHODS: &[&str] = &["initialize", "tools/list", "ping"];

/// Immutable method-to-policy mapping, built once at startup from a
/// declarative list. Adding an open method is a data change.
#[derive(Debug, Clone)]
pub struct MethodPolicy {
    open: HashSet<String>,
}

impl MethodPolicy {
    pub fn new<I, S>(open_methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            open: open_methods.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the named method requires proof of identity. The lookup is
    /// total: every method not in the open set requires auth.
    pub fn requires_auth(&self, method: &str) -> bool {
        !self.open.contains(method)
    }
}

impl Default for MethodPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_METHODS.iter().copied())
    }
}
