//! # Core Data Model
//!
//! Pure data types shared across the registry, store, directory, and service
//! layers. Nothing in here owns a channel or a task.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The opaque, printable key a shortened URL is addressed by.
///
/// A `ShortCode` is assigned exactly once by the
/// [`CodeAllocator`](crate::allocator::CodeAllocator) and is immutable
/// afterwards. It doubles as the actor key: every operation on a code is
/// serialized through the single live instance for that code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortCode(String);

impl ShortCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShortCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The durable record for one shortened URL.
///
/// Invariant: `full_url` was a well-formed absolute URI at the time it was
/// recorded. A record is written all-or-nothing; the store never exposes a
/// partially updated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub short_code: ShortCode,
    pub full_url: String,
}

/// Identifies one registry process ("node") in the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Monotonically increasing counter disambiguating successive owners of the
/// same key. A forwarded call carries the generation the sender resolved; the
/// owner rejects it with `StaleOwner` if ownership has moved on since.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Lifecycle of an in-memory actor instance.
///
/// Activation is an explicit, observable transition rather than a hidden side
/// effect of message delivery: `Inactive → Activating → Active`, with
/// `Deactivating` entered only when the idle window elapses on an empty
/// mailbox. Destruction frees the in-memory instance; it never deletes the
/// durable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Inactive,
    Activating,
    Active,
    Deactivating,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Inactive => "inactive",
            Lifecycle::Activating => "activating",
            Lifecycle::Active => "active",
            Lifecycle::Deactivating => "deactivating",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_monotonic() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().next(), Generation(2));
    }

    #[test]
    fn short_code_display_is_opaque() {
        let code = ShortCode::new("Ab3xY9");
        assert_eq!(code.to_string(), "Ab3xY9");
        assert_eq!(code.as_str(), "Ab3xY9");
    }
}
