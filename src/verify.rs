//! End-of-run checks: properties and the verdicts they return.

use thiserror::Error;

use crate::error::SimError;
use crate::world::World;

// ── Violation ─────────────────────────────────────────────────────────

/// A property that did not hold at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Violation {
    message: String,
}

impl Violation {
    pub fn new(message: impl Into<String>) -> Self {
        Violation {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Lookup errors inside a check count against the property.
impl From<SimError> for Violation {
    fn from(err: SimError) -> Self {
        Violation::new(err.to_string())
    }
}

/// Outcome of an end-of-run check.
pub type Verdict = Result<(), Violation>;

/// `Ok` when `cond` holds, otherwise a violation with the lazily built
/// message.
pub fn ensure(cond: bool, message: impl FnOnce() -> String) -> Verdict {
    if cond {
        Ok(())
    } else {
        Err(Violation::new(message()))
    }
}

// ── Property ──────────────────────────────────────────────────────────

/// A safety property checked once every run has ended.
pub trait Property {
    /// Name of the property (for failure reports).
    fn name(&self) -> &str;

    /// Check the property against the final world state.
    fn check(&self, world: &World) -> Verdict;
}

/// Convenience wrapper for closure-based properties.
pub struct NamedProperty {
    name: String,
    check_fn: Box<dyn Fn(&World) -> Verdict>,
}

impl NamedProperty {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&World) -> Verdict + 'static,
    {
        NamedProperty {
            name: name.to_string(),
            check_fn: Box::new(f),
        }
    }
}

impl Property for NamedProperty {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, world: &World) -> Verdict {
        (self.check_fn)(world)
    }
}

impl std::fmt::Debug for NamedProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedProperty")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_ensure() {
        assert!(ensure(true, || unreachable!()).is_ok());
        let v = ensure(false, || "node 1 committed nothing".into()).unwrap_err();
        assert_eq!(v.to_string(), "node 1 committed nothing");
    }

    #[test]
    fn test_named_property() {
        let world = World::new(Config::default()).unwrap();
        let prop = NamedProperty::new("three nodes", |w| {
            ensure(w.node_count() == 3, || format!("{} nodes", w.node_count()))
        });
        assert_eq!(prop.name(), "three nodes");
        assert!(prop.check(&world).is_ok());

        let strict = NamedProperty::new("one node", |w| {
            ensure(w.node_count() == 1, || format!("{} nodes", w.node_count()))
        });
        assert_eq!(strict.check(&world).unwrap_err().message(), "3 nodes");
    }
}
