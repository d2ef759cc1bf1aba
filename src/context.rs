//! Dispatch context: which node sent the event being executed, and which
//! node is executing it.
//!
//! The engine owns a single [`ContextCell`] per [`World`](crate::World).
//! Every dispatch installs a fresh [`Context`] through a [`ContextGuard`],
//! which restores the previous value when dropped, including during
//! unwinding. Handlers only ever read it.

use std::cell::Cell;
use std::rc::Rc;

use crate::node::NodeId;

// ── Context ───────────────────────────────────────────────────────────

/// The `(source, current)` node pair of the event presently executing.
///
/// `None` plays the role of "no node": the default context outside any
/// dispatch is `(None, None)`, and `Init` runs with `(None, node)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Context {
    /// Node the event originates from.
    pub source: Option<NodeId>,
    /// Node processing the event.
    pub current: Option<NodeId>,
}

impl Context {
    /// Build a context from explicit endpoints.
    pub const fn new(source: Option<NodeId>, current: Option<NodeId>) -> Self {
        Context { source, current }
    }

    /// The context a delivery to `dst` will run in when sent from here:
    /// the current node becomes the source.
    pub const fn destination(self, dst: NodeId) -> Self {
        Context {
            source: self.current,
            current: Some(dst),
        }
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn side(f: &mut std::fmt::Formatter<'_>, node: Option<NodeId>) -> std::fmt::Result {
            match node {
                Some(n) => write!(f, "{n}"),
                None => write!(f, "-"),
            }
        }
        side(f, self.source)?;
        write!(f, "=>")?;
        side(f, self.current)
    }
}

// ── ContextCell ───────────────────────────────────────────────────────

/// Shared, single-threaded cell holding the current [`Context`].
///
/// Cloning the cell shares the slot, so guards can hold a handle without
/// borrowing the world that owns it.
#[derive(Debug, Clone, Default)]
pub struct ContextCell(Rc<Cell<Context>>);

impl ContextCell {
    /// Read the current context.
    #[inline]
    pub fn get(&self) -> Context {
        self.0.get()
    }

    /// Overwrite the current context without restoring it later.
    #[inline]
    pub fn set(&self, ctx: Context) {
        self.0.set(ctx);
    }

    /// Install `ctx` until the returned guard is dropped.
    #[must_use = "the context is restored as soon as the guard is dropped"]
    pub fn enter(&self, ctx: Context) -> ContextGuard {
        let saved = self.0.replace(ctx);
        ContextGuard {
            cell: self.clone(),
            saved,
        }
    }
}

/// Restores the previously installed context on drop.
#[derive(Debug)]
pub struct ContextGuard {
    cell: ContextCell,
    saved: Context,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.cell.set(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: usize) -> Option<NodeId> {
        Some(NodeId::new(i))
    }

    #[test]
    fn test_default_is_empty() {
        let cell = ContextCell::default();
        assert_eq!(cell.get(), Context::new(None, None));
        assert_eq!(cell.get().to_string(), "-=>-");
    }

    #[test]
    fn test_destination_shifts_current_to_source() {
        let ctx = Context::new(n(2), n(0));
        assert_eq!(ctx.destination(NodeId::new(1)), Context::new(n(0), n(1)));
        assert_eq!(ctx.destination(NodeId::new(1)).to_string(), "0=>1");
    }

    #[test]
    fn test_guard_restores_nested() {
        let cell = ContextCell::default();
        {
            let _outer = cell.enter(Context::new(None, n(0)));
            assert_eq!(cell.get().current, n(0));
            {
                let _inner = cell.enter(Context::new(n(0), n(2)));
                assert_eq!(cell.get(), Context::new(n(0), n(2)));
            }
            assert_eq!(cell.get(), Context::new(None, n(0)));
        }
        assert_eq!(cell.get(), Context::default());
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let cell = ContextCell::default();
        let inner = cell.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = inner.enter(Context::new(n(1), n(2)));
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert_eq!(cell.get(), Context::default());
    }
}
