//! Links between handles and river memory.

use std::sync::{Arc, OnceLock};

use crate::lock::{LockGuard, SharedLock};
use crate::river::River;

/// Where a linked handle's bytes live.
pub(crate) struct Binding {
    pub(crate) river: Arc<River>,
    /// Set iff the linked node is a channel.
    pub(crate) channel_offset: Option<usize>,
    pub(crate) rivulet_offset: usize,
    pub(crate) rivulet_size: usize,
    pub(crate) lock: Option<SharedLock>,
}

impl Binding {
    /// Reads `dest.len()` bytes at `offset` under the binding's lock.
    pub(crate) fn read(&self, offset: usize, dest: &mut [u8]) {
        let _guard = LockGuard::acquire(self.lock.as_deref());
        self.river.load(offset, dest);
    }

    /// Writes `src` at `offset` under the binding's lock.
    pub(crate) fn write(&self, offset: usize, src: &[u8]) {
        let _guard = LockGuard::acquire(self.lock.as_deref());
        self.river.store(offset, src);
    }
}

/// Whether a link has been bound to a built river yet.
pub(crate) enum LinkState<'a> {
    Unlinked,
    Linked(&'a Binding),
}

/// The record shared by a tree node and every handle issued for its path.
///
/// A link starts out unlinked and is bound exactly once, by the build that
/// consumes the node it belongs to.
#[derive(Default)]
pub(crate) struct Link {
    binding: OnceLock<Binding>,
}

impl Link {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> LinkState<'_> {
        match self.binding.get() {
            Some(binding) => LinkState::Linked(binding),
            None => LinkState::Unlinked,
        }
    }

    /// Binds the link. Returns false if it was already bound.
    pub(crate) fn bind(&self, binding: Binding) -> bool {
        self.binding.set(binding).is_ok()
    }

    pub(crate) fn is_linked(&self) -> bool {
        self.binding.get().is_some()
    }

    pub(crate) fn river(&self) -> Option<Arc<River>> {
        self.binding.get().map(|binding| binding.river.clone())
    }
}

/// A handle that is linked to river memory.
pub trait Linkable {
    /// Whether the handle is linked.
    ///
    /// A handle is linked once the river it was declared against is built.
    /// Only then does it read or write river memory.
    fn is_linked(&self) -> bool;

    /// The river this handle is linked to.
    fn river(&self) -> Option<Arc<River>>;
}
