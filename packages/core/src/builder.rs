//! The river builder.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::channel::{Channel, ChannelValue};
use crate::error::{Error, Result};
use crate::layout;
use crate::lock::SharedLock;
use crate::path::Path;
use crate::river::River;
use crate::rivulet::Rivulet;
use crate::tree::{ChannelInfo, NodeId, Tree};

/// Builder for rivers.
///
/// Declare channels, rivulets and locks, then call [`build`](Builder::build)
/// once to allocate the river and link every handle issued so far:
///
/// ```rust
/// use river_core::Builder;
///
/// let builder = Builder::new();
/// let time = builder.channel("system.time", 0u64).unwrap();
/// let abort = builder.channel("system.abort", false).unwrap();
///
/// let control = builder.sub("control").unwrap();
/// let pressure = control.channel("pressure", 14.7f64).unwrap();
/// let valid = control.channel("pressure.valid", true).unwrap();
/// let valve_open = control.channel("valve_open", false).unwrap();
/// let control_rivulet = builder.rivulet("control").unwrap();
///
/// // Nothing is linked before the build.
/// assert_eq!(pressure.get(), 0.0);
///
/// let river = builder.build().unwrap();
/// assert_eq!(river.len(), 19);
/// assert_eq!(pressure.get(), 14.7);
/// assert_eq!(valid.offset(), Some(0x11));
/// assert_eq!(control_rivulet.size(), 10);
/// # let _ = (time, abort, valve_open);
/// ```
///
/// Builders are cheap handles onto one shared declaration tree. A builder
/// returned by [`sub`](Builder::sub) resolves paths relative to its own root
/// but declares into the same tree, and can't build.
///
/// The builder stays usable after a build. Later builds lay out the same
/// declarations into a new, fully disjoint river; handles issued before a
/// build stay bound to the river that build produced.
pub struct Builder {
    tree: Rc<RefCell<Tree>>,
    root: NodeId,
}

impl Builder {
    /// Creates a root builder with an empty tree.
    pub fn new() -> Self {
        Self {
            tree: Rc::new(RefCell::new(Tree::new())),
            root: NodeId::ROOT,
        }
    }

    /// Whether this is the root builder for its river.
    pub fn is_root(&self) -> bool {
        self.root == NodeId::ROOT
    }

    /// Adds a channel to the river.
    ///
    /// Reading or writing the channel has no effect until the river is built.
    ///
    /// # Errors
    ///
    /// * [`Error::Invalid`] if the path is malformed.
    /// * [`Error::DuplicateChannel`] if a channel of any type is already
    ///   declared at the path. The existing channel is untouched.
    pub fn channel<T: ChannelValue>(&self, path: &str, init: T) -> Result<Channel<T>> {
        let path = Path::parse(path)?;
        let mut tree = self.tree.borrow_mut();
        let id = tree.resolve_or_insert(self.root, &path);

        let node = tree.node_mut(id);
        if node.channel.is_some() {
            return Err(Error::DuplicateChannel { path });
        }
        node.channel = Some(ChannelInfo {
            init: init.as_bytes().into(),
            type_name: std::any::type_name::<T>(),
        });

        tracing::trace!(%path, size = std::mem::size_of::<T>(), "declared channel");
        Ok(Channel::from_link(tree.link(id)))
    }

    /// Gets a handle to a rivulet.
    ///
    /// Reading or writing the rivulet has no effect until the river is built.
    ///
    /// # Errors
    ///
    /// * [`Error::Invalid`] if the path is malformed.
    /// * [`Error::NotFound`] if nothing is declared at the path.
    pub fn rivulet(&self, path: &str) -> Result<Rivulet> {
        let path = Path::parse(path)?;
        let mut tree = self.tree.borrow_mut();
        let id = tree
            .resolve(self.root, &path)
            .ok_or_else(|| Error::NotFound { path: path.clone() })?;

        tracing::trace!(%path, "issued rivulet");
        Ok(Rivulet::from_link(tree.link(id)))
    }

    /// Adds a lock to a rivulet.
    ///
    /// Every channel and rivulet at or below the path, including ones declared
    /// later, acquires the lock around each access. Locks never nest: at most
    /// one lock applies along any path from the root.
    ///
    /// Locks are attached to the next river built and then detached from the
    /// builder along with the links.
    ///
    /// # Errors
    ///
    /// * [`Error::Invalid`] if the path is malformed.
    /// * [`Error::NotFound`] if nothing is declared at the path.
    /// * [`Error::LockConflict`] if the path, one of its ancestors or one of
    ///   its descendants is already locked. Nothing is assigned in that case.
    pub fn lock(&self, path: &str, lock: SharedLock) -> Result<()> {
        let path = Path::parse(path)?;
        let mut tree = self.tree.borrow_mut();
        let id = tree
            .resolve(self.root, &path)
            .ok_or_else(|| Error::NotFound { path: path.clone() })?;

        let covered = tree
            .subtree(id)
            .into_iter()
            .chain(tree.ancestors(id))
            .any(|node| tree.node(node).lock.is_some());
        if covered {
            return Err(Error::LockConflict { path });
        }

        tree.node_mut(id).lock = Some(lock);
        tree.link(id);

        tracing::trace!(%path, "attached lock");
        Ok(())
    }

    /// Gets a builder rooted at the specified path.
    ///
    /// The sub-builder declares into the same river, with paths relative to
    /// `path`, much like `cd` in a file system. Missing nodes along `path`
    /// are created.
    ///
    /// # Errors
    ///
    /// * [`Error::Invalid`] if the path is malformed.
    pub fn sub(&self, path: &str) -> Result<Builder> {
        let path = Path::parse(path)?;
        let root = self.tree.borrow_mut().resolve_or_insert(self.root, &path);
        Ok(Builder {
            tree: self.tree.clone(),
            root,
        })
    }

    /// Whether anything is declared at `path`.
    pub fn contains(&self, path: &str) -> bool {
        Path::parse(path)
            .ok()
            .and_then(|path| self.tree.borrow().resolve(self.root, &path))
            .is_some()
    }

    /// Builds the river.
    ///
    /// Every channel and rivulet handle produced by the builder since the last
    /// build becomes linked and can read and write river memory. The caller
    /// doesn't have to keep the returned river; handles keep it alive.
    ///
    /// # Errors
    ///
    /// * [`Error::NotRoot`] if this is a sub-builder.
    pub fn build(&self) -> Result<Arc<River>> {
        if !self.is_root() {
            return Err(Error::NotRoot);
        }
        let mut tree = self.tree.borrow_mut();
        Ok(layout::build(&mut tree, self.root))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pretty-prints the declared hierarchy below the builder's root, one name
/// per line, indented four spaces per level.
impl fmt::Display for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tree.borrow().dump(f, self.root)
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.borrow();
        f.debug_struct("Builder")
            .field("root", &tree.path_of(self.root).to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ERR_DUPE, ERR_INVALID, ERR_NOTFOUND, ERR_NOTROOT};
    use crate::link::Linkable;
    use crate::lock::CountingLock;

    #[test]
    fn basic_channels() {
        let builder = Builder::new();
        let foo = builder.channel("foo", 32i32).unwrap();
        let bar = builder.channel("bar", 1.522f64).unwrap();
        let baz = builder.channel("baz", true).unwrap();

        builder.build().unwrap();

        assert_eq!(foo.get(), 32);
        assert_eq!(bar.get(), 1.522);
        assert!(baz.get());

        foo.set(-100);
        bar.set(-9.81);
        baz.set(false);

        assert_eq!(foo.get(), -100);
        assert_eq!(bar.get(), -9.81);
        assert!(!baz.get());
    }

    #[test]
    fn channels_can_have_children() {
        let builder = Builder::new();
        let bar = builder.channel("bar", 2i32).unwrap();
        let bar_bar = builder.channel("bar.bar", 3i32).unwrap();
        let baz = builder.channel("baz", 4i32).unwrap();
        let baz_baz = builder.channel("baz.baz", 5i32).unwrap();
        let baz_baz_baz = builder.channel("baz.baz.baz", 6i32).unwrap();

        builder.build().unwrap();

        assert_eq!(bar.get(), 2);
        assert_eq!(bar_bar.get(), 3);
        assert_eq!(baz.get(), 4);
        assert_eq!(baz_baz.get(), 5);
        assert_eq!(baz_baz_baz.get(), 6);
    }

    #[test]
    fn duplicate_channel_rejected() {
        let builder = Builder::new();
        let foo = builder.channel("foo", 0i32).unwrap();

        let err = builder.channel("foo", 0i32).unwrap_err();
        assert_eq!(err.code(), ERR_DUPE);
        let err = builder.channel("foo", 0.0f64).unwrap_err();
        assert!(matches!(err, Error::DuplicateChannel { .. }));

        let dupe_same: Channel<i32> = builder.channel("foo", 0).unwrap_or_default();
        let dupe_diff: Channel<f64> = builder.channel("foo", 0.0).unwrap_or_default();

        builder.build().unwrap();

        foo.set(1);
        dupe_same.set(2);
        dupe_diff.set(3.0);

        assert_eq!(foo.get(), 1);
        assert_eq!(dupe_same.get(), 0);
        assert_eq!(dupe_diff.get(), 0.0);
        assert!(!dupe_same.is_linked());
    }

    #[test]
    fn invalid_paths_leave_tree_untouched() {
        let builder = Builder::new();
        for bad in ["", ".", "a.", ".a", "a..b", "a b", "a-b", "a.b/c"] {
            assert_eq!(builder.channel(bad, 0u8).unwrap_err().code(), ERR_INVALID);
            assert_eq!(builder.rivulet(bad).unwrap_err().code(), ERR_INVALID);
            assert_eq!(
                builder
                    .lock(bad, Arc::new(CountingLock::new()))
                    .unwrap_err()
                    .code(),
                ERR_INVALID
            );
            assert_eq!(builder.sub(bad).unwrap_err().code(), ERR_INVALID);
        }
        assert_eq!(builder.to_string(), "");
        assert!(builder.build().unwrap().is_empty());
    }

    #[test]
    fn rivulet_requires_existing_path() {
        let builder = Builder::new();
        let err = builder.rivulet("missing").unwrap_err();
        assert_eq!(err.code(), ERR_NOTFOUND);
        assert!(!builder.contains("missing"));

        builder.channel("present.leaf", 1u8).unwrap();
        assert!(builder.contains("present"));
        assert!(builder.rivulet("present").is_ok());
        assert!(builder.rivulet("present.leaf").is_ok());
    }

    #[test]
    fn lock_requires_existing_path() {
        let builder = Builder::new();
        let err = builder
            .lock("missing", Arc::new(CountingLock::new()))
            .unwrap_err();
        assert_eq!(err.code(), ERR_NOTFOUND);
    }

    #[test]
    fn locks_never_nest() {
        let builder = Builder::new();
        builder.channel("a.b.c", 0u8).unwrap();
        builder.channel("a.d", 0u8).unwrap();
        builder.channel("e", 0u8).unwrap();

        builder.lock("a.b", Arc::new(CountingLock::new())).unwrap();

        for path in ["a.b", "a.b.c", "a"] {
            let err = builder
                .lock(path, Arc::new(CountingLock::new()))
                .unwrap_err();
            assert_eq!(err.code(), ERR_DUPE, "locking {}", path);
        }
        builder.lock("a.d", Arc::new(CountingLock::new())).unwrap();
        builder.lock("e", Arc::new(CountingLock::new())).unwrap();
    }

    #[test]
    fn failed_lock_assigns_nothing() {
        let builder = Builder::new();
        let inner = builder.channel("outer.inner", 0u8).unwrap();
        let sibling = builder.channel("outer.sibling", 0u8).unwrap();
        let first = Arc::new(CountingLock::new());
        let second = Arc::new(CountingLock::new());

        builder.lock("outer.inner", first.clone()).unwrap();
        assert!(builder.lock("outer", second.clone()).is_err());

        builder.build().unwrap();
        inner.set(1);
        sibling.set(1);

        assert_eq!(first.acquire_count(), 1);
        assert_eq!(second.acquire_count(), 0);
        assert_eq!(second.release_count(), 0);
    }

    #[test]
    fn later_declarations_inherit_lock() {
        let builder = Builder::new();
        builder.channel("locked.early", 0u8).unwrap();
        let lock = Arc::new(CountingLock::new());
        builder.lock("locked", lock.clone()).unwrap();
        let late = builder.channel("locked.late", 0u8).unwrap();

        assert!(builder.lock("locked.late", Arc::new(CountingLock::new())).is_err());

        builder.build().unwrap();
        late.set(3);
        assert_eq!(late.get(), 3);
        assert_eq!(lock.acquire_count(), 2);
    }

    #[test]
    fn sub_builder_cannot_build() {
        let builder = Builder::new();
        let sub = builder.sub("control").unwrap();
        assert!(builder.is_root());
        assert!(!sub.is_root());
        assert_eq!(sub.build().unwrap_err().code(), ERR_NOTROOT);
    }

    #[test]
    fn sub_builders_compose() {
        let builder = Builder::new();
        let a = builder.sub("a").unwrap();
        let ab = a.sub("b").unwrap();
        let deep = ab.channel("c", 7u16).unwrap();

        assert!(builder.contains("a.b.c"));
        assert!(a.contains("b.c"));
        assert!(!a.contains("a"));
        assert!(ab.rivulet("c").is_ok());
        assert_eq!(
            a.channel("b.c", 0u16).unwrap_err(),
            Error::DuplicateChannel {
                path: Path::parse("b.c").unwrap()
            }
        );

        let river = builder.build().unwrap();
        assert_eq!(deep.get(), 7);
        assert_eq!(river.offset_of("a.b.c"), Some(0));
    }

    #[test]
    fn channel_and_rivulet_share_a_path() {
        let builder = Builder::new();
        let pressure = builder.channel("pressure", 1.0f64).unwrap();
        let valid = builder.channel("pressure.valid", true).unwrap();
        let rivulet = builder.rivulet("pressure").unwrap();

        builder.build().unwrap();

        assert!(Arc::ptr_eq(
            &pressure.river().unwrap(),
            &rivulet.river().unwrap()
        ));
        assert_eq!(pressure.offset(), Some(0));
        assert_eq!(valid.offset(), Some(8));
        assert_eq!(rivulet.offset(), Some(8));
        assert_eq!(rivulet.size(), 1);
        assert_eq!(&rivulet.read_bytes()[..], &[1u8][..]);
    }

    #[test]
    fn tree_dump() {
        let builder = Builder::new();
        builder.channel("system.time", 0u64).unwrap();
        builder.channel("system.abort", false).unwrap();
        let control = builder.sub("control").unwrap();
        control.channel("pressure", 14.7f64).unwrap();
        control.channel("pressure.valid", true).unwrap();
        control.channel("valve_open", false).unwrap();

        assert_eq!(
            builder.to_string(),
            "system\n    time\n    abort\ncontrol\n    pressure\n        valid\n    valve_open\n"
        );
        assert_eq!(control.to_string(), "pressure\n    valid\nvalve_open\n");
        assert_eq!(Builder::new().to_string(), "");
        assert!(format!("{:?}", control).contains("control"));
    }

    #[test]
    fn builds_are_disjoint() {
        let builder = Builder::new();
        let first = builder.channel("value", 10u32).unwrap();
        let river1 = builder.build().unwrap();

        let second = builder.rivulet("value").unwrap();
        let river2 = builder.build().unwrap();

        assert!(!Arc::ptr_eq(&river1, &river2));
        first.set(99);
        assert_eq!(first.get(), 99);
        assert_eq!(&river2.snapshot()[..], &10u32.to_ne_bytes()[..]);
        assert_eq!(second.size(), 0);
    }

    #[test]
    fn very_deep_paths_build() {
        const DEPTH: usize = 50_000;
        let deep_path = vec!["a"; DEPTH].join(".");
        let builder = Builder::new();
        let deep = builder.channel(&deep_path, 9u8).unwrap();
        let top = builder.rivulet("a").unwrap();

        let river = builder.build().unwrap();

        assert_eq!(deep.get(), 9);
        assert_eq!(deep.offset(), Some(0));
        assert_eq!(top.offset(), Some(0));
        assert_eq!(top.size(), 1);
        assert_eq!(river.layout()[0].path.len(), DEPTH);
        assert_eq!(river.offset_of(&deep_path), Some(0));
    }
}
