//! River backing memory.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use bytes::Bytes;

use crate::path::Path;

/// Where one channel landed in a built river.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    /// Channel path relative to the root builder.
    pub path: Path,
    /// Byte offset of the channel in the river.
    pub offset: usize,
    /// Size of the channel value in bytes.
    pub size: usize,
    /// Name of the declared Rust type.
    pub type_name: &'static str,
}

/// River backing memory.
///
/// A river is produced by [`Builder::build`](crate::Builder::build) and is
/// shared by every handle linked to it, so it lives as long as the longest
/// living handle. Callers don't need to keep the returned `Arc` around.
///
/// The bytes are stored as relaxed atomics. Accesses from different threads
/// are therefore never undefined behavior, but they are only *consistent*
/// when the accessed region is guarded by a [`Lock`](crate::Lock).
pub struct River {
    storage: Box<[AtomicU8]>,
    layout: Vec<ChannelLayout>,
}

impl River {
    pub(crate) fn new(image: Vec<u8>, layout: Vec<ChannelLayout>) -> Self {
        Self {
            storage: image.into_iter().map(AtomicU8::new).collect(),
            layout,
        }
    }

    /// Size of the river in bytes.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// True if no channels were declared when the river was built.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Every channel in the river, in offset order.
    pub fn layout(&self) -> &[ChannelLayout] {
        &self.layout
    }

    /// Byte offset of the channel at `path`, if the river has one there.
    pub fn offset_of(&self, path: &str) -> Option<usize> {
        let path = Path::parse(path).ok()?;
        self.layout
            .iter()
            .find(|channel| channel.path == path)
            .map(|channel| channel.offset)
    }

    /// Copy of the whole river.
    ///
    /// No lock is taken, so regions written concurrently may be torn.
    pub fn snapshot(&self) -> Bytes {
        let mut image = vec![0u8; self.len()];
        self.load(0, &mut image);
        Bytes::from(image)
    }

    /// Copies `dest.len()` bytes starting at `offset` into `dest`.
    pub(crate) fn load(&self, offset: usize, dest: &mut [u8]) {
        let src = &self.storage[offset..offset + dest.len()];
        for (byte, cell) in dest.iter_mut().zip(src) {
            *byte = cell.load(Ordering::Relaxed);
        }
    }

    /// Copies `src` into the river starting at `offset`.
    pub(crate) fn store(&self, offset: usize, src: &[u8]) {
        let dest = &self.storage[offset..offset + src.len()];
        for (cell, byte) in dest.iter().zip(src) {
            cell.store(*byte, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for River {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("River")
            .field("len", &self.len())
            .field("channels", &self.layout.len())
            .finish()
    }
}
