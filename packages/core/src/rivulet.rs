//! Untyped rivulet handles.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::link::{Link, LinkState, Linkable};
use crate::river::River;

/// Handle to a rivulet: the contiguous bytes of every channel below a path.
///
/// The rivulet does not include the channel at its own path, if there is
/// one. Before the river is built its size is zero, reads leave the
/// destination untouched and writes do nothing.
///
/// See [`Builder::rivulet`](crate::Builder::rivulet).
#[derive(Clone, Default)]
pub struct Rivulet {
    link: Arc<Link>,
}

impl Rivulet {
    pub(crate) fn from_link(link: Arc<Link>) -> Self {
        Self { link }
    }

    /// Reads the rivulet memory into the front of `dest`.
    ///
    /// Exactly [`size()`](Rivulet::size) bytes are copied.
    ///
    /// # Panics
    ///
    /// Panics if `dest` is shorter than `size()`.
    pub fn read(&self, dest: &mut [u8]) {
        let LinkState::Linked(binding) = self.link.state() else {
            return;
        };
        let size = binding.rivulet_size;
        assert!(
            dest.len() >= size,
            "rivulet read needs {} bytes, destination holds {}",
            size,
            dest.len()
        );
        binding.read(binding.rivulet_offset, &mut dest[..size]);
    }

    /// Reads the rivulet memory into a new buffer.
    ///
    /// Returns an empty buffer if the river is not built.
    pub fn read_bytes(&self) -> Bytes {
        let mut image = vec![0u8; self.size()];
        self.read(&mut image);
        Bytes::from(image)
    }

    /// Writes the front of `src` to the rivulet memory.
    ///
    /// Exactly [`size()`](Rivulet::size) bytes are copied.
    ///
    /// # Panics
    ///
    /// Panics if `src` is shorter than `size()`.
    pub fn write(&self, src: &[u8]) {
        let LinkState::Linked(binding) = self.link.state() else {
            return;
        };
        let size = binding.rivulet_size;
        assert!(
            src.len() >= size,
            "rivulet write needs {} bytes, source holds {}",
            size,
            src.len()
        );
        binding.write(binding.rivulet_offset, &src[..size]);
    }

    /// Size of the rivulet in bytes, or zero if the river is not built.
    pub fn size(&self) -> usize {
        match self.link.state() {
            LinkState::Linked(binding) => binding.rivulet_size,
            LinkState::Unlinked => 0,
        }
    }

    /// Byte offset of the rivulet in its river, once linked.
    pub fn offset(&self) -> Option<usize> {
        match self.link.state() {
            LinkState::Linked(binding) => Some(binding.rivulet_offset),
            LinkState::Unlinked => None,
        }
    }
}

impl Linkable for Rivulet {
    fn is_linked(&self) -> bool {
        self.link.is_linked()
    }

    fn river(&self) -> Option<Arc<River>> {
        self.link.river()
    }
}

impl fmt::Debug for Rivulet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rivulet")
            .field("linked", &self.link.is_linked())
            .field("size", &self.size())
            .finish()
    }
}
