//! Typed channel handles.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::Arc;

use zerocopy::{FromZeros, Immutable, IntoBytes, TryFromBytes};

use crate::link::{Link, LinkState, Linkable};
use crate::river::River;

/// Values up to this many bytes are read without touching the heap.
const INLINE_READ: usize = 64;

/// Types that can be stored in a channel.
///
/// A channel value is a fixed-size, pointer-free blob: anything `zerocopy`
/// can view as bytes and rebuild from bytes. All primitive integers, floats
/// and `bool` qualify, as do `#[repr(C)]` structs deriving the matching
/// `zerocopy` traits.
pub trait ChannelValue:
    IntoBytes + TryFromBytes + FromZeros + Immutable + Copy + Send + Sync + 'static
{
}

impl<T> ChannelValue for T where
    T: IntoBytes
        + TryFromBytes
        + FromZeros
        + Immutable
        + Copy
        + Send
        + Sync
        + 'static
{
}

/// Handle to a river channel.
///
/// Handles are cheap to clone; clones share the same link. Before the river
/// is built, [`get`](Channel::get) returns the zero value and
/// [`set`](Channel::set) does nothing.
///
/// See [`Builder::channel`](crate::Builder::channel).
pub struct Channel<T> {
    link: Arc<Link>,
    _value: PhantomData<fn() -> T>,
}

impl<T: ChannelValue> Channel<T> {
    pub(crate) fn from_link(link: Arc<Link>) -> Self {
        Self {
            link,
            _value: PhantomData,
        }
    }

    /// Gets the value of the channel.
    ///
    /// This returns the zero value if the river is not built.
    pub fn get(&self) -> T {
        let LinkState::Linked(binding) = self.link.state() else {
            return T::new_zeroed();
        };
        let Some(offset) = binding.channel_offset else {
            return T::new_zeroed();
        };

        let size = size_of::<T>();
        let mut inline = [0u8; INLINE_READ];
        let mut spilled;
        let raw: &mut [u8] = if size <= INLINE_READ {
            &mut inline[..size]
        } else {
            spilled = vec![0u8; size];
            &mut spilled
        };
        binding.read(offset, raw);

        match T::try_read_from_bytes(raw) {
            Ok(value) => value,
            Err(_) => {
                // Only reachable when a rivulet write stored bytes that are
                // not a valid T, e.g. 2 into a bool.
                tracing::warn!(
                    offset,
                    type_name = std::any::type_name::<T>(),
                    "channel holds an invalid bit pattern, reading zero"
                );
                T::new_zeroed()
            }
        }
    }

    /// Sets the value of the channel.
    ///
    /// This has no effect if the river is not built.
    pub fn set(&self, value: T) {
        let LinkState::Linked(binding) = self.link.state() else {
            return;
        };
        if let Some(offset) = binding.channel_offset {
            binding.write(offset, value.as_bytes());
        }
    }

    /// Size of the channel type in bytes.
    pub fn size(&self) -> usize {
        size_of::<T>()
    }

    /// Byte offset of the channel in its river, once linked.
    pub fn offset(&self) -> Option<usize> {
        match self.link.state() {
            LinkState::Linked(binding) => binding.channel_offset,
            LinkState::Unlinked => None,
        }
    }
}

impl<T> Linkable for Channel<T> {
    fn is_linked(&self) -> bool {
        self.link.is_linked()
    }

    fn river(&self) -> Option<Arc<River>> {
        self.link.river()
    }
}

/// An unlinked handle that will never be linked.
impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            link: Arc::new(Link::new()),
            _value: PhantomData,
        }
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            link: self.link.clone(),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("type", &std::any::type_name::<T>())
            .field("linked", &self.link.is_linked())
            .finish()
    }
}
