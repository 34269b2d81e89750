//! River: a hierarchical key-value store in one contiguous buffer.
//!
//! A river holds a tree of fixed-size typed values ("channels") grouped into
//! named subtrees ("rivulets"), all packed into a single byte buffer:
//! - `Builder`: declares channels, rivulets, locks and sub-builders
//! - `Channel<T>`: typed handle to one value
//! - `Rivulet`: untyped handle to every channel below a path
//! - `River`: the built buffer, shared by every handle linked to it
//! - `Lock`: caller-supplied synchronization for a subtree
//!
//! Handles are issued while declaring and stay inert until the river is
//! built; from then on they read and write the buffer directly.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use river_core::{Builder, Lock};
//!
//! struct NoopLock;
//!
//! impl Lock for NoopLock {
//!     fn acquire(&self) {}
//!     fn release(&self) {}
//! }
//!
//! let builder = Builder::new();
//! let time = builder.channel("system.time", 0u64).unwrap();
//! let pressure = builder.channel("control.pressure", 14.7f64).unwrap();
//! builder.lock("control", Arc::new(NoopLock)).unwrap();
//!
//! builder.build().unwrap();
//!
//! time.set(1_000_000_000);
//! assert_eq!(time.get(), 1_000_000_000);
//! assert_eq!(pressure.get(), 14.7);
//! ```
//!
//! # Layout
//!
//! Offsets follow declaration order, pre-order, with no padding. Declaring
//! `system.time: u64`, `system.abort: bool`, `control.pressure: f64`,
//! `control.pressure.valid: bool` and `control.valve_open: bool` yields:
//!
//! ```text
//! offset  path
//! 0x00    system.time
//! 0x08    system.abort
//! 0x09    control.pressure
//! 0x11    control.pressure.valid
//! 0x12    control.valve_open
//! ```

pub use bytes::Bytes;

mod builder;
mod channel;
mod error;
mod layout;
mod link;
mod lock;
mod path;
mod river;
mod rivulet;
mod tree;

pub use builder::Builder;
pub use channel::{Channel, ChannelValue};
pub use error::{Error, Result, ERR_DUPE, ERR_INVALID, ERR_NOTFOUND, ERR_NOTROOT};
pub use link::Linkable;
pub use lock::{Lock, SharedLock};
pub use path::{Path, PathError, SEPARATOR};
pub use river::{ChannelLayout, River};
pub use rivulet::Rivulet;

#[cfg(feature = "test-utils")]
pub use lock::CountingLock;
