//! Common utilities for Veles.
//!
//! This crate provides the foundational binary I/O types used across all
//! Veles crates:
//!
//! - [`BinaryReader`] - Zero-copy little-endian reading from byte slices
//! - [`BinaryWriter`] - Little-endian writing with patchable placeholder slots
//!
//! Higher-level concerns (offset indirection, string pooling, shared
//! references) belong to the format crates built on top of these.

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
