//! Chain storage.
//!
//! The chain is deliberately not persisted across restarts; this module
//! provides the in-memory, single-writer [`mem::ChainBuilder`] together with
//! the snapshot handles readers use to observe it.

pub mod mem;

pub use mem::{ChainBuilder, ChainIntegrityError, ChainReader, ChainSnapshot};
