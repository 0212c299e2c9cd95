//! Store implementations for Tally.
//!
//! The engines in `tally-core` consume persistence through narrow traits;
//! this crate provides the concrete backing. Today that is a single
//! process-local [`MemoryStore`]. The integration suite under `tests/`
//! exercises the engines end to end against it.

pub mod memory;

pub use memory::MemoryStore;
