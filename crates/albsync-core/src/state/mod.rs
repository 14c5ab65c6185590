//! Snapshot store implementations
//!
//! - [`MemorySnapshotStore`]: in-memory, for tests and ephemeral runs
//! - [`FileSnapshotStore`]: JSON files with atomic writes, for local runs

pub mod file;
pub mod memory;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;
