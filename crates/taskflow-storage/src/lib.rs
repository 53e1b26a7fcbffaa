//! TaskFlow Storage Layer
//!
//! Durable key-value slots backing the persisted session. Values are opaque
//! strings; callers own the encoding.

pub mod client;
pub mod file;
pub mod memory;

pub use client::{KeyValueStore, StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
