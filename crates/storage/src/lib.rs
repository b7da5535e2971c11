//! Storage abstraction and implementations for Pathway.
//!
//! This crate provides the catalog and progress store interfaces the
//! progress tracker talks to, with a JSON file backend and an in-memory
//! backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{CatalogStore, ProgressStore, Storage, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
