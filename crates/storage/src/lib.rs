//! Storage abstraction and implementations for Travelometer.
//!
//! This crate provides a trait-based storage interface for the route
//! definition and the observation log, with a plain-file implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod file_storage;

pub use trait_::{Storage, StorageError, Result};
pub use file_storage::FileStorage;
