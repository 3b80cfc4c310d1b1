//! # depot-core
//!
//! Shared primitives for the depot release repository tooling.
//!
//! This crate provides the foundational types used across all depot
//! components:
//!
//! - **Storage Backend**: Abstract object-store interface with in-memory
//!   and local-filesystem implementations
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Structured logging initialization
//!
//! Cloud object stores (S3, GCS) are external collaborators: they are
//! specified only at the [`StorageBackend`] trait boundary and are not
//! implemented here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod observability;
pub mod storage;

pub use error::{Error, Result};
pub use observability::{init_logging, LogFormat};
pub use storage::{FsBackend, MemoryBackend, ObjectMeta, StorageBackend};
