//! S3 object storage client.
//!
//! This crate provides:
//! - File download/upload by bucket and key
//! - Existence checks (HEAD) distinguishing not-found from hard errors
//! - Server-side copy and deletion

pub mod client;
pub mod error;

pub use client::{S3Config, StorageClient};
pub use error::{StorageError, StorageResult};
