//! Request handlers.

pub mod completion;
pub mod health;
pub mod ingest;

pub use completion::*;
pub use health::*;
pub use ingest::*;
