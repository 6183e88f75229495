//! CLI command handlers
//!
//! - serve: web server
//! - ingest: knowledge index build
//! - retrieve: ad-hoc similarity search
//! - info: configuration display

pub mod info;
pub mod ingest;
pub mod retrieve;
pub mod serve;

pub use info::*;
pub use ingest::*;
pub use retrieve::*;
pub use serve::*;
