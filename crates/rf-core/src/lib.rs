//! rusty-forum/crates/rf-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Forum:
//! the comment tree engine (node store port, aggregates, tree assembler,
//! write guard) and the service that ties it to accounts and interactions.

pub mod aggregate;
pub mod error;
pub mod guard;
pub mod models;
pub mod pagination;
pub mod scores;
pub mod service;
pub mod traits;
pub mod tree;

// Re-exporting for easier access in other crates
pub use error::*;
pub use guard::{ContentPolicy, LengthBounds, WriteGuard};
pub use models::*;
pub use pagination::{Page, PageRequest};
pub use service::{ForumService, NewThread, Ports};
pub use traits::*;
pub use tree::TreeAssembler;
