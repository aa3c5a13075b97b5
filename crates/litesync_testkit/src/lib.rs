//! # LiteSync Testkit
//!
//! Test utilities for LiteSync.
//!
//! This crate provides:
//! - Store fixtures backed by memory or a temporary file
//! - Property-based generators for entities and server-tagged batches
//! - Concurrent writer harnesses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use litesync_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_temp_store(|store| {
//!         let entity = sample_entity("client1", "id1");
//!         assert!(store.insert_sync_entity(&entity).unwrap().is_applied());
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
