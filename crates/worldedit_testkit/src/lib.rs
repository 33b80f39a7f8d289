//! # WorldEdit Testkit
//!
//! Test utilities for the world editor crates.
//!
//! This crate provides:
//! - Sample worlds and replay helpers
//! - Property-based edit script generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use worldedit_testkit::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn scripts_apply(script in edit_script_strategy(20)) {
//!         let mut world = sample_world();
//!         // ... drive a session with the script
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
