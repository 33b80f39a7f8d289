//! # WorldEdit History
//!
//! Undo/redo history core for the world editor.
//!
//! This crate provides:
//! - `Delta` and `Change` for reversible edits
//! - `HistoryList`, an arena-backed doubly linked list with stable handles
//! - `ChangeHistory`, the cursor that applies, undoes and redoes changes
//! - `HistoryObserver`, the notification seam used by remote synchronization
//!
//! This is a pure crate with no I/O operations.
//!
//! ## Key Invariants
//!
//! - History is linear: recording a change after an undo discards the undone suffix
//! - Undo and redo move the cursor by at most one change per call
//! - A rejected delta leaves the cursor untouched
//! - List consistency violations (foreign or stale handles, unreachable walks)
//!   panic instead of returning errors

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod delta;
mod history;
mod list;

#[cfg(test)]
mod testing;

pub use delta::{Change, Delta};
pub use history::{ChangeHistory, Cursor, HistoryObserver, HistoryView};
pub use list::{Entries, HistoryList, Iter, NodeId};
