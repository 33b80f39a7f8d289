//! # WorldEdit Sync
//!
//! Mirrors the editor's undo/redo history to a remote store.
//!
//! This crate provides:
//! - `RemoteSynchronizer`, a `HistoryObserver` tracking the remote's position
//! - Batched uploads triggered by change-count and time thresholds
//! - Transports: inline, queued with retries, HTTP and loopback
//! - `EditorSession`, bundling model, history and synchronizer
//!
//! ## Key Invariants
//!
//! - Once anything was recorded, a remote at the cursor is `AtCurrent`
//! - Deltas of pruned changes are owed until the next flush and are sent first
//! - A flush never sends an empty batch
//! - Replaying every uploaded batch on the initial world yields the local world

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod error;
mod http;
mod queue;
mod session;
mod synchronizer;
mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RetryConfig, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpResponse, HttpTransport, LoopbackClient, LoopbackServer};
pub use queue::{QueueStats, QueuedTransport};
pub use session::{EditorSession, SharedSession};
pub use synchronizer::{RemotePosition, RemoteState, RemoteSynchronizer, SyncPlan, SyncStats};
pub use transport::{BatchSender, InlineTransport, MockTransport, UploadTransport};
