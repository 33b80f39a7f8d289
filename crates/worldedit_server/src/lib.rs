//! # WorldEdit Server
//!
//! Reference remote store for the world editor.
//!
//! This crate provides:
//! - `PATCH /api/worlds/{id}`: applies a batch of deltas atomically
//! - `GET /api/worlds/{id}`: returns the world snapshot as JSON
//! - An in-memory world store
//!
//! The server is transport-agnostic: [`WorldServer::route`] takes a method,
//! a path and a body, so it can sit behind any HTTP stack or be called
//! in-process.
//!
//! # Status codes
//!
//! | Outcome                         | Status |
//! |---------------------------------|--------|
//! | batch applied                   | 204    |
//! | world returned                  | 200    |
//! | malformed body or path          | 400    |
//! | unknown world or route          | 404    |
//! | unsupported method              | 405    |
//! | a delta does not apply          | 409    |
//! | batch over the configured limit | 413    |

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;
mod store;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::{ServerResponse, WorldServer};
pub use store::{StoredWorld, WorldStore};
