//! HTTP transport implementation.
//!
//! Batches are sent as `PATCH {base}/api/worlds/{id}` with a JSON body of
//! the form `{ "author": { "CUID": .. }, "deltas": [..] }`. The HTTP client
//! is abstracted behind a trait so any library (or an in-process loopback)
//! can carry the request.

use crate::error::{SyncError, SyncResult};
use crate::transport::BatchSender;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};
use worldedit_world::{Author, PatchWorldBody};

/// A response from the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Creates a response without a body.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client abstraction.
///
/// Returns `Err` only when no response was received at all.
pub trait HttpClient {
    /// Sends a PATCH request with a JSON body.
    fn patch(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String>;
}

/// Sends batches to the world endpoint of a remote store.
pub struct HttpTransport<C> {
    base_url: String,
    world_id: u64,
    author: Author,
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport for one world.
    pub fn new(base_url: impl Into<String>, world_id: u64, author: Author, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            world_id,
            author,
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the world endpoint.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/api/worlds/{}",
            self.base_url.trim_end_matches('/'),
            self.world_id
        )
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn fail(&self, err: SyncError) -> SyncError {
        *self.last_error.write() = Some(err.to_string());
        err
    }
}

impl<D: Serialize, C: HttpClient> BatchSender<D> for HttpTransport<C> {
    fn send(&self, deltas: &[D]) -> SyncResult<()> {
        let body = PatchWorldBody::new(self.author.clone(), deltas.iter().collect::<Vec<_>>());
        let body = body.to_json()?;

        let url = self.endpoint();
        let response = self
            .client
            .patch(&url, body)
            .map_err(|e| self.fail(SyncError::transport_retryable(e)))?;

        if !response.is_success() {
            warn!(status = response.status, %url, "remote rejected batch");
            return Err(self.fail(SyncError::Rejected {
                status: response.status,
                message: response.text(),
            }));
        }

        debug!(deltas = deltas.len(), %url, "batch delivered");
        *self.last_error.write() = None;
        Ok(())
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a request for `path` and returns the response.
    fn handle(&self, method: &str, path: &str, body: &[u8]) -> HttpResponse;
}

/// A client that routes requests directly to an in-process server.
///
/// Useful for testing without a network.
pub struct LoopbackClient<S> {
    server: S,
}

impl<S: LoopbackServer> LoopbackClient<S> {
    /// Creates a client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }

    /// The server behind the client.
    pub fn server(&self) -> &S {
        &self.server
    }
}

impl<S: LoopbackServer> HttpClient for LoopbackClient<S> {
    fn patch(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        let path = url.find("/api/").map(|i| &url[i..]).unwrap_or(url);
        Ok(self.server.handle("PATCH", path, &body))
    }
}
