//! Main world server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use crate::store::WorldStore;
use std::sync::Arc;
use tracing::debug;
use worldedit_world::World;

/// A response ready to be written by an HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    /// Status code.
    pub status: u16,
    /// JSON body, empty for 204.
    pub body: Vec<u8>,
}

impl ServerResponse {
    /// A 204 response.
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: Vec::new(),
        }
    }

    /// A 200 response with a JSON body.
    pub fn json(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    /// An error response with body `{"error": "<message>"}`.
    pub fn error(err: &ServerError) -> Self {
        let body = serde_json::json!({ "error": err.to_string() });
        Self {
            status: err.status_code(),
            body: body.to_string().into_bytes(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The world server.
///
/// Routes requests to the handler and turns results into responses.
///
/// # Example
///
/// ```
/// use worldedit_server::{ServerConfig, WorldServer};
/// use worldedit_world::World;
///
/// let server = WorldServer::new(ServerConfig::default());
/// server.insert_world(World::new(1, "harbor"));
///
/// let response = server.route("GET", "/api/worlds/1", &[]);
/// assert_eq!(response.status, 200);
/// ```
pub struct WorldServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl WorldServer {
    /// Creates a new server with an empty store.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(WorldStore::new()))
    }

    /// Creates a server over an existing store.
    pub fn with_store(config: ServerConfig, store: Arc<WorldStore>) -> Self {
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Stores a world.
    pub fn insert_world(&self, world: World) {
        self.context.store.insert(world);
    }

    /// Returns a copy of a stored world.
    pub fn world(&self, id: u64) -> Option<World> {
        self.context.store.get(id)
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<WorldStore> {
        &self.context.store
    }

    /// Handles one request.
    pub fn route(&self, method: &str, path: &str, body: &[u8]) -> ServerResponse {
        let result = self.dispatch(method, path, body);
        match result {
            Ok(response) => response,
            Err(err) => {
                debug!(method, path, status = err.status_code(), "request failed");
                ServerResponse::error(&err)
            }
        }
    }

    fn dispatch(&self, method: &str, path: &str, body: &[u8]) -> ServerResult<ServerResponse> {
        let world_id = parse_world_path(path)?;
        match method {
            "PATCH" => {
                self.handler.handle_patch(world_id, body)?;
                Ok(ServerResponse::no_content())
            }
            "GET" => self.handler.handle_get(world_id).map(ServerResponse::json),
            other => Err(ServerError::MethodNotAllowed(other.to_string())),
        }
    }
}

/// Extracts the world id from `/api/worlds/{id}`.
fn parse_world_path(path: &str) -> ServerResult<u64> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let id = path
        .trim_end_matches('/')
        .strip_prefix("/api/worlds/")
        .ok_or_else(|| ServerError::RouteNotFound(path.to_string()))?;
    id.parse()
        .map_err(|_| ServerError::InvalidRequest(format!("invalid world id: {id:?}")))
}
