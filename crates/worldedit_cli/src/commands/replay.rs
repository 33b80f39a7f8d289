//! Replay command implementation.
//!
//! Runs a scripted editing session against an in-process world server. The
//! session uploads through the real HTTP transport over a loopback client,
//! so the report shows exactly which batches a live editor would send.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use worldedit_server::{ServerConfig, WorldServer};
use worldedit_sync::{
    BatchSender, EditorSession, HttpResponse, HttpTransport, InlineTransport, LoopbackClient,
    LoopbackServer, ManualClock, SyncConfig, SyncResult,
};
use worldedit_world::{
    create_point, delete_point, insert_network_edge, insert_polygon_point, remove_network_edge,
    remove_polygon_point, rename_world, set_point_positions, Author, Edge, Identifier,
    PointPosition, Position, World, WorldChange, WorldDelta, WorldResult,
};

/// An edit script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Starting world, on both the editor and the server.
    pub world: World,
    /// Author CUID sent with every batch.
    #[serde(default = "default_author")]
    pub author: String,
    /// Steps in order.
    pub steps: Vec<Step>,
}

fn default_author() -> String {
    "worldedit-cli".to_string()
}

/// One scripted step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    /// Moves points.
    MovePoints {
        /// New positions.
        moves: Vec<PointPosition>,
    },
    /// Renames the world.
    Rename {
        /// New name.
        name: String,
    },
    /// Creates a point.
    CreatePoint {
        /// New point id.
        point: Identifier,
        /// Initial position.
        position: Position,
    },
    /// Deletes a point.
    DeletePoint {
        /// The point.
        point: Identifier,
    },
    /// Inserts a point into a polygon.
    InsertPolygonPoint {
        /// The polygon.
        polygon: Identifier,
        /// Insertion index.
        index: usize,
        /// The point.
        point: Identifier,
    },
    /// Removes a point from a polygon.
    RemovePolygonPoint {
        /// The polygon.
        polygon: Identifier,
        /// Index to remove.
        index: usize,
    },
    /// Adds a network edge.
    InsertEdge {
        /// The network.
        network: Identifier,
        /// The edge.
        edge: Edge,
    },
    /// Removes a network edge.
    RemoveEdge {
        /// The network.
        network: Identifier,
        /// The edge.
        edge: Edge,
    },
    /// Undoes one change.
    Undo,
    /// Redoes one change.
    Redo,
    /// Advances the clock and re-checks the flush thresholds.
    Wait {
        /// Seconds to advance.
        seconds: f64,
    },
    /// Forces an upload.
    Flush,
}

impl Step {
    fn change(&self, world: &World) -> Option<WorldResult<WorldChange>> {
        let change = match self {
            Step::MovePoints { moves } => {
                let moves: Vec<_> = moves
                    .iter()
                    .map(|m| (m.point.clone(), m.position))
                    .collect();
                set_point_positions(world, &moves)
            }
            Step::Rename { name } => Ok(rename_world(world, name.clone())),
            Step::CreatePoint { point, position } => create_point(world, point.clone(), *position),
            Step::DeletePoint { point } => delete_point(world, point.clone()),
            Step::InsertPolygonPoint {
                polygon,
                index,
                point,
            } => insert_polygon_point(world, polygon.clone(), *index, point.clone()),
            Step::RemovePolygonPoint { polygon, index } => {
                remove_polygon_point(world, polygon.clone(), *index)
            }
            Step::InsertEdge { network, edge } => {
                insert_network_edge(world, network.clone(), edge.clone())
            }
            Step::RemoveEdge { network, edge } => {
                remove_network_edge(world, network.clone(), edge.clone())
            }
            Step::Undo | Step::Redo | Step::Wait { .. } | Step::Flush => return None,
        };
        Some(change)
    }
}

/// Replay options.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Change threshold.
    pub max_changes: usize,
    /// Time threshold in seconds.
    pub max_seconds: f64,
    /// Whether to flush after the last step.
    pub final_flush: bool,
}

/// One batch the session handed to the transport.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRecord {
    /// Step that triggered the upload, 1-based; `None` for the final flush.
    pub step: Option<usize>,
    /// Delta kinds in the batch.
    pub deltas: Vec<String>,
    /// Whether the server accepted the batch.
    pub accepted: bool,
    /// Transport or server error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Replay result.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// Steps run.
    pub steps: usize,
    /// Changes left in the history.
    pub changes: usize,
    /// Uploads in order.
    pub uploads: Vec<UploadRecord>,
    /// Remote position after the last step.
    pub remote_position: String,
    /// Deltas still owed for pruned changes.
    pub owed: usize,
    /// History dump, one line per change.
    pub history: Vec<String>,
    /// The editor's world.
    pub local_world: World,
    /// The server's world.
    pub remote_world: World,
    /// Whether both worlds are equal.
    pub converged: bool,
}

struct Bridge(Arc<WorldServer>);

impl LoopbackServer for Bridge {
    fn handle(&self, method: &str, path: &str, body: &[u8]) -> HttpResponse {
        let response = self.0.route(method, path, body);
        HttpResponse::new(response.status, response.body)
    }
}

/// Logs every batch sent through the inner sender.
struct Recorder<S> {
    inner: S,
    log: Arc<Mutex<Vec<UploadRecord>>>,
}

impl<S: BatchSender<WorldDelta>> BatchSender<WorldDelta> for Recorder<S> {
    fn send(&self, deltas: &[WorldDelta]) -> SyncResult<()> {
        let result = self.inner.send(deltas);
        self.log.lock().push(UploadRecord {
            step: None,
            deltas: deltas.iter().map(|d| d.op.kind().to_string()).collect(),
            accepted: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
        });
        result
    }
}

/// Loads a script file.
pub fn load_script(path: &Path) -> Result<Script, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read script {}: {e}", path.display()))?;
    let script = serde_json::from_str(&text)
        .map_err(|e| format!("invalid script {}: {e}", path.display()))?;
    Ok(script)
}

/// Replays a script and reports what was uploaded.
pub fn replay(
    script: &Script,
    options: &ReplayOptions,
) -> Result<ReplayReport, Box<dyn std::error::Error>> {
    let world_id = script.world.id();
    let server = Arc::new(WorldServer::new(ServerConfig::default()));
    server.insert_world(script.world.clone());

    let log = Arc::new(Mutex::new(Vec::new()));
    let http = HttpTransport::new(
        "http://localhost",
        world_id,
        Author::new(script.author.clone()),
        LoopbackClient::new(Bridge(Arc::clone(&server))),
    );
    let transport = InlineTransport::new(Recorder {
        inner: http,
        log: Arc::clone(&log),
    });

    let clock = ManualClock::new();
    let config = SyncConfig::from_secs_f64(options.max_changes, options.max_seconds)?;
    let mut session =
        EditorSession::with_clock(script.world.clone(), config, transport, clock.clone());

    for (index, step) in script.steps.iter().enumerate() {
        let number = index + 1;
        let uploads_before = log.lock().len();
        let context = |e: &dyn std::fmt::Display| format!("step {number} ({step:?}): {e}");

        match step {
            Step::Undo => {
                session.undo().map_err(|e| context(&e))?;
            }
            Step::Redo => {
                session.redo().map_err(|e| context(&e))?;
            }
            Step::Wait { seconds } => {
                let elapsed = Duration::try_from_secs_f64(*seconds).map_err(|e| context(&e))?;
                clock.advance(elapsed);
                session.tick();
            }
            Step::Flush => session.flush(),
            edit => {
                if let Some(change) = edit.change(session.model()) {
                    let change = change.map_err(|e| context(&e))?;
                    session.apply(change).map_err(|e| context(&e))?;
                }
            }
        }

        for record in log.lock().iter_mut().skip(uploads_before) {
            record.step = Some(number);
        }
    }

    if options.final_flush {
        session.flush();
    }

    let remote_world = server
        .world(world_id)
        .ok_or_else(|| format!("server lost world {world_id}"))?;
    let local_world = session.model().clone();
    let sync = session.synchronizer();
    let dump = session.dump_with(|delta| delta.op.kind().to_string());
    let uploads = log.lock().clone();

    info!(
        steps = script.steps.len(),
        uploads = uploads.len(),
        "replay finished"
    );

    Ok(ReplayReport {
        steps: script.steps.len(),
        changes: session.history().len(),
        uploads,
        remote_position: sync.position().to_string(),
        owed: sync.pruned_deltas().len(),
        history: dump.lines().map(str::to_string).collect(),
        converged: remote_world == local_world,
        local_world,
        remote_world,
    })
}

/// Runs the replay command.
pub fn run(
    path: &Path,
    options: &ReplayOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let script = load_script(path)?;
    let report = replay(&script, options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

fn print_text_output(report: &ReplayReport) {
    println!(
        "Replayed {} steps, {} changes in history",
        report.steps, report.changes
    );
    println!();

    println!("Uploads:");
    if report.uploads.is_empty() {
        println!("  (none)");
    }
    for upload in &report.uploads {
        let step = match upload.step {
            Some(step) => format!("step {step}"),
            None => "final".to_string(),
        };
        let outcome = match &upload.error {
            Some(error) => format!("  FAILED: {error}"),
            None => String::new(),
        };
        println!(
            "  {step:<8} {:>3} deltas  {}{outcome}",
            upload.deltas.len(),
            upload.deltas.join(", ")
        );
    }
    println!();

    for line in &report.history {
        println!("{line}");
    }
    println!();

    if report.converged {
        println!("✓ Remote world matches local world");
    } else {
        println!("✗ Remote world differs from local world");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldedit_testkit::{sample_world, temp_json_file};

    fn options(max_changes: usize) -> ReplayOptions {
        ReplayOptions {
            max_changes,
            max_seconds: 5.0,
            final_flush: true,
        }
    }

    fn script(steps: Vec<Step>) -> Script {
        Script {
            world: sample_world(),
            author: "editor-1".into(),
            steps,
        }
    }

    fn rename(name: &str) -> Step {
        Step::Rename { name: name.into() }
    }

    #[test]
    fn replay_batches_by_threshold() {
        let script = script(vec![
            rename("a"),
            rename("b"),
            rename("c"),
            Step::Wait { seconds: 6.0 },
        ]);
        let report = replay(&script, &options(2)).unwrap();

        assert_eq!(report.uploads.len(), 1);
        assert_eq!(report.uploads[0].step, Some(3));
        assert_eq!(report.uploads[0].deltas.len(), 3);
        assert!(report.converged);
        assert_eq!(report.remote_world.name(), "c");
        assert_eq!(report.remote_position, "at current");
    }

    #[test]
    fn replay_undo_after_flush_sends_backward_deltas() {
        let script = script(vec![
            rename("a"),
            Step::Flush,
            Step::Undo,
            rename("b"),
        ]);
        let report = replay(&script, &options(10)).unwrap();

        let final_upload = report.uploads.last().unwrap();
        assert_eq!(final_upload.step, None);
        assert_eq!(final_upload.deltas, vec!["setWorldName", "setWorldName"]);
        assert!(report.converged);
        assert_eq!(report.local_world.name(), "b");
        assert_eq!(report.changes, 1);
    }

    #[test]
    fn without_final_flush_remote_lags() {
        let script = script(vec![rename("a")]);
        let options = ReplayOptions {
            final_flush: false,
            ..options(10)
        };
        let report = replay(&script, &options).unwrap();

        assert!(report.uploads.is_empty());
        assert!(!report.converged);
        assert_eq!(report.remote_position, "behind");
    }

    #[test]
    fn invalid_step_names_the_step() {
        let script = script(vec![
            rename("a"),
            Step::DeletePoint {
                point: Identifier::Id(1),
            },
        ]);
        let err = replay(&script, &options(10)).unwrap_err();
        assert!(err.to_string().starts_with("step 2"), "{err}");
    }

    #[test]
    fn loads_script_from_file() {
        let json = serde_json::json!({
            "world": sample_world(),
            "steps": [
                { "op": "movePoints", "moves": [
                    { "point": { "id": 4 }, "position": { "x": 1.0, "y": 1.0 } }
                ]},
                { "op": "createPoint", "point": { "temporaryCUID": "p1" },
                  "position": { "x": 2.0, "y": 2.0 } },
                { "op": "undo" },
                { "op": "wait", "seconds": 0.5 }
            ]
        });
        let file = temp_json_file(&json);

        let script = load_script(file.path()).unwrap();
        assert_eq!(script.author, "worldedit-cli");
        assert_eq!(script.steps.len(), 4);

        let report = replay(&script, &options(0)).unwrap();
        assert!(report.converged);
        assert_eq!(report.history.len(), 3);
    }

    #[test]
    fn missing_script_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_script(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read script"));
    }
}
