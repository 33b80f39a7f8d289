//! Editor session: model, history and synchronizer behind one owner.

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::synchronizer::{RemoteSynchronizer, SyncPlan, SyncStats};
use crate::transport::UploadTransport;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::sync::Arc;
use worldedit_history::{Change, ChangeHistory, Delta, NodeId};

/// A session shared between threads.
///
/// History and synchronizer sit behind a single lock; there is no finer
/// grained locking.
pub type SharedSession<D, T, C = SystemClock> = Arc<Mutex<EditorSession<D, T, C>>>;

/// One editor's view of a world: the live model, its undo/redo history and
/// the synchronizer that mirrors the history to the remote store.
pub struct EditorSession<D, T, C = SystemClock>
where
    D: Delta,
    D::Model: Sized,
{
    model: D::Model,
    history: ChangeHistory<D, RemoteSynchronizer<D, T, C>>,
}

impl<D, T> EditorSession<D, T>
where
    D: Delta,
    D::Model: Sized,
    T: UploadTransport<D>,
{
    /// Creates a session on the system clock.
    pub fn new(model: D::Model, config: SyncConfig, transport: T) -> Self {
        Self::with_clock(model, config, transport, SystemClock)
    }
}

impl<D, T, C> EditorSession<D, T, C>
where
    D: Delta,
    D::Model: Sized,
    T: UploadTransport<D>,
    C: Clock,
{
    /// Creates a session with a custom clock.
    pub fn with_clock(model: D::Model, config: SyncConfig, transport: T, clock: C) -> Self {
        let sync = RemoteSynchronizer::with_clock(config, transport, clock);
        Self {
            model,
            history: ChangeHistory::with_observer(sync),
        }
    }

    /// Applies a change to the model and records it.
    ///
    /// Nothing is recorded if the model rejects the change.
    pub fn apply(&mut self, change: Change<D>) -> Result<NodeId, D::Error> {
        change.apply_forward(&mut self.model)?;
        Ok(self.history.set_current(change))
    }

    /// Records a change the caller already applied to the model.
    pub fn record(&mut self, change: Change<D>) -> NodeId {
        self.history.set_current(change)
    }

    /// Undoes one change. See [`ChangeHistory::undo`].
    pub fn undo(&mut self) -> Result<Option<&Change<D>>, D::Error> {
        self.history.undo(&mut self.model)
    }

    /// Redoes one change. See [`ChangeHistory::redo`].
    pub fn redo(&mut self) -> Result<Option<&Change<D>>, D::Error> {
        self.history.redo(&mut self.model)
    }

    /// Re-checks the flush thresholds without a cursor move.
    ///
    /// Call this from the editor's update loop so the time threshold fires
    /// even while the user is idle. Returns true if a flush happened.
    pub fn tick(&mut self) -> bool {
        self.history
            .with_observer_view(|sync, view| sync.maybe_upload(view))
    }

    /// Uploads everything owed, regardless of thresholds.
    pub fn flush(&mut self) {
        self.history.with_observer_view(|sync, view| sync.flush(view));
    }

    /// The batch a flush would send right now, excluding owed pruned deltas.
    pub fn pending(&self) -> SyncPlan<D> {
        self.synchronizer().plan(self.history.view())
    }

    /// The live model.
    pub fn model(&self) -> &D::Model {
        &self.model
    }

    /// The live model, mutably.
    ///
    /// Edits made here are invisible to the history and the remote.
    pub fn model_mut(&mut self) -> &mut D::Model {
        &mut self.model
    }

    /// The history.
    pub fn history(&self) -> &ChangeHistory<D, RemoteSynchronizer<D, T, C>> {
        &self.history
    }

    /// The synchronizer.
    pub fn synchronizer(&self) -> &RemoteSynchronizer<D, T, C> {
        self.history.observer()
    }

    /// Upload statistics.
    pub fn stats(&self) -> &SyncStats {
        self.synchronizer().stats()
    }

    /// Renders the history, one change per line.
    ///
    /// `>` marks the cursor; the remote's node is labelled.
    pub fn dump_with(&self, label: impl Fn(&D) -> String) -> String {
        let view = self.history.view();
        let sync = self.synchronizer();
        let tip = view.applied_tip();

        let mut out = format!(
            "history: {} changes, remote {}, {} owed\n",
            view.list().len(),
            sync.position(),
            sync.pruned_deltas().len()
        );
        let mut applied = tip.is_some();
        for (index, (id, change)) in view.list().entries().enumerate() {
            let marker = if Some(id) == view.current() { '>' } else { ' ' };
            let status = if applied { "applied" } else { "undone" };
            let remote = if Some(id) == sync.remote_node() {
                "  <- remote"
            } else {
                ""
            };
            out.push_str(&format!(
                "{marker} {:>3}  {status:<7}  {}{remote}\n",
                index + 1,
                label(change.forward())
            ));
            if Some(id) == tip {
                applied = false;
            }
        }
        out
    }

    /// Wraps the session for sharing between threads.
    pub fn into_shared(self) -> SharedSession<D, T, C> {
        Arc::new(Mutex::new(self))
    }
}

impl<D, T, C> EditorSession<D, T, C>
where
    D: Delta + Debug,
    D::Model: Sized,
    T: UploadTransport<D>,
    C: Clock,
{
    /// Renders the history using each forward delta's `Debug` output.
    pub fn dump(&self) -> String {
        self.dump_with(|delta| format!("{delta:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::synchronizer::RemotePosition;
    use crate::transport::MockTransport;
    use std::thread;
    use std::time::Duration;
    use worldedit_world::{
        rename_world, set_point_positions, DeltaOp, Identifier, Position, World, WorldDelta,
        WorldError,
    };

    type Session = EditorSession<WorldDelta, MockTransport<WorldDelta>, ManualClock>;

    fn world() -> World {
        World::new(1, "harbor")
            .with_point(Identifier::Id(1), Position::new(0.0, 0.0))
            .with_point(Identifier::Id(2), Position::new(1.0, 0.0))
    }

    fn session(max_changes: usize) -> (Session, MockTransport<WorldDelta>, ManualClock) {
        let transport = MockTransport::new();
        let clock = ManualClock::new();
        let config = SyncConfig::new(max_changes, Duration::from_secs(5));
        let session = EditorSession::with_clock(world(), config, transport.clone(), clock.clone());
        (session, transport, clock)
    }

    fn move_point(session: &mut Session, id: u64, x: f64) {
        let change = set_point_positions(
            session.model(),
            &[(Identifier::Id(id), Position::new(x, 0.0))],
        )
        .unwrap();
        session.apply(change).unwrap();
    }

    #[test]
    fn apply_undo_redo_drive_the_model() {
        let (mut session, _, _) = session(10);
        move_point(&mut session, 1, 5.0);
        let rename = rename_world(session.model(), "bay");
        session.apply(rename).unwrap();

        assert_eq!(session.model().name(), "bay");
        session.undo().unwrap();
        assert_eq!(session.model().name(), "harbor");
        session.undo().unwrap();
        assert_eq!(session.model().point(&Identifier::Id(1)), Some(Position::new(0.0, 0.0)));

        session.redo().unwrap();
        assert_eq!(session.model().point(&Identifier::Id(1)), Some(Position::new(5.0, 0.0)));
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn rejected_apply_records_nothing() {
        let (mut session, _, _) = session(10);
        let change = set_point_positions(
            session.model(),
            &[(Identifier::Id(2), Position::new(3.0, 3.0))],
        )
        .unwrap();
        DeltaOp::DeletePoint {
            point: Identifier::Id(2),
        }
        .apply(session.model_mut())
        .unwrap();

        let err = session.apply(change).unwrap_err();
        assert!(err.is_missing_reference());
        assert!(session.history().is_empty());
    }

    #[test]
    fn failed_undo_leaves_history_and_remote_untouched() {
        let (mut session, transport, _) = session(0);
        move_point(&mut session, 2, 4.0);
        assert_eq!(transport.upload_count(), 1);
        let cursor = session.history().cursor();

        DeltaOp::DeletePoint {
            point: Identifier::Id(2),
        }
        .apply(session.model_mut())
        .unwrap();

        let result = session.undo();
        assert!(matches!(result, Err(WorldError::EntityNotFound { .. })));
        assert_eq!(session.history().cursor(), cursor);
        assert_eq!(session.synchronizer().position(), RemotePosition::AtCurrent);
        assert_eq!(transport.upload_count(), 1);
    }

    #[test]
    fn tick_fires_time_threshold_while_idle() {
        let (mut session, transport, clock) = session(10);
        move_point(&mut session, 1, 1.0);
        assert!(!session.tick());

        clock.advance(Duration::from_secs(6));
        assert!(session.tick());
        assert_eq!(transport.upload_count(), 1);
        assert_eq!(session.stats().deltas_uploaded, 1);

        // The timer restarted with the flush.
        clock.advance(Duration::from_secs(3));
        assert!(!session.tick());
    }

    #[test]
    fn flush_ignores_thresholds() {
        let (mut session, transport, _) = session(10);
        move_point(&mut session, 1, 1.0);
        move_point(&mut session, 2, 2.0);
        assert_eq!(session.pending().deltas.len(), 2);

        session.flush();
        assert_eq!(transport.batches()[0].len(), 2);
        assert!(session.pending().deltas.is_empty());
    }

    #[test]
    fn dump_marks_cursor_and_remote() {
        let (mut session, _, _) = session(10);
        move_point(&mut session, 1, 1.0);
        move_point(&mut session, 2, 2.0);
        session.flush();
        session.undo().unwrap();

        let dump = session.dump_with(|delta| delta.op.kind().to_string());
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "history: 2 changes, remote at current, 0 owed");
        assert_eq!(lines[1], "    1  applied  setPointPositions");
        assert_eq!(lines[2], ">   2  undone   setPointPositions  <- remote");
    }

    #[test]
    fn shared_session_across_threads() {
        let (session, transport, _) = session(100);
        let shared = session.into_shared();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let mut session = shared.lock();
                    let change = set_point_positions(
                        session.model(),
                        &[(Identifier::Id(1), Position::new(i as f64, 0.0))],
                    )
                    .unwrap();
                    session.apply(change).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut session = shared.lock();
        assert_eq!(session.history().len(), 4);
        session.flush();
        assert_eq!(transport.uploaded().len(), 4);
    }
}
