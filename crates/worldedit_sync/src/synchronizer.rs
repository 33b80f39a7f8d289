//! Remote synchronizer state machine.
//!
//! The synchronizer observes the history cursor and keeps track of how far
//! the remote store's applied state is from the local one:
//!
//! | Event                              | Remote state afterwards |
//! |------------------------------------|-------------------------|
//! | new change appended                | `Behind`                |
//! | cursor leaves the remote node back | `Ahead`                 |
//! | cursor leaves the remote node fwd  | `Behind`                |
//! | cursor lands on the remote node    | `AtCurrent`             |
//! | flush                              | whatever the plan says  |
//!
//! On every transition it computes the minimal batch that would bring the
//! remote in line with the cursor. The batch is only shipped once a size or
//! time threshold is crossed; until then the remote bookkeeping stays put.

use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::transport::UploadTransport;
use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{debug, info, trace};
use worldedit_history::{Delta, HistoryObserver, HistoryView, NodeId};

/// Where the remote stands relative to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemotePosition {
    /// The remote needs forward deltas to catch up.
    Behind,
    /// The remote's last node is the cursor's node.
    AtCurrent,
    /// The remote needs backward deltas to roll back.
    Ahead,
}

impl fmt::Display for RemotePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemotePosition::Behind => write!(f, "behind"),
            RemotePosition::AtCurrent => write!(f, "at current"),
            RemotePosition::Ahead => write!(f, "ahead"),
        }
    }
}

/// The remote's position together with the last node it has applied.
///
/// Once anything was recorded, `AtCurrent` holds exactly when the remote
/// node is the cursor's node. When the cursor's change is undone in that
/// state, the remote still has it applied and is owed its backward delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    /// The remote has applied everything up to `last`, which precedes the
    /// local applied state. `None` means nothing is applied remotely.
    Behind {
        /// Last node applied remotely.
        last: Option<NodeId>,
    },
    /// The remote's last node is the cursor's node.
    AtCurrent {
        /// Last node applied remotely; `None` only for an empty history.
        last: Option<NodeId>,
    },
    /// The remote has applied nodes the cursor has since undone.
    Ahead {
        /// Last node applied remotely.
        last: NodeId,
    },
}

impl RemoteState {
    /// The state of a remote that has seen nothing.
    pub const INITIAL: RemoteState = RemoteState::Behind { last: None };

    /// The tri-state position.
    pub fn position(&self) -> RemotePosition {
        match self {
            RemoteState::Behind { .. } => RemotePosition::Behind,
            RemoteState::AtCurrent { .. } => RemotePosition::AtCurrent,
            RemoteState::Ahead { .. } => RemotePosition::Ahead,
        }
    }

    /// The last node the remote has applied.
    pub fn last(&self) -> Option<NodeId> {
        match *self {
            RemoteState::Behind { last } | RemoteState::AtCurrent { last } => last,
            RemoteState::Ahead { last } => Some(last),
        }
    }
}

/// A reconciliation plan: what to send and where the remote ends up.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan<D> {
    /// Deltas to send, in application order.
    pub deltas: Vec<D>,
    /// Remote state once the deltas are applied.
    pub state: RemoteState,
}

impl<D> SyncPlan<D> {
    fn unchanged(state: RemoteState) -> Self {
        Self {
            deltas: Vec::new(),
            state,
        }
    }

    /// Returns true if the plan rolls back changes the remote holds.
    ///
    /// Those are exactly the changes a prune is about to destroy.
    fn is_rollback(&self, from: RemoteState, view: HistoryView<'_, D>) -> bool {
        match from {
            RemoteState::Ahead { .. } => true,
            RemoteState::AtCurrent { .. } => !view.is_current_applied() && !self.deltas.is_empty(),
            RemoteState::Behind { .. } => false,
        }
    }
}

/// Statistics about uploads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStats {
    /// Number of batches handed to the transport.
    pub uploads: u64,
    /// Total deltas uploaded.
    pub deltas_uploaded: u64,
    /// Backward deltas captured from pruned changes.
    pub pruned_deltas_captured: u64,
    /// When the last flush happened.
    pub last_upload: Option<Instant>,
}

/// Keeps a remote store in step with a [`ChangeHistory`](worldedit_history::ChangeHistory).
///
/// Installed as the history's observer. It reads node identity and order
/// from the views it is handed and never touches list structure.
pub struct RemoteSynchronizer<D, T, C = SystemClock> {
    config: SyncConfig,
    transport: T,
    clock: C,
    state: RemoteState,
    pruned: Vec<D>,
    last_upload: Instant,
    stats: SyncStats,
    _delta: PhantomData<fn(D)>,
}

impl<D: Delta, T: UploadTransport<D>> RemoteSynchronizer<D, T> {
    /// Creates a synchronizer on the system clock.
    pub fn new(config: SyncConfig, transport: T) -> Self {
        Self::with_clock(config, transport, SystemClock)
    }
}

impl<D: Delta, T: UploadTransport<D>, C: Clock> RemoteSynchronizer<D, T, C> {
    /// Creates a synchronizer with a custom clock.
    ///
    /// The upload timer starts now.
    pub fn with_clock(config: SyncConfig, transport: T, clock: C) -> Self {
        let last_upload = clock.now();
        Self {
            config,
            transport,
            clock,
            state: RemoteState::INITIAL,
            pruned: Vec::new(),
            last_upload,
            stats: SyncStats::default(),
            _delta: PhantomData,
        }
    }

    /// Computes the batch that would reconcile the remote with the cursor.
    ///
    /// Pure: nothing is committed. Owed deltas from pruned changes are not
    /// part of the plan.
    ///
    /// # Panics
    ///
    /// Panics if the remote node is no longer connected to the cursor.
    pub fn plan(&self, view: HistoryView<'_, D>) -> SyncPlan<D> {
        let list = view.list();
        let applied = view.is_current_applied();

        match self.state {
            RemoteState::Behind { last } => {
                // Last node the local model has applied.
                let to = view.applied_tip();
                if to == last {
                    return SyncPlan::unchanged(self.state);
                }
                let Some(to) = to else {
                    panic!("remote {last:?} is behind an empty applied state");
                };
                let from = match last {
                    Some(last) => list.next(last),
                    None => list.head(),
                };
                let Some(from) = from else {
                    panic!("remote {last:?} is behind but has no successor");
                };

                let deltas = list
                    .get_next(from, to)
                    .into_iter()
                    .map(|change| change.forward().clone())
                    .collect();
                let state = if Some(to) == view.current() {
                    RemoteState::AtCurrent { last: Some(to) }
                } else {
                    RemoteState::Behind { last: Some(to) }
                };
                SyncPlan { deltas, state }
            }
            RemoteState::Ahead { last } => {
                let Some(current) = view.current() else {
                    panic!("remote {last:?} is ahead of an empty history");
                };
                // First node to roll back, walking backward from the remote.
                let to = if applied {
                    list.next(current)
                } else {
                    Some(current)
                };
                let Some(to) = to else {
                    panic!("remote {last:?} is ahead of the last change {current:?}");
                };

                let deltas = list
                    .get_previous(last, to)
                    .into_iter()
                    .map(|change| change.backward().clone())
                    .collect();
                let state = if applied {
                    RemoteState::AtCurrent {
                        last: Some(current),
                    }
                } else {
                    RemoteState::Behind {
                        last: list.previous(current),
                    }
                };
                SyncPlan { deltas, state }
            }
            RemoteState::AtCurrent { last } => match view.current() {
                Some(current) if !applied => SyncPlan {
                    deltas: vec![list.value(current).backward().clone()],
                    state: RemoteState::Behind {
                        last: list.previous(current),
                    },
                },
                _ => SyncPlan::unchanged(RemoteState::AtCurrent { last }),
            },
        }
    }

    /// Flushes if either threshold is crossed.
    ///
    /// Returns true if a flush happened.
    pub fn maybe_upload(&mut self, view: HistoryView<'_, D>) -> bool {
        let plan = self.plan(view);
        let owed = plan.deltas.len() + self.pruned.len();
        let elapsed = self.clock.now().saturating_duration_since(self.last_upload);

        let too_many = owed > self.config.max_new_local_changes;
        let too_old = elapsed > self.config.max_time_since_last_upload;
        if !too_many && !too_old {
            trace!(owed, ?elapsed, "upload deferred");
            return false;
        }

        debug!(owed, too_many, too_old, "flushing");
        self.commit(plan);
        true
    }

    /// Flushes regardless of thresholds.
    pub fn flush(&mut self, view: HistoryView<'_, D>) {
        let plan = self.plan(view);
        self.commit(plan);
    }

    fn commit(&mut self, plan: SyncPlan<D>) {
        let mut batch = std::mem::take(&mut self.pruned);
        batch.extend(plan.deltas);
        self.state = plan.state;

        let now = self.clock.now();
        self.last_upload = now;
        self.stats.last_upload = Some(now);

        if batch.is_empty() {
            return;
        }
        info!(deltas = batch.len(), remote = ?self.state, "uploading batch");
        self.stats.uploads += 1;
        self.stats.deltas_uploaded += batch.len() as u64;
        self.transport.upload(batch);
    }

    /// The remote's state.
    pub fn state(&self) -> RemoteState {
        self.state
    }

    /// The remote's position relative to the cursor.
    pub fn position(&self) -> RemotePosition {
        self.state.position()
    }

    /// The last node the remote has applied.
    pub fn remote_node(&self) -> Option<NodeId> {
        self.state.last()
    }

    /// Backward deltas owed for pruned changes, not yet uploaded.
    pub fn pruned_deltas(&self) -> &[D] {
        &self.pruned
    }

    /// Upload statistics.
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// The configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn remote_is_current(&self, view: HistoryView<'_, D>) -> bool {
        self.state.last().is_some() && self.state.last() == view.current()
    }
}

impl<D: Delta, T: UploadTransport<D>, C: Clock> HistoryObserver<D>
    for RemoteSynchronizer<D, T, C>
{
    fn before_moving_back(&mut self, view: HistoryView<'_, D>) {
        if !self.remote_is_current(view) {
            return;
        }
        if let Some(last) = self.state.last() {
            trace!(?last, "remote is now ahead");
            self.state = RemoteState::Ahead { last };
        }
    }

    fn before_moving_forward(&mut self, view: HistoryView<'_, D>) {
        if self.remote_is_current(view) {
            trace!(last = ?self.state.last(), "remote is now behind");
            self.state = RemoteState::Behind {
                last: self.state.last(),
            };
        }
    }

    fn after_moving(&mut self, view: HistoryView<'_, D>) {
        if self.remote_is_current(view) {
            trace!(last = ?self.state.last(), "remote is at current");
            self.state = RemoteState::AtCurrent {
                last: self.state.last(),
            };
        }
    }

    fn after_appending(&mut self, _view: HistoryView<'_, D>) {
        self.state = RemoteState::Behind {
            last: self.state.last(),
        };
    }

    fn before_pruning(&mut self, view: HistoryView<'_, D>) {
        let from = self.state;
        let plan = self.plan(view);
        if !plan.is_rollback(from, view) {
            return;
        }

        debug!(
            captured = plan.deltas.len(),
            remote = ?plan.state,
            "capturing deltas owed for pruned changes"
        );
        self.stats.pruned_deltas_captured += plan.deltas.len() as u64;
        self.pruned.extend(plan.deltas);
        self.state = plan.state;
    }

    fn after_transition(&mut self, view: HistoryView<'_, D>) {
        self.maybe_upload(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::transport::MockTransport;
    use std::convert::Infallible;
    use std::time::Duration;
    use worldedit_history::{Change, ChangeHistory};

    /// A delta that only carries a label; the model is a list of labels.
    #[derive(Debug, Clone, PartialEq)]
    struct Label(&'static str);

    impl Delta for Label {
        type Model = Vec<&'static str>;
        type Error = Infallible;

        fn apply(&self, model: &mut Vec<&'static str>) -> Result<(), Infallible> {
            model.push(self.0);
            Ok(())
        }
    }

    fn change(forward: &'static str, backward: &'static str) -> Change<Label> {
        Change::new(Label(forward), Label(backward))
    }

    type TestSync = RemoteSynchronizer<Label, MockTransport<Label>, ManualClock>;

    struct Fixture {
        history: ChangeHistory<Label, TestSync>,
        model: Vec<&'static str>,
        transport: MockTransport<Label>,
        clock: ManualClock,
    }

    impl Fixture {
        fn new(max_changes: usize) -> Self {
            let transport = MockTransport::new();
            let clock = ManualClock::new();
            let config = SyncConfig::new(max_changes, Duration::from_secs(60));
            let sync = RemoteSynchronizer::with_clock(config, transport.clone(), clock.clone());
            Self {
                history: ChangeHistory::with_observer(sync),
                model: Vec::new(),
                transport,
                clock,
            }
        }

        fn edit(&mut self, n: usize) {
            const FORWARD: [&str; 6] = ["c1.f", "c2.f", "c3.f", "c4.f", "c5.f", "c6.f"];
            const BACKWARD: [&str; 6] = ["c1.b", "c2.b", "c3.b", "c4.b", "c5.b", "c6.b"];
            self.history.set_current(change(FORWARD[n - 1], BACKWARD[n - 1]));
        }

        fn undo(&mut self) {
            self.history.undo(&mut self.model).unwrap();
        }

        fn redo(&mut self) {
            self.history.redo(&mut self.model).unwrap();
        }

        fn sync(&self) -> &TestSync {
            self.history.observer()
        }

        fn plan(&self) -> Vec<&'static str> {
            self.sync()
                .plan(self.history.view())
                .deltas
                .into_iter()
                .map(|d| d.0)
                .collect()
        }

        fn flush(&mut self) {
            self.history
                .with_observer_view(|sync, view| sync.flush(view));
        }

        fn node(&self, index: usize) -> NodeId {
            self.history.changes().ids().nth(index).unwrap()
        }

        fn uploads(&self) -> Vec<Vec<&'static str>> {
            self.transport
                .batches()
                .into_iter()
                .map(|batch| batch.into_iter().map(|d| d.0).collect())
                .collect()
        }
    }

    #[test]
    fn behind_plan_sends_forward_deltas_in_order() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.edit(3);

        assert_eq!(f.sync().state(), RemoteState::INITIAL);
        assert_eq!(f.plan(), vec!["c1.f", "c2.f", "c3.f"]);
        assert_eq!(
            f.sync().plan(f.history.view()).state,
            RemoteState::AtCurrent {
                last: Some(f.node(2))
            }
        );
    }

    #[test]
    fn ahead_plan_rolls_back_from_remote_node() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.edit(3);
        f.flush();
        assert_eq!(f.sync().position(), RemotePosition::AtCurrent);

        f.undo();
        f.undo();
        f.undo();
        assert_eq!(f.sync().position(), RemotePosition::Ahead);
        assert_eq!(f.sync().remote_node(), Some(f.node(2)));
        assert_eq!(f.plan(), vec!["c3.b", "c2.b", "c1.b"]);
        assert_eq!(
            f.sync().plan(f.history.view()).state,
            RemoteState::Behind { last: None }
        );
    }

    #[test]
    fn undo_at_remote_owes_one_backward_delta() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.flush();

        f.undo();
        assert_eq!(f.sync().position(), RemotePosition::AtCurrent);
        assert_eq!(f.plan(), vec!["c2.b"]);

        f.flush();
        assert_eq!(
            f.sync().state(),
            RemoteState::Behind {
                last: Some(f.node(0))
            }
        );
        assert_eq!(f.plan(), Vec::<&str>::new());
    }

    #[test]
    fn behind_with_undone_current_already_caught_up() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.flush();
        f.undo();
        f.flush();

        // Remote holds c1; cursor is c2 undone.
        f.undo();
        assert_eq!(f.sync().position(), RemotePosition::AtCurrent);
        assert_eq!(f.plan(), vec!["c1.b"]);
    }

    #[test]
    fn redo_after_rollback_resends_forward() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.edit(3);
        f.flush();
        f.undo();
        f.undo();
        f.undo();
        f.flush();
        assert_eq!(f.uploads()[1], vec!["c3.b", "c2.b", "c1.b"]);

        f.redo();
        f.redo();
        assert_eq!(f.plan(), vec!["c1.f", "c2.f"]);
        f.flush();
        assert_eq!(f.sync().position(), RemotePosition::AtCurrent);
        assert_eq!(f.sync().remote_node(), Some(f.node(1)));
    }

    #[test]
    fn redo_while_ahead_shrinks_rollback() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.edit(3);
        f.flush();
        f.undo();
        f.undo();
        f.undo();
        f.redo();

        assert_eq!(f.plan(), vec!["c3.b", "c2.b"]);
        f.redo();
        f.redo();
        f.redo();
        assert_eq!(f.sync().position(), RemotePosition::AtCurrent);
        assert!(f.plan().is_empty());
    }

    #[test]
    fn fourth_edit_crosses_change_threshold() {
        let mut f = Fixture::new(3);
        f.edit(1);
        f.edit(2);
        f.edit(3);
        assert_eq!(f.transport.upload_count(), 0);

        f.edit(4);
        assert_eq!(f.uploads(), vec![vec!["c1.f", "c2.f", "c3.f", "c4.f"]]);
        assert!(f.sync().pruned_deltas().is_empty());
        assert_eq!(f.sync().position(), RemotePosition::AtCurrent);
        assert_eq!(f.sync().stats().uploads, 1);
        assert_eq!(f.sync().stats().deltas_uploaded, 4);
    }

    #[test]
    fn time_threshold_flushes_on_next_transition() {
        let mut f = Fixture::new(100);
        f.edit(1);
        assert_eq!(f.transport.upload_count(), 0);

        f.clock.advance(Duration::from_secs(61));
        f.edit(2);
        assert_eq!(f.uploads(), vec![vec!["c1.f", "c2.f"]]);

        f.clock.advance(Duration::from_secs(30));
        f.edit(3);
        assert_eq!(f.transport.upload_count(), 1);
    }

    #[test]
    fn empty_flush_does_not_call_transport() {
        let mut f = Fixture::new(0);
        f.clock.advance(Duration::from_secs(120));
        f.flush();
        assert_eq!(f.transport.upload_count(), 0);
        assert!(f.sync().stats().last_upload.is_some());
    }

    #[test]
    fn zero_threshold_uploads_every_change() {
        let mut f = Fixture::new(0);
        f.edit(1);
        f.edit(2);
        f.undo();
        assert_eq!(f.uploads(), vec![vec!["c1.f"], vec!["c2.f"], vec!["c2.b"]]);
    }

    #[test]
    fn pruning_while_ahead_captures_owed_deltas() {
        let mut f = Fixture::new(2);
        f.edit(1);
        f.edit(2);
        f.edit(3);
        assert_eq!(f.uploads(), vec![vec!["c1.f", "c2.f", "c3.f"]]);

        f.undo();
        f.undo();
        assert_eq!(f.sync().position(), RemotePosition::Ahead);

        f.edit(4);
        assert_eq!(f.sync().stats().pruned_deltas_captured, 2);
        assert_eq!(
            f.uploads()[1],
            vec!["c3.b", "c2.b", "c4.f"],
            "pruned backward deltas come before new forward deltas"
        );
        assert!(f.sync().pruned_deltas().is_empty());
        assert_eq!(f.sync().position(), RemotePosition::AtCurrent);
    }

    #[test]
    fn pruned_deltas_wait_for_threshold() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.flush();
        f.undo();

        f.edit(3);
        assert_eq!(f.sync().pruned_deltas(), &[Label("c2.b")]);
        assert_eq!(f.transport.upload_count(), 1);
        assert_eq!(f.plan(), vec!["c3.f"]);

        f.flush();
        assert_eq!(f.uploads()[1], vec!["c2.b", "c3.f"]);
    }

    #[test]
    fn pruning_everything_leaves_remote_at_start() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.flush();
        f.undo();
        f.undo();

        f.edit(3);
        assert_eq!(f.history.len(), 1);
        assert_eq!(f.sync().pruned_deltas(), &[Label("c2.b"), Label("c1.b")]);
        assert_eq!(f.sync().remote_node(), None);
        assert_eq!(f.plan(), vec!["c3.f"]);
    }

    #[test]
    fn pruning_unsynced_changes_owes_nothing() {
        let mut f = Fixture::new(10);
        f.edit(1);
        f.edit(2);
        f.undo();
        f.undo();
        f.edit(3);

        assert!(f.sync().pruned_deltas().is_empty());
        assert_eq!(f.plan(), vec!["c3.f"]);
    }

    #[test]
    fn remote_is_current_iff_at_current() {
        let mut f = Fixture::new(1);
        let steps: [fn(&mut Fixture); 9] = [
            |f| f.edit(1),
            |f| f.edit(2),
            |f| f.undo(),
            |f| f.undo(),
            |f| f.redo(),
            |f| f.edit(3),
            |f| f.undo(),
            |f| f.redo(),
            |f| f.redo(),
        ];
        for step in steps {
            step(&mut f);
            let at_current = f.sync().position() == RemotePosition::AtCurrent;
            let same_node = f.sync().remote_node() == f.history.cursor().current;
            assert_eq!(at_current, same_node);
        }
    }
}
