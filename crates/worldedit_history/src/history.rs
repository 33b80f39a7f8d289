//! Change history cursor.

use crate::delta::{Change, Delta};
use crate::list::{HistoryList, NodeId};
use tracing::{debug, trace};

/// Where the history currently stands.
///
/// `current == None` means the history is empty. When `applied` is true the
/// model reflects `current`'s forward delta; otherwise `current` has been
/// rolled back and, together with everything after it, is redo-future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// The node the cursor points at.
    pub current: Option<NodeId>,
    /// Whether `current` is applied to the model.
    pub applied: bool,
}

/// Read-only view of a history handed to observers.
pub struct HistoryView<'a, D> {
    list: &'a HistoryList<Change<D>>,
    cursor: Cursor,
}

impl<D> Clone for HistoryView<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for HistoryView<'_, D> {}

impl<'a, D> HistoryView<'a, D> {
    /// Creates a view over a list and a cursor.
    pub fn new(list: &'a HistoryList<Change<D>>, cursor: Cursor) -> Self {
        Self { list, cursor }
    }

    /// The list of changes.
    pub fn list(&self) -> &'a HistoryList<Change<D>> {
        self.list
    }

    /// The cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The node the cursor points at.
    pub fn current(&self) -> Option<NodeId> {
        self.cursor.current
    }

    /// Whether the current node is applied.
    pub fn is_current_applied(&self) -> bool {
        self.cursor.applied
    }

    /// The last node whose forward delta is reflected in the model.
    pub fn applied_tip(&self) -> Option<NodeId> {
        let current = self.cursor.current?;
        if self.cursor.applied {
            Some(current)
        } else {
            self.list.previous(current)
        }
    }
}

/// Receives notifications at every cursor transition.
///
/// All hooks default to no-ops. Hooks observe the history but can never
/// mutate it: list structure only changes inside [`ChangeHistory`].
pub trait HistoryObserver<D> {
    /// Called right before the cursor moves to the previous node.
    fn before_moving_back(&mut self, view: HistoryView<'_, D>) {
        let _ = view;
    }

    /// Called right before the cursor moves to the next node.
    fn before_moving_forward(&mut self, view: HistoryView<'_, D>) {
        let _ = view;
    }

    /// Called right after the cursor moved one node in either direction.
    fn after_moving(&mut self, view: HistoryView<'_, D>) {
        let _ = view;
    }

    /// Called after a new change was appended and became current.
    fn after_appending(&mut self, view: HistoryView<'_, D>) {
        let _ = view;
    }

    /// Called before undone changes are discarded, prior to any list mutation.
    fn before_pruning(&mut self, view: HistoryView<'_, D>) {
        let _ = view;
    }

    /// Called once at the end of every successful transition.
    fn after_transition(&mut self, view: HistoryView<'_, D>) {
        let _ = view;
    }
}

impl<D> HistoryObserver<D> for () {}

/// A linear undo/redo history of [`Change`]s.
///
/// Recording a change while some changes are undone discards them: there
/// is no branching timeline.
pub struct ChangeHistory<D, O = ()> {
    changes: HistoryList<Change<D>>,
    cursor: Cursor,
    observer: O,
}

impl<D: Delta> ChangeHistory<D> {
    /// Creates an empty history without an observer.
    pub fn new() -> Self {
        Self::with_observer(())
    }
}

impl<D: Delta> Default for ChangeHistory<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Delta, O: HistoryObserver<D>> ChangeHistory<D, O> {
    /// Creates an empty history that notifies `observer`.
    pub fn with_observer(observer: O) -> Self {
        Self {
            changes: HistoryList::new(),
            cursor: Cursor::default(),
            observer,
        }
    }

    /// Records a change that has already been applied to the model.
    ///
    /// Any undone changes are discarded first. The new change becomes
    /// current and applied.
    pub fn set_current(&mut self, change: Change<D>) -> NodeId {
        if self.cursor.current.is_some() {
            self.emit(|observer, view| observer.before_pruning(view));
            self.prune_undone_changes();
        }

        let node = self.changes.push(change);
        self.cursor = Cursor {
            current: Some(node),
            applied: true,
        };

        self.emit(|observer, view| observer.after_appending(view));
        self.emit(|observer, view| observer.after_transition(view));
        node
    }

    /// Rolls back one change.
    ///
    /// Returns `Ok(None)` when there is nothing to undo and `Err` when the
    /// model rejected the backward delta. In both cases nothing changes.
    pub fn undo(&mut self, model: &mut D::Model) -> Result<Option<&Change<D>>, D::Error> {
        let Some(current) = self.cursor.current else {
            return Ok(None);
        };

        let target = if self.cursor.applied {
            current
        } else {
            match self.changes.previous(current) {
                Some(previous) => previous,
                None => return Ok(None),
            }
        };

        self.changes.value(target).apply_backward(model)?;

        if target != current {
            self.emit(|observer, view| observer.before_moving_back(view));
            self.cursor.current = Some(target);
            self.emit(|observer, view| observer.after_moving(view));
        }
        self.cursor.applied = false;
        trace!(node = ?target, "undid change");

        self.emit(|observer, view| observer.after_transition(view));
        Ok(Some(self.changes.value(target)))
    }

    /// Reapplies one undone change.
    ///
    /// Returns `Ok(None)` when there is nothing to redo and `Err` when the
    /// model rejected the forward delta. In both cases nothing changes.
    pub fn redo(&mut self, model: &mut D::Model) -> Result<Option<&Change<D>>, D::Error> {
        let Some(current) = self.cursor.current else {
            return Ok(None);
        };

        let target = if self.cursor.applied {
            match self.changes.next(current) {
                Some(next) => next,
                None => return Ok(None),
            }
        } else {
            current
        };

        self.changes.value(target).apply_forward(model)?;

        if target != current {
            self.emit(|observer, view| observer.before_moving_forward(view));
            self.cursor.current = Some(target);
            self.emit(|observer, view| observer.after_moving(view));
        }
        self.cursor.applied = true;
        trace!(node = ?target, "redid change");

        self.emit(|observer, view| observer.after_transition(view));
        Ok(Some(self.changes.value(target)))
    }

    /// Runs `f` against the observer with a view of the history.
    ///
    /// Lets the observer's owner trigger work (for example a periodic flush)
    /// outside of cursor transitions.
    pub fn with_observer_view<R>(&mut self, f: impl FnOnce(&mut O, HistoryView<'_, D>) -> R) -> R {
        f(
            &mut self.observer,
            HistoryView::new(&self.changes, self.cursor),
        )
    }

    fn emit(&mut self, hook: impl FnOnce(&mut O, HistoryView<'_, D>)) {
        hook(
            &mut self.observer,
            HistoryView::new(&self.changes, self.cursor),
        );
    }

    fn prune_undone_changes(&mut self) {
        let Some(current) = self.cursor.current else {
            return;
        };

        let mut discarded = 0;
        if !self.cursor.applied {
            let previous = self.changes.previous(current);
            self.changes.remove(current);
            discarded += 1;
            self.cursor.current = previous;
        }

        match self.cursor.current {
            Some(current) => discarded += self.changes.remove_after(current).len(),
            None => {
                discarded += self.changes.len();
                self.changes.clear();
            }
        }
        self.cursor.applied = self.cursor.current.is_some();

        if discarded > 0 {
            debug!(discarded, remaining = self.changes.len(), "pruned undone changes");
        }
    }
}

impl<D, O> ChangeHistory<D, O> {
    /// The cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The current change, if any.
    pub fn current(&self) -> Option<&Change<D>> {
        self.cursor.current.map(|id| self.changes.value(id))
    }

    /// Whether the current change is applied.
    pub fn is_current_applied(&self) -> bool {
        self.cursor.applied
    }

    /// The recorded changes, oldest first.
    pub fn changes(&self) -> &HistoryList<Change<D>> {
        &self.changes
    }

    /// Returns the number of recorded changes, undone ones included.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if nothing was ever recorded.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// A read-only view of the list and cursor.
    pub fn view(&self) -> HistoryView<'_, D> {
        HistoryView::new(&self.changes, self.cursor)
    }

    /// The observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}
