//! Arena-backed doubly linked list.

use std::fmt;
use std::iter::FusedIterator;

/// Stable, non-owning handle to a node in a [`HistoryList`].
///
/// A handle stays valid while its node is linked. Freed slots are reused
/// with a bumped generation, so a stale handle never aliases a newer node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.index, self.generation)
    }
}

struct Node<T> {
    value: T,
    previous: Option<NodeId>,
    next: Option<NodeId>,
}

struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

/// An insertion-ordered list with O(1) push, insert and removal by handle.
///
/// The list exclusively owns its nodes. Passing a handle that does not
/// belong to the list (foreign, stale or removed) is a programming error
/// and panics.
///
/// # Invariants
///
/// - `head` has no previous node, `tail` has no next node
/// - `len` equals the number of occupied slots
/// - every occupied slot is reachable from `head`
pub struct HistoryList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> HistoryList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the first node.
    pub fn head(&self) -> Option<NodeId> {
        self.head
    }

    /// Returns the last node.
    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    /// Returns true if `id` refers to a node currently linked in this list.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot_node(id).is_some()
    }

    /// Returns the value at `id`, or `None` if the handle is not a member.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slot_node(id).map(|node| &node.value)
    }

    /// Returns the value at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a member of this list.
    pub fn value(&self, id: NodeId) -> &T {
        &self.node(id).value
    }

    /// Returns the node after `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a member of this list.
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next
    }

    /// Returns the node before `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a member of this list.
    pub fn previous(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).previous
    }

    /// Appends a value at the tail.
    pub fn push(&mut self, value: T) -> NodeId {
        let previous = self.tail;
        let id = self.allocate(value, previous, None);
        match previous {
            Some(tail) => self.node_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Inserts a value immediately after `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a member of this list.
    pub fn insert_after(&mut self, node: NodeId, value: T) -> NodeId {
        let next = self.node(node).next;
        let id = self.allocate(value, Some(node), next);
        self.node_mut(node).next = Some(id);
        match next {
            Some(next) => self.node_mut(next).previous = Some(id),
            None => self.tail = Some(id),
        }
        id
    }

    /// Detaches `node` from the list, relinking its neighbours.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a member of this list.
    pub fn remove(&mut self, node: NodeId) -> T {
        let (previous, next) = {
            let entry = self.node(node);
            (entry.previous, entry.next)
        };
        match previous {
            Some(previous) => self.node_mut(previous).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).previous = previous,
            None => self.tail = previous,
        }
        self.release(node)
    }

    /// Removes every node strictly after `node`, leaving it as the tail.
    ///
    /// Runs in time proportional to the number of removed nodes. Returns
    /// the removed values in list order.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not a member of this list.
    pub fn remove_after(&mut self, node: NodeId) -> Vec<T> {
        let mut cursor = self.node_mut(node).next.take();
        self.tail = Some(node);

        let mut removed = Vec::new();
        while let Some(id) = cursor {
            cursor = self.node(id).next;
            removed.push(self.release(id));
        }
        removed
    }

    /// Removes every node.
    ///
    /// Handles issued before the call become stale.
    pub fn clear(&mut self) {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            cursor = self.node(id).next;
            self.release(id);
        }
        self.head = None;
        self.tail = None;
    }

    /// Collects the values from `from` to `to` inclusive, walking forward.
    ///
    /// # Panics
    ///
    /// Panics if either handle is not a member of this list, or if `to`
    /// cannot be reached from `from` by following `next` links.
    pub fn get_next(&self, from: NodeId, to: NodeId) -> Vec<&T> {
        self.walk(from, to, |node| node.next, "forward")
    }

    /// Collects the values from `from` to `to` inclusive, walking backward.
    ///
    /// # Panics
    ///
    /// Panics if either handle is not a member of this list, or if `to`
    /// cannot be reached from `from` by following `previous` links.
    pub fn get_previous(&self, from: NodeId, to: NodeId) -> Vec<&T> {
        self.walk(from, to, |node| node.previous, "backward")
    }

    /// Iterates over the values from head to tail.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            entries: self.entries(),
        }
    }

    /// Iterates over `(handle, value)` pairs from head to tail.
    pub fn entries(&self) -> Entries<'_, T> {
        Entries {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Iterates over the node handles from head to tail.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries().map(|(id, _)| id)
    }

    fn walk(
        &self,
        from: NodeId,
        to: NodeId,
        step: impl Fn(&Node<T>) -> Option<NodeId>,
        direction: &str,
    ) -> Vec<&T> {
        // Validates membership of `to` before walking.
        self.node(to);

        let mut values = Vec::new();
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let node = self.node(id);
            values.push(&node.value);
            if id == to {
                return values;
            }
            cursor = step(node);
        }
        panic!("{to:?} is not reachable from {from:?} walking {direction}");
    }

    fn slot_node(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        match self.slot_node(id) {
            Some(node) => node,
            None => panic!("{id:?} does not belong to this list"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        let node = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut());
        match node {
            Some(node) => node,
            None => panic!("{id:?} does not belong to this list"),
        }
    }

    fn allocate(&mut self, value: T, previous: Option<NodeId>, next: Option<NodeId>) -> NodeId {
        let node = Node {
            value,
            previous,
            next,
        };
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("history list exceeded {} nodes", u32::MAX);
        });
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    fn release(&mut self, id: NodeId) -> T {
        let slot = &mut self.slots[id.index as usize];
        let node = match slot.node.take() {
            Some(node) => node,
            None => panic!("{id:?} was already released"),
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        node.value
    }
}

impl<T> Default for HistoryList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for HistoryList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a HistoryList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over `(handle, value)` pairs of a [`HistoryList`].
pub struct Entries<'a, T> {
    list: &'a HistoryList<T>,
    cursor: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for Entries<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.list.node(id);
        self.cursor = node.next;
        self.remaining -= 1;
        Some((id, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Entries<'_, T> {}
impl<T> FusedIterator for Entries<'_, T> {}

/// Iterator over the values of a [`HistoryList`].
pub struct Iter<'a, T> {
    entries: Entries<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}
