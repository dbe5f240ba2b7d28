//! Arena-backed doubly-linked deque.
//!
//! Nodes live in a slot arena and are addressed by [`NodeHandle`]s that carry
//! a generation counter. A handle to a removed node never aliases a node that
//! later reuses the same slot, which lets timeout handlers and the eviction
//! [`Cursor`] remove entries out of order without invalidating anyone else.

/// Stable reference to a node in a [`Deque`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    index: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    node: Option<Node<T>>,
}

/// Double-ended queue with O(1) operations at both ends and O(1) removal by
/// handle.
#[derive(Debug)]
pub struct Deque<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deque<T> {
    /// Create an empty deque.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the deque holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a value at the back.
    pub fn push(&mut self, value: T) -> NodeHandle {
        let index = self.allocate(value, self.tail, None);
        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.handle(index)
    }

    /// Prepend a value at the front.
    pub fn unshift(&mut self, value: T) -> NodeHandle {
        let index = self.allocate(value, None, self.head);
        match self.head {
            Some(head) => self.node_mut(head).prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.handle(index)
    }

    /// Remove and return the front value.
    pub fn shift(&mut self) -> Option<T> {
        let head = self.head?;
        self.unlink(head)
    }

    /// Remove and return the back value.
    pub fn pop(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.unlink(tail)
    }

    /// Remove the node a handle points at, if it is still live.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
        if !self.contains(handle) {
            return None;
        }
        self.unlink(handle.index)
    }

    /// Whether `handle` still refers to a live node.
    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.slots
            .get(handle.index)
            .is_some_and(|slot| slot.generation == handle.generation && slot.node.is_some())
    }

    /// Borrow the value behind a handle.
    #[must_use]
    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_ref().map(|node| &node.value)
    }

    /// Mutably borrow the value behind a handle.
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.node.as_mut().map(|node| &mut node.value)
    }

    /// Handle of the front node.
    #[must_use]
    pub fn head(&self) -> Option<NodeHandle> {
        self.head.map(|index| self.handle(index))
    }

    /// Handle of the back node.
    #[must_use]
    pub fn tail(&self) -> Option<NodeHandle> {
        self.tail.map(|index| self.handle(index))
    }

    /// Borrow the front value.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.head
            .and_then(|index| self.node(index))
            .map(|node| &node.value)
    }

    /// Borrow the back value.
    #[must_use]
    pub fn back(&self) -> Option<&T> {
        self.tail
            .and_then(|index| self.node(index))
            .map(|node| &node.value)
    }

    /// Iterate front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            deque: self,
            next: self.head,
        }
    }

    /// Keep only the values for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let Some(node) = self.node(index) else {
                break;
            };
            cursor = node.next;
            if !keep(&node.value) {
                self.unlink(index);
            }
        }
    }

    /// Create a cursor positioned before the front node.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor {
            upcoming: self.head(),
            last: None,
        }
    }

    fn handle(&self, index: usize) -> NodeHandle {
        NodeHandle {
            index,
            generation: self.slots[index].generation,
        }
    }

    fn node(&self, index: usize) -> Option<&Node<T>> {
        self.slots.get(index).and_then(|slot| slot.node.as_ref())
    }

    // Only called with indices reachable from head/tail/prev/next, which are
    // always occupied.
    #[allow(clippy::expect_used)]
    fn node_mut(&mut self, index: usize) -> &mut Node<T> {
        self.slots[index]
            .node
            .as_mut()
            .expect("linked index refers to an occupied slot")
    }

    fn allocate(&mut self, value: T, prev: Option<usize>, next: Option<usize>) -> usize {
        let node = Node { value, prev, next };
        self.len += 1;
        match self.free.pop() {
            Some(index) => {
                self.slots[index].node = Some(node);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn unlink(&mut self, index: usize) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        let node = slot.node.take()?;
        slot.generation += 1;
        self.free.push(index);
        self.len -= 1;

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }
        Some(node.value)
    }
}

/// Front-to-back iterator over a [`Deque`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    deque: &'a Deque<T>,
    next: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.deque.node(self.next?)?;
        self.next = node.next;
        Some(&node.value)
    }
}

/// Persistent forward cursor over a [`Deque`].
///
/// The cursor does not borrow the deque, so it can be stored next to it and
/// survive across calls. It reports exhaustion when it reaches the back, or
/// when the node it was about to visit was removed by someone else; callers
/// then [`reset`](Cursor::reset) it to the front.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    upcoming: Option<NodeHandle>,
    last: Option<NodeHandle>,
}

impl Cursor {
    /// Advance and return the handle of the next node.
    pub fn next<T>(&mut self, deque: &Deque<T>) -> Option<NodeHandle> {
        let handle = self.upcoming?;
        if !deque.contains(handle) {
            self.upcoming = None;
            return None;
        }
        self.upcoming = deque
            .node(handle.index)
            .and_then(|node| node.next)
            .map(|index| deque.handle(index));
        self.last = Some(handle);
        Some(handle)
    }

    /// Remove the node most recently returned by [`next`](Cursor::next).
    pub fn remove<T>(&mut self, deque: &mut Deque<T>) -> Option<T> {
        let handle = self.last.take()?;
        deque.remove(handle)
    }

    /// Move the cursor back before the front node.
    pub fn reset<T>(&mut self, deque: &Deque<T>) {
        self.upcoming = deque.head();
        self.last = None;
    }
}
