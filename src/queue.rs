//! Priority ordering of pending references.
//!
//! References whose target sits fewer pointer segments below its document
//! root come out first, then references found shallower in their own
//! document, then insertion order. Resolving shallow targets first makes it
//! more likely that a pointer running through another reference's location
//! finds that location already resolved. It is a heuristic: the resolver
//! still copes with the remaining cases by resolving intermediate markers
//! on demand.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use url::Url;

use crate::graph::NodeId;

/// A reference found during discovery and not yet resolved.
#[derive(Debug, Clone)]
pub struct PendingRef {
    /// Slot holding the reference marker.
    pub marker: NodeId,
    /// Absolute target URI, fragment included.
    pub target: Url,
    /// Path segments in the target's fragment.
    pub pointer_depth: usize,
    /// Nesting depth of the marker's parent in its own document.
    pub depth: usize,
    seq: u64,
}

impl PendingRef {
    fn key(&self) -> (usize, usize, u64) {
        (self.pointer_depth, self.depth, self.seq)
    }
}

impl PartialEq for PendingRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PendingRef {}

impl PartialOrd for PendingRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-heap of [`PendingRef`]s shared by every document of one load call.
#[derive(Debug, Default)]
pub struct RefQueue {
    heap: BinaryHeap<Reverse<PendingRef>>,
    next_seq: u64,
}

impl RefQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a new reference.
    pub fn push(&mut self, marker: NodeId, target: Url, pointer_depth: usize, depth: usize) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(PendingRef {
            marker,
            target,
            pointer_depth,
            depth,
            seq,
        }));
    }

    /// Put back a reference popped earlier, keeping its original position.
    pub(crate) fn requeue(&mut self, pending: PendingRef) {
        self.heap.push(Reverse(pending));
    }

    pub fn pop(&mut self) -> Option<PendingRef> {
        self.heap.pop().map(|Reverse(pending)| pending)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
