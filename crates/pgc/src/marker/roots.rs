//! Root Set - GC Root Management
//!
//! Roots are the starting points for marking. There is no stack scanning:
//! the embedding program pushes and pops `ObjRef`s explicitly, the way a VM
//! pushes operands onto its value stack.
//!
//! ```text
//! bottom                                   top
//! ┌──────┬──────┬──────┬──────┬──────┬──────┐
//! │ #0:0 │ #1:0 │ #0:1 │ #1:1 │ #0:2 │ ...  │
//! └──────┴──────┴──────┴──────┴──────┴──────┘
//!   w0     w1     w0     w1     w0            (round-robin split, 2 workers)
//! ```
//!
//! # Thread Safety
//!
//! `RootSet` itself is not synchronized; the collector keeps it behind its
//! allocation mutex, so a collection always sees a consistent snapshot.

use crate::object::ObjRef;

/// RootSet - ordered stack of root references
#[derive(Debug, Default, Clone)]
pub struct RootSet {
    roots: Vec<ObjRef>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, r: ObjRef) {
        self.roots.push(r);
    }

    pub fn pop(&mut self) -> Option<ObjRef> {
        self.roots.pop()
    }

    /// Drop every root above `len`
    pub fn truncate(&mut self, len: usize) {
        self.roots.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.roots.iter().copied()
    }

    pub fn as_slice(&self) -> &[ObjRef] {
        &self.roots
    }

    /// Roots from `start` upward
    pub fn from(&self, start: usize) -> &[ObjRef] {
        self.roots.get(start..).unwrap_or(&[])
    }

    /// Rewrite every root through `remap`, stopping at the first error
    pub fn remap<E>(&mut self, mut remap: impl FnMut(ObjRef) -> Result<ObjRef, E>) -> Result<(), E> {
        for root in &mut self.roots {
            *root = remap(*root)?;
        }
        Ok(())
    }

    /// Deal the roots out round-robin, one list per worker
    ///
    /// Duplicates are kept; the mark bit filters them.
    pub fn split(&self, workers: usize) -> Vec<Vec<ObjRef>> {
        let workers = workers.max(1);
        let mut lists = vec![Vec::with_capacity(self.roots.len() / workers + 1); workers];
        for (i, root) in self.roots.iter().enumerate() {
            lists[i % workers].push(*root);
        }
        lists
    }
}
