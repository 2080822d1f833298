//! Slot arena holding every live request and its transport.
//!
//! Requests live in a `Vec` of slots recycled through a free list. A doubly
//! linked list threaded through slot indices keeps them in reverse insertion
//! order, so insertion at the head and removal are both O(1) without any
//! pointer surgery. A `BTreeMap` index answers membership checks by id.

use super::request::{Request, RequestId};
use crate::network::error::Error;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// A registered request and the transport driving it.
///
/// The transport is `None` once it has been cleaned up.
#[derive(Debug)]
pub(crate) struct Entry<T> {
    pub(crate) request: Request,
    pub(crate) transport: Option<T>,
}

#[derive(Debug)]
struct Slot<T> {
    entry: Option<Entry<T>>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: Option<usize>,
    index: BTreeMap<RequestId, usize>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            index: BTreeMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Insert at the head of the list.
    ///
    /// Ids wrap after `u32::MAX` requests, so an id may come round again while
    /// its previous holder is still registered; such an entry is refused.
    /// On failure the entry is handed back so the caller decides how to
    /// dispose of it.
    pub(crate) fn push_front(&mut self, entry: Entry<T>) -> Result<usize, (Entry<T>, Error)> {
        let id = entry.request.id();
        if self.index.contains_key(&id) {
            return Err((entry, Error::IdInUse));
        }
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                // Reserve the free list too, so removal never allocates.
                if self.slots.try_reserve(1).is_err()
                    || self.free.try_reserve(self.slots.len() + 1).is_err()
                {
                    return Err((entry, Error::OutOfMemory));
                }
                self.slots.push(Slot {
                    entry: None,
                    prev: None,
                    next: None,
                });
                self.slots.len() - 1
            }
        };

        let old_head = self.head;
        self.slots[slot] = Slot {
            entry: Some(entry),
            prev: None,
            next: old_head,
        };
        if let Some(old) = old_head {
            self.slots[old].prev = Some(slot);
        }
        self.head = Some(slot);
        self.index.insert(id, slot);
        Ok(slot)
    }

    /// Unlink `slot` and hand back its entry.
    pub(crate) fn remove(&mut self, slot: usize) -> Option<Entry<T>> {
        let entry = self.slots.get_mut(slot)?.entry.take()?;
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);

        match prev {
            Some(prev) => self.slots[prev].next = next,
            None => self.head = next,
        }
        if let Some(next) = next {
            self.slots[next].prev = prev;
        }

        self.slots[slot].prev = None;
        self.slots[slot].next = None;
        self.index.remove(&entry.request.id());
        self.free.push(slot);
        Some(entry)
    }

    /// Slot of the request with this id, if it is registered.
    pub(crate) fn find(&self, id: RequestId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&Entry<T>> {
        self.slots.get(slot)?.entry.as_ref()
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut Entry<T>> {
        self.slots.get_mut(slot)?.entry.as_mut()
    }

    /// First slot in list order.
    pub(crate) fn first(&self) -> Option<usize> {
        self.head
    }

    /// Slot following `slot` in list order.
    pub(crate) fn next(&self, slot: usize) -> Option<usize> {
        self.slots.get(slot)?.next
    }

    /// Ids in list order, newest first.
    pub(crate) fn ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        let mut cursor = self.head;
        core::iter::from_fn(move || {
            let slot = cursor?;
            cursor = self.next(slot);
            self.get(slot).map(|entry| entry.request.id())
        })
    }
}
