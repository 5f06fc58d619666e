//! Update batch and its planning state
//!
//! A batch starts `Resolved` (dependencies pinned, own versions unknown) and
//! becomes `Planned` once every member has its next version. Only a planned
//! batch can produce the `BatchIndex` that dependency rewriting reads.

use crate::domain::{ComponentId, ComponentKey, UpdateItem};
use crate::error::UpdateError;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

/// Dependencies resolved, own versions not yet assigned
#[derive(Debug)]
pub struct Resolved;

/// Every member carries its next version
#[derive(Debug)]
pub struct Planned;

/// Ordered update items processed together
#[derive(Debug)]
pub struct Batch<S> {
    items: Vec<UpdateItem>,
    _state: PhantomData<S>,
}

impl<S> Batch<S> {
    pub fn items(&self) -> &[UpdateItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current ids of all members
    pub fn ids(&self) -> Vec<ComponentId> {
        self.items.iter().map(|item| item.id().clone()).collect()
    }

    pub fn into_items(self) -> Vec<UpdateItem> {
        self.items
    }
}

impl Batch<Resolved> {
    /// Create a batch, rejecting the same component twice
    pub fn new(items: Vec<UpdateItem>) -> Result<Self, UpdateError> {
        let mut seen = HashSet::new();
        for item in &items {
            let key = item.id().key();
            if !seen.insert(key.clone()) {
                return Err(UpdateError::DuplicateComponent {
                    id: key.to_string(),
                });
            }
        }
        Ok(Self {
            items,
            _state: PhantomData,
        })
    }

    pub(super) fn items_mut(&mut self) -> &mut [UpdateItem] {
        &mut self.items
    }

    pub(super) fn into_planned(self) -> Batch<Planned> {
        Batch {
            items: self.items,
            _state: PhantomData,
        }
    }
}

impl Batch<Planned> {
    pub fn items_mut(&mut self) -> &mut [UpdateItem] {
        &mut self.items
    }

    /// Index of every member's planned id
    pub fn index(&self) -> BatchIndex {
        BatchIndex {
            planned: self
                .items
                .iter()
                .map(|item| (item.id().key(), item.id().clone()))
                .collect(),
        }
    }
}

/// Planned ids of a batch keyed by identity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchIndex {
    planned: HashMap<ComponentKey, ComponentId>,
}

impl BatchIndex {
    /// Planned id of a member, any version of `id` matches
    pub fn get(&self, id: &ComponentId) -> Option<&ComponentId> {
        self.planned.get(&id.key())
    }

    pub fn contains(&self, id: &ComponentId) -> bool {
        self.planned.contains_key(&id.key())
    }

    /// The planned id for a member, `id` itself otherwise
    pub fn pin(&self, id: &ComponentId) -> ComponentId {
        self.get(id).cloned().unwrap_or_else(|| id.clone())
    }

    pub fn len(&self) -> usize {
        self.planned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planned.is_empty()
    }
}
