//! Per-class claim index.
//!
//! A [`ClaimIndex`] binds logical keys to hardware handles and tracks the
//! claim state of each binding. Entries are never created implicitly: a key
//! that was not registered at scan time cannot be claimed later.

use crate::error::{Result, WarmBootError};
use crate::key::ResourceClass;
use sonic_hw::{HwHandle, HwObjectKind, RawHandle};
use sonic_types::VlanId;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of a cached entry within one boot generation.
///
/// `Unclaimed` moves to either `Claimed` (reused by the new generation) or
/// `Deleted` (removed during the sweep). Neither transition reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimState {
    Unclaimed,
    Claimed,
    Deleted,
}

/// Whether distinct keys may share a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleMode {
    /// Each handle is bound to exactly one key.
    Unique,
    /// Several keys may bind the same handle (a stat shared by ACL entries,
    /// one mirror serving many ports).
    Shared,
}

/// Anything that can be stored as the handle side of an index.
pub trait IndexHandle: Copy + Ord + fmt::Debug {
    fn raw(&self) -> RawHandle;
}

impl<T: HwObjectKind> IndexHandle for HwHandle<T> {
    fn raw(&self) -> RawHandle {
        self.as_raw()
    }
}

/// VLANs are addressed by their tag.
impl IndexHandle for VlanId {
    fn raw(&self) -> RawHandle {
        RawHandle::from(self.as_u16())
    }
}

#[derive(Debug, Clone)]
struct Slot<H> {
    handle: H,
    state: ClaimState,
}

/// Key to handle bindings for one resource class.
#[derive(Debug, Clone)]
pub struct ClaimIndex<K, H> {
    class: ResourceClass,
    mode: HandleMode,
    entries: BTreeMap<K, Slot<H>>,
    owners: BTreeMap<H, K>,
}

impl<K, H> ClaimIndex<K, H>
where
    K: Ord + Clone + fmt::Display,
    H: IndexHandle,
{
    pub fn new(class: ResourceClass, mode: HandleMode) -> Self {
        Self {
            class,
            mode,
            entries: BTreeMap::new(),
            owners: BTreeMap::new(),
        }
    }

    pub fn class(&self) -> ResourceClass {
        self.class
    }

    /// Binds `key` to `handle`.
    ///
    /// A key that is already bound is a duplicate registration, as is a
    /// handle already bound to another key in [`HandleMode::Unique`] mode.
    pub fn register(&mut self, key: K, handle: H) -> Result<()> {
        if let Some(existing) = self.entries.get(&key) {
            return Err(WarmBootError::duplicate(
                self.class,
                &key,
                existing.handle.raw(),
            ));
        }
        if self.mode == HandleMode::Unique {
            if let Some(other) = self.owners.get(&handle) {
                return Err(WarmBootError::duplicate(self.class, other, handle.raw()));
            }
            self.owners.insert(handle, key.clone());
        }
        self.entries.insert(
            key,
            Slot {
                handle,
                state: ClaimState::Unclaimed,
            },
        );
        Ok(())
    }

    /// Returns the handle bound to `key` unless it has been deleted.
    pub fn find(&self, key: &K) -> Option<H> {
        self.entries
            .get(key)
            .filter(|slot| slot.state != ClaimState::Deleted)
            .map(|slot| slot.handle)
    }

    pub fn state(&self, key: &K) -> Option<ClaimState> {
        self.entries.get(key).map(|slot| slot.state)
    }

    pub fn contains_handle(&self, handle: H) -> bool {
        match self.mode {
            HandleMode::Unique => self.owners.contains_key(&handle),
            HandleMode::Shared => self.entries.values().any(|slot| slot.handle == handle),
        }
    }

    /// Marks `key` as reused. Claiming twice is a no-op; returns whether the
    /// state changed.
    pub fn mark_claimed(&mut self, key: &K) -> Result<bool> {
        let slot = self
            .entries
            .get_mut(key)
            .ok_or_else(|| WarmBootError::invalid_claim(self.class, key))?;
        match slot.state {
            ClaimState::Claimed => Ok(false),
            ClaimState::Unclaimed => {
                slot.state = ClaimState::Claimed;
                Ok(true)
            }
            ClaimState::Deleted => Err(WarmBootError::invalid_claim(self.class, key)),
        }
    }

    /// Records that the sweep removed `key` from hardware.
    pub(crate) fn mark_deleted(&mut self, key: &K) {
        if let Some(slot) = self.entries.get_mut(key) {
            if slot.state == ClaimState::Unclaimed {
                slot.state = ClaimState::Deleted;
            }
        }
    }

    /// Unclaimed bindings in key order.
    pub fn unclaimed(&self) -> Vec<(K, H)> {
        self.with_state(ClaimState::Unclaimed)
    }

    pub fn claimed(&self) -> Vec<(K, H)> {
        self.with_state(ClaimState::Claimed)
    }

    fn with_state(&self, state: ClaimState) -> Vec<(K, H)> {
        self.entries
            .iter()
            .filter(|(_, slot)| slot.state == state)
            .map(|(key, slot)| (key.clone(), slot.handle))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, H, ClaimState)> {
        self.entries
            .iter()
            .map(|(key, slot)| (key, slot.handle, slot.state))
    }

    pub fn count(&self, state: ClaimState) -> usize {
        self.entries.values().filter(|s| s.state == state).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
