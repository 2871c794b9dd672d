// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Atomically swappable shared pointer.

use std::sync::{Arc, PoisonError, RwLock};

/// A slot holding an optional `Arc<T>`.
///
/// The lock is held only for the pointer load or store, never while a value
/// is being computed, so readers on different paths never wait on each other
/// and readers on the same path wait at most for a pointer copy.
#[derive(Debug)]
pub struct AtomicSlot<T: ?Sized> {
    value: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> Default for AtomicSlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ?Sized> AtomicSlot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }

    /// Creates a slot holding `value`.
    #[must_use]
    pub fn new(value: Arc<T>) -> Self {
        Self {
            value: RwLock::new(Some(value)),
        }
    }

    /// Returns the current value.
    #[must_use]
    pub fn load(&self) -> Option<Arc<T>> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns whether the slot holds a value.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replaces the value, returning the previous one.
    pub fn store(&self, value: Option<Arc<T>>) -> Option<Arc<T>> {
        let mut guard = self.value.write().unwrap_or_else(PoisonError::into_inner);
        core::mem::replace(&mut *guard, value)
    }

    /// Empties the slot, returning the previous value.
    pub fn take(&self) -> Option<Arc<T>> {
        self.store(None)
    }

    /// Stores `value` unless the slot is already set; returns whichever value
    /// the slot holds afterwards.
    pub fn get_or_publish(&self, value: Arc<T>) -> Arc<T> {
        let mut guard = self.value.write().unwrap_or_else(PoisonError::into_inner);
        guard.get_or_insert(value).clone()
    }
}
