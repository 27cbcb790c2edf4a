//! Shared storage for composite values.
//!
//! Every composite kind (arrays, records, maps, buffers, ...) lives behind a
//! `Shared<T>`: an `Arc` plus a `parking_lot` lock. Cloning a `Shared` clones
//! the handle, not the data, which is what gives composite values identity
//! and lets two `Value`s alias the same storage.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// A shared, mutable allocation with a stable identity.
///
/// The identity is the address of the allocation and stays valid for as long
/// as any handle is alive. Callers that recurse through composite values must
/// snapshot the children and release the guard before descending; holding a
/// guard across recursion into an aliased child can deadlock.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    /// Allocate fresh shared storage holding `value`.
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Acquire a read guard.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read()
    }

    /// Acquire a write guard.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write()
    }

    /// The stable address of the allocation, used as the identity key by the
    /// engine's caches.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Whether two handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Shared").field(&*self.0.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_alias_one_allocation() {
        let a = Shared::new(vec![1, 2, 3]);
        let b = a.clone();
        b.write().push(4);
        assert_eq!(*a.read(), vec![1, 2, 3, 4]);
        assert!(a.ptr_eq(&b));
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn fresh_allocations_have_distinct_identities() {
        let a = Shared::new(0u8);
        let b = Shared::new(0u8);
        assert_ne!(a.identity(), b.identity());
        assert!(!a.ptr_eq(&b));
    }
}
