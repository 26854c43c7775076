//! Generic object recycling
//!
//! Steady-state play must only ever reset pooled objects, never construct or
//! destroy them. Instances are created by `expand` (or by `acquire` when the
//! pool runs dry) and destroyed only by `shrink` and `clear`.
//!
//! Every instance is either `available` or `in_use`, never both, and
//! `available + in_use == total_created` between calls.

use std::collections::BTreeSet;

use serde::Serialize;

/// Capabilities every pooled object provides
pub trait Poolable {
    /// Construction/reset arguments
    type Args: Default;

    /// Reinitialize a recycled instance for a new lifetime
    fn reset(&mut self, args: &Self::Args);
    /// Called when the instance goes back to the available list
    fn deactivate(&mut self);
    /// Called once, right before the instance is destroyed
    fn dispose(&mut self);
}

/// Handle naming one pooled instance
///
/// The generation changes only when a slot is disposed and refilled, so a
/// handle stays valid across any number of acquire/release cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStats {
    pub available: usize,
    pub in_use: usize,
    pub total: usize,
    /// Rounded `in_use / total` percentage, 0 for an empty pool
    pub utilization_percent: u32,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Builds a fresh instance for the given slot
pub type Factory<T> = Box<dyn FnMut(PoolHandle, &<T as Poolable>::Args) -> T>;

/// Recycling container for one kind of object
pub struct ObjectPool<T: Poolable> {
    name: &'static str,
    slots: Vec<Slot<T>>,
    /// Indices of disposed slots waiting to be refilled
    vacant: Vec<u32>,
    available: Vec<PoolHandle>,
    in_use: BTreeSet<PoolHandle>,
    total_created: usize,
    factory: Factory<T>,
}

impl<T: Poolable> ObjectPool<T> {
    /// Create a pool and pre-allocate `initial_size` instances
    pub fn new(
        name: &'static str,
        initial_size: usize,
        factory: impl FnMut(PoolHandle, &T::Args) -> T + 'static,
    ) -> Self {
        let mut pool = Self {
            name,
            slots: Vec::with_capacity(initial_size),
            vacant: Vec::new(),
            available: Vec::with_capacity(initial_size),
            in_use: BTreeSet::new(),
            total_created: 0,
            factory: Box::new(factory),
        };
        pool.expand(initial_size);
        log::info!("Pool '{}' created with {} objects", name, initial_size);
        pool
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Take an instance, recycling one if possible
    ///
    /// Never fails: an empty available list grows the pool by one.
    pub fn acquire(&mut self, args: &T::Args) -> PoolHandle {
        let handle = match self.available.pop() {
            Some(handle) => {
                if let Some(value) = self.value_mut(handle) {
                    value.reset(args);
                }
                handle
            }
            None => {
                let handle = self.construct(args);
                log::debug!(
                    "Pool '{}' grew on acquire: object #{}",
                    self.name,
                    self.total_created
                );
                handle
            }
        };
        self.in_use.insert(handle);
        handle
    }

    /// Return an instance to the available list
    ///
    /// Returns false (and changes nothing) if the handle is not in use.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        if !self.in_use.remove(&handle) {
            log::warn!(
                "Pool '{}': attempted to release object not in use ({:?})",
                self.name,
                handle
            );
            return false;
        }
        if let Some(value) = self.value_mut(handle) {
            value.deactivate();
        }
        self.available.push(handle);
        true
    }

    /// Pre-allocate `count` deactivated instances
    pub fn expand(&mut self, count: usize) {
        let args = T::Args::default();
        for _ in 0..count {
            let handle = self.construct(&args);
            if let Some(value) = self.value_mut(handle) {
                value.deactivate();
            }
            self.available.push(handle);
        }
        if count > 0 {
            log::debug!(
                "Pool '{}' expanded by {} (total: {})",
                self.name,
                count,
                self.total_created
            );
        }
    }

    /// Dispose available instances until at most `target_available` remain
    pub fn shrink(&mut self, target_available: usize) {
        let to_remove = self.available.len().saturating_sub(target_available);
        for _ in 0..to_remove {
            if let Some(handle) = self.available.pop() {
                self.destroy(handle);
            }
        }
        if to_remove > 0 {
            log::info!("Pool '{}' shrunk by {} objects", self.name, to_remove);
        }
    }

    /// Dispose every instance, available and in use
    pub fn clear(&mut self) {
        let handles: Vec<PoolHandle> = self
            .available
            .drain(..)
            .chain(std::mem::take(&mut self.in_use))
            .collect();
        for handle in handles {
            self.destroy(handle);
        }
        log::info!("Pool '{}' cleared", self.name);
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.value_mut(handle)
    }

    #[inline]
    pub fn is_in_use(&self, handle: PoolHandle) -> bool {
        self.in_use.contains(&handle)
    }

    /// In-use handles in slot order
    pub fn in_use_handles(&self) -> impl Iterator<Item = PoolHandle> + '_ {
        self.in_use.iter().copied()
    }

    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    pub fn in_use_len(&self) -> usize {
        self.in_use.len()
    }

    pub fn total_created(&self) -> usize {
        self.total_created
    }

    pub fn stats(&self) -> PoolStats {
        let in_use = self.in_use.len();
        let utilization_percent = if self.total_created > 0 {
            ((in_use as f64 / self.total_created as f64) * 100.0).round() as u32
        } else {
            0
        };
        PoolStats {
            available: self.available.len(),
            in_use,
            total: self.total_created,
            utilization_percent,
        }
    }

    /// True when more than `threshold` of all instances are in use
    pub fn needs_expansion(&self, threshold: f32) -> bool {
        if self.total_created == 0 {
            return true;
        }
        let utilization = self.in_use.len() as f32 / self.total_created as f32;
        utilization > threshold
    }

    /// Partition invariant: disjoint sets that together cover every live instance
    pub fn is_consistent(&self) -> bool {
        let live = self.slots.iter().filter(|slot| slot.value.is_some()).count();
        self.available.len() + self.in_use.len() == self.total_created
            && live == self.total_created
            && self.available.iter().all(|h| !self.in_use.contains(h))
    }

    fn value_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    fn construct(&mut self, args: &T::Args) -> PoolHandle {
        let handle = match self.vacant.pop() {
            Some(index) => PoolHandle::new(index, self.slots[index as usize].generation),
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                PoolHandle::new((self.slots.len() - 1) as u32, 0)
            }
        };
        let value = (self.factory)(handle, args);
        self.slots[handle.index as usize].value = Some(value);
        self.total_created += 1;
        handle
    }

    fn destroy(&mut self, handle: PoolHandle) {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return;
        };
        if slot.generation != handle.generation {
            return;
        }
        if let Some(mut value) = slot.value.take() {
            value.dispose();
            slot.generation = slot.generation.wrapping_add(1);
            self.vacant.push(handle.index);
            self.total_created -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Token {
        value: u32,
        active: bool,
        resets: u32,
        disposed: bool,
    }

    impl Poolable for Token {
        type Args = u32;

        fn reset(&mut self, args: &u32) {
            self.value = *args;
            self.active = true;
            self.resets += 1;
        }

        fn deactivate(&mut self) {
            self.active = false;
        }

        fn dispose(&mut self) {
            self.disposed = true;
        }
    }

    fn token_pool(initial: usize) -> ObjectPool<Token> {
        ObjectPool::new("token", initial, |_, args: &u32| Token {
            value: *args,
            active: true,
            ..Default::default()
        })
    }

    #[test]
    fn test_preallocates_deactivated() {
        let pool = token_pool(4);
        assert_eq!(
            pool.stats(),
            PoolStats {
                available: 4,
                in_use: 0,
                total: 4,
                utilization_percent: 0,
            }
        );
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_reuses_same_instance() {
        let mut pool = token_pool(1);
        let first = pool.acquire(&7);
        assert!(pool.release(first));
        let second = pool.acquire(&9);
        assert_eq!(first, second);
        assert_eq!(pool.total_created(), 1);

        let token = pool.get(second).unwrap();
        assert_eq!(token.value, 9);
        assert!(token.active);
        // Pre-allocated once, then reset on each of the two acquires
        assert_eq!(token.resets, 2);
    }

    #[test]
    fn test_grows_when_exhausted() {
        let mut pool = token_pool(1);
        let a = pool.acquire(&1);
        let b = pool.acquire(&2);
        assert_ne!(a, b);
        assert_eq!(pool.total_created(), 2);
        // Fresh instances are built with the acquire args, not reset
        assert_eq!(pool.get(b).unwrap().value, 2);
        assert_eq!(pool.get(b).unwrap().resets, 0);
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool = token_pool(2);
        let handle = pool.acquire(&1);
        assert!(pool.release(handle));
        assert!(!pool.release(handle));
        assert_eq!(pool.available_len(), 2);
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_release_deactivates() {
        let mut pool = token_pool(0);
        let handle = pool.acquire(&3);
        assert!(pool.get(handle).unwrap().active);
        pool.release(handle);
        assert!(!pool.get(handle).unwrap().active);
    }

    #[test]
    fn test_shrink_disposes_and_invalidates() {
        let mut pool = token_pool(5);
        let kept = pool.acquire(&1);
        pool.shrink(1);
        assert_eq!(pool.available_len(), 1);
        assert_eq!(pool.in_use_len(), 1);
        assert_eq!(pool.total_created(), 2);
        assert!(pool.is_consistent());
        assert!(pool.get(kept).is_some());

        // Refilled slots get a new generation
        let refills: Vec<_> = (0..4).map(|i| pool.acquire(&i)).collect();
        assert!(refills.iter().any(|h| h.generation() > 0));
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_clear_empties_pool() {
        let mut pool = token_pool(3);
        let handle = pool.acquire(&1);
        pool.clear();
        assert_eq!(pool.stats(), PoolStats::default());
        assert!(pool.get(handle).is_none());
        assert!(!pool.release(handle));
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_needs_expansion() {
        let mut pool = token_pool(0);
        assert!(pool.needs_expansion(0.8));

        pool.expand(10);
        let _held: Vec<_> = (0..8).map(|i| pool.acquire(&i)).collect();
        assert!(!pool.needs_expansion(0.8));
        pool.acquire(&9);
        assert!(pool.needs_expansion(0.8));
        assert_eq!(pool.stats().utilization_percent, 90);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Acquire,
        Release(usize),
        Expand(usize),
        Shrink(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Acquire),
            3 => (0usize..16).prop_map(Op::Release),
            1 => (0usize..4).prop_map(Op::Expand),
            1 => (0usize..6).prop_map(Op::Shrink),
        ]
    }

    proptest! {
        #[test]
        fn prop_partition_holds(ops in prop::collection::vec(op(), 0..64)) {
            let mut pool = token_pool(2);
            let mut held: Vec<PoolHandle> = Vec::new();
            for op in ops {
                match op {
                    Op::Acquire => held.push(pool.acquire(&0)),
                    Op::Release(i) => {
                        if !held.is_empty() {
                            let handle = held.swap_remove(i % held.len());
                            prop_assert!(pool.release(handle));
                        }
                    }
                    Op::Expand(n) => pool.expand(n),
                    Op::Shrink(n) => pool.shrink(n),
                }
                prop_assert!(pool.is_consistent());
                prop_assert_eq!(pool.in_use_len(), held.len());
            }
        }
    }
}
