// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Process-wide registry (spec.md §5 "Reference counting in the general
//! cache layer", §9 "Global mutable state").
//!
//! Distinct from [`crate::cache::BlockCache`] (which is a plain LRU):
//! this is the reference-counted layer above it, for objects (vnode
//! handles, cache pools) that outlive any single query and must not be
//! freed while a query still holds a reference, even after that query's
//! cache entry is otherwise evicted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A registry entry: an atomic refcount alongside the payload. `release`
/// decrements; `release_with_remove` additionally moves the node into
/// the trash list once its count would otherwise still be positive,
/// trusting the sweeper to free it once the count reaches zero.
pub struct CacheNode<T> {
    pub value: T,
    refcount: AtomicUsize,
}

impl<T> CacheNode<T> {
    #[must_use]
    pub fn new(value: T) -> Arc<Self> {
        Arc::new(Self { value, refcount: AtomicUsize::new(1) })
    }

    pub fn acquire(self: &Arc<Self>) -> Arc<Self> {
        self.refcount.fetch_add(1, Ordering::AcqRel);
        Arc::clone(self)
    }

    /// Decrements the refcount; returns the count *after* decrementing.
    pub fn release(&self) -> usize {
        self.refcount.fetch_sub(1, Ordering::AcqRel) - 1
    }

    #[must_use]
    pub fn refcount(&self) -> usize {
        self.refcount.load(Ordering::Acquire)
    }
}

/// Holds nodes removed from the live registry but not yet safe to free
/// (spec.md §5: "relocates the node into a trash list drained by a
/// background sweeper"). Generic over a type-erased drop target so one
/// sweeper thread can serve every node kind the registry holds.
#[derive(Default)]
pub struct TrashList {
    entries: Mutex<Vec<Box<dyn FnMut() -> bool + Send>>>,
}

impl TrashList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the trash list. `still_referenced` is polled by
    /// the sweeper; once it returns `false` the entry is dropped from
    /// the list (freeing the node, since nothing else holds an `Arc` to
    /// it by then).
    pub fn add(&self, still_referenced: impl FnMut() -> bool + Send + 'static) {
        self.entries.lock().expect("lock poisoned").push(Box::new(still_referenced));
    }

    /// Drains every entry whose refcount has reached zero. Returns the
    /// number of entries freed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().expect("lock poisoned");
        let before = entries.len();
        entries.retain_mut(|still_referenced| still_referenced());
        before - entries.len()
    }

    /// Forces every entry out regardless of refcount (spec.md §5
    /// "during shutdown the sweeper may force-drain").
    pub fn force_drain(&self) -> usize {
        let mut entries = self.entries.lock().expect("lock poisoned");
        let n = entries.len();
        entries.clear();
        n
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Background sweeper: periodically drains [`TrashList`] entries whose
/// refcount has reached zero (spec.md §5 "at a configured interval").
pub struct Sweeper {
    handle: Option<std::thread::JoinHandle<()>>,
    stop: Arc<std::sync::atomic::AtomicBool>,
}

impl Sweeper {
    #[must_use]
    pub fn spawn(trash: Arc<TrashList>, interval: Duration) -> Self {
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            while !stop_clone.load(Ordering::Acquire) {
                std::thread::sleep(interval);
                let freed = trash.sweep();
                if freed > 0 {
                    log::trace!("sweeper freed {freed} trashed cache nodes");
                }
            }
        });

        Self { handle: Some(handle), stop }
    }

    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Top-level process registry (spec.md §9 "Global mutable state"):
/// one per process, explicitly constructed via [`Registry::init`] and
/// torn down via [`Registry::shutdown`] rather than living behind a
/// `lazy_static`/`OnceCell`, so tests can run multiple independent
/// registries in the same process.
pub struct Registry {
    pub config: Arc<crate::config::Config>,
    pub trash: Arc<TrashList>,
    sweeper: Option<Sweeper>,
}

impl Registry {
    #[must_use]
    pub fn init(config: crate::config::Config, sweep_interval: Duration) -> Self {
        let trash = Arc::new(TrashList::new());
        let sweeper = Sweeper::spawn(Arc::clone(&trash), sweep_interval);
        Self { config: Arc::new(config), trash, sweeper: Some(sweeper) }
    }

    /// Stops the sweeper and force-drains any remaining trash (spec.md
    /// §5 "during shutdown the sweeper may force-drain").
    pub fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown();
        }
        let freed = self.trash.force_drain();
        if freed > 0 {
            log::debug!("registry shutdown force-drained {freed} trashed cache nodes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trash_list_frees_once_refcount_reaches_zero() {
        let trash = TrashList::new();
        let node = CacheNode::new(42);
        let weak_refcount = Arc::clone(&node);

        trash.add(move || weak_refcount.refcount() > 0);
        assert_eq!(trash.sweep(), 0);

        node.release();
        assert_eq!(trash.sweep(), 1);
        assert!(trash.is_empty());
    }

    #[test]
    fn force_drain_clears_regardless_of_refcount() {
        let trash = TrashList::new();
        let node = CacheNode::new(1);
        trash.add(move || node.refcount() > 0);
        assert_eq!(trash.force_drain(), 1);
    }

    #[test]
    fn registry_init_and_shutdown_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::Config::new(dir.path());
        let registry = Registry::init(config, Duration::from_millis(10));
        registry.shutdown();
    }
}
