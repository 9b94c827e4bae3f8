//! Borrow/lend cache of GPU resources
//!
//! Callers borrow a resource by description and get a [`Receipt`] back. The
//! receipt hands the resource back when it is dropped or passed to
//! [`Receipt::return_to_cache`], so every exit path of the borrowing scope
//! releases it, including early returns through `?`.
//!
//! Every entry is lent to one borrower at a time. Borrowing a description
//! whose entries are all lent out allocates a new entry, up to
//! [`CacheConfig::max_borrows_per_key`] entries lent at once (0 for no limit).
//!
//! Eviction only runs when a receipt comes back. If the bytes held by all
//! entries are above [`CacheConfig::capacity`], idle entries are closed,
//! least recently returned first, until the total fits or no idle entry is
//! left. Lent entries are never evicted, so the total can stay above the
//! capacity while borrows are outstanding.

mod loader;

pub use loader::ResourceLoader;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::rc::Rc;

use crate::config::CacheConfig;
use crate::error::{RenderError, RenderResult};

/// Cache usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently resident
    pub entries: usize,
    /// Entries currently lent out
    pub borrowed: usize,
    /// Entries resident but not lent out
    pub idle: usize,
    /// Accounted bytes of all resident entries
    pub total_bytes: usize,
    /// Configured capacity in bytes
    pub capacity: usize,
    /// Borrows served by an idle entry
    pub hits: u64,
    /// Borrows that had to allocate
    pub misses: u64,
    /// Entries closed by eviction
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of borrows served without allocating (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type EntryId = u64;

struct Entry<K, V> {
    key: K,
    value: V,
    size: usize,
    borrows: u32,
    last_used: u64,
}

struct CacheState<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    loader: Box<dyn ResourceLoader<Key = K, Value = V>>,
    config: CacheConfig,
    entries: HashMap<EntryId, Entry<K, V>>,
    by_key: HashMap<K, Vec<EntryId>>,
    next_id: EntryId,
    clock: u64,
    total_bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V> CacheState<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Most recently returned idle entry for the key, and the number lent out
    fn lookup(&self, key: &K) -> (Option<EntryId>, usize) {
        let mut idle: Option<(EntryId, u64)> = None;
        let mut active = 0;
        for id in self.by_key.get(key).into_iter().flatten() {
            let Some(entry) = self.entries.get(id) else {
                continue;
            };
            if entry.borrows > 0 {
                active += 1;
            } else if idle.map_or(true, |(_, used)| entry.last_used > used) {
                idle = Some((*id, entry.last_used));
            }
        }
        (idle.map(|(id, _)| id), active)
    }

    fn borrow(&mut self, key: &K) -> RenderResult<(EntryId, V)> {
        let (idle, active) = self.lookup(key);

        if let Some(id) = idle {
            let now = self.tick();
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.borrows += 1;
                entry.last_used = now;
                self.hits += 1;
                return Ok((id, entry.value.clone()));
            }
        }

        let limit = self.config.max_borrows_per_key;
        if limit > 0 && active >= limit {
            return Err(RenderError::BorrowLimitExceeded {
                key: format!("{key:?}"),
                limit,
            });
        }

        let value = self.loader.load(key)?;
        let size = self.loader.size_of(&value);
        let id = self.next_id;
        self.next_id += 1;
        let now = self.tick();

        log::debug!(
            "Cache miss for {:?}: allocated entry {} ({} bytes)",
            key,
            id,
            size
        );
        self.misses += 1;
        self.total_bytes += size;
        self.entries.insert(
            id,
            Entry {
                key: key.clone(),
                value: value.clone(),
                size,
                borrows: 1,
                last_used: now,
            },
        );
        self.by_key.entry(key.clone()).or_default().push(id);
        Ok((id, value))
    }

    fn release(&mut self, id: EntryId) {
        let now = self.tick();
        let entry = self
            .entries
            .get_mut(&id)
            .unwrap_or_else(|| panic!("receipt for unknown cache entry {id}"));
        assert!(
            entry.borrows > 0,
            "cache entry {id} returned more often than it was borrowed"
        );
        entry.borrows -= 1;
        entry.last_used = now;

        if self.total_bytes > self.config.capacity {
            self.evict_to_fit();
        }
    }

    /// Close idle entries, least recently used first, until the total fits
    fn evict_to_fit(&mut self) {
        let mut idle: Vec<(u64, EntryId)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.borrows == 0)
            .map(|(id, e)| (e.last_used, *id))
            .collect();
        idle.sort_unstable();

        for (_, id) in idle {
            if self.total_bytes <= self.config.capacity {
                break;
            }
            self.remove(id);
            self.evictions += 1;
        }
    }

    fn remove(&mut self, id: EntryId) {
        let Some(entry) = self.entries.remove(&id) else {
            return;
        };
        assert_eq!(entry.borrows, 0, "evicting a lent cache entry");
        log::debug!("Closing cache entry {} for {:?}", id, entry.key);

        if let Some(ids) = self.by_key.get_mut(&entry.key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_key.remove(&entry.key);
            }
        }
        self.total_bytes = self
            .total_bytes
            .checked_sub(entry.size)
            .unwrap_or_else(|| panic!("cache byte accounting went negative"));
        self.loader.close(entry.value);
    }

    fn evict_idle(&mut self) -> usize {
        let idle: Vec<EntryId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.borrows == 0)
            .map(|(id, _)| *id)
            .collect();
        let count = idle.len();
        for id in idle {
            self.remove(id);
            self.evictions += 1;
        }
        count
    }

    fn stats(&self) -> CacheStats {
        let borrowed = self.entries.values().filter(|e| e.borrows > 0).count();
        CacheStats {
            entries: self.entries.len(),
            borrowed,
            idle: self.entries.len() - borrowed,
            total_bytes: self.total_bytes,
            capacity: self.config.capacity,
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

impl<K, V> Drop for CacheState<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        for (_, entry) in self.entries.drain() {
            self.loader.close(entry.value);
        }
        self.by_key.clear();
        self.total_bytes = 0;
    }
}

/// Keyed pool of GPU resources lent out through [`Receipt`]s.
///
/// Cloning the cache yields another handle to the same pool. The pool and
/// every resource in it are released when the last handle and the last
/// receipt are gone.
pub struct BorrowCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    state: Rc<RefCell<CacheState<K, V>>>,
}

impl<K, V> Clone for BorrowCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<K, V> BorrowCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug + 'static,
    V: Clone + 'static,
{
    /// Create a cache that allocates through `loader`
    pub fn new<L>(loader: L, config: CacheConfig) -> Self
    where
        L: ResourceLoader<Key = K, Value = V> + 'static,
    {
        Self {
            state: Rc::new(RefCell::new(CacheState {
                loader: Box::new(loader),
                config,
                entries: HashMap::new(),
                by_key: HashMap::new(),
                next_id: 1,
                clock: 0,
                total_bytes: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            })),
        }
    }

    /// Borrow a resource matching `key`, allocating one if no idle entry exists
    pub fn get(&self, key: &K) -> RenderResult<Receipt<K, V>> {
        let (id, value) = self.state.borrow_mut().borrow(key)?;
        Ok(Receipt {
            state: Rc::clone(&self.state),
            id,
            value,
        })
    }

    /// Borrow a resource for the duration of `f`.
    ///
    /// The resource is returned whether `f` succeeds or fails.
    pub fn with_borrowed<R>(
        &self,
        key: &K,
        f: impl FnOnce(&V) -> RenderResult<R>,
    ) -> RenderResult<R> {
        let receipt = self.get(key)?;
        f(&receipt)
    }

    /// Close every idle entry. Returns the number of entries closed.
    pub fn evict_idle(&self) -> usize {
        self.state.borrow_mut().evict_idle()
    }

    pub fn stats(&self) -> CacheStats {
        self.state.borrow().stats()
    }

    pub fn config(&self) -> CacheConfig {
        self.state.borrow().config
    }

    /// Number of resident entries for a description
    pub fn entries_for(&self, key: &K) -> usize {
        self.state.borrow().by_key.get(key).map_or(0, Vec::len)
    }

    pub fn total_bytes(&self) -> usize {
        self.state.borrow().total_bytes
    }
}

impl<K, V> fmt::Debug for BorrowCache<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("BorrowCache")
                .field("stats", &state.stats())
                .finish(),
            Err(_) => f.write_str("BorrowCache { .. }"),
        }
    }
}

/// One outstanding borrow.
///
/// Dereferences to the borrowed resource. The borrow ends when the receipt
/// is dropped; [`Receipt::return_to_cache`] makes that explicit. A receipt
/// cannot be returned twice because returning consumes it.
pub struct Receipt<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    state: Rc<RefCell<CacheState<K, V>>>,
    id: EntryId,
    value: V,
}

impl<K, V> Receipt<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    /// Hand the resource back to its cache
    pub fn return_to_cache(self) {
        drop(self);
    }
}

impl<K, V> Deref for Receipt<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<K, V> Drop for Receipt<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        self.state.borrow_mut().release(self.id);
    }
}

impl<K, V> fmt::Debug for Receipt<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
    V: Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receipt")
            .field("entry", &self.id)
            .field("value", &self.value)
            .finish()
    }
}
