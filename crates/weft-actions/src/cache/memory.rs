use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use weft_config::InMemoryCacheOptions;

use super::{Cache, CacheError};

#[derive(Debug)]
struct Entry {
  value: Value,
  written: Instant,
  accessed: Instant,
  generation: u64,
}

/// Entries plus their write order. A rewrite pushes a new `(key, generation)`
/// and leaves the old one behind as stale; stale slots are skipped when they
/// reach the front.
#[derive(Debug, Default)]
struct Store {
  entries: HashMap<String, Entry>,
  order: VecDeque<(String, u64)>,
  next_generation: u64,
}

impl Store {
  fn is_live(&self, key: &str, generation: u64) -> bool {
    self
      .entries
      .get(key)
      .is_some_and(|entry| entry.generation == generation)
  }

  fn compact(&mut self) {
    let Store { entries, order, .. } = self;
    order.retain(|(key, generation)| {
      entries
        .get(key)
        .is_some_and(|entry| entry.generation == *generation)
    });
  }
}

/// Process-local [`Cache`] with size and TTL eviction.
///
/// Eviction is lazy: expired entries are dropped when read, or when they are
/// the oldest writes at the time of a `put`.
#[derive(Debug)]
pub struct InMemoryCache {
  options: InMemoryCacheOptions,
  store: Mutex<Store>,
}

impl InMemoryCache {
  pub fn new(options: InMemoryCacheOptions) -> Self {
    Self {
      options,
      store: Mutex::new(Store::default()),
    }
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn lock(&self) -> MutexGuard<'_, Store> {
    self.store.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
    let ttl = Duration::from_millis(self.options.ttl);
    let ttl_after_access = Duration::from_millis(self.options.ttl_after_access);
    (self.options.enable_ttl && now.duration_since(entry.written) >= ttl)
      || (self.options.enable_ttl_after_access && now.duration_since(entry.accessed) >= ttl_after_access)
  }

  /// Pop stale and expired slots off the front of the write order.
  fn purge_front(&self, store: &mut Store, now: Instant) {
    while let Some((key, generation)) = store.order.front() {
      let expired = match store.entries.get(key) {
        Some(entry) if entry.generation == *generation => self.is_expired(entry, now),
        _ => true,
      };
      if !expired {
        break;
      }
      if let Some((key, generation)) = store.order.pop_front() {
        if store.is_live(&key, generation) {
          store.entries.remove(&key);
        }
      }
    }
  }

  fn evict_over_size(&self, store: &mut Store) {
    if !self.options.enable_maximum_size {
      return;
    }
    while store.entries.len() > self.options.maximum_size {
      let Some((key, generation)) = store.order.pop_front() else {
        break;
      };
      if store.is_live(&key, generation) {
        store.entries.remove(&key);
      }
    }
  }
}

#[async_trait]
impl Cache for InMemoryCache {
  async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
    let now = Instant::now();
    let mut store = self.lock();
    let expired = match store.entries.get(key) {
      None => return Ok(None),
      Some(entry) => self.is_expired(entry, now),
    };
    if expired {
      store.entries.remove(key);
      return Ok(None);
    }
    Ok(store.entries.get_mut(key).map(|entry| {
      entry.accessed = now;
      entry.value.clone()
    }))
  }

  async fn put(&self, key: &str, value: Value) -> Result<(), CacheError> {
    let now = Instant::now();
    let mut store = self.lock();

    let generation = store.next_generation;
    store.next_generation += 1;
    store.entries.insert(
      key.to_string(),
      Entry {
        value,
        written: now,
        accessed: now,
        generation,
      },
    );
    store.order.push_back((key.to_string(), generation));

    self.purge_front(&mut store, now);
    self.evict_over_size(&mut store);
    if store.order.len() > 2 * store.entries.len() + 16 {
      store.compact();
    }
    Ok(())
  }
}
