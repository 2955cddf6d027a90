//! In-memory entity cache: one entry per cache key.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::key::CacheKey;
use crate::api::{ClientError, Collection, Project, Task, User};

/// Outcome of one remote read, shareable between every waiter.
pub type FetchResult = Result<Arc<Collection>, Arc<ClientError>>;

/// A fetch in progress. Cloning attaches another waiter to the same call.
pub type InFlight = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
  Fresh,
  Stale,
  Loading,
}

struct CacheEntry {
  data: Option<Arc<Collection>>,
  state: EntryState,
  last_error: Option<Arc<ClientError>>,
  fetched_at: Option<DateTime<Utc>>,
  /// Replaced on every invalidation. A fetch started under an older
  /// generation cannot mark the entry fresh.
  generation: u64,
  /// Set when the last fetch failed; passive reads wait for an explicit
  /// retry or a new invalidation.
  held: bool,
  running: Option<Running>,
}

/// The one fetch allowed to complete into an entry.
struct Running {
  ticket: u64,
  /// Entry generation when the fetch started
  generation: u64,
  in_flight: InFlight,
}

impl CacheEntry {
  fn new(generation: u64) -> Self {
    Self {
      data: None,
      state: EntryState::Stale,
      last_error: None,
      fetched_at: None,
      generation,
      held: false,
      running: None,
    }
  }

  /// Detach the running fetch if `ticket` names it.
  fn finish(&mut self, ticket: u64) -> Option<Running> {
    match &self.running {
      Some(running) if running.ticket == ticket => self.running.take(),
      _ => None,
    }
  }
}

/// Read-only view of one entry at a point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub data: Option<Arc<Collection>>,
  /// `None` when the key has never been fetched (or is disabled)
  pub state: Option<EntryState>,
  pub last_error: Option<Arc<ClientError>>,
  pub fetched_at: Option<DateTime<Utc>>,
  held: bool,
}

impl Snapshot {
  pub fn is_idle(&self) -> bool {
    self.state.is_none()
  }

  pub fn is_loading(&self) -> bool {
    self.state == Some(EntryState::Loading)
  }

  pub fn is_fresh(&self) -> bool {
    self.state == Some(EntryState::Fresh)
  }

  pub fn is_stale(&self) -> bool {
    self.state == Some(EntryState::Stale)
  }

  /// Whether a passive read should start a fetch for this entry.
  pub(crate) fn needs_fetch(&self) -> bool {
    match self.state {
      None => true,
      Some(EntryState::Stale) => !self.held,
      Some(EntryState::Fresh) | Some(EntryState::Loading) => false,
    }
  }

  pub fn users(&self) -> &[User] {
    self.data.as_deref().map(Collection::users).unwrap_or(&[])
  }

  pub fn projects(&self) -> &[Project] {
    self.data.as_deref().map(Collection::projects).unwrap_or(&[])
  }

  pub fn tasks(&self) -> &[Task] {
    self.data.as_deref().map(Collection::tasks).unwrap_or(&[])
  }
}

pub(crate) enum FetchStart {
  /// Joined a fetch that was already running
  Attached(InFlight),
  Started(InFlight),
}

#[derive(Default)]
struct Inner {
  entries: HashMap<CacheKey, CacheEntry>,
  /// Source of generations, never reused even across `clear`
  counter: u64,
}

impl Inner {
  fn next_generation(&mut self) -> u64 {
    self.counter += 1;
    self.counter
  }
}

/// Shared map of cache entries.
///
/// Writes come only from the fetch coordinator (on completion) and the
/// mutation dispatcher (invalidation). The lock is never held across an
/// await point.
#[derive(Clone, Default)]
pub struct EntityCache {
  inner: Arc<Mutex<Inner>>,
}

impl EntityCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn snapshot(&self, key: CacheKey) -> Snapshot {
    let inner = self.lock();
    match inner.entries.get(&key) {
      Some(entry) => Snapshot {
        data: entry.data.clone(),
        state: Some(entry.state),
        last_error: entry.last_error.clone(),
        fetched_at: entry.fetched_at,
        held: entry.held,
      },
      None => Snapshot::default(),
    }
  }

  /// Mark an entry stale. Never fetches; the next read does.
  ///
  /// Returns whether the entry's state changed.
  pub fn invalidate(&self, key: CacheKey) -> bool {
    let mut inner = self.lock();
    let generation = inner.next_generation();
    let Some(entry) = inner.entries.get_mut(&key) else {
      return false;
    };
    entry.held = false;
    match entry.state {
      EntryState::Stale => false,
      EntryState::Fresh => {
        entry.generation = generation;
        entry.state = EntryState::Stale;
        true
      }
      EntryState::Loading => {
        // The running fetch may predate the change; its result lands as stale
        entry.generation = generation;
        true
      }
    }
  }

  /// Start a fetch for `key` unless one is already running.
  ///
  /// `start` receives the ticket that identifies this fetch to
  /// [`write`](Self::write) and [`record_error`](Self::record_error).
  pub(crate) fn begin_fetch<F>(&self, key: CacheKey, start: F) -> FetchStart
  where
    F: FnOnce(u64) -> InFlight,
  {
    let mut inner = self.lock();
    let ticket = inner.next_generation();
    let entry = inner
      .entries
      .entry(key)
      .or_insert_with(|| CacheEntry::new(ticket));

    if let Some(running) = &entry.running {
      return FetchStart::Attached(running.in_flight.clone());
    }

    let in_flight = start(ticket);
    entry.state = EntryState::Loading;
    entry.held = false;
    entry.running = Some(Running {
      ticket,
      generation: entry.generation,
      in_flight: in_flight.clone(),
    });
    FetchStart::Started(in_flight)
  }

  /// Store validated data from the fetch holding `ticket`. Only the fetch
  /// coordinator calls this.
  pub(crate) fn write(&self, key: CacheKey, data: Arc<Collection>, ticket: u64) {
    let mut inner = self.lock();
    // Entry gone or owned by a newer fetch: the cache was cleared meanwhile
    let Some(entry) = inner.entries.get_mut(&key) else {
      return;
    };
    let Some(running) = entry.finish(ticket) else {
      return;
    };
    entry.data = Some(data);
    entry.last_error = None;
    entry.fetched_at = Some(Utc::now());
    entry.held = false;
    entry.state = if entry.generation == running.generation {
      EntryState::Fresh
    } else {
      EntryState::Stale
    };
  }

  /// Record a failed fetch, keeping the last known data.
  pub(crate) fn record_error(&self, key: CacheKey, error: Arc<ClientError>, ticket: u64) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(&key) else {
      return;
    };
    let Some(running) = entry.finish(ticket) else {
      return;
    };
    entry.last_error = Some(error);
    entry.state = EntryState::Stale;
    entry.held = entry.generation == running.generation;
  }

  /// Drop every entry. Fetches still running discard their results.
  pub fn clear(&self) {
    self.lock().entries.clear();
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::TransportError;
  use futures::FutureExt;

  const KEY: CacheKey = CacheKey::Tasks { project: 7 };

  fn ready(data: Collection) -> InFlight {
    futures::future::ready(Ok(Arc::new(data))).boxed().shared()
  }

  fn empty_tasks() -> Collection {
    Collection::Tasks(Vec::new())
  }

  fn start(cache: &EntityCache) -> u64 {
    let mut seen = 0;
    cache.begin_fetch(KEY, |ticket| {
      seen = ticket;
      ready(empty_tasks())
    });
    seen
  }

  fn error() -> Arc<ClientError> {
    Arc::new(ClientError::Transport(TransportError::Timeout {
      url: "http://localhost/task/7".to_string(),
    }))
  }

  #[test]
  fn test_absent_key_is_idle() {
    let cache = EntityCache::new();
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.is_idle());
    assert!(snapshot.needs_fetch());
    assert!(!cache.invalidate(KEY));
    assert!(cache.is_empty());
  }

  #[test]
  fn test_begin_fetch_deduplicates() {
    let cache = EntityCache::new();
    assert!(matches!(
      cache.begin_fetch(KEY, |_| ready(empty_tasks())),
      FetchStart::Started(_)
    ));
    assert!(cache.snapshot(KEY).is_loading());
    let second = cache.begin_fetch(KEY, |_| panic!("must attach to the running fetch"));
    assert!(matches!(second, FetchStart::Attached(_)));
  }

  #[test]
  fn test_write_then_invalidate() {
    let cache = EntityCache::new();
    let ticket = start(&cache);
    cache.write(KEY, Arc::new(empty_tasks()), ticket);
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.is_fresh());
    assert!(snapshot.fetched_at.is_some());
    assert!(!snapshot.needs_fetch());

    assert!(cache.invalidate(KEY));
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.is_stale());
    assert!(snapshot.needs_fetch());
    assert!(snapshot.data.is_some());
  }

  #[test]
  fn test_reinvalidating_stale_is_noop() {
    let cache = EntityCache::new();
    let ticket = start(&cache);
    cache.write(KEY, Arc::new(empty_tasks()), ticket);
    assert!(cache.invalidate(KEY));
    assert!(!cache.invalidate(KEY));
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.is_stale());
    assert_eq!(cache.len(), 1);
  }

  #[test]
  fn test_invalidation_during_fetch_keeps_result_stale() {
    let cache = EntityCache::new();
    let ticket = start(&cache);
    assert!(cache.invalidate(KEY));
    assert!(cache.snapshot(KEY).is_loading());

    cache.write(KEY, Arc::new(empty_tasks()), ticket);
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.is_stale());
    assert!(snapshot.needs_fetch());
  }

  #[test]
  fn test_error_keeps_last_data_and_holds() {
    let cache = EntityCache::new();
    let ticket = start(&cache);
    cache.write(KEY, Arc::new(empty_tasks()), ticket);
    cache.invalidate(KEY);

    let ticket = start(&cache);
    cache.record_error(KEY, error(), ticket);
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.is_stale());
    assert!(snapshot.data.is_some());
    assert!(snapshot.last_error.is_some());
    assert!(!snapshot.needs_fetch());

    // A new invalidation releases the hold but keeps the error visible
    cache.invalidate(KEY);
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.needs_fetch());
    assert!(snapshot.last_error.is_some());
  }

  #[test]
  fn test_clear_discards_running_fetch() {
    let cache = EntityCache::new();
    let ticket = start(&cache);
    cache.clear();
    cache.write(KEY, Arc::new(empty_tasks()), ticket);
    assert!(cache.snapshot(KEY).is_idle());

    // The old fetch must not complete into the entry a new session started
    let current = start(&cache);
    assert_ne!(current, ticket);
    cache.write(KEY, Arc::new(empty_tasks()), ticket);
    cache.record_error(KEY, error(), ticket);
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.is_loading());
    assert!(snapshot.data.is_none());
    assert!(snapshot.last_error.is_none());
    assert!(matches!(
      cache.begin_fetch(KEY, |_| panic!("must attach to the running fetch")),
      FetchStart::Attached(_)
    ));

    cache.write(KEY, Arc::new(empty_tasks()), current);
    assert!(cache.snapshot(KEY).is_fresh());
  }

  #[test]
  fn test_completed_fetch_cannot_write_twice() {
    let cache = EntityCache::new();
    let ticket = start(&cache);
    cache.write(KEY, Arc::new(empty_tasks()), ticket);
    cache.invalidate(KEY);
    cache.record_error(KEY, error(), ticket);
    let snapshot = cache.snapshot(KEY);
    assert!(snapshot.last_error.is_none());
    assert!(snapshot.needs_fetch());
  }
}
