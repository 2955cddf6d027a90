//! Fetch coordinator: serves reads from the cache and performs at most one
//! remote read per key at a time.

use futures::FutureExt;
use std::sync::Arc;

use super::graph;
use super::key::CacheKey;
use super::store::{EntityCache, FetchResult, FetchStart, InFlight, Snapshot};
use crate::api::transport::ApiRequest;
use crate::api::{endpoints, schema, ClientError, Collection, Transport};
use crate::session::Session;

#[derive(Clone)]
pub struct FetchCoordinator {
  cache: EntityCache,
  session: Session,
  transport: Arc<dyn Transport>,
}

impl FetchCoordinator {
  pub fn new(cache: EntityCache, session: Session, transport: Arc<dyn Transport>) -> Self {
    Self {
      cache,
      session,
      transport,
    }
  }

  pub fn cache(&self) -> &EntityCache {
    &self.cache
  }

  pub fn is_enabled(&self, key: CacheKey) -> bool {
    graph::is_enabled(key, &self.session, &self.cache)
  }

  /// Current entry for `key`, starting a background fetch when the entry is
  /// missing or stale and the key is enabled.
  ///
  /// Meant to be called on every render. A failed fetch is not repeated by
  /// later reads; use [`refetch`](Self::refetch) or an invalidation.
  pub fn read(&self, key: CacheKey) -> Snapshot {
    let snapshot = self.cache.snapshot(key);
    if !snapshot.needs_fetch() || !self.is_enabled(key) {
      return snapshot;
    }
    let _in_flight = self.start(key);
    self.cache.snapshot(key)
  }

  /// User-requested retry. Joins a running fetch instead of starting another.
  ///
  /// Returns false when the key is disabled.
  pub fn refetch(&self, key: CacheKey) -> bool {
    if !self.is_enabled(key) {
      return false;
    }
    let _in_flight = self.start(key);
    true
  }

  /// Resolve `key`, from the cache when fresh, otherwise through one shared
  /// remote read. A disabled key resolves to an empty collection without
  /// touching the network or the cache.
  pub async fn fetch(&self, key: CacheKey) -> FetchResult {
    if !self.is_enabled(key) {
      tracing::debug!(%key, "fetch disabled");
      return Ok(Arc::new(Collection::empty(key.kind())));
    }

    let snapshot = self.cache.snapshot(key);
    if snapshot.is_fresh() {
      if let Some(data) = snapshot.data {
        tracing::debug!(%key, "cache hit");
        return Ok(data);
      }
    }

    self.start(key).await
  }

  fn start(&self, key: CacheKey) -> InFlight {
    let started = self.cache.begin_fetch(key, |ticket| {
      let this = self.clone();
      async move { this.load(key, ticket).await }.boxed().shared()
    });

    match started {
      FetchStart::Attached(in_flight) => {
        tracing::debug!(%key, "joined in-flight fetch");
        in_flight
      }
      FetchStart::Started(in_flight) => {
        // Runs to completion even if every caller stops waiting
        tokio::spawn(in_flight.clone().map(|_| ()));
        in_flight
      }
    }
  }

  async fn load(self, key: CacheKey, ticket: u64) -> FetchResult {
    let request = key.request();
    tracing::info!(kind = key.kind().name(), scope = ?key.scope(), %request, "fetching");

    match self.read_remote(key, request).await {
      Ok(collection) => {
        tracing::debug!(%key, count = collection.len(), "fetch succeeded");
        let data = Arc::new(collection);
        self.cache.write(key, Arc::clone(&data), ticket);
        Ok(data)
      }
      Err(err) => {
        tracing::warn!(%key, error = %err, "fetch failed");
        let err = Arc::new(err);
        self.cache.record_error(key, Arc::clone(&err), ticket);
        Err(err)
      }
    }
  }

  async fn read_remote(&self, key: CacheKey, request: ApiRequest) -> Result<Collection, ClientError> {
    let operation = request.operation;
    let response = self.transport.send(request).await?;
    let payload = endpoints::decode_payload(operation, response)?;
    Ok(schema::validate_collection(key.kind(), &payload)?)
  }
}
