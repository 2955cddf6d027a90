//! The signed-in identity of this client instance.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::api::{ProjectId, User, UserId};
use crate::cache::EntityCache;

#[derive(Debug, Default)]
struct SessionState {
  current_user: Option<User>,
  /// Project whose detail view is showing, gates the user directory fetch
  open_project: Option<ProjectId>,
}

/// Session handle passed explicitly to the fetch coordinator and the
/// mutation dispatcher. Clones share the same state; separate `Session`
/// values are fully independent.
#[derive(Debug, Clone, Default)]
pub struct Session {
  state: Arc<RwLock<SessionState>>,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  fn read(&self) -> RwLockReadGuard<'_, SessionState> {
    self.state.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
    self.state.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Establish the current user. Queries scoped to this user become enabled.
  pub fn login(&self, user: User) {
    tracing::info!(user_id = user.id, "session established");
    self.write().current_user = Some(user);
  }

  /// End the session and purge all cached data, so nothing fetched for
  /// this user is visible to the next one.
  pub fn logout(&self, cache: &EntityCache) {
    {
      let mut state = self.write();
      if let Some(user) = state.current_user.take() {
        tracing::info!(user_id = user.id, "session ended");
      }
      state.open_project = None;
    }
    cache.clear();
  }

  pub fn current_user(&self) -> Option<User> {
    self.read().current_user.clone()
  }

  pub fn user_id(&self) -> Option<UserId> {
    self.read().current_user.as_ref().map(|u| u.id)
  }

  pub fn is_authenticated(&self) -> bool {
    self.read().current_user.is_some()
  }

  pub fn open_project(&self, project: ProjectId) {
    self.write().open_project = Some(project);
  }

  /// Forget the open project
  pub fn close_project(&self) {
    self.write().open_project = None;
  }

  /// Close `project` only if it is still the open one.
  pub fn close_project_if(&self, project: ProjectId) {
    let mut state = self.write();
    if state.open_project == Some(project) {
      state.open_project = None;
    }
  }

  pub fn open_project_id(&self) -> Option<ProjectId> {
    self.read().open_project
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ann() -> User {
    User {
      id: 1,
      name: "Ann".to_string(),
      email: "ann@example.com".to_string(),
    }
  }

  #[test]
  fn test_login_sets_user() {
    let session = Session::new();
    assert!(!session.is_authenticated());
    session.login(ann());
    assert_eq!(session.user_id(), Some(1));
    assert_eq!(session.current_user(), Some(ann()));
  }

  #[test]
  fn test_sessions_are_independent() {
    let a = Session::new();
    let b = Session::new();
    a.login(ann());
    assert!(!b.is_authenticated());
    assert!(a.clone().is_authenticated());
  }

  #[test]
  fn test_logout_clears_user_project_and_cache() {
    use crate::cache::CacheKey;
    use futures::FutureExt;

    let session = Session::new();
    let cache = EntityCache::new();
    session.login(ann());
    session.open_project(7);
    cache.begin_fetch(CacheKey::Users, |_| futures::future::pending().boxed().shared());
    assert_eq!(cache.len(), 1);

    session.logout(&cache);
    assert!(!session.is_authenticated());
    assert_eq!(session.open_project_id(), None);
    assert!(cache.is_empty());
  }

  #[test]
  fn test_close_project_if_ignores_other_projects() {
    let session = Session::new();
    session.open_project(7);
    session.close_project_if(8);
    assert_eq!(session.open_project_id(), Some(7));
    session.close_project_if(7);
    assert_eq!(session.open_project_id(), None);
  }
}
