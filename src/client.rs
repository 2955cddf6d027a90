//! Entry point for the view layer: one session, one cache, one coordinator
//! and one dispatcher sharing them.

use std::sync::Arc;

use crate::api::{ClientError, Transport};
use crate::cache::{CacheKey, EntityCache, FetchCoordinator, FetchResult, Snapshot};
use crate::mutation::{Mutation, MutationDispatcher, MutationOutcome};
use crate::session::Session;

#[derive(Clone)]
pub struct TaskboardClient {
  session: Session,
  coordinator: FetchCoordinator,
  dispatcher: MutationDispatcher,
}

impl TaskboardClient {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    let cache = EntityCache::new();
    let session = Session::new();
    Self {
      coordinator: FetchCoordinator::new(cache.clone(), session.clone(), transport.clone()),
      dispatcher: MutationDispatcher::new(cache, session.clone(), transport),
      session,
    }
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn cache(&self) -> &EntityCache {
    self.coordinator.cache()
  }

  /// Render-time read; may start a background fetch.
  pub fn read(&self, key: CacheKey) -> Snapshot {
    self.coordinator.read(key)
  }

  pub async fn fetch(&self, key: CacheKey) -> FetchResult {
    self.coordinator.fetch(key).await
  }

  pub fn refetch(&self, key: CacheKey) -> bool {
    self.coordinator.refetch(key)
  }

  pub async fn mutate(&self, mutation: Mutation) -> Result<MutationOutcome, ClientError> {
    self.dispatcher.mutate(mutation).await
  }

  /// Project list key for the signed-in user.
  pub fn projects_key(&self) -> Option<CacheKey> {
    self.session.user_id().map(|user| CacheKey::Projects { user })
  }

  pub fn read_projects(&self) -> Snapshot {
    match self.projects_key() {
      Some(key) => self.read(key),
      None => Snapshot::default(),
    }
  }

  pub fn read_tasks(&self, project: i64) -> Snapshot {
    self.read(CacheKey::Tasks { project })
  }

  pub fn read_users(&self) -> Snapshot {
    self.read(CacheKey::Users)
  }

  pub fn sign_out(&self) {
    self.session.logout(self.cache());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mutation::{AuthMode, Credentials};
  use crate::test_support::{project_json, task_json, user_json, MockTransport};
  use serde_json::json;

  #[tokio::test]
  async fn test_first_task_unlocks_user_directory() {
    let transport = MockTransport::new();
    let client = TaskboardClient::new(transport.clone());
    transport.respond("POST /user/find", 201, user_json(1, "Ann"));
    transport.respond("GET /project", 200, json!([project_json(7, 1)]));
    transport.respond("GET /task/7", 200, json!([]));
    transport.respond("GET /user", 200, json!([user_json(1, "Ann")]));

    client
      .mutate(Mutation::AuthenticateOrRegister {
        mode: AuthMode::SignIn,
        credentials: Credentials {
          name: "Ann".to_string(),
          email: "ann@example.com".to_string(),
        },
      })
      .await
      .unwrap();

    let key = client.projects_key().unwrap();
    let projects = client.fetch(key).await.unwrap();
    let project = projects.projects()[0].clone();
    client.session().open_project(project.id);

    client.fetch(CacheKey::Tasks { project: 7 }).await.unwrap();
    assert!(client.read_users().is_idle());

    transport.respond("POST /task/create", 201, task_json(1, 7));
    transport.respond("GET /task/7", 200, json!([task_json(1, 7)]));
    client
      .mutate(Mutation::CreateTask {
        project,
        title: "Task 1".to_string(),
        description: String::new(),
      })
      .await
      .unwrap();

    // Re-render: tasks refetch, then the directory becomes eligible
    client.fetch(CacheKey::Tasks { project: 7 }).await.unwrap();
    assert!(client.read_users().is_loading());
    assert!(client.read_users().is_loading());
    let users = client.fetch(CacheKey::Users).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(transport.calls("GET /user"), 1);
  }

  #[tokio::test]
  async fn test_sign_out_forgets_everything() {
    let transport = MockTransport::new();
    let client = TaskboardClient::new(transport.clone());
    transport.respond("GET /project", 200, json!([project_json(7, 1)]));
    client.session().login(crate::test_support::ann());
    client.fetch(client.projects_key().unwrap()).await.unwrap();
    assert_eq!(client.cache().len(), 1);

    client.sign_out();
    assert!(client.projects_key().is_none());
    assert!(client.read_projects().is_idle());
    assert!(client.cache().is_empty());
  }
}
