//! Static dependency table: which keys a mutation invalidates, and what each
//! key needs before it may be fetched.

use super::key::CacheKey;
use super::store::EntityCache;
use crate::api::UserId;
use crate::mutation::Mutation;
use crate::session::Session;

/// Precondition for fetching a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
  /// This exact user is signed in
  SignedInAs(UserId),
  /// Some user is signed in
  SignedIn,
  /// A user is signed in and at least one task is cached for the open project
  OpenProjectHasTasks,
}

pub fn gate(key: CacheKey) -> Gate {
  match key {
    CacheKey::Projects { user } => Gate::SignedInAs(user),
    CacheKey::Tasks { .. } => Gate::SignedIn,
    CacheKey::Users => Gate::OpenProjectHasTasks,
  }
}

/// Evaluate the `enabled` predicate of a key against current state.
pub fn is_enabled(key: CacheKey, session: &Session, cache: &EntityCache) -> bool {
  match gate(key) {
    Gate::SignedInAs(user) => session.user_id() == Some(user),
    Gate::SignedIn => session.is_authenticated(),
    Gate::OpenProjectHasTasks => {
      session.is_authenticated()
        && session
          .open_project_id()
          .is_some_and(|project| !cache.snapshot(CacheKey::Tasks { project }).tasks().is_empty())
    }
  }
}

/// Keys made stale by a successful mutation.
///
/// `viewer` is the signed-in user at the time the mutation was issued.
pub fn invalidated_keys(mutation: &Mutation, viewer: Option<UserId>) -> Vec<CacheKey> {
  match mutation {
    Mutation::AuthenticateOrRegister { .. } => Vec::new(),
    Mutation::CreateProject { .. } => viewer
      .map(|user| vec![CacheKey::Projects { user }])
      .unwrap_or_default(),
    // Tasks of the removed project are left orphaned; nothing reads them again
    Mutation::DeleteProject { project } => vec![CacheKey::Projects {
      user: project.owner.id,
    }],
    Mutation::CreateTask { project, .. } => vec![CacheKey::Tasks {
      project: project.id,
    }],
    Mutation::UpdateTask { task, .. } | Mutation::DeleteTask { task } => vec![CacheKey::Tasks {
      project: task.project.id,
    }],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::model::ProjectRef;
  use crate::api::{Collection, Project, Task, TaskStatus, User};
  use crate::mutation::{AuthMode, Credentials, TaskChange};
  use futures::FutureExt;
  use std::sync::Arc;

  fn ann() -> User {
    User {
      id: 1,
      name: "Ann".to_string(),
      email: "ann@example.com".to_string(),
    }
  }

  fn project() -> Project {
    Project {
      id: 7,
      title: "Roadmap".to_string(),
      description: String::new(),
      owner: ann(),
    }
  }

  fn task() -> Task {
    Task {
      id: 3,
      title: "Write".to_string(),
      description: String::new(),
      status: TaskStatus::Todo,
      project: ProjectRef { id: 7 },
      assigned_to: None,
    }
  }

  #[test]
  fn test_invalidation_table() {
    let tasks = vec![CacheKey::Tasks { project: 7 }];
    let projects = vec![CacheKey::Projects { user: 1 }];

    let create_project = Mutation::CreateProject {
      title: "x".to_string(),
      description: "y".to_string(),
    };
    assert_eq!(invalidated_keys(&create_project, Some(1)), projects);
    assert!(invalidated_keys(&create_project, None).is_empty());

    let delete_project = Mutation::DeleteProject { project: project() };
    assert_eq!(invalidated_keys(&delete_project, Some(1)), projects);

    let create_task = Mutation::CreateTask {
      project: project(),
      title: "t".to_string(),
      description: String::new(),
    };
    assert_eq!(invalidated_keys(&create_task, Some(1)), tasks);

    let update_task = Mutation::UpdateTask {
      task: task(),
      change: TaskChange::Status(TaskStatus::Done),
    };
    assert_eq!(invalidated_keys(&update_task, Some(1)), tasks);
    assert_eq!(invalidated_keys(&Mutation::DeleteTask { task: task() }, Some(1)), tasks);

    let auth = Mutation::AuthenticateOrRegister {
      mode: AuthMode::SignIn,
      credentials: Credentials {
        name: "Ann".to_string(),
        email: "ann@example.com".to_string(),
      },
    };
    assert!(invalidated_keys(&auth, None).is_empty());
  }

  #[test]
  fn test_gates_follow_session() {
    let session = Session::new();
    let cache = EntityCache::new();
    let projects = CacheKey::Projects { user: 1 };
    let tasks = CacheKey::Tasks { project: 7 };

    assert!(!is_enabled(projects, &session, &cache));
    assert!(!is_enabled(tasks, &session, &cache));

    session.login(ann());
    assert!(is_enabled(projects, &session, &cache));
    assert!(!is_enabled(CacheKey::Projects { user: 2 }, &session, &cache));
    assert!(is_enabled(tasks, &session, &cache));
  }

  #[test]
  fn test_user_directory_needs_cached_tasks() {
    let session = Session::new();
    let cache = EntityCache::new();
    session.login(ann());
    assert!(!is_enabled(CacheKey::Users, &session, &cache));

    session.open_project(7);
    assert!(!is_enabled(CacheKey::Users, &session, &cache));

    let key = CacheKey::Tasks { project: 7 };
    let mut ticket = 0;
    cache.begin_fetch(key, |t| {
      ticket = t;
      futures::future::pending().boxed().shared()
    });
    cache.write(key, Arc::new(Collection::Tasks(vec![task()])), ticket);
    assert!(is_enabled(CacheKey::Users, &session, &cache));

    session.close_project();
    assert!(!is_enabled(CacheKey::Users, &session, &cache));
  }
}
