//! Structured cache keys.

use std::fmt;

use crate::api::endpoints;
use crate::api::transport::ApiRequest;
use crate::api::{EntityKind, ProjectId, UserId};

/// Identifies one cacheable collection: an entity kind plus its scope.
///
/// Keys compare by value, so two keys built independently for the same
/// scope always hit the same entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
  /// Project list as seen by a signed-in user
  Projects { user: UserId },
  /// Tasks of one project
  Tasks { project: ProjectId },
  /// The whole user directory
  Users,
}

impl CacheKey {
  pub fn kind(&self) -> EntityKind {
    match self {
      CacheKey::Projects { .. } => EntityKind::Project,
      CacheKey::Tasks { .. } => EntityKind::Task,
      CacheKey::Users => EntityKind::User,
    }
  }

  /// Scope parameters in order.
  pub fn scope(&self) -> Vec<i64> {
    match self {
      CacheKey::Projects { user } => vec![*user],
      CacheKey::Tasks { project } => vec![*project],
      CacheKey::Users => Vec::new(),
    }
  }

  /// The remote read that fills this key.
  pub fn request(&self) -> ApiRequest {
    match self {
      // The service returns every project; the key scopes it to the viewer
      CacheKey::Projects { .. } => endpoints::list_projects(),
      CacheKey::Tasks { project } => endpoints::list_tasks(*project),
      CacheKey::Users => endpoints::list_users(),
    }
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CacheKey::Projects { user } => write!(f, "projects for user {}", user),
      CacheKey::Tasks { project } => write!(f, "tasks for project {}", project),
      CacheKey::Users => f.write_str("all users"),
    }
  }
}
