//! Domain entities exchanged with the task service.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = i64;
pub type ProjectId = i64;
pub type TaskId = i64;

/// A known user of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: UserId,
  pub name: String,
  pub email: String,
}

/// A project with its owner embedded by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub id: ProjectId,
  pub title: String,
  pub description: String,
  pub owner: User,
}

impl Project {
  pub fn is_owned_by(&self, user: &User) -> bool {
    self.owner.id == user.id
  }
}

/// Reference from a task to the project it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
  pub id: ProjectId,
}

impl From<&Project> for ProjectRef {
  fn from(project: &Project) -> Self {
    Self { id: project.id }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
  Todo,
  InProgress,
  Done,
}

impl TaskStatus {
  pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

  /// Wire representation
  pub fn as_str(self) -> &'static str {
    match self {
      TaskStatus::Todo => "TODO",
      TaskStatus::InProgress => "IN_PROGRESS",
      TaskStatus::Done => "DONE",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      TaskStatus::Todo => "Todo",
      TaskStatus::InProgress => "In progress",
      TaskStatus::Done => "Done",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|s| s.as_str() == value)
  }

  /// Next status in the TODO -> IN_PROGRESS -> DONE -> TODO cycle
  pub fn next(self) -> Self {
    match self {
      TaskStatus::Todo => TaskStatus::InProgress,
      TaskStatus::InProgress => TaskStatus::Done,
      TaskStatus::Done => TaskStatus::Todo,
    }
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
  pub id: TaskId,
  pub title: String,
  pub description: String,
  pub status: TaskStatus,
  pub project: ProjectRef,
  #[serde(rename = "assignedTo")]
  pub assigned_to: Option<User>,
}

/// Entity kinds the service knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
  User,
  Project,
  Task,
}

impl EntityKind {
  pub fn name(self) -> &'static str {
    match self {
      EntityKind::User => "user",
      EntityKind::Project => "project",
      EntityKind::Task => "task",
    }
  }
}

/// A validated collection of entities, as held by one cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
  Users(Vec<User>),
  Projects(Vec<Project>),
  Tasks(Vec<Task>),
}

impl Collection {
  pub fn empty(kind: EntityKind) -> Self {
    match kind {
      EntityKind::User => Collection::Users(Vec::new()),
      EntityKind::Project => Collection::Projects(Vec::new()),
      EntityKind::Task => Collection::Tasks(Vec::new()),
    }
  }

  pub fn kind(&self) -> EntityKind {
    match self {
      Collection::Users(_) => EntityKind::User,
      Collection::Projects(_) => EntityKind::Project,
      Collection::Tasks(_) => EntityKind::Task,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Collection::Users(v) => v.len(),
      Collection::Projects(v) => v.len(),
      Collection::Tasks(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn users(&self) -> &[User] {
    match self {
      Collection::Users(v) => v,
      _ => &[],
    }
  }

  pub fn projects(&self) -> &[Project] {
    match self {
      Collection::Projects(v) => v,
      _ => &[],
    }
  }

  pub fn tasks(&self) -> &[Task] {
    match self {
      Collection::Tasks(v) => v,
      _ => &[],
    }
  }
}
