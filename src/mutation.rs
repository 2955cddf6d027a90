//! Mutation dispatcher: one remote write per call, invalidation on success.

use std::sync::Arc;

use crate::api::schema::{self, Schema};
use crate::api::transport::ApiRequest;
use crate::api::{endpoints, ClientError, Project, ProjectId, Task, TaskId, TaskStatus, Transport, User, UserId};
use crate::cache::{graph, CacheKey, EntityCache};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
  /// Look up an existing user
  SignIn,
  /// Register a new user
  SignUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
  pub name: String,
  pub email: String,
}

/// Assignee picked in the view, before it is resolved against the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeSelection {
  Unassigned,
  User(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskChange {
  Status(TaskStatus),
  Assignee(AssigneeSelection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
  AuthenticateOrRegister {
    mode: AuthMode,
    credentials: Credentials,
  },
  CreateProject {
    title: String,
    description: String,
  },
  DeleteProject {
    project: Project,
  },
  CreateTask {
    project: Project,
    title: String,
    description: String,
  },
  UpdateTask {
    task: Task,
    change: TaskChange,
  },
  DeleteTask {
    task: Task,
  },
}

impl Mutation {
  pub fn name(&self) -> &'static str {
    match self {
      Mutation::AuthenticateOrRegister {
        mode: AuthMode::SignIn,
        ..
      } => "sign-in",
      Mutation::AuthenticateOrRegister {
        mode: AuthMode::SignUp,
        ..
      } => "sign-up",
      Mutation::CreateProject { .. } => "create-project",
      Mutation::DeleteProject { .. } => "delete-project",
      Mutation::CreateTask { .. } => "create-task",
      Mutation::UpdateTask { .. } => "update-task",
      Mutation::DeleteTask { .. } => "delete-task",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
  Authenticated(User),
  ProjectCreated(Project),
  ProjectDeleted(ProjectId),
  TaskCreated(Task),
  TaskUpdated(Task),
  TaskDeleted(TaskId),
}

#[derive(Clone)]
pub struct MutationDispatcher {
  cache: EntityCache,
  session: Session,
  transport: Arc<dyn Transport>,
}

impl MutationDispatcher {
  pub fn new(cache: EntityCache, session: Session, transport: Arc<dyn Transport>) -> Self {
    Self {
      cache,
      session,
      transport,
    }
  }

  /// Perform one remote write. On success every key the mutation affects is
  /// marked stale; on failure the cache is left as it was.
  pub async fn mutate(&self, mutation: Mutation) -> Result<MutationOutcome, ClientError> {
    let viewer = self.session.user_id();
    let name = mutation.name();

    match self.perform(&mutation).await {
      Ok(outcome) => {
        tracing::info!(mutation = name, "mutation succeeded");
        for key in graph::invalidated_keys(&mutation, viewer) {
          if self.cache.invalidate(key) {
            tracing::info!(%key, "invalidated");
          }
        }
        Ok(outcome)
      }
      Err(err) => {
        tracing::warn!(mutation = name, error = %err, "mutation failed");
        Err(err)
      }
    }
  }

  async fn perform(&self, mutation: &Mutation) -> Result<MutationOutcome, ClientError> {
    match mutation {
      Mutation::AuthenticateOrRegister { mode, credentials } => {
        let request = match mode {
          AuthMode::SignIn => endpoints::find_user(&credentials.name, &credentials.email),
          AuthMode::SignUp => endpoints::create_user(&credentials.name, &credentials.email),
        };
        let user: User = self.send_for(request).await?;
        self.session.login(user.clone());
        Ok(MutationOutcome::Authenticated(user))
      }
      Mutation::CreateProject { title, description } => {
        let owner = self.require_user()?;
        let request = endpoints::create_project(title, description, &owner);
        Ok(MutationOutcome::ProjectCreated(self.send_for(request).await?))
      }
      Mutation::DeleteProject { project } => {
        let user = self.require_user()?;
        self.send_ack(endpoints::remove_project(project.id, &user)).await?;
        self.session.close_project_if(project.id);
        Ok(MutationOutcome::ProjectDeleted(project.id))
      }
      Mutation::CreateTask {
        project,
        title,
        description,
      } => {
        self.require_user()?;
        let request = endpoints::create_task(title, description, project);
        Ok(MutationOutcome::TaskCreated(self.send_for(request).await?))
      }
      Mutation::UpdateTask { task, change } => {
        self.require_user()?;
        let updated = self.apply(task, *change)?;
        self.send_ack(endpoints::update_task(&updated)).await?;
        Ok(MutationOutcome::TaskUpdated(updated))
      }
      Mutation::DeleteTask { task } => {
        let user = self.require_user()?;
        self.send_ack(endpoints::remove_task(task.id, &user)).await?;
        Ok(MutationOutcome::TaskDeleted(task.id))
      }
    }
  }

  fn require_user(&self) -> Result<User, ClientError> {
    self.session.current_user().ok_or(ClientError::NotAuthenticated)
  }

  /// Build the task as it should look after `change`.
  fn apply(&self, task: &Task, change: TaskChange) -> Result<Task, ClientError> {
    let mut updated = task.clone();
    match change {
      TaskChange::Status(status) => updated.status = status,
      TaskChange::Assignee(AssigneeSelection::Unassigned) => updated.assigned_to = None,
      TaskChange::Assignee(AssigneeSelection::User(id)) => {
        let directory = self.cache.snapshot(CacheKey::Users);
        let user = directory
          .users()
          .iter()
          .find(|user| user.id == id)
          .cloned()
          .ok_or(ClientError::UnknownAssignee(id))?;
        updated.assigned_to = Some(user);
      }
    }
    Ok(updated)
  }

  async fn send_for<T: Schema>(&self, request: ApiRequest) -> Result<T, ClientError> {
    tracing::info!(%request, "sending");
    let operation = request.operation;
    let response = self.transport.send(request).await?;
    let payload = endpoints::decode_payload(operation, response)?;
    Ok(schema::validate_one(&payload)?)
  }

  async fn send_ack(&self, request: ApiRequest) -> Result<(), ClientError> {
    tracing::info!(%request, "sending");
    let operation = request.operation;
    let response = self.transport.send(request).await?;
    endpoints::decode_ack(operation, response)
  }
}
