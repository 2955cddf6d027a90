//! Scripted transport and fixtures shared by unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::api::model::ProjectRef;
use crate::api::transport::{ApiRequest, RawResponse};
use crate::api::{Project, Task, TaskStatus, Transport, TransportError, User, UserId};

#[derive(Default)]
struct Route {
  responses: VecDeque<Result<RawResponse, TransportError>>,
  /// The single remaining response has been served at least once
  repeating: bool,
  gate: Option<Arc<Notify>>,
}

/// Transport answering from a per-request-line script.
///
/// Queued responses are served in order and the last one repeats. Queuing
/// after the last one has been served replaces it.
#[derive(Default)]
pub struct MockTransport {
  routes: Mutex<HashMap<String, Route>>,
  requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  fn push(&self, line: &str, response: Result<RawResponse, TransportError>) {
    let mut routes = self.routes.lock().unwrap();
    let route = routes.entry(line.to_string()).or_default();
    if route.repeating {
      route.responses.clear();
      route.repeating = false;
    }
    route.responses.push_back(response);
  }

  pub fn respond(&self, line: &str, status: u16, body: Value) {
    self.respond_raw(line, status, &body.to_string());
  }

  pub fn respond_raw(&self, line: &str, status: u16, body: &str) {
    let response = RawResponse {
      status,
      body: body.to_string(),
    };
    self.push(line, Ok(response));
  }

  /// Queue a connection failure.
  pub fn fail(&self, line: &str) {
    let error = TransportError::Unreachable {
      url: line.to_string(),
      message: "connection refused".to_string(),
    };
    self.push(line, Err(error));
  }

  /// Block requests for `line` until the returned gate is notified.
  pub fn hold(&self, line: &str) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    let mut routes = self.routes.lock().unwrap();
    routes.entry(line.to_string()).or_default().gate = Some(gate.clone());
    gate
  }

  pub fn calls(&self, line: &str) -> usize {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|request| request.line() == line)
      .count()
  }

  pub fn total_calls(&self) -> usize {
    self.requests.lock().unwrap().len()
  }

  pub fn last_request(&self, line: &str) -> Option<ApiRequest> {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .rev()
      .find(|request| request.line() == line)
      .cloned()
  }
}

#[async_trait]
impl Transport for MockTransport {
  async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
    let line = request.line();
    self.requests.lock().unwrap().push(request);

    let gate = self
      .routes
      .lock()
      .unwrap()
      .get(&line)
      .and_then(|route| route.gate.clone());
    if let Some(gate) = gate {
      gate.notified().await;
    }

    let mut routes = self.routes.lock().unwrap();
    let unscripted = || TransportError::Unreachable {
      url: line.clone(),
      message: "no scripted response".to_string(),
    };
    let Some(route) = routes.get_mut(&line) else {
      return Err(unscripted());
    };
    if route.responses.len() > 1 {
      return route.responses.pop_front().unwrap_or_else(|| Err(unscripted()));
    }
    route.repeating = true;
    route
      .responses
      .front()
      .cloned()
      .unwrap_or_else(|| Err(unscripted()))
  }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn user(id: UserId) -> User {
  let name = match id {
    1 => "Ann".to_string(),
    2 => "Bob".to_string(),
    _ => format!("User{}", id),
  };
  User {
    id,
    email: format!("{}@example.com", name.to_lowercase()),
    name,
  }
}

pub fn ann() -> User {
  user(1)
}

pub fn bob() -> User {
  user(2)
}

pub fn project(id: i64, owner: User) -> Project {
  Project {
    id,
    title: format!("Project {}", id),
    description: "Plans".to_string(),
    owner,
  }
}

pub fn task(id: i64, project: i64) -> Task {
  Task {
    id,
    title: format!("Task {}", id),
    description: String::new(),
    status: TaskStatus::Todo,
    project: ProjectRef { id: project },
    assigned_to: None,
  }
}

pub fn user_json(id: UserId, name: &str) -> Value {
  serde_json::json!({
    "id": id,
    "name": name,
    "email": format!("{}@example.com", name.to_lowercase()),
  })
}

pub fn project_json(id: i64, owner: UserId) -> Value {
  serde_json::to_value(project(id, user(owner))).unwrap()
}

pub fn task_json(id: i64, project: i64) -> Value {
  serde_json::to_value(task(id, project)).unwrap()
}
