//! Endpoint table for the task service and interpretation of its responses.

use serde_json::{json, Value};

use super::error::{ClientError, ServiceError, ServiceErrorKind};
use super::model::{Project, ProjectId, Task, TaskId, User};
use super::schema::{ValidationError, Violation};
use super::transport::{ApiRequest, Method, RawResponse};

/// Every remote operation the client performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
  FindUser,
  CreateUser,
  ListUsers,
  ListProjects,
  CreateProject,
  RemoveProject,
  ListTasks,
  CreateTask,
  UpdateTask,
  RemoveTask,
}

impl Operation {
  /// Whether a successful response must carry a validated body.
  pub fn expects_payload(self) -> bool {
    !matches!(
      self,
      Operation::RemoveProject | Operation::UpdateTask | Operation::RemoveTask
    )
  }

  /// Classify a failure by where it happened and the status it carried.
  ///
  /// `None` is a 2xx response with a `message`. Server errors are never
  /// blamed on the account lookup.
  fn failure_kind(self, status: Option<u16>) -> ServiceErrorKind {
    match (self, status) {
      (_, Some(status)) if status >= 500 => ServiceErrorKind::Rejected,
      (Operation::FindUser, _) => ServiceErrorKind::NotFound,
      (Operation::CreateUser, _) => ServiceErrorKind::AlreadyExists,
      (_, Some(404)) => ServiceErrorKind::NotFound,
      (_, Some(409)) => ServiceErrorKind::AlreadyExists,
      _ => ServiceErrorKind::Rejected,
    }
  }
}

fn request(operation: Operation, method: Method, path: String, body: Option<Value>) -> ApiRequest {
  ApiRequest {
    operation,
    method,
    path,
    body,
  }
}

pub fn find_user(name: &str, email: &str) -> ApiRequest {
  let body = json!({ "name": name, "email": email });
  request(Operation::FindUser, Method::Post, "/user/find".into(), Some(body))
}

pub fn create_user(name: &str, email: &str) -> ApiRequest {
  let body = json!({ "name": name, "email": email });
  request(Operation::CreateUser, Method::Post, "/user/create".into(), Some(body))
}

pub fn list_users() -> ApiRequest {
  request(Operation::ListUsers, Method::Get, "/user".into(), None)
}

pub fn list_projects() -> ApiRequest {
  request(Operation::ListProjects, Method::Get, "/project".into(), None)
}

pub fn create_project(title: &str, description: &str, owner: &User) -> ApiRequest {
  let body = json!({ "title": title, "description": description, "owner": owner });
  request(
    Operation::CreateProject,
    Method::Post,
    "/project/create".into(),
    Some(body),
  )
}

pub fn remove_project(id: ProjectId, user: &User) -> ApiRequest {
  let body = json!({ "id": id, "user": user });
  request(
    Operation::RemoveProject,
    Method::Delete,
    format!("/project/remove/{}", id),
    Some(body),
  )
}

pub fn list_tasks(project: ProjectId) -> ApiRequest {
  request(Operation::ListTasks, Method::Get, format!("/task/{}", project), None)
}

pub fn create_task(title: &str, description: &str, project: &Project) -> ApiRequest {
  let body = json!({ "title": title, "description": description, "project": project });
  request(Operation::CreateTask, Method::Post, "/task/create".into(), Some(body))
}

pub fn update_task(task: &Task) -> ApiRequest {
  request(
    Operation::UpdateTask,
    Method::Patch,
    format!("/task/update/{}", task.id),
    Some(json!(task)),
  )
}

pub fn remove_task(id: TaskId, user: &User) -> ApiRequest {
  let body = json!({ "id": id, "user": user });
  request(
    Operation::RemoveTask,
    Method::Delete,
    format!("/task/remove/{}", id),
    Some(body),
  )
}

// ============================================================================
// Response interpretation
// ============================================================================

/// Decode a response whose body must be validated by the caller.
pub fn decode_payload(operation: Operation, response: RawResponse) -> Result<Value, ClientError> {
  match decode(operation, response)? {
    Some(value) => Ok(value),
    None => Err(ValidationError::new("", Violation::Missing).into()),
  }
}

/// Decode a response where only success matters.
pub fn decode_ack(operation: Operation, response: RawResponse) -> Result<(), ClientError> {
  decode(operation, response).map(|_| ())
}

fn decode(operation: Operation, response: RawResponse) -> Result<Option<Value>, ClientError> {
  let parsed = if response.body.trim().is_empty() {
    Ok(None)
  } else {
    serde_json::from_str::<Value>(&response.body).map(Some)
  };

  if !response.is_success() {
    let message = parsed
      .ok()
      .flatten()
      .as_ref()
      .and_then(service_message)
      .unwrap_or_else(|| format!("request failed with status {}", response.status));
    return Err(service_error(operation, Some(response.status), message));
  }

  match parsed {
    // A 2xx body carrying `message` is still a failure
    Ok(Some(value)) => match service_message(&value) {
      Some(message) => Err(service_error(operation, None, message)),
      None => Ok(Some(value)),
    },
    Ok(None) => Ok(None),
    Err(e) if operation.expects_payload() => {
      Err(ValidationError::new("", Violation::Malformed(e.to_string())).into())
    }
    Err(_) => Ok(None),
  }
}

fn service_error(operation: Operation, status: Option<u16>, message: String) -> ClientError {
  ClientError::Service(ServiceError {
    kind: operation.failure_kind(status),
    status,
    message,
  })
}

/// Extract the `message` field of an error body. Some services send a list.
fn service_message(value: &Value) -> Option<String> {
  match value.as_object()?.get("message")? {
    Value::String(s) => Some(s.clone()),
    Value::Array(items) => Some(
      items
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join(", "),
    ),
    other => Some(other.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(status: u16, body: &str) -> RawResponse {
    RawResponse {
      status,
      body: body.to_string(),
    }
  }

  fn user() -> User {
    User {
      id: 1,
      name: "Ann".to_string(),
      email: "ann@example.com".to_string(),
    }
  }

  #[test]
  fn test_endpoint_paths() {
    assert_eq!(list_tasks(7).line(), "GET /task/7");
    assert_eq!(remove_project(3, &user()).line(), "DELETE /project/remove/3");
    assert_eq!(remove_task(4, &user()).body.unwrap()["user"]["id"], 1);
    assert_eq!(find_user("Ann", "ann@example.com").line(), "POST /user/find");
  }

  #[test]
  fn test_message_on_success_is_a_service_error() {
    let err = decode_payload(
      Operation::FindUser,
      response(201, r#"{"message":"Bad request"}"#),
    )
    .unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::NotFound));
    assert_eq!(err.to_string(), "Bad request");
  }

  #[test]
  fn test_registration_failure_is_already_exists() {
    let err = decode_payload(
      Operation::CreateUser,
      response(400, r#"{"message":"Bad request","statusCode":400}"#),
    )
    .unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::AlreadyExists));
  }

  #[test]
  fn test_server_error_during_auth_is_not_an_account_problem() {
    for operation in [Operation::FindUser, Operation::CreateUser] {
      let err = decode_payload(operation, response(503, "")).unwrap_err();
      assert_eq!(err.service_kind(), Some(ServiceErrorKind::Rejected));
      assert_eq!(err.to_string(), "request failed with status 503");
    }
    let err = decode_payload(Operation::FindUser, response(404, "")).unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::NotFound));
  }

  #[test]
  fn test_status_classification_for_other_operations() {
    let err = decode_ack(Operation::RemoveTask, response(404, "")).unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::NotFound));
    assert_eq!(err.to_string(), "request failed with status 404");

    let err = decode_ack(
      Operation::UpdateTask,
      response(500, r#"{"message":["title must be a string","x"]}"#),
    )
    .unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::Rejected));
    assert_eq!(err.to_string(), "title must be a string, x");
  }

  #[test]
  fn test_ack_accepts_empty_and_opaque_bodies() {
    assert!(decode_ack(Operation::RemoveProject, response(200, "")).is_ok());
    assert!(decode_ack(Operation::UpdateTask, response(200, "OK")).is_ok());
  }

  #[test]
  fn test_payload_rejects_empty_and_non_json() {
    let err = decode_payload(Operation::ListUsers, response(200, "")).unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    let err = decode_payload(Operation::ListUsers, response(200, "<html>")).unwrap_err();
    assert!(matches!(
      err,
      ClientError::Validation(ValidationError {
        violation: Violation::Malformed(_),
        ..
      })
    ));
  }

  #[test]
  fn test_payload_passes_arrays_through() {
    let value = decode_payload(Operation::ListProjects, response(200, "[]")).unwrap();
    assert_eq!(value, json!([]));
  }
}
