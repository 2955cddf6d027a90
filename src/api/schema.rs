//! Shape checks for untyped response payloads.
//!
//! Every remote read passes through here before it may enter the cache.
//! Validation stops at the first violation; nothing is partially accepted.

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

use super::model::{Collection, EntityKind, Project, ProjectRef, Task, TaskStatus, User};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Check an address against the standard `local@domain.tld` shape.
pub fn is_valid_email(value: &str) -> bool {
  EMAIL_PATTERN.is_match(value)
}

/// What was wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
  Missing,
  WrongType {
    expected: &'static str,
    found: &'static str,
  },
  InvalidEmail,
  UnknownStatus(String),
  /// Body could not be decoded as JSON at all
  Malformed(String),
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Violation::Missing => f.write_str("required field is missing"),
      Violation::WrongType { expected, found } => write!(f, "expected {}, found {}", expected, found),
      Violation::InvalidEmail => f.write_str("invalid email address"),
      Violation::UnknownStatus(s) => write!(f, "unknown task status '{}'", s),
      Violation::Malformed(e) => write!(f, "not valid JSON ({})", e),
    }
  }
}

/// First field-level violation found in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
  /// Dotted path to the offending field, e.g. `[2].owner.email`
  pub path: String,
  pub violation: Violation,
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let location = if self.path.is_empty() {
      "payload"
    } else {
      self.path.as_str()
    };
    write!(f, "{}: {}", location, self.violation)
  }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
  pub fn new(path: impl Into<String>, violation: Violation) -> Self {
    Self {
      path: path.into(),
      violation,
    }
  }
}

/// Entities that can be built from an untyped payload.
pub trait Schema: Sized {
  fn from_value(value: &Value, path: &str) -> Result<Self, ValidationError>;
}

/// Validate a single entity.
pub fn validate_one<T: Schema>(payload: &Value) -> Result<T, ValidationError> {
  T::from_value(payload, "")
}

/// Validate an array of entities.
pub fn validate_list<T: Schema>(payload: &Value) -> Result<Vec<T>, ValidationError> {
  let items = payload
    .as_array()
    .ok_or_else(|| wrong_type("", "array", payload))?;
  items
    .iter()
    .enumerate()
    .map(|(i, item)| T::from_value(item, &format!("[{}]", i)))
    .collect()
}

/// Validate an array payload for the given kind into a cacheable collection.
pub fn validate_collection(kind: EntityKind, payload: &Value) -> Result<Collection, ValidationError> {
  Ok(match kind {
    EntityKind::User => Collection::Users(validate_list(payload)?),
    EntityKind::Project => Collection::Projects(validate_list(payload)?),
    EntityKind::Task => Collection::Tasks(validate_list(payload)?),
  })
}

impl Schema for User {
  fn from_value(value: &Value, path: &str) -> Result<Self, ValidationError> {
    let obj = object(value, path)?;
    Ok(User {
      id: integer(obj, path, "id")?,
      name: string(obj, path, "name")?,
      email: email(obj, path, "email")?,
    })
  }
}

impl Schema for Project {
  fn from_value(value: &Value, path: &str) -> Result<Self, ValidationError> {
    let obj = object(value, path)?;
    Ok(Project {
      id: integer(obj, path, "id")?,
      title: string(obj, path, "title")?,
      description: string(obj, path, "description")?,
      owner: User::from_value(field(obj, path, "owner")?, &join(path, "owner"))?,
    })
  }
}

impl Schema for Task {
  fn from_value(value: &Value, path: &str) -> Result<Self, ValidationError> {
    let obj = object(value, path)?;
    let id = integer(obj, path, "id")?;
    let title = string(obj, path, "title")?;
    let description = string(obj, path, "description")?;

    let status_raw = string(obj, path, "status")?;
    let status = TaskStatus::parse(&status_raw).ok_or_else(|| {
      ValidationError::new(join(path, "status"), Violation::UnknownStatus(status_raw.clone()))
    })?;

    let project_path = join(path, "project");
    let project_obj = object(field(obj, path, "project")?, &project_path)?;
    let project = ProjectRef {
      id: integer(project_obj, &project_path, "id")?,
    };

    let assigned_to = match obj.get("assignedTo") {
      None | Some(Value::Null) => None,
      Some(user) => Some(User::from_value(user, &join(path, "assignedTo"))?),
    };

    Ok(Task {
      id,
      title,
      description,
      status,
      project,
      assigned_to,
    })
  }
}

// ============================================================================
// Field helpers
// ============================================================================

fn join(path: &str, name: &str) -> String {
  if path.is_empty() {
    name.to_string()
  } else {
    format!("{}.{}", path, name)
  }
}

fn type_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

fn wrong_type(path: &str, expected: &'static str, found: &Value) -> ValidationError {
  ValidationError::new(
    path,
    Violation::WrongType {
      expected,
      found: type_name(found),
    },
  )
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ValidationError> {
  value.as_object().ok_or_else(|| wrong_type(path, "object", value))
}

fn field<'a>(obj: &'a Map<String, Value>, path: &str, name: &str) -> Result<&'a Value, ValidationError> {
  obj
    .get(name)
    .ok_or_else(|| ValidationError::new(join(path, name), Violation::Missing))
}

fn integer(obj: &Map<String, Value>, path: &str, name: &str) -> Result<i64, ValidationError> {
  let value = field(obj, path, name)?;
  value
    .as_i64()
    .ok_or_else(|| wrong_type(&join(path, name), "integer", value))
}

fn string(obj: &Map<String, Value>, path: &str, name: &str) -> Result<String, ValidationError> {
  let value = field(obj, path, name)?;
  value
    .as_str()
    .map(String::from)
    .ok_or_else(|| wrong_type(&join(path, name), "string", value))
}

fn email(obj: &Map<String, Value>, path: &str, name: &str) -> Result<String, ValidationError> {
  let value = string(obj, path, name)?;
  if is_valid_email(&value) {
    Ok(value)
  } else {
    Err(ValidationError::new(join(path, name), Violation::InvalidEmail))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn project_json() -> Value {
    json!({
      "id": 7,
      "title": "Roadmap",
      "description": "Q3",
      "owner": { "id": 1, "name": "Ann", "email": "ann@example.com" }
    })
  }

  #[test]
  fn test_email_pattern() {
    assert!(is_valid_email("ann@example.com"));
    assert!(!is_valid_email("ann@example"));
    assert!(!is_valid_email("ann example@x.io"));
    assert!(!is_valid_email("@x.io"));
  }

  #[test]
  fn test_valid_project() {
    let project: Project = validate_one(&project_json()).unwrap();
    assert_eq!(project.id, 7);
    assert_eq!(project.owner.name, "Ann");
  }

  #[test]
  fn test_nested_owner_email_is_checked() {
    let mut payload = project_json();
    payload["owner"]["email"] = json!("not-an-email");
    let err = validate_one::<Project>(&payload).unwrap_err();
    assert_eq!(err.path, "owner.email");
    assert_eq!(err.violation, Violation::InvalidEmail);
  }

  #[test]
  fn test_first_violation_wins() {
    let payload = json!({ "id": "7", "title": 3 });
    let err = validate_one::<Project>(&payload).unwrap_err();
    assert_eq!(err.path, "id");
    assert_eq!(
      err.violation,
      Violation::WrongType {
        expected: "integer",
        found: "string"
      }
    );
  }

  #[test]
  fn test_missing_field() {
    let payload = json!({ "id": 1, "name": "Ann" });
    let err = validate_one::<User>(&payload).unwrap_err();
    assert_eq!(err.path, "email");
    assert_eq!(err.violation, Violation::Missing);
    assert_eq!(err.to_string(), "email: required field is missing");
  }

  #[test]
  fn test_list_reports_index() {
    let payload = json!([project_json(), { "id": 8 }]);
    let err = validate_list::<Project>(&payload).unwrap_err();
    assert_eq!(err.path, "[1].title");
  }

  #[test]
  fn test_list_requires_array() {
    let err = validate_collection(EntityKind::User, &json!({ "id": 1 })).unwrap_err();
    assert_eq!(err.path, "");
    assert!(err.to_string().starts_with("payload: expected array"));
  }

  #[test]
  fn test_task_with_and_without_assignee() {
    let payload = json!([
      {
        "id": 1, "title": "a", "description": "", "status": "TODO",
        "project": { "id": 7 }, "assignedTo": null
      },
      {
        "id": 2, "title": "b", "description": "", "status": "DONE",
        "project": project_json(),
        "assignedTo": { "id": 3, "name": "Bo", "email": "bo@example.com" }
      }
    ]);
    let tasks = validate_collection(EntityKind::Task, &payload).unwrap();
    let tasks = tasks.tasks();
    assert_eq!(tasks[0].assigned_to, None);
    assert_eq!(tasks[1].project.id, 7);
    assert_eq!(tasks[1].assigned_to.as_ref().map(|u| u.id), Some(3));
  }

  #[test]
  fn test_task_rejects_unknown_status() {
    let payload = json!({
      "id": 1, "title": "a", "description": "", "status": "BLOCKED",
      "project": { "id": 7 }, "assignedTo": null
    });
    let err = validate_one::<Task>(&payload).unwrap_err();
    assert_eq!(err.path, "status");
    assert_eq!(err.violation, Violation::UnknownStatus("BLOCKED".to_string()));
  }

  #[test]
  fn test_task_rejects_malformed_assignee() {
    let payload = json!({
      "id": 1, "title": "a", "description": "", "status": "TODO",
      "project": { "id": 7 }, "assignedTo": { "id": 3, "name": "Bo" }
    });
    let err = validate_one::<Task>(&payload).unwrap_err();
    assert_eq!(err.path, "assignedTo.email");
  }
}
