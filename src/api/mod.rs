//! Remote task service: entities, payload validation and transport.

pub mod endpoints;
pub mod error;
pub mod model;
pub mod schema;
pub mod transport;

pub use error::{ClientError, ServiceErrorKind, TransportError};
pub use model::{Collection, EntityKind, Project, ProjectId, Task, TaskId, TaskStatus, User, UserId};
pub use transport::{HttpTransport, Transport};
