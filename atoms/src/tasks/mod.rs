// Re-export model types and service functions
pub mod http;
pub mod local;
pub mod model;
pub mod service;

pub use model::{CreateTaskPayload, Task, TaskStatus, UpdateTaskPayload};
pub use http::*;
pub use service::*;
