use serde::{Deserialize, Serialize};

/// Assignable employee. Append-only from the application's point of view:
/// no rename or delete is exposed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Employee {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeePayload {
    pub name: String,
}
