use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::Utc;

use super::model::Employee;
use crate::error::StoreError;

const EMPLOYEE_PARTITION: &str = "EMPLOYEE";

fn employee_sk(employee_id: &str) -> String {
    format!("EMP#{}", employee_id)
}

/// Employees ordered by name, case-insensitively.
pub async fn list_employees(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Vec<Employee>, StoreError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(EMPLOYEE_PARTITION.to_string()))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("EMP#".to_string()))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB query error: {}", e)))?;

    let mut employees = Vec::new();
    for item in result.items() {
        if let Some(sk) = item.get("SK").and_then(|v| v.as_s().ok()) {
            if let Some(employee_id) = sk.strip_prefix("EMP#") {
                employees.push(Employee {
                    id: employee_id.to_string(),
                    name: item
                        .get("name")
                        .and_then(|v| v.as_s().ok())
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                });
            }
        }
    }
    employees.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(employees)
}

/// Case-insensitive duplicate probe over the stored `name_lower` projection.
async fn name_taken(
    client: &DynamoClient,
    table_name: &str,
    name_lower: &str,
) -> Result<bool, StoreError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(EMPLOYEE_PARTITION.to_string()))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("EMP#".to_string()))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB query error: {}", e)))?;

    Ok(result.items().iter().any(|item| {
        item.get("name_lower")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.as_str())
            == Some(name_lower)
    }))
}

/// Add an employee. The trimmed name must be non-empty and unique under
/// case-insensitive comparison; the lowered form is stored alongside the
/// name to serve that check.
pub async fn add_employee(
    client: &DynamoClient,
    table_name: &str,
    name: &str,
) -> Result<Employee, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("employee name is required".to_string()));
    }
    let name_lower = name.to_lowercase();
    if name_taken(client, table_name, &name_lower).await? {
        return Err(StoreError::DuplicateName(name.to_string()));
    }

    let employee = Employee {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
    };
    client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(EMPLOYEE_PARTITION.to_string()))
        .item("SK", AttributeValue::S(employee_sk(&employee.id)))
        .item("name", AttributeValue::S(employee.name.clone()))
        .item("name_lower", AttributeValue::S(name_lower))
        .item("created_at", AttributeValue::S(Utc::now().to_rfc3339()))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB put_item error: {}", e)))?;
    Ok(employee)
}
