use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, NaiveDate, Utc};

use super::model::{CreateTaskPayload, Task, TaskStatus, UpdateTaskPayload};
use crate::error::StoreError;

const TASK_PARTITION: &str = "TASK";

fn task_sk(task_id: &str) -> String {
    format!("TASK#{}", task_id)
}

/// Map a task item out of DynamoDB. Attachments are left empty here and
/// joined in by the tracker block.
pub(crate) fn task_from_item(
    task_id: &str,
    item: &HashMap<String, AttributeValue>,
) -> Result<Task, StoreError> {
    let get_s = |key: &str| {
        item.get(key)
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
    };

    let created_at = get_s("created_at")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| {
            StoreError::Storage(format!("task {} has a malformed created_at", task_id))
        })?;

    Ok(Task {
        id: task_id.to_string(),
        title: get_s("title").unwrap_or_default(),
        details: get_s("details").unwrap_or_default(),
        assigned_id: get_s("assigned_id").filter(|s| !s.is_empty()),
        assigned_name: get_s("assigned_name").unwrap_or_default(),
        created_at,
        deadline: get_s("deadline")
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        status: get_s("status")
            .and_then(|s| TaskStatus::parse(&s))
            .unwrap_or_default(),
        attachments: Vec::new(),
    })
}

/// Load every task, newest first.
pub async fn list_tasks(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Vec<Task>, StoreError> {
    let result = client
        .query()
        .table_name(table_name)
        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
        .expression_attribute_values(":pk", AttributeValue::S(TASK_PARTITION.to_string()))
        .expression_attribute_values(":sk_prefix", AttributeValue::S("TASK#".to_string()))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB query error: {}", e)))?;

    let mut tasks = Vec::new();
    for item in result.items() {
        if let Some(sk) = item.get("SK").and_then(|v| v.as_s().ok()) {
            if let Some(task_id) = sk.strip_prefix("TASK#") {
                tasks.push(task_from_item(task_id, item)?);
            }
        }
    }
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(tasks)
}

/// Create a task. The id and creation timestamp are assigned here and
/// never change afterwards.
pub async fn create_task(
    client: &DynamoClient,
    table_name: &str,
    payload: CreateTaskPayload,
) -> Result<Task, StoreError> {
    let task = payload.into_task(Utc::now())?;

    let mut builder = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(TASK_PARTITION.to_string()))
        .item("SK", AttributeValue::S(task_sk(&task.id)))
        .item("title", AttributeValue::S(task.title.clone()))
        .item("details", AttributeValue::S(task.details.clone()))
        .item("assigned_name", AttributeValue::S(task.assigned_name.clone()))
        .item("created_at", AttributeValue::S(task.created_at.to_rfc3339()))
        .item("status", AttributeValue::S(task.status.as_str().to_string()));

    if let Some(assigned_id) = &task.assigned_id {
        builder = builder.item("assigned_id", AttributeValue::S(assigned_id.clone()));
    }
    if let Some(deadline) = &task.deadline {
        builder = builder.item(
            "deadline",
            AttributeValue::S(deadline.format("%Y-%m-%d").to_string()),
        );
    }

    builder
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB put_item error: {}", e)))?;
    Ok(task)
}

/// Get a specific task (without its attachment join).
pub async fn get_task(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
) -> Result<Task, StoreError> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(TASK_PARTITION.to_string()))
        .key("SK", AttributeValue::S(task_sk(task_id)))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB get_item error: {}", e)))?;

    match result.item() {
        Some(item) => task_from_item(task_id, item),
        None => Err(StoreError::NotFound(format!("task {}", task_id))),
    }
}

/// Merge a patch into the stored record via an update expression. `id` and
/// `created_at` are never written.
pub async fn update_task(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
    payload: UpdateTaskPayload,
) -> Result<Task, StoreError> {
    // surface a missing id as NotFound instead of upserting blindly
    get_task(client, table_name, task_id).await?;

    let mut update_expr = vec![];
    let mut expr_names = HashMap::new();
    let mut expr_values = HashMap::new();

    if let Some(title) = payload.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }
        update_expr.push("#title = :title");
        expr_names.insert("#title".to_string(), "title".to_string());
        expr_values.insert(":title".to_string(), AttributeValue::S(title));
    }

    if let Some(details) = payload.details {
        update_expr.push("#details = :details");
        expr_names.insert("#details".to_string(), "details".to_string());
        expr_values.insert(":details".to_string(), AttributeValue::S(details));
    }

    if let Some(assigned_id) = payload.assigned_id {
        update_expr.push("#assigned_id = :assigned_id");
        expr_names.insert("#assigned_id".to_string(), "assigned_id".to_string());
        expr_values.insert(":assigned_id".to_string(), AttributeValue::S(assigned_id));
    }

    if let Some(assigned_name) = payload.assigned_name {
        update_expr.push("#assigned_name = :assigned_name");
        expr_names.insert("#assigned_name".to_string(), "assigned_name".to_string());
        expr_values.insert(
            ":assigned_name".to_string(),
            AttributeValue::S(assigned_name),
        );
    }

    if let Some(deadline) = payload.deadline {
        update_expr.push("#deadline = :deadline");
        expr_names.insert("#deadline".to_string(), "deadline".to_string());
        expr_values.insert(
            ":deadline".to_string(),
            AttributeValue::S(deadline.format("%Y-%m-%d").to_string()),
        );
    }

    if let Some(status) = payload.status {
        update_expr.push("#status = :status");
        expr_names.insert("#status".to_string(), "status".to_string());
        expr_values.insert(
            ":status".to_string(),
            AttributeValue::S(status.as_str().to_string()),
        );
    }

    if !update_expr.is_empty() {
        let update_expression = format!("SET {}", update_expr.join(", "));

        let mut builder = client
            .update_item()
            .table_name(table_name)
            .key("PK", AttributeValue::S(TASK_PARTITION.to_string()))
            .key("SK", AttributeValue::S(task_sk(task_id)))
            .update_expression(update_expression);

        for (k, v) in expr_names {
            builder = builder.expression_attribute_names(k, v);
        }
        for (k, v) in expr_values {
            builder = builder.expression_attribute_values(k, v);
        }

        builder
            .send()
            .await
            .map_err(|e| StoreError::Storage(format!("DynamoDB update_item error: {}", e)))?;
    }

    get_task(client, table_name, task_id).await
}

/// Delete a task and everything under it. Every attachment (and its blob
/// object) is removed concurrently and joined before the task record goes,
/// so no storage objects are orphaned; individual blob failures are logged
/// and swallowed inside `delete_attachment`.
pub async fn delete_task(
    dynamo: &DynamoClient,
    s3: &S3Client,
    table_name: &str,
    bucket_name: &str,
    task_id: &str,
) -> Result<(), StoreError> {
    let attachments =
        crate::attachments::service::list_attachments(dynamo, table_name, task_id).await?;
    let removals = attachments.iter().map(|a| {
        crate::attachments::service::delete_attachment(
            dynamo,
            s3,
            table_name,
            bucket_name,
            task_id,
            a,
        )
    });
    futures::future::try_join_all(removals).await?;

    dynamo
        .delete_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(TASK_PARTITION.to_string()))
        .key("SK", AttributeValue::S(task_sk(task_id)))
        .send()
        .await
        .map_err(|e| StoreError::Storage(format!("DynamoDB delete_item error: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_maps_back_to_a_task() {
        let mut item = HashMap::new();
        item.insert("title".to_string(), AttributeValue::S("Fix login".into()));
        item.insert("details".to_string(), AttributeValue::S("SSO broken".into()));
        item.insert("assigned_id".to_string(), AttributeValue::S("e1".into()));
        item.insert("assigned_name".to_string(), AttributeValue::S("Ann".into()));
        item.insert(
            "created_at".to_string(),
            AttributeValue::S("2026-01-02T03:04:05+00:00".into()),
        );
        item.insert("deadline".to_string(), AttributeValue::S("2026-02-01".into()));
        item.insert("status".to_string(), AttributeValue::S("Waiting client".into()));

        let task = task_from_item("t1", &item).unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(task.title, "Fix login");
        assert_eq!(task.status, TaskStatus::WaitingClient);
        assert_eq!(
            task.deadline,
            NaiveDate::from_ymd_opt(2026, 2, 1)
        );
        assert!(task.attachments.is_empty());
    }

    #[test]
    fn unknown_status_defaults_to_open() {
        let mut item = HashMap::new();
        item.insert(
            "created_at".to_string(),
            AttributeValue::S("2026-01-02T03:04:05+00:00".into()),
        );
        item.insert("status".to_string(), AttributeValue::S("Archived".into()));

        let task = task_from_item("t1", &item).unwrap();
        assert_eq!(task.status, TaskStatus::Open);
    }

    #[test]
    fn malformed_created_at_is_a_storage_failure() {
        let mut item = HashMap::new();
        item.insert("title".to_string(), AttributeValue::S("x".into()));
        item.insert("created_at".to_string(), AttributeValue::S("yesterday".into()));

        let err = task_from_item("t1", &item).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
