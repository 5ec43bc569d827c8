use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use lambda_http::{http::StatusCode, Body, Error, Response};

use super::model::{CreateTaskPayload, UpdateTaskPayload};
use super::service;
use crate::error::StoreError;
use crate::http::{bad_request, error_response, json_response};

/// POST /tasks
pub async fn create_task_handler(
    client: &DynamoClient,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: CreateTaskPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => return bad_request(format!("invalid request body: {}", e)),
    };
    match service::create_task(client, table_name, payload).await {
        Ok(task) => json_response(StatusCode::CREATED, serde_json::to_string(&task)?),
        Err(e) => error_response(&e),
    }
}

/// GET /tasks/{id} - single task with its resolved attachment list.
pub async fn get_task_handler(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    let result = async {
        let mut task = service::get_task(client, table_name, task_id).await?;
        task.attachments =
            crate::attachments::service::list_attachments(client, table_name, task_id).await?;
        Ok::<_, StoreError>(task)
    }
    .await;

    match result {
        Ok(task) => json_response(StatusCode::OK, serde_json::to_string(&task)?),
        Err(e) => error_response(&e),
    }
}

/// PATCH /tasks/{id}
pub async fn update_task_handler(
    client: &DynamoClient,
    table_name: &str,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UpdateTaskPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => return bad_request(format!("invalid request body: {}", e)),
    };

    let result = async {
        let mut task = service::update_task(client, table_name, task_id, payload).await?;
        task.attachments =
            crate::attachments::service::list_attachments(client, table_name, task_id).await?;
        Ok::<_, StoreError>(task)
    }
    .await;

    match result {
        Ok(task) => json_response(StatusCode::OK, serde_json::to_string(&task)?),
        Err(e) => error_response(&e),
    }
}

/// DELETE /tasks/{id} - cascades into attachments and their blobs.
pub async fn delete_task_handler(
    dynamo: &DynamoClient,
    s3: &S3Client,
    table_name: &str,
    bucket_name: &str,
    task_id: &str,
) -> Result<Response<Body>, Error> {
    match service::delete_task(dynamo, s3, table_name, bucket_name, task_id).await {
        Ok(()) => json_response(
            StatusCode::OK,
            serde_json::json!({ "deleted": task_id }).to_string(),
        ),
        Err(e) => error_response(&e),
    }
}
