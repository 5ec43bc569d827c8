use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use lambda_http::{http::StatusCode, Body, Error, Response};

use super::model::{AddLinkPayload, AttachmentPolicy, FileUpload, UploadAttachmentPayload};
use super::service;
use crate::http::{bad_request, error_response, json_response};

/// POST /tasks/{id}/attachments
pub async fn upload_attachment_handler(
    dynamo: &DynamoClient,
    s3: &S3Client,
    table_name: &str,
    bucket_name: &str,
    policy: &AttachmentPolicy,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UploadAttachmentPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => return bad_request(format!("invalid request body: {}", e)),
    };
    let bytes = match BASE64.decode(payload.data_base64.as_bytes()) {
        Ok(b) => b,
        Err(e) => return bad_request(format!("invalid base64 payload: {}", e)),
    };

    // the object key nests under the task id, so the task must exist first
    if let Err(e) = crate::tasks::service::get_task(dynamo, table_name, task_id).await {
        return error_response(&e);
    }

    let upload = FileUpload {
        name: payload.name,
        mime: payload.mime,
        bytes,
    };
    match service::upload_file(dynamo, s3, table_name, bucket_name, task_id, policy, upload).await {
        Ok(attachment) => json_response(StatusCode::CREATED, serde_json::to_string(&attachment)?),
        Err(e) => error_response(&e),
    }
}

/// POST /tasks/{id}/links
pub async fn add_link_handler(
    dynamo: &DynamoClient,
    table_name: &str,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: AddLinkPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => return bad_request(format!("invalid request body: {}", e)),
    };

    if let Err(e) = crate::tasks::service::get_task(dynamo, table_name, task_id).await {
        return error_response(&e);
    }

    match service::add_link(dynamo, table_name, task_id, &payload.url, payload.label.as_deref())
        .await
    {
        Ok(attachment) => json_response(StatusCode::CREATED, serde_json::to_string(&attachment)?),
        Err(e) => error_response(&e),
    }
}
