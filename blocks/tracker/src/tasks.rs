use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};
use taskboard_atoms as atoms;

use atoms::error::StoreError;
use atoms::filter::TaskFilter;
use atoms::http::{error_response, json_response};
use atoms::tasks::Task;

/// Load every task with its resolved attachment list, newest first
/// (Backend Join).
pub async fn load_tasks_with_attachments(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Vec<Task>, StoreError> {
    // 1. Fetch the task collection
    let mut tasks = atoms::tasks::service::list_tasks(client, table_name).await?;

    // 2. Resolve every task's attachment sub-collection concurrently
    let attachment_lists = futures::future::try_join_all(
        tasks
            .iter()
            .map(|t| atoms::attachments::service::list_attachments(client, table_name, &t.id)),
    )
    .await?;

    // 3. Attach the lists to their tasks
    for (task, attachments) in tasks.iter_mut().zip(attachment_lists) {
        task.attachments = attachments;
    }
    Ok(tasks)
}

/// GET /tasks - filtered list with the attachment join.
pub async fn list_tasks_handler(
    client: &DynamoClient,
    table_name: &str,
    filter: TaskFilter,
) -> Result<Response<Body>, Error> {
    match load_tasks_with_attachments(client, table_name).await {
        Ok(tasks) => {
            let visible = filter.apply(&tasks);
            json_response(StatusCode::OK, serde_json::to_string(&visible)?)
        }
        Err(e) => error_response(&e),
    }
}

/// GET /tasks/export - CSV of the full task set.
pub async fn export_tasks_handler(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    match load_tasks_with_attachments(client, table_name).await {
        Ok(tasks) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/csv")
            .header(
                "Content-Disposition",
                "attachment; filename=\"tasks-export.csv\"",
            )
            .header("Access-Control-Allow-Origin", "*")
            .body(atoms::export::tasks_to_csv(&tasks).into())
            .map_err(Box::new)?),
        Err(e) => error_response(&e),
    }
}
