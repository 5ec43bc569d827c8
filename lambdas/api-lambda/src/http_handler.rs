use std::sync::Arc;

use lambda_http::http::header::HeaderValue;
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use taskboard_atoms as atoms;
use taskboard_shared::AppState;

use atoms::attachments::model::AttachmentPolicy;
use atoms::filter::TaskFilter;

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PATCH,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    resp
}

fn finalize_response(resp: Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
    resp.map(with_cors_headers)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

/// Wake live subscriptions after a successful mutation.
fn publish_on_success(state: &AppState, resp: &Result<Response<Body>, Error>) {
    if let Ok(resp) = resp {
        if resp.status().is_success() {
            state.changes.publish();
        }
    }
}

/// Main Lambda handler - routes requests to employee and task endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    let table_name = &state.table_name;
    let bucket_name = &state.bucket_name;

    if path.starts_with("/employees") {
        let resp = match (method, path) {
            (&Method::GET, "/employees") => {
                atoms::employees::http::list_employees_handler(&state.dynamo_client, table_name)
                    .await
            }
            (&Method::POST, "/employees") => {
                let resp = atoms::employees::http::add_employee_handler(
                    &state.dynamo_client,
                    table_name,
                    body,
                )
                .await;
                publish_on_success(&state, &resp);
                resp
            }
            (_, "/employees") => method_not_allowed(),
            _ => not_found(),
        };
        return finalize_response(resp);
    }

    if path.starts_with("/tasks") {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let resp = match (method, parts.as_slice()) {
            // GET /tasks - filtered list with attachments (Backend Join)
            (&Method::GET, ["tasks"]) => {
                let params = event.query_string_parameters();
                let filter = TaskFilter::from_query(
                    params.first("status"),
                    params.first("assigned"),
                    params.first("date"),
                    params.first("q"),
                );
                tracker_block::tasks::list_tasks_handler(&state.dynamo_client, table_name, filter)
                    .await
            }
            // POST /tasks - create task
            (&Method::POST, ["tasks"]) => {
                let resp =
                    atoms::tasks::http::create_task_handler(&state.dynamo_client, table_name, body)
                        .await;
                publish_on_success(&state, &resp);
                resp
            }
            // GET /tasks/export - CSV download
            (&Method::GET, ["tasks", "export"]) => {
                tracker_block::tasks::export_tasks_handler(&state.dynamo_client, table_name).await
            }
            // GET /tasks/{id} - get task with attachments
            (&Method::GET, ["tasks", task_id]) => {
                atoms::tasks::http::get_task_handler(&state.dynamo_client, table_name, task_id)
                    .await
            }
            // PATCH /tasks/{id} - merge a patch into the task
            (&Method::PATCH, ["tasks", task_id]) => {
                let resp = atoms::tasks::http::update_task_handler(
                    &state.dynamo_client,
                    table_name,
                    task_id,
                    body,
                )
                .await;
                publish_on_success(&state, &resp);
                resp
            }
            // DELETE /tasks/{id} - cascade into attachments and blobs
            (&Method::DELETE, ["tasks", task_id]) => {
                let resp = atoms::tasks::http::delete_task_handler(
                    &state.dynamo_client,
                    &state.s3_client,
                    table_name,
                    bucket_name,
                    task_id,
                )
                .await;
                publish_on_success(&state, &resp);
                resp
            }
            // POST /tasks/{id}/attachments - upload a file
            (&Method::POST, ["tasks", task_id, "attachments"]) => {
                let policy = AttachmentPolicy::from_env();
                let resp = atoms::attachments::http::upload_attachment_handler(
                    &state.dynamo_client,
                    &state.s3_client,
                    table_name,
                    bucket_name,
                    &policy,
                    task_id,
                    body,
                )
                .await;
                publish_on_success(&state, &resp);
                resp
            }
            // POST /tasks/{id}/links - add an external link
            (&Method::POST, ["tasks", task_id, "links"]) => {
                let resp = atoms::attachments::http::add_link_handler(
                    &state.dynamo_client,
                    table_name,
                    task_id,
                    body,
                )
                .await;
                publish_on_success(&state, &resp);
                resp
            }
            _ => not_found(),
        };
        return finalize_response(resp);
    }

    tracing::warn!("No route matched - Method: {} Path: {}", method, path);
    finalize_response(not_found())
}
