use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{http::StatusCode, Body, Error, Response};

use super::model::CreateEmployeePayload;
use super::service;
use crate::http::{bad_request, error_response, json_response};

/// GET /employees
pub async fn list_employees_handler(
    client: &DynamoClient,
    table_name: &str,
) -> Result<Response<Body>, Error> {
    match service::list_employees(client, table_name).await {
        Ok(employees) => json_response(StatusCode::OK, serde_json::to_string(&employees)?),
        Err(e) => error_response(&e),
    }
}

/// POST /employees
pub async fn add_employee_handler(
    client: &DynamoClient,
    table_name: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: CreateEmployeePayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => return bad_request(format!("invalid request body: {}", e)),
    };
    match service::add_employee(client, table_name, &payload.name).await {
        Ok(employee) => json_response(StatusCode::CREATED, serde_json::to_string(&employee)?),
        Err(e) => error_response(&e),
    }
}
