use lambda_http::{http::StatusCode, Body, Error, Response};

use crate::error::StoreError;

pub fn json_response(status: StatusCode, body: String) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(body.into())
        .map_err(Box::new)?)
}

pub fn bad_request(message: String) -> Result<Response<Body>, Error> {
    json_response(
        StatusCode::BAD_REQUEST,
        serde_json::json!({ "error": message }).to_string(),
    )
}

/// Map a store failure onto the wire: taxonomy-driven status plus a JSON
/// error body.
pub fn error_response(err: &StoreError) -> Result<Response<Body>, Error> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!("store failure: {}", err);
    }
    json_response(status, serde_json::json!({ "error": err.to_string() }).to_string())
}
