use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

use crate::error::CoreError;

/// Serialize `value` as a JSON response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

/// Turn a domain error into the `{error, message}` body the UI expects.
pub fn error_response(err: &CoreError) -> Result<Response<Body>, Error> {
    json_response(
        err.status_code(),
        &serde_json::json!({ "error": err.category(), "message": err.to_string() }),
    )
}
