use annotations_block::submissions::annotate_handler;
use dentcheck_atoms::submissions::{
    get_handler, list_all_handler, list_mine_handler, reject_handler, upload_handler,
};
use dentcheck_shared::{auth, AppState};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use lambda_http::http::header::{HeaderValue, VARY};
use reports_block::{generate_report_handler, ReportSettings};
use std::sync::Arc;

const ROUTE_PREFIX: &str = "api/submissions";

fn with_cors_headers(mut resp: Response<Body>, state: &AppState, request_origin: Option<&str>) -> Response<Body> {
    let cors_origin = auth::get_cors_origin(&state.config, request_origin);

    let headers = resp.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_str(&cors_origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PUT,PATCH,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization,X-User-Id,X-User-Role,X-User-Name,X-User-Email"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));

    resp
}

fn finalize_response(
    resp: Result<Response<Body>, Error>,
    state: &AppState,
    request_origin: Option<&str>,
) -> Result<Response<Body>, Error> {
    resp.map(|r| with_cors_headers(r, state, request_origin))
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": "not_found", "message": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}

/// Main Lambda handler - routes submission, annotation and report requests
pub(crate) async fn function_handler(event: Request, state: Arc<AppState>) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    let request_origin = event.headers().get("Origin").and_then(|v| v.to_str().ok());
    tracing::info!("🚀 API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp, &state, request_origin));
    }

    let Some(rest) = path
        .trim_start_matches('/')
        .strip_prefix(ROUTE_PREFIX)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
    else {
        return finalize_response(not_found(), &state, request_origin);
    };
    let parts: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let actor = match auth::authenticate_request(event.headers()) {
        Ok(actor) => actor,
        Err(resp) => return Ok(with_cors_headers(resp, &state, request_origin)),
    };

    let submissions = state.submissions.as_ref();
    let objects = state.objects.as_ref();
    let fetch_timeout = state.config.fetch_timeout;

    let resp = match (method, parts.as_slice()) {
        // POST /api/submissions/upload - patient uploads a photo
        (&Method::POST, ["upload"]) => upload_handler(submissions, objects, &actor, body).await,
        // GET /api/submissions/admin/all - every submission, newest first
        (&Method::GET, ["admin", "all"]) => list_all_handler(submissions, &actor).await,
        // GET /api/submissions/patient/my - the caller's own submissions
        (&Method::GET, ["patient", "my"]) => list_mine_handler(submissions, &actor).await,
        // GET /api/submissions/{id}
        (&Method::GET, [submission_id]) => get_handler(submissions, &actor, submission_id).await,
        // PUT /api/submissions/{id}/annotate
        (&Method::PUT, [submission_id, "annotate"]) => {
            annotate_handler(submissions, objects, &actor, submission_id, body, fetch_timeout).await
        }
        // POST /api/submissions/{id}/generate-pdf
        (&Method::POST, [submission_id, "generate-pdf"]) => {
            let settings = ReportSettings {
                clinic_name: state.config.clinic_name.clone(),
            };
            generate_report_handler(submissions, objects, &actor, submission_id, &settings, fetch_timeout).await
        }
        // PATCH /api/submissions/{id}/reject
        (&Method::PATCH, [submission_id, "reject"]) => reject_handler(submissions, &actor, submission_id).await,
        _ => not_found(),
    };

    finalize_response(resp, &state, request_origin)
}
