// Authentication happens upstream in the API Gateway authorizer. The
// verified identity arrives as headers.

use dentcheck_atoms::responses::error_response;
use dentcheck_atoms::users::{Actor, Role};
use dentcheck_atoms::CoreError;
use lambda_http::http::HeaderMap;
use lambda_http::{Body, Response};

use crate::config::AppConfig;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const USER_NAME_HEADER: &str = "X-User-Name";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Read the verified actor from the request headers.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, CoreError> {
    let user_id = header(headers, USER_ID_HEADER).ok_or_else(|| {
        tracing::warn!("Missing {} header", USER_ID_HEADER);
        CoreError::Unauthorized("No identity on request".to_string())
    })?;
    let raw_role = header(headers, USER_ROLE_HEADER)
        .ok_or_else(|| CoreError::Unauthorized("No role on request".to_string()))?;
    let user_role = Role::parse(raw_role).ok_or_else(|| {
        tracing::warn!("Unknown role '{}' for user {}", raw_role, user_id);
        CoreError::Unauthorized(format!("Unknown role: {}", raw_role))
    })?;

    Ok(Actor {
        user_id: user_id.to_string(),
        user_name: header(headers, USER_NAME_HEADER).unwrap_or_default().to_string(),
        user_email: header(headers, USER_EMAIL_HEADER).unwrap_or_default().to_string(),
        user_role,
    })
}

/// Like [`actor_from_headers`], but hands back a ready 401 on failure.
pub fn authenticate_request(headers: &HeaderMap) -> Result<Actor, Response<Body>> {
    actor_from_headers(headers).map_err(|e| match error_response(&e) {
        Ok(resp) => resp,
        Err(_) => {
            let mut resp = Response::new(Body::Empty);
            *resp.status_mut() = e.status_code();
            resp
        }
    })
}

/// Origin to echo back in CORS headers.
pub fn get_cors_origin(config: &AppConfig, request_origin: Option<&str>) -> String {
    if config.allowed_origins.is_empty() {
        return "*".to_string();
    }
    match request_origin {
        Some(origin) if config.allowed_origins.iter().any(|o| o == origin) => origin.to_string(),
        _ => config.allowed_origins[0].clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(*v));
        }
        map
    }

    #[test]
    fn reads_full_identity() {
        let actor = actor_from_headers(&headers(&[
            ("x-user-id", "u-1"),
            ("x-user-role", "admin"),
            ("x-user-name", "Dr Who"),
            ("x-user-email", "who@example.com"),
        ]))
        .unwrap();
        assert_eq!(actor.user_id, "u-1");
        assert_eq!(actor.user_role, Role::Admin);
        assert_eq!(actor.user_name, "Dr Who");
    }

    #[test]
    fn missing_or_unknown_identity_is_unauthorized() {
        for pairs in [
            vec![("x-user-role", "admin")],
            vec![("x-user-id", "u-1")],
            vec![("x-user-id", "u-1"), ("x-user-role", "superuser")],
        ] {
            let err = actor_from_headers(&headers(&pairs)).unwrap_err();
            assert_eq!(err.category(), "unauthorized");
        }

        let resp = authenticate_request(&HeaderMap::new()).unwrap_err();
        assert_eq!(resp.status(), 401);
    }

    #[test]
    fn cors_origin_respects_allow_list() {
        let open = AppConfig::default();
        assert_eq!(get_cors_origin(&open, Some("https://x.example")), "*");

        let locked = AppConfig {
            allowed_origins: vec!["https://app.example".to_string(), "https://admin.example".to_string()],
            ..AppConfig::default()
        };
        assert_eq!(get_cors_origin(&locked, Some("https://admin.example")), "https://admin.example");
        assert_eq!(get_cors_origin(&locked, Some("https://evil.example")), "https://app.example");
        assert_eq!(get_cors_origin(&locked, None), "https://app.example");
    }
}
