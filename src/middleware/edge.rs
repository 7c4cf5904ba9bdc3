//! Edge gate for page requests
//!
//! Runs in front of every page route. API routes and static assets pass
//! through untouched. Everything else is allowed or redirected based on the
//! presence of the access token cookie, and receives the security headers.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, Error};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::security::SecurityHeaders;
use crate::session::has_session_cookie;
use crate::utils::responses::ResponseBuilder;

/// Paths the gate never touches
static EXCLUDED_PATHS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(api|_next/static|_next/image|favicon\.ico|public)(/|$)")
        .expect("excluded path pattern is valid")
});

/// Pages that only make sense without a session
pub const AUTH_ROUTES: [&str; 2] = ["/login", "/signup"];

/// Where signed-in users land when they open an auth route
pub const HOME_PATH: &str = "/flows";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    Allow,
    Redirect(String),
}

#[must_use]
pub fn is_excluded_path(path: &str) -> bool {
    EXCLUDED_PATHS.is_match(path)
}

#[must_use]
pub fn is_auth_route(path: &str) -> bool {
    AUTH_ROUTES.iter().any(|route| {
        path.strip_prefix(route)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Gate decision for a page path
#[must_use]
pub fn decide(path: &str, has_session: bool) -> EdgeDecision {
    match (is_auth_route(path), has_session) {
        (true, true) => EdgeDecision::Redirect(HOME_PATH.to_string()),
        (false, false) => EdgeDecision::Redirect(
            ResponseBuilder::redirect(LOGIN_PATH)
                .with_return_to(path)
                .location()
                .to_string(),
        ),
        _ => EdgeDecision::Allow,
    }
}

/// Middleware function, registered with `actix_web::middleware::from_fn`
///
/// Security headers come from the `SecurityHeaders` app data.
///
/// # Errors
///
/// Propagates errors from the wrapped service
pub async fn edge_gate(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    if is_excluded_path(req.path()) {
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    }

    let security = req.app_data::<web::Data<SecurityHeaders>>().cloned();
    let has_session = has_session_cookie(req.request());

    let mut response = match decide(req.path(), has_session) {
        EdgeDecision::Allow => next.call(req).await?.map_into_left_body(),
        EdgeDecision::Redirect(location) => {
            debug!("Edge redirect {} -> {location}", req.path());
            let redirect = ResponseBuilder::redirect(&location).build();
            req.into_response(redirect).map_into_right_body()
        }
    };

    if let Some(security) = security {
        security.apply(response.headers_mut());
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::middleware::from_fn;
    use actix_web::test::{call_service, init_service, TestRequest};
    use actix_web::{App, HttpResponse};

    use crate::session::ACCESS_TOKEN_COOKIE;

    #[test]
    fn test_excluded_paths() {
        for path in [
            "/api",
            "/api/auth/me",
            "/_next/static/chunks/app.js",
            "/_next/image",
            "/favicon.ico",
            "/public/logo.svg",
        ] {
            assert!(is_excluded_path(path), "{path} should be excluded");
        }
        for path in ["/", "/flows", "/apiary", "/publications", "/login"] {
            assert!(!is_excluded_path(path), "{path} should be gated");
        }
    }

    #[test]
    fn test_auth_route_matching() {
        assert!(is_auth_route("/login"));
        assert!(is_auth_route("/signup/confirm"));
        assert!(!is_auth_route("/loginx"));
        assert!(!is_auth_route("/flows"));
    }

    #[test]
    fn test_decision_table() {
        assert_eq!(decide("/login", false), EdgeDecision::Allow);
        assert_eq!(
            decide("/login", true),
            EdgeDecision::Redirect("/flows".to_string())
        );
        assert_eq!(
            decide("/runs/42", false),
            EdgeDecision::Redirect("/login?redirect=%2Fruns%2F42".to_string())
        );
        assert_eq!(decide("/runs/42", true), EdgeDecision::Allow);
    }

    async fn page() -> HttpResponse {
        HttpResponse::Ok().body("page")
    }

    #[actix_web::test]
    async fn test_redirects_carry_security_headers() {
        let app = init_service(
            App::new()
                .app_data(web::Data::new(SecurityHeaders::new(None)))
                .wrap(from_fn(edge_gate))
                .default_service(web::to(page)),
        )
        .await;

        let req = TestRequest::get().uri("/flows").to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            resp.headers().get("location").unwrap(),
            "/login?redirect=%2Fflows"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[actix_web::test]
    async fn test_allowed_page_gets_headers_and_api_is_untouched() {
        let app = init_service(
            App::new()
                .app_data(web::Data::new(SecurityHeaders::new(None)))
                .wrap(from_fn(edge_gate))
                .default_service(web::to(page)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/flows")
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "token"))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");

        let req = TestRequest::get().uri("/api/health").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get("x-content-type-options").is_none());
    }

    #[actix_web::test]
    async fn test_empty_session_cookie_counts_as_signed_out() {
        let app = init_service(
            App::new()
                .wrap(from_fn(edge_gate))
                .default_service(web::to(page)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/login")
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, ""))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
