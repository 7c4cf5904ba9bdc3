use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, warn};

use super::{apply_cookies, relay_response, GatewayState};
use crate::client::{ApiRequest, BackendClient};
use crate::models::HealthResponse;
use crate::session::RequestCookieJar;
use crate::utils::headers::RequestHeaderProcessor;
use crate::utils::responses::{build_upstream_url, convert_http_method, ResponseBuilder};

pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    ResponseBuilder::ok().json(&HealthResponse {
        status: "ok".to_string(),
        message: "YeetFlow gateway is running".to_string(),
    })
}

#[must_use]
pub fn is_api_path(path: &str) -> bool {
    path.strip_prefix("/api")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[must_use]
pub fn is_admin_path(path: &str) -> bool {
    path.strip_prefix("/admin")
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

enum AdminGate {
    Allow,
    Deny(HttpResponse),
}

/// Resolve the caller through the backend before serving an admin page
async fn check_admin(req: &HttpRequest, state: &GatewayState) -> (AdminGate, Vec<Cookie<'static>>) {
    let jar = Arc::new(RequestCookieJar::from_request(req));
    let result = state.api.authenticated(jar.clone()).current_user().await;
    let rotated = jar.take_pending();

    let gate = match result {
        Ok(user) if user.is_admin() => AdminGate::Allow,
        Ok(user) => {
            debug!("User {} is not an admin, denying {}", user.id, req.path());
            AdminGate::Deny(ResponseBuilder::redirect(UNAUTHORIZED_PATH).build())
        }
        Err(err) => {
            debug!("Admin page requested without a valid session: {err}");
            AdminGate::Deny(
                ResponseBuilder::redirect("/login")
                    .with_return_to(req.path())
                    .build(),
            )
        }
    };

    (gate, rotated)
}

/// Catch-all page route, forwarded to the frontend renderer
///
/// Pages under `/admin` are only served to users whose backend role is admin.
pub async fn proxy_page(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<GatewayState>,
) -> HttpResponse {
    if is_api_path(req.path()) {
        return ResponseBuilder::error(404).with_detail("Not Found").build();
    }

    let mut rotated = Vec::new();
    if is_admin_path(req.path()) {
        let (gate, cookies) = check_admin(&req, &state).await;
        rotated = cookies;
        if let AdminGate::Deny(mut response) = gate {
            apply_cookies(&mut response, &rotated);
            return response;
        }
    }

    let url = match build_upstream_url(&state.frontend_url, req.path(), req.query_string()) {
        Ok(url) => url,
        Err(response) => return response,
    };
    let method = match convert_http_method(req.method()) {
        Ok(method) => method,
        Err(response) => return response,
    };

    let mut request = ApiRequest::new(method, url);
    request.headers = RequestHeaderProcessor::for_proxy().forward_request_headers(&req);
    if !body.is_empty() {
        request.body = Some(body.to_vec());
    }

    let mut response = match state.transport().send(request).await {
        Ok(upstream) => relay_response(upstream),
        Err(err) => {
            warn!("Frontend request for {} failed: {err}", req.path());
            ResponseBuilder::bad_gateway()
                .with_detail("Frontend unavailable")
                .build()
        }
    };
    apply_cookies(&mut response, &rotated);
    response
}
