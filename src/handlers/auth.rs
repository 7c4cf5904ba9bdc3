use std::sync::Arc;

use actix_web::http::header::{CACHE_CONTROL, CONTENT_TYPE, SET_COOKIE};
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use super::{apply_cookies, GatewayState};
use crate::client::{BackendClient, ClientError};
use crate::models::{LoginRequest, LogoutResponse, RegisterRequest};
use crate::session::{parse_set_cookie_header, RequestCookieJar};
use crate::utils::headers::is_secure_request;
use crate::utils::responses::ResponseBuilder;

fn parse_body<T: DeserializeOwned>(body: &web::Bytes) -> Result<T, HttpResponse> {
    serde_json::from_slice(body).map_err(|err| {
        debug!("Rejecting malformed JSON body: {err}");
        ResponseBuilder::invalid_json()
    })
}

/// Error response carrying the backend's status and normalised detail
fn backend_error(err: &ClientError, default_status: u16, default_detail: &str) -> HttpResponse {
    let status = err.status().unwrap_or(default_status);
    let detail = err.detail().unwrap_or_else(|| default_detail.to_string());
    ResponseBuilder::error(status).with_detail(&detail).build()
}

/// `POST /api/auth/login`
///
/// Forwards the credentials as a password grant and relays the backend's
/// token body and every `Set-Cookie` header. Over plain HTTP the cookies are
/// rewritten through the Set-Cookie bridge so the browser accepts them.
pub async fn login(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<GatewayState>,
) -> HttpResponse {
    let credentials: LoginRequest = match parse_body(&body) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return ResponseBuilder::missing_credentials();
    }

    let upstream = match state
        .api
        .unauthenticated()
        .login(&credentials.email, &credentials.password)
        .await
    {
        Ok(upstream) => upstream,
        Err(err) => {
            info!("Login rejected: {err}");
            return backend_error(&err, 401, "Authentication failed");
        }
    };

    let secure = is_secure_request(&req);
    let mut builder = HttpResponse::Ok();
    builder.insert_header((CONTENT_TYPE, "application/json"));

    for raw in upstream.set_cookies() {
        if secure {
            builder.append_header((SET_COOKIE, raw));
        } else if let Some(parsed) = parse_set_cookie_header(&raw, false) {
            builder.append_header((SET_COOKIE, parsed.to_header_value()));
        } else {
            warn!("Dropping unparseable Set-Cookie header from backend");
        }
    }

    builder.body(upstream.body)
}

/// `POST /api/auth/logout`
///
/// Always succeeds; both session cookies are expired whether or not they exist.
pub async fn logout(state: web::Data<GatewayState>) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    for cookie in state.cookie_factory.expired_session_cookies() {
        builder.cookie(cookie);
    }
    builder.json(LogoutResponse { ok: true })
}

/// `GET /api/auth/me`
pub async fn me(req: HttpRequest, state: web::Data<GatewayState>) -> HttpResponse {
    let jar = Arc::new(RequestCookieJar::from_request(&req));
    let result = state.api.authenticated(jar.clone()).current_user().await;
    let rotated = jar.take_pending();

    match result {
        Ok(user) => {
            let mut response = ResponseBuilder::ok()
                .with_header(CACHE_CONTROL.as_str(), "no-store")
                .json(&user);
            apply_cookies(&mut response, &rotated);
            response
        }
        Err(err) => {
            debug!("Current user lookup failed: {err}");
            let status = err
                .status()
                .filter(|status| (400..500).contains(status))
                .unwrap_or(401);

            let detail = if status == 401 {
                "Unauthorized".to_string()
            } else {
                err.detail().unwrap_or_else(|| "Unauthorized".to_string())
            };

            let mut response = ResponseBuilder::error(status)
                .with_detail(&detail)
                .with_header(CACHE_CONTROL.as_str(), "no-store")
                .build();

            if status == 401 {
                apply_cookies(&mut response, &state.cookie_factory.expired_session_cookies());
            } else {
                apply_cookies(&mut response, &rotated);
            }
            response
        }
    }
}

/// `POST /api/auth/register`
///
/// Does not sign the new user in.
pub async fn register(body: web::Bytes, state: web::Data<GatewayState>) -> HttpResponse {
    let payload: RegisterRequest = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    if payload.email.is_empty() || payload.password.is_empty() {
        return ResponseBuilder::missing_credentials();
    }

    match state.api.unauthenticated().register(&payload).await {
        Ok(user) => ResponseBuilder::created().json(&user),
        Err(err) => {
            info!("Registration rejected: {err}");
            backend_error(&err, 500, "Registration failed")
        }
    }
}
