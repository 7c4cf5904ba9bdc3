use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, warn};
use reqwest::header::{HeaderValue, AUTHORIZATION};

use super::{relay_response, GatewayState};
use crate::client::ApiRequest;
use crate::utils::headers::RequestHeaderProcessor;
use crate::utils::responses::{build_upstream_url, convert_http_method, ResponseBuilder};

/// `/api/worker/{path}`
///
/// Forwards method, path, query, headers and body to the worker. The
/// service-level token is injected only when the caller sent no non-empty
/// `Authorization` of its own.
pub async fn proxy_worker(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    state: web::Data<GatewayState>,
) -> HttpResponse {
    let url = match build_upstream_url(&state.worker_base_url, &path, req.query_string()) {
        Ok(url) => url,
        Err(response) => return response,
    };
    let method = match convert_http_method(req.method()) {
        Ok(method) => method,
        Err(response) => return response,
    };

    let mut request = ApiRequest::new(method, url);
    request.headers = RequestHeaderProcessor::for_proxy().forward_request_headers(&req);

    let caller_authorized = request
        .headers
        .get(AUTHORIZATION)
        .is_some_and(|value| !value.is_empty());

    if !caller_authorized {
        if let Some(value) = state
            .worker_api_token
            .as_deref()
            .and_then(|token| HeaderValue::from_str(&format!("Bearer {token}")).ok())
        {
            request.headers.insert(AUTHORIZATION, value);
        }
    }

    if request.method != reqwest::Method::GET && request.method != reqwest::Method::HEAD {
        request.body = Some(body.to_vec());
    }

    debug!("Proxying {} {} to worker", request.method, request.url.path());
    match state.transport().send(request).await {
        Ok(upstream) => relay_response(upstream),
        Err(err) => {
            warn!("Worker proxy request failed: {err}");
            ResponseBuilder::internal_server_error()
                .with_detail("Failed to proxy request to worker")
                .build()
        }
    }
}
