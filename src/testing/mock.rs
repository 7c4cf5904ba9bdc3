//! Scripted transport for exercising the clients and handlers without a network

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::Value;

use crate::client::{ApiRequest, ApiResponse, ClientError, Transport};

/// One scripted reply
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl MockResponse {
    /// JSON body with the given status
    ///
    /// # Panics
    ///
    /// Panics if the value cannot be serialized
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: vec![(CONTENT_TYPE.to_string(), "application/json".to_string())],
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    #[must_use]
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![(CONTENT_TYPE.to_string(), "text/plain".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_set_cookie(self, raw: &str) -> Self {
        self.with_header(SET_COOKIE.as_str(), raw)
    }

    fn to_api_response(&self) -> ApiResponse {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        ApiResponse {
            status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers,
            body: self.body.clone(),
        }
    }
}

type Reply = Result<MockResponse, String>;

#[derive(Default)]
struct MockState {
    replies: HashMap<String, VecDeque<Reply>>,
    requests: Vec<ApiRequest>,
}

/// Transport that answers by URL path and records every request
///
/// Replies queued for a path are served in order; the last one is repeated
/// once the queue is down to it. Unscripted paths answer 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply for `path`
    #[must_use]
    pub fn respond(self, path: &str, response: MockResponse) -> Self {
        self.push(path, Ok(response));
        self
    }

    /// Queue a transport failure for `path`
    #[must_use]
    pub fn fail(self, path: &str, message: &str) -> Self {
        self.push(path, Err(message.to_string()));
        self
    }

    fn push(&self, path: &str, reply: Reply) {
        self.lock()
            .replies
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Every request sent so far, in order
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Requests sent to `path`
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.url.path() == path)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn call_count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let path = request.url.path().to_string();
        let mut state = self.lock();
        state.requests.push(request);

        let reply = match state.replies.get_mut(&path) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        match reply {
            Some(Ok(response)) => Ok(response.to_api_response()),
            Some(Err(message)) => Err(ClientError::Transport(message)),
            None => Ok(MockResponse::json(404, serde_json::json!({"detail": "Not Found"}))
                .to_api_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(path: &str) -> ApiRequest {
        ApiRequest::get(Url::parse(&format!("http://backend.test{path}")).unwrap())
    }

    #[tokio::test]
    async fn test_replies_in_order_then_repeat_last() {
        let transport = MockTransport::new()
            .respond("/a", MockResponse::text(401, "first"))
            .respond("/a", MockResponse::text(200, "second"));

        assert_eq!(transport.send(get("/a")).await.unwrap().status, 401);
        assert_eq!(transport.send(get("/a")).await.unwrap().status, 200);
        assert_eq!(transport.send(get("/a")).await.unwrap().status, 200);
        assert_eq!(transport.call_count("/a"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_path_and_failures() {
        let transport = MockTransport::new().fail("/down", "connection refused");

        assert_eq!(transport.send(get("/missing")).await.unwrap().status, 404);
        assert!(matches!(
            transport.send(get("/down")).await,
            Err(ClientError::Transport(_))
        ));
    }
}
