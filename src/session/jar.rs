//! Request-scoped cookie store
//!
//! The authenticated client reads and rotates session tokens through a
//! [`CookieStore`]. [`RequestCookieJar`] is built from one incoming request,
//! buffers every write, and hands the writes back to the handler so they can be
//! attached to the outgoing response. Nothing here outlives the request.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use actix_web::cookie::Cookie;
use actix_web::HttpRequest;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CookieWriteError {
    #[error("cookie '{0}' cannot be written: response headers are already fixed")]
    ReadOnly(String),
}

/// Cookie access for one logical request
pub trait CookieStore: Send + Sync {
    /// Current value of a cookie, including writes made earlier in the request
    fn get(&self, name: &str) -> Option<String>;

    /// Queue a cookie for the outgoing response
    ///
    /// # Errors
    ///
    /// Returns [`CookieWriteError::ReadOnly`] when the store can no longer
    /// affect the response.
    fn set(&self, cookie: Cookie<'static>) -> Result<(), CookieWriteError>;
}

#[derive(Debug)]
struct JarState {
    pending: Vec<Cookie<'static>>,
    writable: bool,
}

#[derive(Debug)]
pub struct RequestCookieJar {
    incoming: HashMap<String, String>,
    state: Mutex<JarState>,
}

impl RequestCookieJar {
    /// Writable jar seeded with the request's cookies
    #[must_use]
    pub fn from_request(req: &HttpRequest) -> Self {
        Self::with_writable(snapshot(req), true)
    }

    /// Jar for contexts that cannot emit `Set-Cookie`; every write fails
    #[must_use]
    pub fn read_only(req: &HttpRequest) -> Self {
        Self::with_writable(snapshot(req), false)
    }

    /// Jar built from explicit name/value pairs
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let incoming = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        Self::with_writable(incoming, true)
    }

    fn with_writable(incoming: HashMap<String, String>, writable: bool) -> Self {
        Self {
            incoming,
            state: Mutex::new(JarState {
                pending: Vec::new(),
                writable,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, JarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.lock().writable
    }

    /// Drain the queued writes and seal the jar
    ///
    /// Later writes fail because the response they would belong to has
    /// already been built.
    #[must_use]
    pub fn take_pending(&self) -> Vec<Cookie<'static>> {
        let mut state = self.lock();
        state.writable = false;
        std::mem::take(&mut state.pending)
    }
}

impl CookieStore for RequestCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let state = self.lock();
        if let Some(cookie) = state.pending.iter().rev().find(|c| c.name() == name) {
            return Some(cookie.value().to_string()).filter(|value| !value.is_empty());
        }
        drop(state);

        self.incoming
            .get(name)
            .filter(|value| !value.is_empty())
            .cloned()
    }

    fn set(&self, cookie: Cookie<'static>) -> Result<(), CookieWriteError> {
        let mut state = self.lock();
        if !state.writable {
            return Err(CookieWriteError::ReadOnly(cookie.name().to_string()));
        }
        state.pending.push(cookie);
        Ok(())
    }
}

fn snapshot(req: &HttpRequest) -> HashMap<String, String> {
    req.cookies()
        .map(|cookies| {
            cookies
                .iter()
                .map(|c| (c.name().to_string(), c.value().to_string()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_snapshot_of_request_cookies() {
        let req = TestRequest::default()
            .cookie(Cookie::new("access_token", "a1"))
            .cookie(Cookie::new("refresh_token", "r1"))
            .to_http_request();
        let jar = RequestCookieJar::from_request(&req);

        assert_eq!(jar.get("access_token").as_deref(), Some("a1"));
        assert_eq!(jar.get("refresh_token").as_deref(), Some("r1"));
        assert!(jar.get("missing").is_none());
    }

    #[test]
    fn test_pending_write_is_visible_to_later_reads() {
        let jar = RequestCookieJar::from_pairs([("access_token", "old")]);
        jar.set(Cookie::new("access_token", "new")).unwrap();

        assert_eq!(jar.get("access_token").as_deref(), Some("new"));
    }

    #[test]
    fn test_expired_write_hides_incoming_value() {
        let jar = RequestCookieJar::from_pairs([("refresh_token", "r1")]);
        jar.set(Cookie::new("refresh_token", "")).unwrap();
        assert!(jar.get("refresh_token").is_none());
    }

    #[test]
    fn test_take_pending_seals_jar() {
        let jar = RequestCookieJar::from_pairs(Vec::<(String, String)>::new());
        jar.set(Cookie::new("access_token", "a2")).unwrap();

        let pending = jar.take_pending();
        assert_eq!(pending.len(), 1);
        assert!(!jar.is_writable());
        assert_eq!(
            jar.set(Cookie::new("access_token", "a3")),
            Err(CookieWriteError::ReadOnly("access_token".to_string()))
        );
        assert!(jar.take_pending().is_empty());
    }

    #[test]
    fn test_read_only_jar_rejects_writes() {
        let req = TestRequest::default()
            .cookie(Cookie::new("access_token", "a1"))
            .to_http_request();
        let jar = RequestCookieJar::read_only(&req);

        assert!(jar.set(Cookie::new("access_token", "a2")).is_err());
        assert_eq!(jar.get("access_token").as_deref(), Some("a1"));
    }
}
