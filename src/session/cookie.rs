use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::HttpRequest;

use crate::models::Token;

/// Cookie names shared by the gateway, the backend and the edge middleware
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: Option<Duration>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age: None,
        }
    }
}

/// Cookie factory for the session cookies minted by the gateway itself
///
/// Cookies relayed from the backend go through the Set-Cookie bridge instead;
/// this factory covers refreshed tokens and logout.
#[derive(Debug, Clone, Copy)]
pub struct CookieFactory {
    secure: bool,
}

impl CookieFactory {
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Generic method to create a cookie with the factory's `Secure` flag
    #[must_use]
    pub fn create_cookie(&self, name: &str, value: &str, options: CookieOptions) -> Cookie<'static> {
        let mut builder = Cookie::build(name.to_owned(), value.to_owned())
            .http_only(options.http_only)
            .secure(self.secure)
            .same_site(options.same_site)
            .path(options.path);

        if let Some(max_age) = options.max_age {
            builder = builder.max_age(max_age);
        }

        builder.finish()
    }

    /// Access token cookie, scoped to the token's lifetime when the backend sent one
    #[must_use]
    pub fn access_token_cookie(&self, token: &Token) -> Cookie<'static> {
        self.create_cookie(
            ACCESS_TOKEN_COOKIE,
            &token.access_token,
            CookieOptions {
                max_age: token.expires_in.map(Duration::seconds),
                ..Default::default()
            },
        )
    }

    /// Rotated refresh token cookie, `None` when the backend did not rotate it
    #[must_use]
    pub fn refresh_token_cookie(&self, token: &Token) -> Option<Cookie<'static>> {
        token.rotated_refresh_token().map(|refresh_token| {
            self.create_cookie(
                REFRESH_TOKEN_COOKIE,
                refresh_token,
                CookieOptions {
                    max_age: token.refresh_expires_in.map(Duration::seconds),
                    ..Default::default()
                },
            )
        })
    }

    /// Cookies that replace the stored tokens after a successful refresh
    #[must_use]
    pub fn token_cookies(&self, token: &Token) -> Vec<Cookie<'static>> {
        let mut cookies = vec![self.access_token_cookie(token)];
        cookies.extend(self.refresh_token_cookie(token));
        cookies
    }

    /// Create an expired cookie for clearing
    #[must_use]
    pub fn expired_cookie(&self, name: &str) -> Cookie<'static> {
        self.create_cookie(
            name,
            "",
            CookieOptions {
                max_age: Some(Duration::ZERO),
                ..Default::default()
            },
        )
    }

    /// Expired versions of both session cookies
    #[must_use]
    pub fn expired_session_cookies(&self) -> [Cookie<'static>; 2] {
        [
            self.expired_cookie(ACCESS_TOKEN_COOKIE),
            self.expired_cookie(REFRESH_TOKEN_COOKIE),
        ]
    }
}

/// Whether the request carries a non-empty access token cookie
#[must_use]
pub fn has_session_cookie(req: &HttpRequest) -> bool {
    req.cookie(ACCESS_TOKEN_COOKIE)
        .is_some_and(|cookie| !cookie.value().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn token(refresh: Option<&str>) -> Token {
        Token {
            access_token: "access-2".to_string(),
            refresh_token: refresh.map(ToString::to_string),
            token_type: Some("bearer".to_string()),
            expires_in: Some(900),
            refresh_expires_in: Some(604_800),
        }
    }

    #[test]
    fn test_token_cookies_carry_expiry_and_flags() {
        let factory = CookieFactory::new(true);
        let cookies = factory.token_cookies(&token(Some("refresh-2")));

        assert_eq!(cookies.len(), 2);
        let access = &cookies[0];
        assert_eq!(access.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(access.value(), "access-2");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(true));
        assert_eq!(access.same_site(), Some(SameSite::Lax));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(access.max_age(), Some(Duration::seconds(900)));

        let refresh = &cookies[1];
        assert_eq!(refresh.name(), REFRESH_TOKEN_COOKIE);
        assert_eq!(refresh.max_age(), Some(Duration::seconds(604_800)));
    }

    #[test]
    fn test_unrotated_refresh_token_is_not_written() {
        let factory = CookieFactory::new(false);
        let cookies = factory.token_cookies(&token(None));
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].secure(), Some(false));
    }

    #[test]
    fn test_expired_session_cookies() {
        let factory = CookieFactory::new(false);
        for cookie in factory.expired_session_cookies() {
            assert_eq!(cookie.value(), "");
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
            assert_eq!(cookie.path(), Some("/"));
        }
    }

    #[test]
    fn test_session_cookie_detection() {
        let with_session = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, "abc"))
            .to_http_request();
        assert!(has_session_cookie(&with_session));

        let empty = TestRequest::default()
            .cookie(Cookie::new(ACCESS_TOKEN_COOKIE, ""))
            .to_http_request();
        assert!(!has_session_cookie(&empty));

        let none = TestRequest::default().to_http_request();
        assert!(!has_session_cookie(&none));
    }
}
