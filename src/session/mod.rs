//! Session cookie handling
//!
//! # Modules
//!
//! - [`cookie`] - Cookie names and the factory for gateway-minted cookies
//! - [`jar`] - Request-scoped cookie store used by the authenticated client
//! - [`set_cookie`] - Parsing and downgrading of backend `Set-Cookie` headers

pub mod cookie;
pub mod jar;
pub mod set_cookie;

pub use cookie::{
    has_session_cookie, CookieFactory, CookieOptions, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
pub use jar::{CookieStore, CookieWriteError, RequestCookieJar};
pub use set_cookie::{parse_set_cookie_header, CookieAttributes, CookiePriority, ParsedCookie};
