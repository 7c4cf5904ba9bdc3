//! Assertion helpers for gateway responses

use actix_web::cookie::{time::Duration, Cookie};
use actix_web::dev::ServiceResponse;
use actix_web::http::header::SET_COOKIE;

/// Assert the response status
///
/// # Panics
///
/// Panics if the status differs
pub fn assert_status<B>(response: &ServiceResponse<B>, expected_status: u16) {
    assert_eq!(
        response.status().as_u16(),
        expected_status,
        "Expected status {expected_status}, got {}",
        response.status()
    );
}

/// Assert that a response header has a specific value
///
/// # Panics
///
/// Panics if the header is missing or has a different value
pub fn assert_header_value<B>(response: &ServiceResponse<B>, header_name: &str, expected: &str) {
    match response.headers().get(header_name) {
        Some(value) => assert_eq!(
            value.to_str().unwrap_or(""),
            expected,
            "Header '{header_name}' has wrong value"
        ),
        None => panic!("Header '{header_name}' not found in response"),
    }
}

/// Every `Set-Cookie` value on the response
#[must_use]
pub fn set_cookie_headers<B>(response: &ServiceResponse<B>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .filter_map(|value| value.to_str().ok())
        .map(ToString::to_string)
        .collect()
}

/// The last `Set-Cookie` for `name`, parsed
#[must_use]
pub fn find_set_cookie<B>(response: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    set_cookie_headers(response)
        .into_iter()
        .filter_map(|raw| Cookie::parse(raw).ok())
        .filter(|cookie| cookie.name() == name)
        .last()
}

/// Assert that the response expires cookie `name`
///
/// # Panics
///
/// Panics if the cookie is not cleared
pub fn assert_cookie_cleared<B>(response: &ServiceResponse<B>, name: &str) {
    let cookie = find_set_cookie(response, name)
        .unwrap_or_else(|| panic!("Expected Set-Cookie for '{name}'"));
    assert_eq!(cookie.value(), "", "Cookie '{name}' should be emptied");
    assert_eq!(
        cookie.max_age(),
        Some(Duration::ZERO),
        "Cookie '{name}' should expire immediately"
    );
}
