//! Set-Cookie bridge
//!
//! Backend `Set-Cookie` headers are parsed into a [`ParsedCookie`] before they
//! are relayed to the browser. When the browser reached the gateway over plain
//! HTTP the cookie is downgraded so the browser will still store it: `Secure`
//! and `Partitioned` are removed and `SameSite=None` becomes `SameSite=Lax`.
//! The upstream `Domain` is never relayed.

use actix_web::cookie::time::OffsetDateTime;
use actix_web::cookie::{time::Duration, Cookie, SameSite};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookiePriority {
    Low,
    Medium,
    High,
}

impl CookiePriority {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Attributes kept from an upstream `Set-Cookie` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: Option<String>,
    pub same_site: Option<SameSite>,
    /// Seconds
    pub max_age: Option<i64>,
    pub expires: Option<OffsetDateTime>,
    pub priority: Option<CookiePriority>,
    pub partitioned: bool,
    pub http_only: bool,
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCookie {
    pub name: String,
    pub value: String,
    pub attributes: CookieAttributes,
}

/// Parse one raw `Set-Cookie` header
///
/// Returns `None` when the header has no `name=value` segment.
#[must_use]
pub fn parse_set_cookie_header(header: &str, is_secure_request: bool) -> Option<ParsedCookie> {
    let mut segments = split_segments(header).into_iter();

    let (name, value) = segments.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut attributes = CookieAttributes::default();
    for segment in segments {
        let (attr_name, attr_value) = match segment.split_once('=') {
            Some((n, v)) => (n.trim(), unquote(v.trim())),
            None => (segment, ""),
        };

        match attr_name.to_ascii_lowercase().as_str() {
            "path" => attributes.path = Some(attr_value.to_string()).filter(|p| !p.is_empty()),
            "samesite" => {
                if let Some(same_site) = parse_same_site(attr_value) {
                    attributes.same_site = Some(same_site);
                }
            }
            "max-age" => {
                if let Ok(max_age) = attr_value.parse::<i64>() {
                    attributes.max_age = Some(max_age);
                }
            }
            "expires" => {
                if let Some(expires) = parse_http_date(attr_value) {
                    attributes.expires = Some(expires);
                }
            }
            "priority" => {
                if let Some(priority) = CookiePriority::parse(attr_value) {
                    attributes.priority = Some(priority);
                }
            }
            "partitioned" => attributes.partitioned = true,
            "httponly" => attributes.http_only = true,
            "secure" => attributes.secure = true,
            // Domain is recognised but never relayed
            _ => {}
        }
    }

    if !is_secure_request {
        attributes.secure = false;
        attributes.partitioned = false;
        if attributes.same_site == Some(SameSite::None) {
            attributes.same_site = Some(SameSite::Lax);
        }
    }

    Some(ParsedCookie {
        name: name.to_string(),
        value: value.trim().to_string(),
        attributes,
    })
}

impl ParsedCookie {
    /// Actix cookie carrying every attribute the cookie type can express
    #[must_use]
    pub fn to_cookie(&self) -> Cookie<'static> {
        let attrs = &self.attributes;
        let mut builder = Cookie::build(self.name.clone(), self.value.clone());

        if let Some(path) = &attrs.path {
            builder = builder.path(path.clone());
        }
        if let Some(same_site) = attrs.same_site {
            builder = builder.same_site(same_site);
        }
        if let Some(max_age) = attrs.max_age {
            builder = builder.max_age(Duration::seconds(max_age));
        }
        if let Some(expires) = attrs.expires {
            builder = builder.expires(expires);
        }
        if attrs.http_only {
            builder = builder.http_only(true);
        }
        if attrs.secure {
            builder = builder.secure(true);
        }

        builder.finish()
    }

    /// Serialised `Set-Cookie` value, including `Partitioned` and `Priority`
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut header = self.to_cookie().to_string();
        if let Some(priority) = self.attributes.priority {
            header.push_str("; Priority=");
            header.push_str(priority.as_str());
        }
        if self.attributes.partitioned {
            header.push_str("; Partitioned");
        }
        header
    }
}

/// Split on `;` outside double quotes, dropping empty segments
fn split_segments(header: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in header.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(header[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(header[start..].trim());

    segments.retain(|segment| !segment.is_empty());
    segments
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_same_site(value: &str) -> Option<SameSite> {
    match value.to_ascii_lowercase().as_str() {
        "lax" => Some(SameSite::Lax),
        "strict" => Some(SameSite::Strict),
        "none" => Some(SameSite::None),
        _ => None,
    }
}

/// RFC 1123 dates, plus the dashed RFC 850, Netscape and asctime forms
fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
    let parsed: DateTime<Utc> = DateTime::parse_from_rfc2822(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            [
                "%a, %d-%b-%Y %H:%M:%S GMT",
                "%A, %d-%b-%y %H:%M:%S GMT",
                "%a %b %e %H:%M:%S %Y",
            ]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        })?;

    OffsetDateTime::from_unix_timestamp(parsed.timestamp()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_backend_cookie() {
        let parsed = parse_set_cookie_header(
            "access_token=eyJabc.def; HttpOnly; Path=/; SameSite=lax; Max-Age=900",
            true,
        )
        .unwrap();

        assert_eq!(parsed.name, "access_token");
        assert_eq!(parsed.value, "eyJabc.def");
        assert_eq!(parsed.attributes.path.as_deref(), Some("/"));
        assert_eq!(parsed.attributes.same_site, Some(SameSite::Lax));
        assert_eq!(parsed.attributes.max_age, Some(900));
        assert!(parsed.attributes.http_only);
        assert!(!parsed.attributes.secure);
    }

    #[test]
    fn test_value_may_contain_equals() {
        let parsed = parse_set_cookie_header("token=a=b==; Path=/", true).unwrap();
        assert_eq!(parsed.value, "a=b==");
    }

    #[test]
    fn test_insecure_request_downgrade() {
        let parsed = parse_set_cookie_header(
            "refresh_token=r1; Secure; SameSite=None; Partitioned; HttpOnly",
            false,
        )
        .unwrap();

        assert!(!parsed.attributes.secure);
        assert!(!parsed.attributes.partitioned);
        assert_eq!(parsed.attributes.same_site, Some(SameSite::Lax));
        assert!(parsed.attributes.http_only);

        let header = parsed.to_header_value();
        assert!(!header.contains("Secure"));
        assert!(!header.contains("Partitioned"));
        assert!(header.contains("SameSite=Lax"));
    }

    #[test]
    fn test_secure_request_keeps_flags() {
        let parsed = parse_set_cookie_header(
            "refresh_token=r1; Secure; SameSite=None; Partitioned; Priority=high",
            true,
        )
        .unwrap();

        assert!(parsed.attributes.secure);
        assert!(parsed.attributes.partitioned);
        assert_eq!(parsed.attributes.same_site, Some(SameSite::None));
        assert_eq!(parsed.attributes.priority, Some(CookiePriority::High));

        let header = parsed.to_header_value();
        assert!(header.contains("Secure"));
        assert!(header.ends_with("; Priority=High; Partitioned"));
    }

    #[test]
    fn test_domain_is_dropped() {
        let parsed =
            parse_set_cookie_header("access_token=a; Domain=api.yeetflow.dev; Path=/", true)
                .unwrap();
        assert!(!parsed.to_header_value().to_lowercase().contains("domain"));
    }

    #[test]
    fn test_quoted_attribute_with_semicolon() {
        let parsed =
            parse_set_cookie_header("pref=1; Path=\"/a;b\"; HttpOnly", true).unwrap();
        assert_eq!(parsed.attributes.path.as_deref(), Some("/a;b"));
        assert!(parsed.attributes.http_only);
    }

    #[test]
    fn test_unknown_and_invalid_attributes_are_ignored() {
        let parsed = parse_set_cookie_header(
            "a=1; Foo=bar; SameSite=sideways; Max-Age=soon; Priority=urgent; Expires=never",
            true,
        )
        .unwrap();
        assert_eq!(parsed.attributes, CookieAttributes::default());
    }

    #[test]
    fn test_expires_formats() {
        let rfc1123 = parse_set_cookie_header("a=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT", true)
            .unwrap();
        let netscape =
            parse_set_cookie_header("a=1; Expires=Wed, 21-Oct-2015 07:28:00 GMT", true).unwrap();

        let expected = OffsetDateTime::from_unix_timestamp(1_445_412_480).unwrap();
        assert_eq!(rfc1123.attributes.expires, Some(expected));
        assert_eq!(netscape.attributes.expires, Some(expected));
    }

    #[test]
    fn test_expires_asctime_format() {
        let parsed =
            parse_set_cookie_header("a=1; Expires=Sun Nov  6 08:49:37 1994; Path=/", true).unwrap();
        assert_eq!(
            parsed.attributes.expires,
            Some(OffsetDateTime::from_unix_timestamp(784_111_777).unwrap())
        );
        assert!(parsed.to_header_value().contains("Expires=Sun, 06 Nov 1994 08:49:37 GMT"));
    }

    #[test]
    fn test_missing_name_value_segment() {
        assert!(parse_set_cookie_header("", true).is_none());
        assert!(parse_set_cookie_header(" ; ; ", true).is_none());
        assert!(parse_set_cookie_header("HttpOnly; Path=/", true).is_none());
        assert!(parse_set_cookie_header("=value; Path=/", true).is_none());
    }

    #[test]
    fn test_round_trip_on_secure_request() {
        let original = parse_set_cookie_header(
            "session=abc123; Path=/app; Max-Age=3600; Secure; HttpOnly",
            true,
        )
        .unwrap();
        let reparsed = parse_set_cookie_header(&original.to_header_value(), true).unwrap();

        assert_eq!(reparsed.name, original.name);
        assert_eq!(reparsed.value, original.value);
        assert_eq!(reparsed.attributes.path, original.attributes.path);
        assert_eq!(reparsed.attributes.max_age, original.attributes.max_age);
        assert!(reparsed.attributes.secure);
    }
}
