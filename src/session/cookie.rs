//! Cookie header parsing and `Set-Cookie` rendering

use axum::http::{header, HeaderMap, HeaderValue};
use std::fmt;

/// Read a cookie value from the request's `Cookie` headers.
///
/// Empty values count as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// A `Set-Cookie` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
}

impl SetCookie {
    /// A path-`/`, HttpOnly cookie with no expiry (browser session lifetime)
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            max_age: None,
            http_only: true,
            secure: false,
        }
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// A cookie instructing the browser to drop `name` immediately
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(0)
    }

    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.to_string()).ok()
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age.max(0))?;
            if max_age <= 0 {
                write!(f, "; Expires=Thu, 01 Jan 1970 00:00:00 GMT")?;
            }
        }
        if self.http_only {
            write!(f, "; HttpOnly")?;
        }
        if self.secure {
            write!(f, "; Secure")?;
        }
        write!(f, "; SameSite=Lax")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_read_cookie() {
        let headers = headers("session=abc; token=x.y.z");
        assert_eq!(read_cookie(&headers, "token").as_deref(), Some("x.y.z"));
        assert_eq!(read_cookie(&headers, "session").as_deref(), Some("abc"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_read_cookie_ignores_empty_and_prefix_names() {
        let headers = headers("token=; mytoken=zzz");
        assert_eq!(read_cookie(&headers, "token"), None);
    }

    #[test]
    fn test_set_cookie_rendering() {
        let cookie = SetCookie::new("token", "abc").max_age(3600).secure(true);
        assert_eq!(
            cookie.to_string(),
            "token=abc; Path=/; Max-Age=3600; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn test_expired_cookie() {
        let rendered = SetCookie::expired("token").to_string();
        assert!(rendered.starts_with("token=; Path=/; Max-Age=0; Expires="));
        assert!(!rendered.contains("Secure"));
    }
}
