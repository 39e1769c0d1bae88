//! The refresh cookie: the only place a refresh token ever travels

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::{Duration, OffsetDateTime};

/// Name of the cookie carrying the refresh token
pub const REFRESH_COOKIE_NAME: &str = "jwt";

/// Attributes of the refresh cookie, fixed at startup
#[derive(Debug, Clone, Copy)]
pub struct RefreshCookie {
    secure: bool,
    max_age: Duration,
}

impl RefreshCookie {
    pub fn new(secure: bool, max_age: Duration) -> Self {
        Self { secure, max_age }
    }

    /// Cookie holding a freshly issued refresh token
    pub fn issue(&self, refresh_token: String) -> Cookie<'static> {
        let mut cookie = self.base(refresh_token);
        cookie.set_max_age(self.max_age);
        cookie
    }

    /// Same cookie, empty and already expired, so the browser drops it
    pub fn expired(&self) -> Cookie<'static> {
        let mut cookie = self.base(String::new());
        cookie.set_max_age(Duration::ZERO);
        cookie.set_expires(OffsetDateTime::UNIX_EPOCH);
        cookie
    }

    /// Refresh token sent by the browser, if any
    pub fn read<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(REFRESH_COOKIE_NAME)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
    }

    fn base(&self, value: String) -> Cookie<'static> {
        Cookie::build((REFRESH_COOKIE_NAME, value))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.secure)
            .path("/")
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_cookie_attributes() {
        let cookie = RefreshCookie::new(true, Duration::days(7)).issue("token".to_string());
        let rendered = cookie.to_string();

        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.value(), "token");
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("SameSite=Strict"));
        assert!(rendered.contains("Secure"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("Max-Age=604800"));
    }

    #[test]
    fn test_development_cookie_is_not_secure() {
        let cookie = RefreshCookie::new(false, Duration::days(7)).issue("token".to_string());
        assert!(!cookie.to_string().contains("Secure"));
    }

    #[test]
    fn test_expired_cookie() {
        let cookie = RefreshCookie::new(true, Duration::days(7)).expired();
        let rendered = cookie.to_string();

        assert_eq!(cookie.value(), "");
        assert!(rendered.contains("Max-Age=0"));
        assert!(rendered.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
        assert!(rendered.contains("HttpOnly"));
    }

    #[test]
    fn test_read_ignores_empty_value() {
        let settings = RefreshCookie::new(false, Duration::days(7));

        let jar = CookieJar::new().add(Cookie::new(REFRESH_COOKIE_NAME, ""));
        assert_eq!(settings.read(&jar), None);

        let jar = CookieJar::new().add(Cookie::new(REFRESH_COOKIE_NAME, "abc"));
        assert_eq!(settings.read(&jar), Some("abc"));
    }
}
