//! Session cookie handling
//!
//! The cookie only carries an opaque [`SessionId`]; all conversation state lives
//! server-side in the conversation store.

use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::cookie::SameSite;
use tracing::debug;

use crate::models::SessionId;

/// Session id from the cookie, or a fresh one plus the cookie that carries it
pub fn resolve_session(jar: CookieJar, cookie_name: &str) -> (CookieJar, SessionId) {
    if let Some(id) = jar
        .get(cookie_name)
        .and_then(|c| c.value().parse::<SessionId>().ok())
    {
        return (jar, id);
    }

    let id = SessionId::generate();
    debug!("Issuing new session {}", id);
    let cookie = Cookie::build((cookie_name.to_string(), id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cookie_issues_session() {
        let (jar, id) = resolve_session(CookieJar::new(), "barcraft_session");
        let cookie = jar.get("barcraft_session").unwrap();
        assert_eq!(cookie.value(), id.as_str());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_valid_cookie_is_reused() {
        let existing = SessionId::generate();
        let jar = CookieJar::new().add(Cookie::new("barcraft_session", existing.to_string()));

        let (_, id) = resolve_session(jar, "barcraft_session");
        assert_eq!(id, existing);
    }

    #[test]
    fn test_tampered_cookie_replaced() {
        let jar = CookieJar::new().add(Cookie::new("barcraft_session", "../../etc/passwd"));

        let (jar, id) = resolve_session(jar, "barcraft_session");
        assert_eq!(jar.get("barcraft_session").unwrap().value(), id.as_str());
    }
}
