use axum::http::{HeaderMap, HeaderValue, header};

/// Value of the first cookie called `name` in the request's `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// `Set-Cookie` value scoped to the whole site. `value` must already be
/// cookie-safe. `max_age` of `Some(0)` deletes the cookie.
pub fn set_cookie(name: &str, value: &str, max_age: Option<u64>, secure: bool) -> HeaderValue {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if let Some(age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", age));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; lens_session=abc; other=1"),
        );
        headers.append(header::COOKIE, HeaderValue::from_static("lens_flash=xyz"));

        assert_eq!(cookie_value(&headers, "lens_session"), Some("abc"));
        assert_eq!(cookie_value(&headers, "lens_flash"), Some("xyz"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_set_cookie() {
        let v = set_cookie("lens_session", "abc", None, false);
        assert_eq!(v, "lens_session=abc; Path=/; HttpOnly; SameSite=Lax");

        let v = set_cookie("lens_flash", "", Some(0), true);
        assert_eq!(v, "lens_flash=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Secure");
    }
}
