//! Target URL construction for outbound calls to a backend.
//!
//! Builds `base_url + path + query string` for a single outbound call,
//! rather than the bare `host:port` concatenation a pure reverse proxy
//! would need.

/// Builds the URL an [`crate::services::executor::Executor`] sends a request
/// to: `base_url` with any trailing slash stripped, followed by `path`
/// (already stripped of its own trailing slash by the caller), followed by
/// `?k=v&...` for each query parameter in insertion order.
pub fn build_target_url(base_url: &str, path: &str, query_params: &[(String, String)]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut url = format!("{}{}", base, path);
    if !query_params.is_empty() {
        url.push('?');
        for (i, (key, value)) in query_params.iter().enumerate() {
            if i > 0 {
                url.push('&');
            }
            url.push_str(&urlencode(key));
            url.push('=');
            url.push_str(&urlencode(value));
        }
    }
    url
}

/// Strips a single trailing slash from a request path, per the Executor's
/// URL-building rule. Leaves a bare `/` untouched.
pub fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_url_without_query() {
        assert_eq!(
            build_target_url("http://legacy/api", "/users", &[]),
            "http://legacy/api/users"
        );
    }

    #[test]
    fn builds_url_with_query_params_in_order() {
        let params = vec![
            ("page".to_string(), "2".to_string()),
            ("sort".to_string(), "name asc".to_string()),
        ];
        assert_eq!(
            build_target_url("http://legacy/api/", "/users", &params),
            "http://legacy/api/users?page=2&sort=name%20asc"
        );
    }

    #[test]
    fn strips_trailing_slash_but_not_root() {
        assert_eq!(strip_trailing_slash("/users/"), "/users");
        assert_eq!(strip_trailing_slash("/"), "/");
    }
}
