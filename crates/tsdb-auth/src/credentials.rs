//! Credential extraction: URL params `u`/`p` take precedence over
//! HTTP Basic auth. Parsing the raw Basic header is kept here, independent
//! of `axum`, so it's unit-testable without spinning up HTTP.

use base64::Engine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// `query_u`/`query_p` are the `u`/`p` query-string params (if present);
/// `basic_auth_header` is the raw `Authorization` header value (if
/// present). Query params win over Basic auth per the extraction order.
pub fn extract(
    query_u: Option<&str>,
    query_p: Option<&str>,
    basic_auth_header: Option<&str>,
) -> Option<Credentials> {
    if let (Some(u), Some(p)) = (query_u, query_p) {
        return Some(Credentials {
            username: u.to_string(),
            password: p.to_string(),
        });
    }
    basic_auth_header.and_then(parse_basic)
}

fn parse_basic(header: &str) -> Option<Credentials> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_win_over_basic_auth() {
        let basic = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("other:pw")
        );
        let creds = extract(Some("alice"), Some("s3cret"), Some(&basic)).unwrap();
        assert_eq!(creds.username, "alice");
    }

    #[test]
    fn falls_back_to_basic_auth() {
        let basic = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("bob:hunter2")
        );
        let creds = extract(None, None, Some(&basic)).unwrap();
        assert_eq!(creds.username, "bob");
        assert_eq!(creds.password, "hunter2");
    }

    #[test]
    fn missing_credentials_is_none() {
        assert!(extract(None, None, None).is_none());
    }

    #[test]
    fn malformed_basic_auth_is_none() {
        assert!(extract(None, None, Some("Basic not-base64!!")).is_none());
    }
}
