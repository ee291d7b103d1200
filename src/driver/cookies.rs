//! Identity-token cookies

use serde::{Deserialize, Serialize};

/// A cookie to inject into, or read back from, a browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

/// Parses a `name=value; name=value` header into cookies scoped to `domain`
///
/// Segments without `=` or with an empty name are ignored. Values keep any
/// `=` after the first one.
pub fn parse_cookie_header(header: &str, domain: &str) -> Vec<Cookie> {
    header
        .split(';')
        .filter_map(|segment| {
            let (name, value) = segment.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Cookie {
                name: name.to_string(),
                value: value.trim().to_string(),
                domain: domain.to_string(),
                path: "/".to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header(
            "SESSION=abc; wzws_cid=x=y==; ; junk",
            "wenshu.court.gov.cn",
        );

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "SESSION");
        assert_eq!(cookies[0].value, "abc");
        assert_eq!(cookies[1].name, "wzws_cid");
        assert_eq!(cookies[1].value, "x=y==");
        assert!(cookies
            .iter()
            .all(|c| c.domain == "wenshu.court.gov.cn" && c.path == "/"));
    }

    #[test]
    fn test_parse_empty_header() {
        assert!(parse_cookie_header("", "example.com").is_empty());
        assert!(parse_cookie_header("=value", "example.com").is_empty());
    }
}
