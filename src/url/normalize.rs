use crate::UrlError;
use url::Url;

/// Query parameters that never identify a document
const TRACKING_PARAMS: &[&str] = &["utm_source", "utm_medium", "utm_campaign", "from", "s8", "_t"];

/// Normalizes a document URL so equal documents compare equal in the dedup index
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Only `http` and `https` are accepted
/// 3. Host is lowercased (done by the parser)
/// 4. Path dot segments and repeated slashes are collapsed
/// 5. Fragment is removed
/// 6. Tracking query parameters are removed, the rest sorted by key with their
///    percent-encoding kept as written
/// 7. An empty query string is dropped
///
/// # Examples
///
/// ```
/// use wenshu_trawl::url::normalize_url;
///
/// let url = normalize_url("https://Example.COM/a//b/index.html?docId=9&utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/a/b/index.html?docId=9");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if let Some(query) = url.query() {
        let params = filter_and_sort_query_params(query);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = params.join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Collapses empty and dot segments; keeps a trailing slash only for the root
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters and sorts the raw `key=value` segments, keeping their encoding untouched
fn filter_and_sort_query_params(query: &str) -> Vec<String> {
    let mut params: Vec<&str> = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !TRACKING_PARAMS.contains(&query_key(segment)))
        .collect();

    params.sort_by_key(|segment| query_key(segment));
    params.into_iter().map(str::to_string).collect()
}

fn query_key(segment: &str) -> &str {
    segment.split_once('=').map_or(segment, |(key, _)| key)
}
