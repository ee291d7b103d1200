//! URL handling for portal links
//!
//! Result lists on the portal link to documents with paths relative to the
//! site's `website/wenshu/` directory. This module turns those into absolute,
//! normalized URLs suitable as dedup keys.

mod normalize;

pub use normalize::normalize_url;

use crate::UrlError;
use url::Url;

/// Resolves a result-list href into an absolute, normalized document URL
///
/// `../`-relative links are rewritten by substituting `link_prefix` for the
/// leading `../`. Other relative links are resolved against `link_prefix`, and
/// absolute links pass through unchanged apart from normalization.
///
/// # Examples
///
/// ```
/// use wenshu_trawl::url::resolve_site_link;
///
/// let url = resolve_site_link(
///     "../181107ANFZ0BXSK4/index.html?docId=abc",
///     "https://wenshu.court.gov.cn/website/wenshu/",
/// )
/// .unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://wenshu.court.gov.cn/website/wenshu/181107ANFZ0BXSK4/index.html?docId=abc"
/// );
/// ```
pub fn resolve_site_link(href: &str, link_prefix: &str) -> Result<Url, UrlError> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return Err(UrlError::Parse(format!("not a document link: '{}'", href)));
    }

    if let Some(rest) = href.strip_prefix("../") {
        return normalize_url(&format!("{}{}", link_prefix, rest));
    }

    if Url::parse(href).is_ok() {
        return normalize_url(href);
    }

    let base = Url::parse(link_prefix).map_err(|e| UrlError::Parse(e.to_string()))?;
    let joined = base
        .join(href)
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_url(joined.as_str())
}
