use crate::state::LinkRecord;
use crate::url::resolve_site_link;
use scraper::{Html, Selector};
use tracing::debug;

/// Extracts document links from a result-list page
///
/// The selectors are tried in order and the first one matching any element
/// wins. Anchors without an `href`, or whose `href` does not resolve to an
/// http(s) URL, are dropped. Titles are whitespace-trimmed.
///
/// # Arguments
///
/// * `markup` - The result-list page content
/// * `selectors` - Anchor selectors in priority order
/// * `link_prefix` - Replacement for a leading `../` in hrefs
pub fn extract_links_with(markup: &str, selectors: &[Selector], link_prefix: &str) -> Vec<LinkRecord> {
    let document = Html::parse_document(markup);

    for selector in selectors {
        let anchors: Vec<_> = document.select(selector).collect();
        if anchors.is_empty() {
            continue;
        }

        return anchors
            .into_iter()
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                match resolve_site_link(href, link_prefix) {
                    Ok(url) => Some(LinkRecord {
                        url: url.to_string(),
                        title: anchor.text().collect::<String>().trim().to_string(),
                    }),
                    Err(e) => {
                        debug!(href = %href, "Dropping link: {}", e);
                        None
                    }
                }
            })
            .collect();
    }

    Vec::new()
}
