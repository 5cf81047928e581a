//! URL handling for News-Harvest
//!
//! Listing pages hand out relative hrefs and article links decorated with
//! fragments and tracking parameters. Everything that becomes a frontier entry
//! or a persistence key goes through this module first.

mod normalize;

pub use normalize::normalize_article_url;

use url::Url;

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be ignored:
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only links
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use news_harvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://vnexpress.net/category/day?cateid=1").unwrap();
/// assert_eq!(
///     resolve_link("/category/day?cateid=1&page=2", &base).as_deref(),
///     Some("https://vnexpress.net/category/day?cateid=1&page=2")
/// );
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
