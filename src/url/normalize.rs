use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source", "vn_source"];

/// Normalizes an article URL into its persistence key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not http(s)
/// 2. Lowercase the host
/// 3. Remove the fragment (`#box_comment` and friends)
/// 4. Remove tracking query parameters, keep the rest in order
/// 5. Remove an empty query string
///
/// Scheme and `www.` are left alone: they are part of the article's identity
/// as the site publishes it.
///
/// # Examples
///
/// ```
/// use news_harvest::url::normalize_article_url;
///
/// let url = normalize_article_url("https://VnExpress.net/bai-viet-1.html#box_comment_vne").unwrap();
/// assert_eq!(url, "https://vnexpress.net/bai-viet-1.html");
/// ```
pub fn normalize_article_url(url_str: &str) -> Option<String> {
    let mut url = Url::parse(url_str.trim()).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let host = url.host_str()?.to_lowercase();
    url.set_host(Some(&host)).ok()?;

    url.set_fragment(None);

    if url.query().is_some() {
        let kept = filter_query_params(&url);
        if kept.is_empty() {
            url.set_query(None);
        } else {
            // Values come back decoded and must be re-encoded
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Some(url.to_string())
}

/// Drops tracking parameters, preserving the order of the rest
fn filter_query_params(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
