// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Resolve a potentially relative link against a base URL.
///
/// Only `http`/`https` results are accepted, so `javascript:` and `mailto:`
/// links resolve to `None`.
///
/// # Examples
/// ```
/// use sprout_monitor::utils::url::resolve;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/path/list.aspx").unwrap();
/// assert_eq!(
///     resolve(&base, "detail.aspx?nid=1").unwrap().as_str(),
///     "https://example.com/path/detail.aspx?nid=1"
/// );
/// ```
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Drop the fragment part of a URL.
pub fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Return `url` with query parameter `key` set to `value`, keeping every
/// other parameter in its original order.
pub fn with_query_param(url: &Url, key: &str, value: &str) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut out = url.clone();
    {
        let mut query = out.query_pairs_mut();
        query.clear();
        for (k, v) in &pairs {
            query.append_pair(k, v);
        }
        query.append_pair(key, value);
    }
    out
}

/// Read a numeric query parameter from a URL.
pub fn numeric_query_param(url: &Url, key: &str) -> Option<u32> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.trim().parse().ok())
}

/// Extract a stable announcement identifier from a URL.
pub fn extract_notice_id(url: &Url) -> Option<String> {
    let mut fallback_keyed: Option<String> = None;
    let mut fallback_numeric: Option<String> = None;

    for (key, value) in url.query_pairs() {
        if value.is_empty() {
            continue;
        }

        let key_lower = key.to_lowercase();
        let value_string = value.to_string();

        if matches!(
            key_lower.as_str(),
            "nid"
                | "articleno"
                | "article_no"
                | "articleid"
                | "article_id"
                | "notice_id"
                | "noticeid"
                | "seq"
                | "no"
                | "id"
        ) {
            return Some(value_string);
        }

        if fallback_keyed.is_none()
            && (key_lower.ends_with("id")
                || key_lower.contains("seq")
                || key_lower.contains("article"))
        {
            fallback_keyed = Some(value_string.clone());
        }

        if fallback_numeric.is_none() && value_string.chars().all(|c| c.is_ascii_digit()) {
            fallback_numeric = Some(value_string);
        }
    }

    if let Some(value) = fallback_keyed.or(fallback_numeric) {
        return Some(value);
    }

    let last = url.path_segments().and_then(|mut segments| segments.next_back())?;
    let digits: String = last.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = url("https://example.com/path/index.html");
        assert_eq!(
            resolve(&base, "other.html").unwrap().as_str(),
            "https://example.com/path/other.html"
        );
        assert_eq!(
            resolve(&base, "/root.html").unwrap().as_str(),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve(&base, "https://other.com/page").unwrap().as_str(),
            "https://other.com/page"
        );
    }

    #[test]
    fn test_resolve_rejects_non_http() {
        let base = url("https://example.com/");
        assert!(resolve(&base, "javascript:void(0)").is_none());
        assert!(resolve(&base, "mailto:a@example.com").is_none());
        assert!(resolve(&base, "#top").is_none());
        assert!(resolve(&base, "   ").is_none());
    }

    #[test]
    fn test_with_query_param_preserves_others() {
        let base = url("https://sprout.example.edu/DeepNews.aspx?spid=ABC");
        let page = with_query_param(&base, "pg", "3");
        assert_eq!(
            page.as_str(),
            "https://sprout.example.edu/DeepNews.aspx?spid=ABC&pg=3"
        );

        let again = with_query_param(&page, "pg", "4");
        assert_eq!(numeric_query_param(&again, "pg"), Some(4));
        assert_eq!(again.query_pairs().count(), 2);
    }

    #[test]
    fn test_without_fragment() {
        let u = url("https://example.com/a?x=1#section");
        assert_eq!(without_fragment(&u).as_str(), "https://example.com/a?x=1");
    }

    #[test]
    fn test_extract_notice_id_nid() {
        let u = url("https://sprout.example.edu/DeepNewsDtl.aspx?nid=9F3A21&spid=XYZ");
        assert_eq!(extract_notice_id(&u), Some("9F3A21".to_string()));
    }

    #[test]
    fn test_extract_notice_id_path_digits() {
        let u = url("https://example.com/notice/9999");
        assert_eq!(extract_notice_id(&u), Some("9999".to_string()));
    }

    #[test]
    fn test_extract_notice_id_none() {
        let u = url("https://example.com/about");
        assert_eq!(extract_notice_id(&u), None);
    }
}
