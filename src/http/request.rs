//! Outbound request construction.
//!
//! # Responsibilities
//! - Build the upstream URL from a platform base and the forwarded path
//! - Carry the original query string across unchanged
//!
//! # Design Decisions
//! - The base URL's own path is a prefix, never replaced
//! - Percent-encoding in the forwarded path is preserved as received

use url::Url;

/// Append `forward_path` to the path of `base` and attach `query`.
pub fn build_target_url(base: &Url, forward_path: &str, query: Option<&str>) -> Url {
    let base_path = base.path().trim_end_matches('/');
    let path = if forward_path.starts_with('/') {
        format!("{}{}", base_path, forward_path)
    } else {
        format!("{}/{}", base_path, forward_path)
    };

    let mut target = base.clone();
    target.set_path(&path);
    target.set_query(query.filter(|q| !q.is_empty()));
    target.set_fragment(None);
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(base: &str, path: &str, query: Option<&str>) -> String {
        build_target_url(&Url::parse(base).unwrap(), path, query).to_string()
    }

    #[test]
    fn test_appends_to_base_path() {
        assert_eq!(
            target("https://api.example.com/openai", "/v1/chat/completions", None),
            "https://api.example.com/openai/v1/chat/completions"
        );
        assert_eq!(
            target("https://api.example.com/openai/", "/v1/models", None),
            "https://api.example.com/openai/v1/models"
        );
    }

    #[test]
    fn test_root_base() {
        assert_eq!(target("http://127.0.0.1:8080", "/v1", None), "http://127.0.0.1:8080/v1");
        assert_eq!(target("http://127.0.0.1:8080/", "/", None), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_query_is_attached() {
        assert_eq!(
            target("http://h/base", "/v1beta/models", Some("key=1&alt=sse")),
            "http://h/base/v1beta/models?key=1&alt=sse"
        );
        assert_eq!(target("http://h/?old=1", "/x", None), "http://h/x");
        assert_eq!(target("http://h", "/x", Some("")), "http://h/x");
    }

    #[test]
    fn test_keeps_percent_encoding() {
        assert_eq!(
            target("http://h/p", "/files/a%20b", None),
            "http://h/p/files/a%20b"
        );
    }
}
