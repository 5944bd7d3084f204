//! Path segments of the request a document answers.

use crate::error::{BuildError, Result};
use url::Url;

/// The current request URL split into path segments, with the configured
/// root segments removed.
///
/// `http://localhost/v1/articles/1/comments` with root `["v1"]` has the
/// segments `["articles", "1", "comments"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    url: Url,
    segments: Vec<String>,
}

impl RequestPath {
    /// Parse `request_url`, joining it onto `base` when it is relative.
    pub fn parse(base: &Url, request_url: &str, root: &[String]) -> Result<Self> {
        let invalid = |reason: String| BuildError::InvalidRequestUrl {
            url: request_url.to_string(),
            reason,
        };
        // `articles/1` must resolve under the root, not replace its last segment
        let mut dir = base.clone();
        if let Ok(mut path) = dir.path_segments_mut() {
            path.pop_if_empty().push("");
        }
        let url = dir.join(request_url).map_err(|e| invalid(e.to_string()))?;

        let mut segments = Vec::new();
        for raw in url
            .path_segments()
            .ok_or_else(|| invalid("URL cannot be a base".to_string()))?
        {
            if raw.is_empty() {
                continue;
            }
            let segment = urlencoding::decode(raw).map_err(|e| invalid(e.to_string()))?;
            segments.push(segment.into_owned());
        }
        if segments.starts_with(root) {
            segments.drain(..root.len());
        }

        Ok(Self { url, segments })
    }

    /// A path for documents built without a request, e.g. in tests.
    pub(crate) fn unresolved(base: &Url) -> Self {
        Self {
            url: base.clone(),
            segments: Vec::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Segments without the last one; `None` for the empty path.
    pub fn parent(&self) -> Option<&[String]> {
        self.segments.split_last().map(|(_, parent)| parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost/v1").unwrap()
    }

    fn root() -> Vec<String> {
        vec!["v1".to_string()]
    }

    #[test]
    fn test_strips_root_segments() {
        let path =
            RequestPath::parse(&base(), "http://localhost/v1/articles/1/comments", &root()).unwrap();
        assert_eq!(path.segments(), ["articles", "1", "comments"]);
        assert_eq!(path.last(), Some("comments"));
        assert_eq!(path.parent().unwrap(), ["articles", "1"]);
    }

    #[test]
    fn test_keeps_path_outside_root() {
        let path = RequestPath::parse(&base(), "http://localhost/articles", &root()).unwrap();
        assert_eq!(path.segments(), ["articles"]);
    }

    #[test]
    fn test_relative_url_joins_base() {
        let path = RequestPath::parse(&base(), "/v1/people/9?include=articles", &root()).unwrap();
        assert_eq!(path.url().as_str(), "http://localhost/v1/people/9?include=articles");
        assert_eq!(path.segments(), ["people", "9"]);
    }

    #[test]
    fn test_relative_url_without_slash_stays_under_root() {
        let path = RequestPath::parse(&base(), "articles/1", &root()).unwrap();
        assert_eq!(path.url().as_str(), "http://localhost/v1/articles/1");
        assert_eq!(path.segments(), ["articles", "1"]);

        let bare = Url::parse("http://localhost").unwrap();
        let path = RequestPath::parse(&bare, "articles/1", &[]).unwrap();
        assert_eq!(path.url().as_str(), "http://localhost/articles/1");
    }

    #[test]
    fn test_decodes_and_skips_empty_segments() {
        let path = RequestPath::parse(&base(), "http://localhost/v1//files/a%2Fb/", &root()).unwrap();
        assert_eq!(path.segments(), ["files", "a/b"]);
    }

    #[test]
    fn test_root_only_is_empty() {
        let path = RequestPath::parse(&base(), "http://localhost/v1/", &root()).unwrap();
        assert!(path.is_empty());
        assert!(path.parent().is_none());
    }

    #[test]
    fn test_rejects_non_base_url() {
        let err = RequestPath::parse(&base(), "mailto:someone@example.com", &root()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidRequestUrl { .. }));
    }
}
