//! Absolute URL assembly from path segments.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;
use url::Url;

/// Where generated links point: scheme, host, optional port and the path
/// segments every API URL starts with.
///
/// Deserializable so it can live in a configuration file:
///
/// ```toml
/// scheme = "https"
/// host = "api.example.com"
/// port = 8443
/// root_path_segments = ["v1"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlBuilderConfiguration {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_path_segments: Vec<String>,
}

fn default_scheme() -> String {
    "http".to_string()
}

impl Default for UrlBuilderConfiguration {
    fn default() -> Self {
        Self::new("http", "localhost")
    }
}

impl UrlBuilderConfiguration {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port: None,
            root_path_segments: Vec::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Append a root path segment (e.g. `"api"`, then `"v1"`).
    pub fn with_root_path_segment(mut self, segment: impl Into<String>) -> Self {
        self.root_path_segments.push(segment.into());
        self
    }

    /// Split a base URL such as `https://api.example.com:8443/v1` into its
    /// configuration parts. Query and fragment are ignored.
    pub fn from_base_url(base: &str) -> Result<Self> {
        let invalid = |reason: String| ModelError::InvalidBaseUrl {
            url: base.to_string(),
            reason,
        };
        let url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;
        let mut root_path_segments = Vec::new();
        for raw in url.path_segments().into_iter().flatten() {
            if raw.is_empty() {
                continue;
            }
            // stored decoded; `UrlBuilder::build` encodes them
            let segment = urlencoding::decode(raw).map_err(|e| invalid(e.to_string()))?;
            root_path_segments.push(segment.into_owned());
        }

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port: url.port(),
            root_path_segments,
        })
    }
}

/// Turns an ordered list of path segments into an absolute URL under a
/// configured base.
///
/// Segments are percent-encoded individually, so an id containing `/`
/// stays a single segment.
///
/// ```
/// use hyperdoc_model::{UrlBuilder, UrlBuilderConfiguration};
///
/// let config = UrlBuilderConfiguration::new("https", "api.example.com")
///     .with_root_path_segment("v1");
/// let urls = UrlBuilder::new(config).unwrap();
///
/// assert_eq!(urls.build(["articles", "1"]), "https://api.example.com/v1/articles/1");
/// assert_eq!(urls.build(["files", "a/b"]), "https://api.example.com/v1/files/a%2Fb");
/// ```
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    config: UrlBuilderConfiguration,
    base: Url,
}

impl UrlBuilder {
    pub fn new(config: UrlBuilderConfiguration) -> Result<Self> {
        let raw = format!("{}://{}", config.scheme, config.host);
        let invalid = |reason: String| ModelError::InvalidBaseUrl {
            url: raw.clone(),
            reason,
        };

        let mut base = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;
        base.set_port(config.port)
            .map_err(|()| invalid("scheme does not allow a port".to_string()))?;
        base.path_segments_mut()
            .map_err(|()| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(&config.root_path_segments);

        Ok(Self { config, base })
    }

    pub fn config(&self) -> &UrlBuilderConfiguration {
        &self.config
    }

    /// Path segments every built URL starts with.
    pub fn root_path_segments(&self) -> &[String] {
        &self.config.root_path_segments
    }

    /// The base URL with only the root segments applied.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append `segments` to the base URL.
    pub fn build<I>(&self, segments: I) -> String
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base.clone();
        // `new` rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        trace!(%url, "assembled url");
        url.to_string()
    }
}
