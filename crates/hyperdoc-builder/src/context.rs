use crate::builder::DocumentBuilder;
use crate::error::Result;
use hyperdoc_model::{
    HypermediaAssembler, HypermediaAssemblerRegistry, ServiceModel, UrlBuilder,
    UrlBuilderConfiguration,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How derived links address primary resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathMode {
    /// Primary resources are addressed below the request path
    /// (`/people/9/articles/1`).
    #[default]
    Hierarchical,
    /// Every resource is addressed by its collection path (`/articles/1`).
    Canonical,
}

/// Settings for a [`DocumentContext`] that can live in a configuration
/// file:
///
/// ```toml
/// [url]
/// scheme = "https"
/// host = "api.example.com"
/// root_path_segments = ["v1"]
///
/// [hypermedia]
/// path_mode = "canonical"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub url: UrlBuilderConfiguration,
    #[serde(default)]
    pub hypermedia: HypermediaConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypermediaConfig {
    #[serde(default)]
    pub path_mode: PathMode,
}

/// Everything shared by the documents of one service: the service model,
/// URL assembly, the hypermedia assemblers and the path mode.
///
/// Create it once and call [`new_document`](Self::new_document) per request.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    model: Arc<ServiceModel>,
    urls: UrlBuilder,
    assemblers: HypermediaAssemblerRegistry,
    path_mode: PathMode,
}

impl DocumentContext {
    pub fn new(
        model: impl Into<Arc<ServiceModel>>,
        url_config: UrlBuilderConfiguration,
    ) -> Result<Self> {
        Ok(Self {
            model: model.into(),
            urls: UrlBuilder::new(url_config)?,
            assemblers: HypermediaAssemblerRegistry::new(),
            path_mode: PathMode::default(),
        })
    }

    pub fn from_config(model: impl Into<Arc<ServiceModel>>, config: ContextConfig) -> Result<Self> {
        Ok(Self::new(model, config.url)?.with_path_mode(config.hypermedia.path_mode))
    }

    /// Use `assembler` for resources of `type_name`.
    pub fn with_assembler<A: HypermediaAssembler + 'static>(
        mut self,
        type_name: impl Into<String>,
        assembler: A,
    ) -> Self {
        self.assemblers = self.assemblers.register(type_name, assembler);
        self
    }

    /// Use `assembler` for document links and unregistered types.
    pub fn with_default_assembler<A: HypermediaAssembler + 'static>(mut self, assembler: A) -> Self {
        self.assemblers = self.assemblers.with_default(assembler);
        self
    }

    pub fn with_assemblers(mut self, assemblers: HypermediaAssemblerRegistry) -> Self {
        self.assemblers = assemblers;
        self
    }

    pub fn with_path_mode(mut self, path_mode: PathMode) -> Self {
        self.path_mode = path_mode;
        self
    }

    pub fn model(&self) -> &ServiceModel {
        &self.model
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    pub fn assemblers(&self) -> &HypermediaAssemblerRegistry {
        &self.assemblers
    }

    pub fn path_mode(&self) -> PathMode {
        self.path_mode
    }

    /// Start a document answering a request for `current_request_url`.
    ///
    /// An unparsable URL does not panic: it is recorded as the document's
    /// failure and returned by
    /// [`write_document`](DocumentBuilder::write_document).
    pub fn new_document(&self, current_request_url: &str) -> DocumentBuilder<'_> {
        DocumentBuilder::new(self, current_request_url)
    }
}
