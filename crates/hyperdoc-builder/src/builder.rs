use crate::context::DocumentContext;
use crate::error::{BuildError, Result};
use crate::included::IncludedBuilder;
use crate::links::{LinkTarget, LinksBuilder};
use crate::path::RequestPath;
use crate::resource::{ResourceBuilder, ResourceIdentifierBuilder};
use crate::tree::{DocumentTree, PrimaryNode, ResourceKey, ResourceNode};
use crate::writer::DocumentWriter;
use hyperdoc::v1::{Document, ErrorObject, JsonApi, Meta};
use hyperdoc_model::{Cardinality, RelationshipDescriptor, ResourceType};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use tracing::debug;

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Access to the document under construction. Every builder in a chain
/// implements it by asking its parent, so nested builders all write into
/// the same tree.
pub trait TreeAccess: sealed::Sealed {
    #[doc(hidden)]
    fn parts(&mut self) -> (&DocumentContext, &mut DocumentTree);
}

macro_rules! delegate_tree_access {
    ($([$($generics:tt)*] $ty:ty),* $(,)?) => {$(
        impl<$($generics)*> crate::builder::sealed::Sealed for $ty {}
        impl<$($generics)*> crate::builder::TreeAccess for $ty {
            fn parts(
                &mut self,
            ) -> (&crate::context::DocumentContext, &mut crate::tree::DocumentTree) {
                crate::builder::TreeAccess::parts(&mut self.parent)
            }
        }
    )*};
}
pub(crate) use delegate_tree_access;

/// Run `f` against the tree unless an earlier call already failed. A
/// failure is recorded and `T::default()` returned in its place.
pub(crate) fn apply<P, T, F>(builder: &mut P, f: F) -> T
where
    P: TreeAccess + ?Sized,
    T: Default,
    F: FnOnce(&DocumentContext, &mut DocumentTree) -> Result<T>,
{
    let (ctx, tree) = builder.parts();
    if tree.is_failed() {
        return T::default();
    }
    match f(ctx, tree) {
        Ok(value) => value,
        Err(err) => {
            tree.fail(err);
            T::default()
        }
    }
}

// ── domain object helpers ──────────────────────────────────────────────

pub(crate) fn resource_type_of<T: Any>(ctx: &DocumentContext) -> Result<&ResourceType> {
    ctx.model()
        .resource_type_of::<T>()
        .ok_or(BuildError::UnregisteredType(std::any::type_name::<T>()))
}

pub(crate) fn key_of<T: Any>(ctx: &DocumentContext, object: &T) -> Result<ResourceKey> {
    let rt = resource_type_of::<T>(ctx)?;
    match rt.id_of(object) {
        Some(id) if !id.is_empty() => Ok(ResourceKey::new(rt.name(), id)),
        _ => Err(BuildError::MissingId {
            resource_type: rt.name().to_string(),
        }),
    }
}

/// Read id and attributes of `object` into a fresh node.
pub(crate) fn snapshot<T: Any>(ctx: &DocumentContext, object: &T) -> Result<ResourceNode> {
    let key = key_of(ctx, object)?;
    let attributes = resource_type_of::<T>(ctx)?.attributes_of(object)?;
    Ok(ResourceNode::new(key, attributes))
}

pub(crate) fn to_meta<M: Serialize>(meta: M) -> Result<Meta> {
    match serde_json::to_value(meta)? {
        Value::Object(map) => Ok(map),
        _ => Err(BuildError::MetaNotObject),
    }
}

pub(crate) fn merge_meta(tree: &mut DocumentTree, keys: &[ResourceKey], meta: &Meta) {
    for key in keys {
        if let Some(node) = tree.resource_mut(key) {
            node.meta.extend(meta.clone());
        }
    }
}

/// The relationship `name` declared on the type of `source`, checked
/// against the expected cardinality and target type when given.
pub(crate) fn declared_relationship<'m>(
    ctx: &'m DocumentContext,
    source: &ResourceKey,
    name: &str,
    cardinality: Option<Cardinality>,
    target_type: Option<&str>,
) -> Result<&'m RelationshipDescriptor> {
    let rt = ctx
        .model()
        .resource_type(&source.resource_type)
        .ok_or_else(|| BuildError::UnknownResourceType(source.resource_type.clone()))?;
    let descriptor = rt
        .relationship(name)
        .ok_or_else(|| BuildError::UnknownRelationship {
            resource_type: rt.name().to_string(),
            relationship: name.to_string(),
        })?;

    if let Some(requested) = cardinality
        && requested != descriptor.cardinality
    {
        return Err(BuildError::CardinalityMismatch {
            resource_type: rt.name().to_string(),
            relationship: name.to_string(),
            declared: descriptor.cardinality,
            requested,
        });
    }
    if let Some(actual) = target_type
        && actual != descriptor.target_type
    {
        return Err(BuildError::TargetTypeMismatch {
            resource_type: rt.name().to_string(),
            relationship: name.to_string(),
            expected: descriptor.target_type.clone(),
            actual: actual.to_string(),
        });
    }
    Ok(descriptor)
}

// ============================================================================
// DocumentBuilder
// ============================================================================

/// Fluent builder for one JSON:API document.
///
/// Obtained from [`DocumentContext::new_document`]. Child builders take
/// ownership of their parent and hand it back from their `*_end()` method,
/// so a whole document reads as one chain:
///
/// ```
/// use hyperdoc_builder::{DocumentContext, keywords};
/// use hyperdoc_model::{ResourceType, ServiceModel, UrlBuilderConfiguration};
///
/// struct Article { id: u64, title: String }
///
/// let model = ServiceModel::builder()
///     .resource_type(
///         ResourceType::builder::<Article>("articles")
///             .id(|a| a.id)
///             .attribute("title", |a| a.title.clone())
///             .build(),
///     )
///     .build()
///     .unwrap();
/// let ctx = DocumentContext::new(model, UrlBuilderConfiguration::default()).unwrap();
///
/// let article = Article { id: 1, title: "Rails is Omakase".into() };
/// let doc = ctx
///     .new_document("http://localhost/articles/1")
///     .resource(&article)
///         .links()
///             .add_self_link()
///         .links_end()
///     .resource_end()
///     .write_document()
///     .unwrap();
///
/// let data = serde_json::to_value(&doc).unwrap()["data"].clone();
/// assert_eq!(data["links"][keywords::SELF], "http://localhost/articles/1");
/// ```
///
/// Misuse does not panic and does not break the chain: the first failure
/// is kept and returned by [`write_document`](Self::write_document).
#[derive(Debug)]
pub struct DocumentBuilder<'c> {
    ctx: &'c DocumentContext,
    request: RequestPath,
    tree: DocumentTree,
}

impl sealed::Sealed for DocumentBuilder<'_> {}

impl TreeAccess for DocumentBuilder<'_> {
    fn parts(&mut self) -> (&DocumentContext, &mut DocumentTree) {
        (self.ctx, &mut self.tree)
    }
}

impl<'c> DocumentBuilder<'c> {
    pub(crate) fn new(ctx: &'c DocumentContext, current_request_url: &str) -> Self {
        let mut tree = DocumentTree::default();
        let urls = ctx.urls();
        let request = RequestPath::parse(
            urls.base_url(),
            current_request_url,
            urls.root_path_segments(),
        )
        .unwrap_or_else(|err| {
            tree.fail(err);
            RequestPath::unresolved(urls.base_url())
        });
        Self { ctx, request, tree }
    }

    pub fn jsonapi(mut self, jsonapi: JsonApi) -> Self {
        apply(&mut self, |_, tree| {
            tree.jsonapi = Some(jsonapi);
            Ok(())
        });
        self
    }

    /// Merge `meta`, which must serialize to a JSON object, into the
    /// top-level `meta`.
    pub fn meta<M: Serialize>(mut self, meta: M) -> Self {
        apply(&mut self, |_, tree| {
            tree.meta.extend(to_meta(meta)?);
            Ok(())
        });
        self
    }

    /// Top-level links.
    pub fn links(self) -> LinksBuilder<Self> {
        LinksBuilder::new(self, LinkTarget::Document)
    }

    /// Use `object` as the primary resource.
    pub fn resource<T: Any>(mut self, object: &T) -> ResourceBuilder<'c> {
        let keys = apply(&mut self, |ctx, tree| {
            let node = snapshot(ctx, object)?;
            let key = node.key.clone();
            tree.set_primary(PrimaryNode::Resource(key.clone()))?;
            tree.upsert(node);
            Ok(vec![key])
        });
        ResourceBuilder::new(self, keys)
    }

    /// Use `objects` as primary data. An empty iterator gives `"data": []`.
    pub fn resource_collection<'a, T, I>(mut self, objects: I) -> ResourceBuilder<'c>
    where
        T: Any,
        I: IntoIterator<Item = &'a T>,
    {
        let keys = apply(&mut self, |ctx, tree| {
            let mut keys: Vec<ResourceKey> = Vec::new();
            let mut nodes = Vec::new();
            for object in objects {
                let node = snapshot(ctx, object)?;
                if keys.contains(&node.key) {
                    debug!(resource = %node.key, "collapsing duplicate in collection");
                } else {
                    keys.push(node.key.clone());
                }
                nodes.push(node);
            }
            tree.set_primary(PrimaryNode::Resources(keys.clone()))?;
            for node in nodes {
                tree.upsert(node);
            }
            Ok(keys)
        });
        ResourceBuilder::new(self, keys)
    }

    /// `"data": null`, e.g. for an empty to-one related endpoint.
    pub fn null_resource(mut self) -> Self {
        apply(&mut self, |_, tree| tree.set_primary(PrimaryNode::Null));
        self
    }

    /// Use the identifier of `object` as primary data.
    pub fn resource_identifier<T: Any>(mut self, object: &T) -> ResourceIdentifierBuilder<'c> {
        apply(&mut self, |ctx, tree| {
            let key = key_of(ctx, object)?;
            tree.set_primary(PrimaryNode::Identifier(key.identifier()))
        });
        ResourceIdentifierBuilder::new(self)
    }

    /// Use the identifiers of `objects` as primary data.
    pub fn resource_identifier_collection<'a, T, I>(
        mut self,
        objects: I,
    ) -> ResourceIdentifierBuilder<'c>
    where
        T: Any,
        I: IntoIterator<Item = &'a T>,
    {
        apply(&mut self, |ctx, tree| {
            let mut keys: Vec<ResourceKey> = Vec::new();
            for object in objects {
                let key = key_of(ctx, object)?;
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            let identifiers = keys.iter().map(ResourceKey::identifier).collect();
            tree.set_primary(PrimaryNode::Identifiers(identifiers))
        });
        ResourceIdentifierBuilder::new(self)
    }

    /// Related resources for the `included` member.
    pub fn included(self) -> IncludedBuilder<'c> {
        IncludedBuilder::new(self)
    }

    pub fn errors(self) -> ErrorsBuilder<'c> {
        ErrorsBuilder { parent: self }
    }

    /// Derive `self` links for every resource and `self`/`related` links
    /// for every declared relationship when the document is written.
    pub fn assemble_hypermedia(mut self) -> Self {
        self.tree.assemble_hypermedia = true;
        self
    }

    /// The tree built so far.
    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn request_path(&self) -> &RequestPath {
        &self.request
    }

    /// Materialize the document, or return the first failure.
    pub fn write_document(self) -> Result<Document> {
        DocumentWriter::new(self.ctx, &self.request).write(self.tree)
    }
}

// ============================================================================
// ErrorsBuilder
// ============================================================================

/// Builder for the top-level `errors` member.
#[derive(Debug)]
pub struct ErrorsBuilder<'c> {
    parent: DocumentBuilder<'c>,
}

impl<'c> ErrorsBuilder<'c> {
    pub fn add_error(mut self, error: ErrorObject) -> Self {
        apply(&mut self.parent, |_, tree| {
            tree.errors.push(error);
            Ok(())
        });
        self
    }

    pub fn add_errors(mut self, errors: impl IntoIterator<Item = ErrorObject>) -> Self {
        apply(&mut self.parent, |_, tree| {
            tree.errors.extend(errors);
            Ok(())
        });
        self
    }

    pub fn errors_end(self) -> DocumentBuilder<'c> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::LinkNode;
    use hyperdoc::v1::keywords;
    use hyperdoc_model::{ServiceModel, UrlBuilderConfiguration};
    use serde_json::json;

    struct Article {
        id: u64,
        title: &'static str,
    }
    struct Person {
        id: &'static str,
    }
    struct Unregistered;

    fn ctx() -> DocumentContext {
        let model = ServiceModel::builder()
            .resource_type(
                ResourceType::builder::<Article>("articles")
                    .id(|a| a.id)
                    .attribute("title", |a| a.title)
                    .to_one("author", "people")
                    .build(),
            )
            .resource_type(ResourceType::builder::<Person>("people").id(|p| p.id).build())
            .build()
            .unwrap();
        DocumentContext::new(model, UrlBuilderConfiguration::default()).unwrap()
    }

    fn article(id: u64) -> Article {
        Article { id, title: "t" }
    }

    #[test]
    fn test_resource_collection_collapses_duplicates() {
        let ctx = ctx();
        let articles = [article(1), article(2), Article { id: 1, title: "newer" }];
        let builder = ctx
            .new_document("http://localhost/articles")
            .resource_collection(&articles)
            .resource_end();

        let tree = builder.tree();
        assert_eq!(
            tree.primary(),
            &PrimaryNode::Resources(vec![
                ResourceKey::new("articles", "1"),
                ResourceKey::new("articles", "2"),
            ])
        );
        let first = tree.resource(&ResourceKey::new("articles", "1")).unwrap();
        assert_eq!(first.attributes["title"], "newer");
    }

    #[test]
    fn test_unregistered_type_is_deferred() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/things/1")
            .resource(&Unregistered)
            .meta(json!({"ignored": true}))
            .resource_end()
            .meta(json!({"also": "ignored"}));

        assert!(matches!(
            builder.tree().failure(),
            Some(BuildError::UnregisteredType(_))
        ));
        assert!(builder.tree().meta().is_empty());
        assert!(builder.write_document().is_err());
    }

    #[test]
    fn test_empty_id_is_rejected() {
        let ctx = ctx();
        let err = ctx
            .new_document("http://localhost/people")
            .resource(&Person { id: "" })
            .resource_end()
            .write_document()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingId { ref resource_type } if resource_type == "people"));
    }

    #[test]
    fn test_primary_data_set_twice() {
        let ctx = ctx();
        let err = ctx
            .new_document("http://localhost/articles/1")
            .resource(&article(1))
            .resource_end()
            .null_resource()
            .write_document()
            .unwrap_err();
        assert!(matches!(err, BuildError::PrimaryDataAlreadySet));
    }

    #[test]
    fn test_meta_must_be_object() {
        let ctx = ctx();
        let builder = ctx.new_document("http://localhost/").meta(vec![1, 2]);
        assert!(matches!(builder.tree().failure(), Some(BuildError::MetaNotObject)));

        let builder = ctx
            .new_document("http://localhost/")
            .meta(json!({"a": 1, "b": 1}))
            .meta(json!({"b": 2}));
        assert_eq!(Value::Object(builder.tree().meta().clone()), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_invalid_request_url_is_deferred() {
        let ctx = ctx();
        let builder = ctx.new_document("mailto:someone@example.com");
        assert!(matches!(
            builder.tree().failure(),
            Some(BuildError::InvalidRequestUrl { .. })
        ));
        assert!(builder.request_path().is_empty());
    }

    #[test]
    fn test_document_links_and_hypermedia_flag() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/articles")
            .links()
            .add_self_link()
            .add_link("next", "http://localhost/articles?page=2")
            .links_end()
            .assemble_hypermedia();
        let tree = builder.tree();
        assert_eq!(tree.links().get(keywords::SELF), Some(&LinkNode::Auto));
        assert!(matches!(tree.links().get("next"), Some(LinkNode::Explicit(_))));
        assert!(tree.assembles_hypermedia());
    }

    #[test]
    fn test_declared_relationship_checks() {
        let ctx = ctx();
        let source = ResourceKey::new("articles", "1");
        assert!(declared_relationship(&ctx, &source, "author", None, None).is_ok());
        assert!(matches!(
            declared_relationship(&ctx, &source, "comments", None, None),
            Err(BuildError::UnknownRelationship { .. })
        ));
        assert!(matches!(
            declared_relationship(&ctx, &source, "author", Some(Cardinality::ToMany), None),
            Err(BuildError::CardinalityMismatch { .. })
        ));
        let err =
            declared_relationship(&ctx, &source, "author", None, Some("articles")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "relationship `author` of `articles` targets `people`, got `articles`"
        );
    }

    #[test]
    fn test_errors_builder() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .errors()
            .add_error(ErrorObject::new().with_status("404"))
            .add_errors([ErrorObject::new().with_code("gone")])
            .errors_end();
        assert_eq!(builder.tree().errors().len(), 2);
    }

    #[test]
    fn test_errors_ignored_after_failure() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/things/1")
            .resource(&Unregistered)
            .resource_end()
            .errors()
            .add_error(ErrorObject::new().with_status("500"))
            .add_errors([ErrorObject::new().with_status("404")])
            .errors_end();
        assert!(builder.tree().errors().is_empty());
        assert!(matches!(
            builder.write_document(),
            Err(BuildError::UnregisteredType(_))
        ));
    }
}
