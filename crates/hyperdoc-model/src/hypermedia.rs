//! Hypermedia assembler contracts: which path segment names a resource
//! collection, and which links and relationships get emitted.

use crate::resource_type::{RelationshipDescriptor, ResourceType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a link belongs to.
#[derive(Debug, Clone, Copy)]
pub enum LinkScope<'a> {
    /// Top-level document links.
    Document,
    Resource(&'a ResourceType),
    Relationship {
        resource_type: &'a ResourceType,
        relationship: &'a str,
    },
}

/// A link about to be derived, offered to [`HypermediaAssembler::emit_link`].
#[derive(Debug, Clone, Copy)]
pub struct LinkContext<'a> {
    pub scope: LinkScope<'a>,
    /// Link relation name, e.g. `"self"` or `"related"`.
    pub rel: &'a str,
}

impl<'a> LinkContext<'a> {
    pub fn resource_type(&self) -> Option<&'a ResourceType> {
        match self.scope {
            LinkScope::Document => None,
            LinkScope::Resource(rt) => Some(rt),
            LinkScope::Relationship { resource_type, .. } => Some(resource_type),
        }
    }

    pub fn relationship(&self) -> Option<&'a str> {
        match self.scope {
            LinkScope::Relationship { relationship, .. } => Some(relationship),
            _ => None,
        }
    }
}

/// Strategy that derives hypermedia for a resource type.
///
/// Only links and relationships the assembler *derives* pass through these
/// hooks; links whose href the caller supplies are emitted as given.
pub trait HypermediaAssembler: Send + Sync {
    /// Path segment naming the collection of `resource_type`
    /// (`/articles/1` → `"articles"`).
    fn collection_path(&self, resource_type: &ResourceType) -> String {
        resource_type.name().to_string()
    }

    /// Whether a derived link should appear in the document.
    fn emit_link(&self, _link: &LinkContext<'_>) -> bool {
        true
    }

    /// Whether a declared relationship should be derived for resources of
    /// `resource_type`.
    fn emit_relationship(
        &self,
        _resource_type: &ResourceType,
        _relationship: &RelationshipDescriptor,
    ) -> bool {
        true
    }
}

/// Uses the type name as collection path and emits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHypermediaAssembler;

impl HypermediaAssembler for DefaultHypermediaAssembler {}

type LinkPredicate = Box<dyn Fn(&LinkContext<'_>) -> bool + Send + Sync>;
type RelationshipPredicate =
    Box<dyn Fn(&ResourceType, &RelationshipDescriptor) -> bool + Send + Sync>;

/// Assembler configured with a collection path override and suppression
/// predicates. A link or relationship is suppressed when any predicate
/// matches it.
///
/// ```
/// use hyperdoc::v1::keywords;
/// use hyperdoc_model::{
///     HypermediaAssembler, LinkContext, LinkScope, ResourceType, RuleHypermediaAssembler,
/// };
///
/// struct Comment { id: u64 }
/// let comments = ResourceType::builder::<Comment>("comments")
///     .id(|c| c.id)
///     .to_one("author", "people")
///     .build();
///
/// let assembler = RuleHypermediaAssembler::new()
///     .with_collection_path("article-comments")
///     .suppress_link(keywords::CANONICAL);
///
/// assert_eq!(assembler.collection_path(&comments), "article-comments");
/// let canonical = LinkContext { scope: LinkScope::Resource(&comments), rel: keywords::CANONICAL };
/// assert!(!assembler.emit_link(&canonical));
/// let this = LinkContext { scope: LinkScope::Resource(&comments), rel: keywords::SELF };
/// assert!(assembler.emit_link(&this));
/// ```
#[derive(Default)]
pub struct RuleHypermediaAssembler {
    collection_path: Option<String>,
    suppressed_links: Vec<LinkPredicate>,
    suppressed_relationships: Vec<RelationshipPredicate>,
}

impl RuleHypermediaAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `segment` instead of the type name as collection path.
    pub fn with_collection_path(mut self, segment: impl Into<String>) -> Self {
        self.collection_path = Some(segment.into());
        self
    }

    /// Never derive links with relation `rel`, in any scope.
    pub fn suppress_link(self, rel: impl Into<String>) -> Self {
        let rel = rel.into();
        self.suppress_link_when(move |link| link.rel == rel)
    }

    pub fn suppress_link_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&LinkContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.suppressed_links.push(Box::new(predicate));
        self
    }

    /// Never derive the relationship `name`.
    pub fn suppress_relationship(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.suppress_relationship_when(move |_, rel| rel.name == name)
    }

    pub fn suppress_relationship_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ResourceType, &RelationshipDescriptor) -> bool + Send + Sync + 'static,
    {
        self.suppressed_relationships.push(Box::new(predicate));
        self
    }
}

impl HypermediaAssembler for RuleHypermediaAssembler {
    fn collection_path(&self, resource_type: &ResourceType) -> String {
        self.collection_path
            .clone()
            .unwrap_or_else(|| resource_type.name().to_string())
    }

    fn emit_link(&self, link: &LinkContext<'_>) -> bool {
        !self.suppressed_links.iter().any(|p| p(link))
    }

    fn emit_relationship(
        &self,
        resource_type: &ResourceType,
        relationship: &RelationshipDescriptor,
    ) -> bool {
        !self
            .suppressed_relationships
            .iter()
            .any(|p| p(resource_type, relationship))
    }
}

impl fmt::Debug for RuleHypermediaAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleHypermediaAssembler")
            .field("collection_path", &self.collection_path)
            .field("suppressed_links", &self.suppressed_links.len())
            .field("suppressed_relationships", &self.suppressed_relationships.len())
            .finish()
    }
}

/// Assemblers keyed by JSON:API type name, with a fallback used for
/// unregistered types and for document-level links.
#[derive(Clone)]
pub struct HypermediaAssemblerRegistry {
    default: Arc<dyn HypermediaAssembler>,
    by_type: HashMap<String, Arc<dyn HypermediaAssembler>>,
}

impl Default for HypermediaAssemblerRegistry {
    fn default() -> Self {
        Self {
            default: Arc::new(DefaultHypermediaAssembler),
            by_type: HashMap::new(),
        }
    }
}

impl HypermediaAssemblerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the fallback assembler.
    pub fn with_default<A: HypermediaAssembler + 'static>(mut self, assembler: A) -> Self {
        self.default = Arc::new(assembler);
        self
    }

    /// Use `assembler` for resources of `type_name`.
    pub fn register<A: HypermediaAssembler + 'static>(
        mut self,
        type_name: impl Into<String>,
        assembler: A,
    ) -> Self {
        self.by_type.insert(type_name.into(), Arc::new(assembler));
        self
    }

    pub fn assembler_for(&self, type_name: &str) -> &dyn HypermediaAssembler {
        self.by_type
            .get(type_name)
            .map(|a| a.as_ref())
            .unwrap_or(self.default.as_ref())
    }

    /// Assembler consulted for top-level document links.
    pub fn document_assembler(&self) -> &dyn HypermediaAssembler {
        self.default.as_ref()
    }
}

impl fmt::Debug for HypermediaAssemblerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.by_type.keys().collect();
        types.sort();
        f.debug_struct("HypermediaAssemblerRegistry")
            .field("registered", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_type::Cardinality;
    use hyperdoc::v1::keywords;

    struct Blog;

    fn blogs() -> ResourceType {
        ResourceType::builder::<Blog>("blogs")
            .id(|_| 1)
            .to_many("articles", "articles")
            .to_one("owner", "people")
            .build()
    }

    #[test]
    fn test_default_assembler_emits_everything() {
        let rt = blogs();
        let a = DefaultHypermediaAssembler;
        assert_eq!(a.collection_path(&rt), "blogs");
        assert!(a.emit_link(&LinkContext {
            scope: LinkScope::Document,
            rel: keywords::UP
        }));
        assert!(a.emit_relationship(&rt, &rt.relationships()[0]));
    }

    #[test]
    fn test_rule_assembler_suppresses_by_predicate() {
        let rt = blogs();
        let a = RuleHypermediaAssembler::new().suppress_link_when(|link| {
            link.relationship() == Some("articles") && link.rel == keywords::SELF
        });

        let rel_self = LinkContext {
            scope: LinkScope::Relationship {
                resource_type: &rt,
                relationship: "articles",
            },
            rel: keywords::SELF,
        };
        let rel_related = LinkContext {
            rel: keywords::RELATED,
            ..rel_self
        };
        assert!(!a.emit_link(&rel_self));
        assert!(a.emit_link(&rel_related));
        assert_eq!(a.collection_path(&rt), "blogs");
    }

    #[test]
    fn test_rule_assembler_suppresses_relationships() {
        let rt = blogs();
        let a = RuleHypermediaAssembler::new()
            .suppress_relationship("owner")
            .suppress_relationship_when(|_, rel| rel.cardinality == Cardinality::ToMany);
        assert!(rt.relationships().iter().all(|r| !a.emit_relationship(&rt, r)));

        let a = RuleHypermediaAssembler::new().suppress_relationship("owner");
        let emitted: Vec<_> = rt
            .relationships()
            .iter()
            .filter(|r| a.emit_relationship(&rt, r))
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(emitted, ["articles"]);
    }

    #[test]
    fn test_registry_falls_back_to_default() {
        let rt = blogs();
        let registry = HypermediaAssemblerRegistry::new().register(
            "blogs",
            RuleHypermediaAssembler::new().with_collection_path("weblogs"),
        );
        assert_eq!(registry.assembler_for("blogs").collection_path(&rt), "weblogs");
        assert_eq!(registry.assembler_for("people").collection_path(&rt), "blogs");
        assert!(format!("{:?}", registry).contains("blogs"));
    }

    #[test]
    fn test_registry_custom_default() {
        let rt = blogs();
        let registry = HypermediaAssemblerRegistry::new()
            .with_default(RuleHypermediaAssembler::new().suppress_link(keywords::UP));
        let up = LinkContext {
            scope: LinkScope::Document,
            rel: keywords::UP,
        };
        assert!(!registry.document_assembler().emit_link(&up));
        assert!(!registry.assembler_for("blogs").emit_link(&up));
        assert!(registry.assembler_for("blogs").emit_relationship(&rt, &rt.relationships()[1]));
    }

    #[test]
    fn test_link_context_accessors() {
        let rt = blogs();
        let ctx = LinkContext {
            scope: LinkScope::Resource(&rt),
            rel: keywords::SELF,
        };
        assert_eq!(ctx.resource_type().unwrap().name(), "blogs");
        assert!(ctx.relationship().is_none());
        let doc = LinkContext {
            scope: LinkScope::Document,
            rel: keywords::SELF,
        };
        assert!(doc.resource_type().is_none());
    }
}
