//! The in-memory document tree the builder fills and the writer reads.
//!
//! Resources live in an arena keyed by [`ResourceKey`], so adding the same
//! logical resource twice merges into one node instead of duplicating it.

use crate::error::BuildError;
use hyperdoc::v1::{ErrorObject, JsonApi, Link, Linkage, Meta, ResourceIdentifier};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// Identity of a resource: its type name and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub resource_type: String,
    pub id: String,
}

impl ResourceKey {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn identifier(&self) -> ResourceIdentifier {
        ResourceIdentifier::new(&self.resource_type, &self.id)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

// ============================================================================
// Links
// ============================================================================

/// A link whose href is either supplied or derived at write time.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkNode {
    Auto,
    Explicit(Link),
}

/// Links of one object, keyed by relation name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSet(BTreeMap<String, LinkNode>);

impl LinkSet {
    /// Set the link for `rel`. A later link replaces an earlier one, except
    /// that a derived link never replaces a supplied one.
    pub fn set(&mut self, rel: impl Into<String>, node: LinkNode) {
        let rel = rel.into();
        if node == LinkNode::Auto
            && let Some(LinkNode::Explicit(_)) = self.0.get(&rel)
        {
            return;
        }
        self.0.insert(rel, node);
    }

    pub fn merge(&mut self, other: LinkSet) {
        for (rel, node) in other.0 {
            self.set(rel, node);
        }
    }

    pub fn get(&self, rel: &str) -> Option<&LinkNode> {
        self.0.get(rel)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LinkNode)> {
        self.0.iter().map(|(rel, node)| (rel.as_str(), node))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Resources
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipNode {
    pub links: LinkSet,
    pub meta: Meta,
    pub linkage: Option<Linkage>,
}

impl RelationshipNode {
    /// To-one linkage replaces what was there; to-many linkage is unioned
    /// with it, keeping first-seen order.
    pub fn set_linkage(&mut self, linkage: Linkage) {
        match (self.linkage.as_mut(), linkage) {
            (Some(Linkage::ToMany(existing)), Linkage::ToMany(added)) => {
                for ri in added {
                    if !existing
                        .iter()
                        .any(|e| e.resource_type == ri.resource_type && e.id == ri.id)
                    {
                        existing.push(ri);
                    }
                }
            }
            (_, linkage) => self.linkage = Some(linkage),
        }
    }

    pub fn merge(&mut self, other: RelationshipNode) {
        self.links.merge(other.links);
        self.meta.extend(other.meta);
        if let Some(linkage) = other.linkage {
            self.set_linkage(linkage);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.meta.is_empty() && self.linkage.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub key: ResourceKey,
    pub attributes: Map<String, Value>,
    pub meta: Meta,
    pub links: LinkSet,
    pub relationships: BTreeMap<String, RelationshipNode>,
}

impl ResourceNode {
    pub fn new(key: ResourceKey, attributes: Map<String, Value>) -> Self {
        Self {
            key,
            attributes,
            meta: Meta::new(),
            links: LinkSet::default(),
            relationships: BTreeMap::new(),
        }
    }

    /// The relationship `name`, created empty on first use.
    pub fn relationship_mut(&mut self, name: &str) -> &mut RelationshipNode {
        self.relationships.entry(name.to_string()).or_default()
    }

    /// Fold a newer snapshot of the same resource into this node.
    pub fn merge(&mut self, other: ResourceNode) {
        self.attributes = other.attributes;
        self.meta.extend(other.meta);
        self.links.merge(other.links);
        for (name, rel) in other.relationships {
            self.relationship_mut(&name).merge(rel);
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// What the `data` member will hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PrimaryNode {
    #[default]
    Unset,
    Null,
    Resource(ResourceKey),
    Resources(Vec<ResourceKey>),
    Identifier(ResourceIdentifier),
    Identifiers(Vec<ResourceIdentifier>),
}

impl PrimaryNode {
    /// Keys of resource objects in primary data.
    pub fn resource_keys(&self) -> &[ResourceKey] {
        match self {
            PrimaryNode::Resource(key) => std::slice::from_ref(key),
            PrimaryNode::Resources(keys) => keys,
            _ => &[],
        }
    }
}

/// The document under construction.
#[derive(Debug, Default)]
pub struct DocumentTree {
    pub(crate) jsonapi: Option<JsonApi>,
    pub(crate) meta: Meta,
    pub(crate) links: LinkSet,
    pub(crate) primary: PrimaryNode,
    pub(crate) resources: HashMap<ResourceKey, ResourceNode>,
    pub(crate) included: Vec<ResourceKey>,
    included_set: HashSet<ResourceKey>,
    pub(crate) errors: Vec<ErrorObject>,
    pub(crate) assemble_hypermedia: bool,
    pub(crate) failure: Option<BuildError>,
}

impl DocumentTree {
    pub fn jsonapi(&self) -> Option<&JsonApi> {
        self.jsonapi.as_ref()
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn links(&self) -> &LinkSet {
        &self.links
    }

    pub fn primary(&self) -> &PrimaryNode {
        &self.primary
    }

    pub fn resource(&self, key: &ResourceKey) -> Option<&ResourceNode> {
        self.resources.get(key)
    }

    /// Whether `key` is in the document, as primary data or included.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    /// Included keys in first-inclusion order. May contain keys that are
    /// also primary data; the writer leaves those out.
    pub fn included(&self) -> &[ResourceKey] {
        &self.included
    }

    pub fn errors(&self) -> &[ErrorObject] {
        &self.errors
    }

    pub fn assembles_hypermedia(&self) -> bool {
        self.assemble_hypermedia
    }

    /// The first failure recorded while building.
    pub fn failure(&self) -> Option<&BuildError> {
        self.failure.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Record a build failure. Only the first one is kept.
    pub(crate) fn fail(&mut self, err: BuildError) {
        if self.failure.is_none() {
            warn!(error = %err, "document build failed");
            self.failure = Some(err);
        } else {
            debug!(error = %err, "ignoring failure after the first");
        }
    }

    /// Insert `node`, merging into an existing node with the same key.
    pub(crate) fn upsert(&mut self, node: ResourceNode) {
        match self.resources.get_mut(&node.key) {
            Some(existing) => {
                debug!(resource = %node.key, "merging repeated resource");
                existing.merge(node);
            }
            None => {
                self.resources.insert(node.key.clone(), node);
            }
        }
    }

    pub(crate) fn resource_mut(&mut self, key: &ResourceKey) -> Option<&mut ResourceNode> {
        self.resources.get_mut(key)
    }

    /// Append `key` to the included list unless it is already there.
    pub(crate) fn include(&mut self, key: ResourceKey) {
        if self.included_set.contains(&key) {
            debug!(resource = %key, "resource already included");
            return;
        }
        self.included_set.insert(key.clone());
        self.included.push(key);
    }

    /// Set primary data. Setting it again is accepted only when shape and
    /// identity are unchanged.
    pub(crate) fn set_primary(&mut self, primary: PrimaryNode) -> Result<(), BuildError> {
        match &self.primary {
            PrimaryNode::Unset => {
                self.primary = primary;
                Ok(())
            }
            current if same_identity(current, &primary) => Ok(()),
            _ => Err(BuildError::PrimaryDataAlreadySet),
        }
    }
}

fn same_identity(a: &PrimaryNode, b: &PrimaryNode) -> bool {
    let ids = |ris: &[ResourceIdentifier]| -> Vec<(String, String)> {
        ris.iter()
            .map(|ri| (ri.resource_type.clone(), ri.id.clone()))
            .collect()
    };
    match (a, b) {
        (PrimaryNode::Identifier(x), PrimaryNode::Identifier(y)) => {
            ids(std::slice::from_ref(x)) == ids(std::slice::from_ref(y))
        }
        (PrimaryNode::Identifiers(x), PrimaryNode::Identifiers(y)) => ids(x) == ids(y),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperdoc::v1::keywords;
    use serde_json::json;

    fn node(id: &str, attrs: Value) -> ResourceNode {
        let Value::Object(attributes) = attrs else {
            panic!("attributes must be an object");
        };
        ResourceNode::new(ResourceKey::new("articles", id), attributes)
    }

    fn ri(id: &str) -> ResourceIdentifier {
        ResourceIdentifier::new("comments", id)
    }

    #[test]
    fn test_explicit_link_beats_auto() {
        let mut links = LinkSet::default();
        links.set(keywords::SELF, LinkNode::Explicit(Link::from("http://x/1")));
        links.set(keywords::SELF, LinkNode::Auto);
        assert_eq!(
            links.get(keywords::SELF),
            Some(&LinkNode::Explicit(Link::from("http://x/1")))
        );

        links.set(keywords::SELF, LinkNode::Explicit(Link::from("http://x/2")));
        assert_eq!(
            links.get(keywords::SELF),
            Some(&LinkNode::Explicit(Link::from("http://x/2")))
        );

        links.set(keywords::RELATED, LinkNode::Auto);
        links.set(keywords::RELATED, LinkNode::Explicit(Link::from("http://x/r")));
        assert!(matches!(links.get(keywords::RELATED), Some(LinkNode::Explicit(_))));
    }

    #[test]
    fn test_to_many_linkage_is_unioned() {
        let mut rel = RelationshipNode::default();
        rel.set_linkage(Linkage::ToMany(vec![ri("5"), ri("12")]));
        rel.set_linkage(Linkage::ToMany(vec![ri("12"), ri("7")]));
        assert_eq!(rel.linkage, Some(Linkage::ToMany(vec![ri("5"), ri("12"), ri("7")])));

        rel.set_linkage(Linkage::ToMany(vec![]));
        assert_eq!(rel.linkage.as_ref().unwrap().identifiers().len(), 3);
    }

    #[test]
    fn test_to_one_linkage_is_overwritten() {
        let mut rel = RelationshipNode::default();
        rel.set_linkage(Linkage::ToOne(Some(ri("5"))));
        rel.set_linkage(Linkage::ToOne(None));
        assert_eq!(rel.linkage, Some(Linkage::ToOne(None)));
        assert!(!rel.is_empty());
        assert!(RelationshipNode::default().is_empty());
    }

    #[test]
    fn test_resource_merge() {
        let mut a = node("1", json!({"title": "old", "body": "x"}));
        a.meta.insert("views".into(), json!(1));
        a.meta.insert("draft".into(), json!(true));
        a.relationship_mut("comments")
            .set_linkage(Linkage::ToMany(vec![ri("5")]));

        let mut b = node("1", json!({"title": "new"}));
        b.meta.insert("views".into(), json!(2));
        b.relationship_mut("comments")
            .set_linkage(Linkage::ToMany(vec![ri("6")]));
        b.links.set(keywords::SELF, LinkNode::Auto);

        a.merge(b);
        assert_eq!(Value::Object(a.attributes.clone()), json!({"title": "new"}));
        assert_eq!(Value::Object(a.meta.clone()), json!({"views": 2, "draft": true}));
        assert_eq!(a.relationships["comments"].linkage.as_ref().unwrap().identifiers().len(), 2);
        assert_eq!(a.links.get(keywords::SELF), Some(&LinkNode::Auto));
    }

    #[test]
    fn test_upsert_and_include_dedup() {
        let mut tree = DocumentTree::default();
        tree.upsert(node("1", json!({"title": "a"})));
        tree.upsert(node("1", json!({"title": "b"})));
        assert_eq!(tree.resources.len(), 1);
        let key = ResourceKey::new("articles", "1");
        assert_eq!(tree.resource(&key).unwrap().attributes["title"], "b");

        tree.include(key.clone());
        tree.include(ResourceKey::new("articles", "2"));
        tree.include(key);
        assert_eq!(tree.included().len(), 2);
        assert_eq!(tree.included()[1].to_string(), "articles/2");
    }

    #[test]
    fn test_primary_set_twice() {
        let mut tree = DocumentTree::default();
        let key = ResourceKey::new("articles", "1");
        tree.set_primary(PrimaryNode::Resource(key.clone())).unwrap();
        tree.set_primary(PrimaryNode::Resource(key.clone())).unwrap();
        assert!(matches!(
            tree.set_primary(PrimaryNode::Resource(ResourceKey::new("articles", "2"))),
            Err(BuildError::PrimaryDataAlreadySet)
        ));
        assert!(tree.set_primary(PrimaryNode::Resources(vec![key])).is_err());
        assert!(tree.set_primary(PrimaryNode::Null).is_err());
    }

    #[test]
    fn test_primary_identifier_ignores_meta() {
        let mut tree = DocumentTree::default();
        tree.set_primary(PrimaryNode::Identifier(ri("5").with_meta("a", 1)))
            .unwrap();
        tree.set_primary(PrimaryNode::Identifier(ri("5"))).unwrap();
        assert!(tree.set_primary(PrimaryNode::Identifier(ri("6"))).is_err());
    }

    #[test]
    fn test_first_failure_is_kept() {
        let mut tree = DocumentTree::default();
        assert!(!tree.is_failed());
        tree.fail(BuildError::MetaNotObject);
        tree.fail(BuildError::PrimaryDataAlreadySet);
        assert!(matches!(tree.failure(), Some(BuildError::MetaNotObject)));
    }

    #[test]
    fn test_primary_resource_keys() {
        let key = ResourceKey::new("articles", "1");
        assert_eq!(PrimaryNode::Resource(key.clone()).resource_keys(), [key.clone()]);
        assert!(PrimaryNode::Null.resource_keys().is_empty());
        assert_eq!(PrimaryNode::Resources(vec![key.clone(), key]).resource_keys().len(), 2);
    }
}
