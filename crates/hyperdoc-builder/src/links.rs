use crate::builder::{TreeAccess, apply};
use crate::error::BuildError;
use crate::tree::{DocumentTree, LinkNode, ResourceKey};
use hyperdoc::v1::{Link, keywords};

/// What a [`LinksBuilder`] adds links to.
#[derive(Debug, Clone)]
pub(crate) enum LinkTarget {
    Document,
    Resources(Vec<ResourceKey>),
    Relationship {
        keys: Vec<ResourceKey>,
        name: String,
    },
}

impl LinkTarget {
    fn scope(&self) -> &'static str {
        match self {
            LinkTarget::Document => "the document",
            LinkTarget::Resources(_) => "resources",
            LinkTarget::Relationship { .. } => "relationships",
        }
    }

    /// Relations whose href can be derived in this scope.
    fn derivable(&self) -> &'static [&'static str] {
        match self {
            LinkTarget::Document => &[keywords::SELF, keywords::UP],
            LinkTarget::Resources(_) => &[keywords::SELF, keywords::CANONICAL],
            LinkTarget::Relationship { .. } => &[keywords::SELF, keywords::RELATED],
        }
    }

    fn set(&self, tree: &mut DocumentTree, rel: &str, node: LinkNode) {
        match self {
            LinkTarget::Document => tree.links.set(rel, node),
            LinkTarget::Resources(keys) => {
                for key in keys {
                    if let Some(resource) = tree.resource_mut(key) {
                        resource.links.set(rel, node.clone());
                    }
                }
            }
            LinkTarget::Relationship { keys, name } => {
                for key in keys {
                    if let Some(resource) = tree.resource_mut(key) {
                        resource.relationship_mut(name).links.set(rel, node.clone());
                    }
                }
            }
        }
    }
}

/// Adds links to the document, a resource (or every resource of a
/// collection) or a relationship.
///
/// The `add_*_link` methods ask for a derived link whose href is computed
/// when the document is written; [`add_link`](Self::add_link) takes a
/// supplied href and always wins over a derived link for the same relation.
#[derive(Debug)]
pub struct LinksBuilder<P> {
    parent: P,
    target: LinkTarget,
}

impl<P: TreeAccess> LinksBuilder<P> {
    pub(crate) fn new(parent: P, target: LinkTarget) -> Self {
        Self { parent, target }
    }

    pub fn add_self_link(self) -> Self {
        self.derive(keywords::SELF)
    }

    /// Document scope only: the request path minus its last segment.
    pub fn add_up_link(self) -> Self {
        self.derive(keywords::UP)
    }

    /// Resource scope only: the resource's collection path and id.
    pub fn add_canonical_link(self) -> Self {
        self.derive(keywords::CANONICAL)
    }

    /// Relationship scope only: the related resource(s) endpoint.
    pub fn add_related_link(self) -> Self {
        self.derive(keywords::RELATED)
    }

    pub fn add_link(mut self, rel: impl Into<String>, link: impl Into<Link>) -> Self {
        let rel = rel.into();
        let link = link.into();
        let target = &self.target;
        apply(&mut self.parent, |_, tree| {
            target.set(tree, &rel, LinkNode::Explicit(link));
            Ok(())
        });
        self
    }

    pub fn links_end(self) -> P {
        self.parent
    }

    fn derive(mut self, rel: &'static str) -> Self {
        let target = &self.target;
        apply(&mut self.parent, |_, tree| {
            if !target.derivable().contains(&rel) {
                return Err(BuildError::UnsupportedLink {
                    rel: rel.to_string(),
                    scope: target.scope(),
                });
            }
            target.set(tree, rel, LinkNode::Auto);
            Ok(())
        });
        self
    }
}
