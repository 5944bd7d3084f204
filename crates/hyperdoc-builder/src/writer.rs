//! Materialization of a [`DocumentTree`] into a [`Document`].

use crate::context::{DocumentContext, PathMode};
use crate::error::{BuildError, Result};
use crate::path::RequestPath;
use crate::tree::{DocumentTree, LinkNode, LinkSet, PrimaryNode, ResourceKey};
use hyperdoc::v1::{Document, Link, Links, Meta, PrimaryData, Relationship, Resource, keywords};
use hyperdoc_model::{HypermediaAssembler, LinkContext, LinkScope, ResourceType};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Where a resource sits in the document; decides its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Single,
    Collection,
    Included,
}

/// Turns a [`DocumentTree`] into a [`Document`], computing the href of
/// every derived link.
///
/// Primary resources are addressed relative to the request path in
/// [`PathMode::Hierarchical`]; included resources always use their
/// canonical `[collection path, id]`.
#[derive(Debug)]
pub struct DocumentWriter<'a> {
    ctx: &'a DocumentContext,
    request: &'a RequestPath,
}

impl<'a> DocumentWriter<'a> {
    pub fn new(ctx: &'a DocumentContext, request: &'a RequestPath) -> Self {
        Self { ctx, request }
    }

    pub fn write(&self, mut tree: DocumentTree) -> Result<Document> {
        if let Some(err) = tree.failure.take() {
            return Err(err);
        }
        if tree.assemble_hypermedia {
            self.assemble_hypermedia(&mut tree)?;
        }

        let primary_keys: HashSet<&ResourceKey> = tree.primary.resource_keys().iter().collect();
        let included_keys: Vec<&ResourceKey> = tree
            .included
            .iter()
            .filter(|key| !primary_keys.contains(key))
            .collect();

        if !tree.errors.is_empty() && tree.primary != PrimaryNode::Unset {
            return Err(BuildError::DataWithErrors);
        }
        if !included_keys.is_empty() && tree.primary == PrimaryNode::Unset {
            return Err(BuildError::IncludedWithoutData);
        }

        let data = match &tree.primary {
            PrimaryNode::Unset => None,
            PrimaryNode::Null => Some(PrimaryData::Null),
            PrimaryNode::Resource(key) => Some(PrimaryData::Resource(Box::new(
                self.resource(&tree, key, Placement::Single)?,
            ))),
            PrimaryNode::Resources(keys) => Some(PrimaryData::Resources(
                keys.iter()
                    .map(|key| self.resource(&tree, key, Placement::Collection))
                    .collect::<Result<_>>()?,
            )),
            PrimaryNode::Identifier(ri) => Some(PrimaryData::Identifier(ri.clone())),
            PrimaryNode::Identifiers(ris) => Some(PrimaryData::Identifiers(ris.clone())),
        };
        let included = included_keys
            .into_iter()
            .map(|key| self.resource(&tree, key, Placement::Included))
            .collect::<Result<Vec<_>>>()?;
        let links = self.document_links(&tree.links);

        Ok(Document {
            jsonapi: tree.jsonapi,
            meta: non_empty(tree.meta),
            links,
            data,
            included,
            errors: tree.errors,
        })
    }

    /// Ask for a `self` link on every resource and `self`/`related` links
    /// on every relationship its assembler accepts.
    fn assemble_hypermedia(&self, tree: &mut DocumentTree) -> Result<()> {
        for node in tree.resources.values_mut() {
            let rt = self.resource_type(&node.key)?;
            let assembler = self.ctx.assemblers().assembler_for(rt.name());
            node.links.set(keywords::SELF, LinkNode::Auto);
            for rel in rt.relationships() {
                if !assembler.emit_relationship(rt, rel) {
                    debug!(resource = %node.key, relationship = %rel.name, "relationship suppressed");
                    continue;
                }
                let relationship = node.relationship_mut(&rel.name);
                relationship.links.set(keywords::SELF, LinkNode::Auto);
                relationship.links.set(keywords::RELATED, LinkNode::Auto);
            }
        }
        Ok(())
    }

    fn resource_type(&self, key: &ResourceKey) -> Result<&'a ResourceType> {
        self.ctx
            .model()
            .resource_type(&key.resource_type)
            .ok_or_else(|| BuildError::UnknownResourceType(key.resource_type.clone()))
    }

    fn resource(&self, tree: &DocumentTree, key: &ResourceKey, placement: Placement) -> Result<Resource> {
        let node = tree
            .resource(key)
            .ok_or_else(|| BuildError::SourceNotInDocument(key.clone()))?;
        let rt = self.resource_type(key)?;
        let assembler = self.ctx.assemblers().assembler_for(rt.name());
        let urls = self.ctx.urls();

        let canonical = vec![assembler.collection_path(rt), key.id.clone()];
        let path = self.resource_path(placement, &canonical);

        let links = resolve_links(&node.links, assembler, LinkScope::Resource(rt), |rel| match rel {
            keywords::SELF => Some(urls.build(&path)),
            keywords::CANONICAL => Some(urls.build(&canonical)),
            _ => None,
        });

        let mut relationships = BTreeMap::new();
        for (name, rel) in &node.relationships {
            let scope = LinkScope::Relationship {
                resource_type: rt,
                relationship: name,
            };
            let links = resolve_links(&rel.links, assembler, scope, |link| {
                let base = path.iter().map(String::as_str);
                match link {
                    keywords::SELF => Some(urls.build(base.chain(["relationships", name.as_str()]))),
                    keywords::RELATED => Some(urls.build(base.chain([name.as_str()]))),
                    _ => None,
                }
            });
            let relationship = Relationship {
                links,
                data: rel.linkage.clone(),
                meta: non_empty(rel.meta.clone()),
            };
            if relationship.is_empty() {
                continue;
            }
            relationships.insert(name.clone(), relationship);
        }

        Ok(Resource {
            resource_type: key.resource_type.clone(),
            id: Some(key.id.clone()),
            attributes: non_empty(node.attributes.clone()),
            relationships: (!relationships.is_empty()).then_some(relationships),
            links,
            meta: non_empty(node.meta.clone()),
        })
    }

    fn resource_path(&self, placement: Placement, canonical: &[String]) -> Vec<String> {
        let request = self.request;
        if placement == Placement::Included
            || self.ctx.path_mode() == PathMode::Canonical
            || request.is_empty()
        {
            return canonical.to_vec();
        }

        let (collection, id) = (&canonical[0], &canonical[1]);
        let mut path = request.segments().to_vec();
        if request.last() == Some(id.as_str()) {
            return path;
        }
        match placement {
            Placement::Collection => path.push(id.clone()),
            Placement::Single if request.last() == Some(collection.as_str()) => {
                path.push(id.clone())
            }
            _ => {}
        }
        path
    }

    fn document_links(&self, links: &LinkSet) -> Option<Links> {
        let urls = self.ctx.urls();
        let assembler = self.ctx.assemblers().document_assembler();
        resolve_links(links, assembler, LinkScope::Document, |rel| match rel {
            keywords::SELF => Some(self.request.url().to_string()),
            keywords::UP => self.request.parent().map(|parent| urls.build(parent)),
            _ => None,
        })
    }
}

/// Supplied links pass through; derived links are offered to `assembler`
/// and resolved with `href`. A derived link without an href is dropped.
fn resolve_links<F>(
    set: &LinkSet,
    assembler: &dyn HypermediaAssembler,
    scope: LinkScope<'_>,
    href: F,
) -> Option<Links>
where
    F: Fn(&str) -> Option<String>,
{
    let mut links = Links::new();
    for (rel, node) in set.iter() {
        match node {
            LinkNode::Explicit(link) => {
                links.insert(rel.to_string(), link.clone());
            }
            LinkNode::Auto => {
                if !assembler.emit_link(&LinkContext { scope, rel }) {
                    debug!(rel, "derived link suppressed");
                    continue;
                }
                if let Some(href) = href(rel) {
                    links.insert(rel.to_string(), Link::Href(href));
                }
            }
        }
    }
    (!links.is_empty()).then_some(links)
}

fn non_empty(meta: Meta) -> Option<Meta> {
    (!meta.is_empty()).then_some(meta)
}
