use crate::builder::{
    DocumentBuilder, TreeAccess, apply, declared_relationship, delegate_tree_access, key_of,
    merge_meta, resource_type_of, to_meta,
};
use crate::error::BuildError;
use crate::links::{LinkTarget, LinksBuilder};
use crate::tree::{LinkNode, PrimaryNode, ResourceKey};
use hyperdoc::v1::{Linkage, Meta, keywords};
use hyperdoc_model::Cardinality;
use serde::Serialize;
use std::any::Any;

/// Builder scoped to the primary resource, or to every resource of a
/// primary collection.
#[derive(Debug)]
pub struct ResourceBuilder<'c> {
    parent: DocumentBuilder<'c>,
    keys: Vec<ResourceKey>,
}

delegate_tree_access!([] ResourceBuilder<'_>);

impl<'c> ResourceBuilder<'c> {
    pub(crate) fn new(parent: DocumentBuilder<'c>, keys: Vec<ResourceKey>) -> Self {
        Self { parent, keys }
    }

    /// Merge `meta` into the resource meta. Later keys win.
    pub fn meta<M: Serialize>(mut self, meta: M) -> Self {
        let keys = &self.keys;
        apply(&mut self.parent, |_, tree| {
            merge_meta(tree, keys, &to_meta(meta)?);
            Ok(())
        });
        self
    }

    pub fn links(self) -> LinksBuilder<Self> {
        let target = LinkTarget::Resources(self.keys.clone());
        LinksBuilder::new(self, target)
    }

    pub fn relationships(self) -> RelationshipsBuilder<Self> {
        let keys = self.keys.clone();
        RelationshipsBuilder::new(self, keys)
    }

    pub fn resource_end(self) -> DocumentBuilder<'c> {
        self.parent
    }
}

// ============================================================================
// Relationships
// ============================================================================

/// Builder for the `relationships` member of the resources in scope.
#[derive(Debug)]
pub struct RelationshipsBuilder<P> {
    parent: P,
    keys: Vec<ResourceKey>,
}

delegate_tree_access!([P: TreeAccess] RelationshipsBuilder<P>);

impl<P: TreeAccess> RelationshipsBuilder<P> {
    pub(crate) fn new(parent: P, keys: Vec<ResourceKey>) -> Self {
        Self { parent, keys }
    }

    /// Add the declared relationship `name` with derived links for the
    /// given relations (`self` and/or `related`).
    ///
    /// ```
    /// # use hyperdoc_builder::{DocumentContext, keywords};
    /// # use hyperdoc_model::{ResourceType, ServiceModel, UrlBuilderConfiguration};
    /// # struct Article { id: u64 }
    /// # struct Person { id: u64 }
    /// # let model = ServiceModel::builder()
    /// #     .resource_type(ResourceType::builder::<Article>("articles").id(|a| a.id).to_one("author", "people").build())
    /// #     .resource_type(ResourceType::builder::<Person>("people").id(|p| p.id).build())
    /// #     .build().unwrap();
    /// # let ctx = DocumentContext::new(model, UrlBuilderConfiguration::default()).unwrap();
    /// let doc = ctx
    ///     .new_document("http://localhost/articles/1")
    ///     .resource(&Article { id: 1 })
    ///         .relationships()
    ///             .add_relationship("author", &[keywords::SELF, keywords::RELATED])
    ///         .relationships_end()
    ///     .resource_end()
    ///     .write_document()
    ///     .unwrap();
    ///
    /// let json = serde_json::to_value(&doc).unwrap();
    /// assert_eq!(
    ///     json["data"]["relationships"]["author"]["links"]["related"],
    ///     "http://localhost/articles/1/author"
    /// );
    /// ```
    pub fn add_relationship(mut self, name: &str, links: &[&str]) -> Self {
        let keys = &self.keys;
        apply(&mut self.parent, |ctx, tree| {
            for rel in links {
                if *rel != keywords::SELF && *rel != keywords::RELATED {
                    return Err(BuildError::UnsupportedLink {
                        rel: rel.to_string(),
                        scope: "relationships",
                    });
                }
            }
            for key in keys {
                declared_relationship(ctx, key, name, None, None)?;
                if let Some(resource) = tree.resource_mut(key) {
                    let relationship = resource.relationship_mut(name);
                    for rel in links {
                        relationship.links.set(*rel, LinkNode::Auto);
                    }
                }
            }
            Ok(())
        });
        self
    }

    /// Builder for the declared relationship `name`.
    pub fn relationship(mut self, name: &str) -> RelationshipBuilder<P> {
        let keys = &self.keys;
        apply(&mut self.parent, |ctx, _| {
            for key in keys {
                declared_relationship(ctx, key, name, None, None)?;
            }
            Ok(())
        });
        RelationshipBuilder {
            parent: self,
            name: name.to_string(),
        }
    }

    pub fn relationships_end(self) -> P {
        self.parent
    }
}

/// Builder for one relationship of the resources in scope.
#[derive(Debug)]
pub struct RelationshipBuilder<P> {
    parent: RelationshipsBuilder<P>,
    name: String,
}

delegate_tree_access!([P: TreeAccess] RelationshipBuilder<P>);

impl<P: TreeAccess> RelationshipBuilder<P> {
    pub fn links(self) -> LinksBuilder<Self> {
        let target = LinkTarget::Relationship {
            keys: self.parent.keys.clone(),
            name: self.name.clone(),
        };
        LinksBuilder::new(self, target)
    }

    pub fn meta<M: Serialize>(mut self, meta: M) -> Self {
        let (keys, name) = (&self.parent.keys, &self.name);
        apply(&mut self.parent.parent, |_, tree| {
            let meta = to_meta(meta)?;
            for key in keys {
                if let Some(resource) = tree.resource_mut(key) {
                    resource.relationship_mut(name).meta.extend(meta.clone());
                }
            }
            Ok(())
        });
        self
    }

    /// Set to-one linkage; `None` gives `"data": null`.
    pub fn to_one_linkage<T: Any>(mut self, target: Option<&T>) -> Self {
        let (keys, name) = (&self.parent.keys, &self.name);
        apply(&mut self.parent.parent, |ctx, tree| {
            let target_type = resource_type_of::<T>(ctx)?.name();
            let identifier = target.map(|t| key_of(ctx, t)).transpose()?;
            for key in keys {
                declared_relationship(ctx, key, name, Some(Cardinality::ToOne), Some(target_type))?;
                if let Some(resource) = tree.resource_mut(key) {
                    resource
                        .relationship_mut(name)
                        .set_linkage(Linkage::ToOne(identifier.as_ref().map(ResourceKey::identifier)));
                }
            }
            Ok(())
        });
        self
    }

    /// Add to-many linkage. Identifiers already present are kept once.
    pub fn to_many_linkage<'a, T, I>(mut self, targets: I) -> Self
    where
        T: Any,
        I: IntoIterator<Item = &'a T>,
    {
        let (keys, name) = (&self.parent.keys, &self.name);
        apply(&mut self.parent.parent, |ctx, tree| {
            let target_type = resource_type_of::<T>(ctx)?.name();
            let identifiers = targets
                .into_iter()
                .map(|t| key_of(ctx, t).map(|k| k.identifier()))
                .collect::<Result<Vec<_>, _>>()?;
            for key in keys {
                declared_relationship(ctx, key, name, Some(Cardinality::ToMany), Some(target_type))?;
                if let Some(resource) = tree.resource_mut(key) {
                    resource
                        .relationship_mut(name)
                        .set_linkage(Linkage::ToMany(identifiers.clone()));
                }
            }
            Ok(())
        });
        self
    }

    pub fn relationship_end(self) -> RelationshipsBuilder<P> {
        self.parent
    }
}

// ============================================================================
// Resource identifiers
// ============================================================================

/// Builder scoped to primary resource identifier(s).
#[derive(Debug)]
pub struct ResourceIdentifierBuilder<'c> {
    parent: DocumentBuilder<'c>,
}

impl<'c> ResourceIdentifierBuilder<'c> {
    pub(crate) fn new(parent: DocumentBuilder<'c>) -> Self {
        Self { parent }
    }

    /// Merge `meta` into the identifier meta.
    pub fn meta<M: Serialize>(mut self, meta: M) -> Self {
        apply(&mut self.parent, |_, tree| {
            let meta = to_meta(meta)?;
            let merge = |target: &mut Option<Meta>| {
                target.get_or_insert_with(Meta::new).extend(meta.clone());
            };
            match &mut tree.primary {
                PrimaryNode::Identifier(ri) => merge(&mut ri.meta),
                PrimaryNode::Identifiers(ris) => ris.iter_mut().for_each(|ri| merge(&mut ri.meta)),
                _ => {}
            }
            Ok(())
        });
        self
    }

    pub fn resource_identifier_end(self) -> DocumentBuilder<'c> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DocumentContext;
    use hyperdoc::v1::ResourceIdentifier;
    use hyperdoc_model::{ResourceType, ServiceModel, UrlBuilderConfiguration};
    use serde_json::{Value, json};

    struct Article {
        id: u64,
    }
    struct Person {
        id: u64,
    }
    struct Comment {
        id: u64,
    }

    fn ctx() -> DocumentContext {
        let model = ServiceModel::builder()
            .resource_type(
                ResourceType::builder::<Article>("articles")
                    .id(|a| a.id)
                    .to_one("author", "people")
                    .to_many("comments", "comments")
                    .build(),
            )
            .resource_type(ResourceType::builder::<Person>("people").id(|p| p.id).build())
            .resource_type(ResourceType::builder::<Comment>("comments").id(|c| c.id).build())
            .build()
            .unwrap();
        DocumentContext::new(model, UrlBuilderConfiguration::default()).unwrap()
    }

    fn article_key(id: &str) -> ResourceKey {
        ResourceKey::new("articles", id)
    }

    #[test]
    fn test_collection_meta_applies_to_every_resource() {
        let ctx = ctx();
        let articles = [Article { id: 1 }, Article { id: 2 }];
        let builder = ctx
            .new_document("http://localhost/articles")
            .resource_collection(&articles)
            .meta(json!({"seen": true}))
            .resource_end();
        for id in ["1", "2"] {
            let node = builder.tree().resource(&article_key(id)).unwrap();
            assert_eq!(Value::Object(node.meta.clone()), json!({"seen": true}));
        }
    }

    #[test]
    fn test_linkage() {
        let ctx = ctx();
        let comments = [Comment { id: 5 }, Comment { id: 12 }];
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&Article { id: 1 })
            .relationships()
            .relationship("author")
            .to_one_linkage(Some(&Person { id: 9 }))
            .meta(json!({"verified": true}))
            .relationship_end()
            .relationship("comments")
            .to_many_linkage(&comments)
            .to_many_linkage([&Comment { id: 12 }, &Comment { id: 13 }])
            .relationship_end()
            .relationships_end()
            .resource_end();

        let tree = builder.tree();
        assert!(tree.failure().is_none());
        let node = tree.resource(&article_key("1")).unwrap();
        assert_eq!(
            node.relationships["author"].linkage,
            Some(Linkage::ToOne(Some(ResourceIdentifier::new("people", "9"))))
        );
        let ids: Vec<_> = node.relationships["comments"]
            .linkage
            .as_ref()
            .unwrap()
            .identifiers()
            .iter()
            .map(|ri| ri.id.clone())
            .collect();
        assert_eq!(ids, ["5", "12", "13"]);
    }

    #[test]
    fn test_linkage_cardinality_and_target_checked() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&Article { id: 1 })
            .relationships()
            .relationship("author")
            .to_many_linkage([&Person { id: 9 }])
            .relationship_end()
            .relationships_end()
            .resource_end();
        assert!(matches!(
            builder.tree().failure(),
            Some(BuildError::CardinalityMismatch { .. })
        ));

        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&Article { id: 1 })
            .relationships()
            .relationship("author")
            .to_one_linkage(None::<&Comment>)
            .relationship_end()
            .relationships_end()
            .resource_end();
        assert!(matches!(
            builder.tree().failure(),
            Some(BuildError::TargetTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_relationship() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&Article { id: 1 })
            .relationships()
            .add_relationship("tags", &[keywords::SELF])
            .relationships_end()
            .resource_end();
        assert!(matches!(
            builder.tree().failure(),
            Some(BuildError::UnknownRelationship { .. })
        ));
    }

    #[test]
    fn test_add_relationship_rejects_other_keywords() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&Article { id: 1 })
            .relationships()
            .add_relationship("author", &[keywords::CANONICAL])
            .relationships_end()
            .resource_end();
        assert!(matches!(
            builder.tree().failure(),
            Some(BuildError::UnsupportedLink { .. })
        ));
    }

    #[test]
    fn test_identifier_meta() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/articles/1/relationships/comments")
            .resource_identifier_collection(&[Comment { id: 5 }, Comment { id: 12 }])
            .meta(json!({"read": false}))
            .resource_identifier_end();
        let PrimaryNode::Identifiers(ris) = builder.tree().primary() else {
            panic!("expected identifiers");
        };
        assert_eq!(ris.len(), 2);
        assert!(ris.iter().all(|ri| ri.meta.as_ref().unwrap()["read"] == false));
    }
}
