use crate::builder::{
    DocumentBuilder, apply, declared_relationship, delegate_tree_access, key_of,
    merge_meta, resource_type_of, snapshot, to_meta,
};
use crate::context::DocumentContext;
use crate::error::{BuildError, Result};
use crate::links::{LinkTarget, LinksBuilder};
use crate::resource::RelationshipsBuilder;
use crate::tree::{DocumentTree, ResourceKey, ResourceNode};
use hyperdoc::v1::Linkage;
use hyperdoc_model::Cardinality;
use serde::Serialize;
use std::any::Any;

/// Builder for the `included` member.
///
/// The `include_to_*` methods also record linkage on the source
/// resource, which must already be in the document.
#[derive(Debug)]
pub struct IncludedBuilder<'c> {
    parent: DocumentBuilder<'c>,
}

delegate_tree_access!([] IncludedBuilder<'_>);

impl<'c> IncludedBuilder<'c> {
    pub(crate) fn new(parent: DocumentBuilder<'c>) -> Self {
        Self { parent }
    }

    /// Include `object` without linking it from anything.
    pub fn include<T: Any>(mut self, object: &T) -> IncludeBuilder<'c> {
        let keys = apply(&mut self, |ctx, tree| {
            let node = snapshot(ctx, object)?;
            Ok(add_included(tree, vec![node]))
        });
        IncludeBuilder { parent: self, keys }
    }

    /// Include `to` as the to-one relationship `relationship` of `from`.
    pub fn include_to_one<F, T>(mut self, from: &F, relationship: &str, to: &T) -> IncludeBuilder<'c>
    where
        F: Any,
        T: Any,
    {
        let keys = apply(&mut self, |ctx, tree| {
            let node = snapshot(ctx, to)?;
            let linkage = Linkage::ToOne(Some(node.key.identifier()));
            let target_type = Some(node.key.resource_type.as_str());
            link_source(ctx, tree, from, relationship, Cardinality::ToOne, target_type, linkage)?;
            Ok(add_included(tree, vec![node]))
        });
        IncludeBuilder { parent: self, keys }
    }

    /// Include `targets` as members of the to-many relationship
    /// `relationship` of `from`.
    pub fn include_to_many<'a, F, T, I>(
        mut self,
        from: &F,
        relationship: &str,
        targets: I,
    ) -> IncludeBuilder<'c>
    where
        F: Any,
        T: Any,
        I: IntoIterator<Item = &'a T>,
    {
        let keys = apply(&mut self, |ctx, tree| {
            let nodes = targets
                .into_iter()
                .map(|t| snapshot(ctx, t))
                .collect::<Result<Vec<_>>>()?;
            let target_type = Some(resource_type_of::<T>(ctx)?.name());
            let linkage = Linkage::ToMany(nodes.iter().map(|n| n.key.identifier()).collect());
            link_source(ctx, tree, from, relationship, Cardinality::ToMany, target_type, linkage)?;
            Ok(add_included(tree, nodes))
        });
        IncludeBuilder { parent: self, keys }
    }

    /// Record `"data": null` for the to-one relationship, replacing any
    /// earlier linkage.
    pub fn include_to_one_empty<F: Any>(mut self, from: &F, relationship: &str) -> Self {
        apply(&mut self, |ctx, tree| {
            link_source(ctx, tree, from, relationship, Cardinality::ToOne, None, Linkage::ToOne(None))
        });
        self
    }

    /// Record `"data": []` for the to-many relationship unless it already
    /// has members.
    pub fn include_to_many_empty<F: Any>(mut self, from: &F, relationship: &str) -> Self {
        apply(&mut self, |ctx, tree| {
            link_source(ctx, tree, from, relationship, Cardinality::ToMany, None, Linkage::ToMany(Vec::new()))
        });
        self
    }

    pub fn included_end(self) -> DocumentBuilder<'c> {
        self.parent
    }
}

fn add_included(tree: &mut DocumentTree, nodes: Vec<ResourceNode>) -> Vec<ResourceKey> {
    let mut keys: Vec<ResourceKey> = Vec::new();
    for node in nodes {
        let key = node.key.clone();
        tree.upsert(node);
        tree.include(key.clone());
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Validate `from.relationship` and record `linkage` on it.
fn link_source<F: Any>(
    ctx: &DocumentContext,
    tree: &mut DocumentTree,
    from: &F,
    relationship: &str,
    cardinality: Cardinality,
    target_type: Option<&str>,
    linkage: Linkage,
) -> Result<()> {
    let source = key_of(ctx, from)?;
    if !tree.contains(&source) {
        return Err(BuildError::SourceNotInDocument(source));
    }
    declared_relationship(
        ctx,
        &source,
        relationship,
        Some(cardinality),
        target_type,
    )?;
    if let Some(node) = tree.resource_mut(&source) {
        node.relationship_mut(relationship).set_linkage(linkage);
    }
    Ok(())
}

// ============================================================================
// IncludeBuilder
// ============================================================================

/// Builder scoped to the resources added by one include call.
#[derive(Debug)]
pub struct IncludeBuilder<'c> {
    parent: IncludedBuilder<'c>,
    keys: Vec<ResourceKey>,
}

delegate_tree_access!([] IncludeBuilder<'_>);

impl<'c> IncludeBuilder<'c> {
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

    pub fn include_end(self) -> IncludedBuilder<'c> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::PrimaryNode;
    use hyperdoc_model::{ResourceType, ServiceModel, UrlBuilderConfiguration};
    use serde_json::{Value, json};

    struct Article {
        id: u64,
    }
    struct Person {
        id: u64,
        name: &'static str,
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
            .resource_type(
                ResourceType::builder::<Person>("people")
                    .id(|p| p.id)
                    .attribute("name", |p| p.name)
                    .build(),
            )
            .resource_type(
                ResourceType::builder::<Comment>("comments")
                    .id(|c| c.id)
                    .to_one("author", "people")
                    .build(),
            )
            .build()
            .unwrap();
        DocumentContext::new(model, UrlBuilderConfiguration::default()).unwrap()
    }

    fn dan() -> Person {
        Person { id: 9, name: "Dan" }
    }

    #[test]
    fn test_include_to_one_links_and_dedups() {
        let ctx = ctx();
        let article = Article { id: 1 };
        let comment = Comment { id: 5 };
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&article)
            .resource_end()
            .included()
            .include_to_one(&article, "author", &dan())
            .include_end()
            .include_to_many(&article, "comments", [&comment])
            .include_end()
            .include_to_one(&comment, "author", &Person { id: 9, name: "Daniel" })
            .meta(json!({"role": "author"}))
            .include_end()
            .included_end();

        let tree = builder.tree();
        assert!(tree.failure().is_none());
        assert_eq!(
            tree.included(),
            [ResourceKey::new("people", "9"), ResourceKey::new("comments", "5")]
        );
        let dan = tree.resource(&ResourceKey::new("people", "9")).unwrap();
        assert_eq!(dan.attributes["name"], "Daniel");
        assert_eq!(Value::Object(dan.meta.clone()), json!({"role": "author"}));

        let article = tree.resource(&ResourceKey::new("articles", "1")).unwrap();
        assert_eq!(
            article.relationships["author"].linkage,
            Some(Linkage::ToOne(Some(ResourceKey::new("people", "9").identifier())))
        );
        let comment = tree.resource(&ResourceKey::new("comments", "5")).unwrap();
        assert!(comment.relationships["author"].linkage.is_some());
    }

    #[test]
    fn test_source_must_be_in_document() {
        let ctx = ctx();
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&Article { id: 1 })
            .resource_end()
            .included()
            .include_to_one(&Article { id: 2 }, "author", &dan())
            .include_end()
            .included_end();
        let err = builder.write_document().unwrap_err();
        assert_eq!(
            err.to_string(),
            "resource articles/2 must be in the document before related resources can be included"
        );
    }

    #[test]
    fn test_include_target_type_checked() {
        let ctx = ctx();
        let article = Article { id: 1 };
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&article)
            .resource_end()
            .included()
            .include_to_many(&article, "comments", [&dan()])
            .include_end()
            .included_end();
        assert!(matches!(
            builder.tree().failure(),
            Some(BuildError::TargetTypeMismatch { .. })
        ));
        assert!(builder.tree().included().is_empty());
    }

    #[test]
    fn test_empty_includes() {
        let ctx = ctx();
        let article = Article { id: 1 };
        let comment = Comment { id: 5 };
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&article)
            .resource_end()
            .included()
            .include_to_many(&article, "comments", [&comment])
            .include_end()
            .include_to_many_empty(&article, "comments")
            .include_to_one(&article, "author", &dan())
            .include_end()
            .include_to_one_empty(&article, "author")
            .included_end();

        let tree = builder.tree();
        assert!(tree.failure().is_none());
        let node = tree.resource(&ResourceKey::new("articles", "1")).unwrap();
        assert_eq!(node.relationships["comments"].linkage.as_ref().unwrap().identifiers().len(), 1);
        assert_eq!(node.relationships["author"].linkage, Some(Linkage::ToOne(None)));
        // dan stays included even though the linkage was reset
        assert_eq!(tree.included().len(), 2);
    }

    #[test]
    fn test_empty_include_checks_cardinality() {
        let ctx = ctx();
        let article = Article { id: 1 };
        let builder = ctx
            .new_document("http://localhost/articles/1")
            .resource(&article)
            .resource_end()
            .included()
            .include_to_one_empty(&article, "comments")
            .included_end();
        assert!(matches!(
            builder.tree().failure(),
            Some(BuildError::CardinalityMismatch { .. })
        ));
    }

    #[test]
    fn test_primary_resource_included_again() {
        let ctx = ctx();
        let comment = Comment { id: 5 };
        let builder = ctx
            .new_document("http://localhost/comments/5")
            .resource(&comment)
            .resource_end()
            .included()
            .include(&comment)
            .include_end()
            .included_end();
        let tree = builder.tree();
        assert_eq!(tree.primary(), &PrimaryNode::Resource(ResourceKey::new("comments", "5")));
        assert_eq!(tree.included().len(), 1);
    }
}
