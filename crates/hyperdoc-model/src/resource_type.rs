//! Mapping of a Rust domain type onto a JSON:API resource type.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

type IdAccessor = Box<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;
type AttributeAccessor = Box<dyn Fn(&dyn Any) -> Option<serde_json::Result<Value>> + Send + Sync>;

/// Whether a relationship links to a single resource or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    ToOne,
    ToMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::ToOne => write!(f, "to-one"),
            Cardinality::ToMany => write!(f, "to-many"),
        }
    }
}

/// A relationship declared on a resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    pub name: String,
    pub cardinality: Cardinality,
    /// JSON:API type name of the related resources.
    pub target_type: String,
}

struct AttributeDescriptor {
    name: String,
    accessor: AttributeAccessor,
}

/// How one Rust type appears in a JSON:API document: its type name, how to
/// read its id and attributes, and which relationships it declares.
///
/// Accessors are stored type-erased so a [`ServiceModel`](crate::ServiceModel)
/// can hold resource types for many Rust types at once.
///
/// # Example
///
/// ```
/// use hyperdoc_model::{Cardinality, ResourceType};
///
/// struct Article { id: u64, title: String }
///
/// let articles = ResourceType::builder::<Article>("articles")
///     .id(|a| a.id)
///     .attribute("title", |a| a.title.clone())
///     .to_one("author", "people")
///     .to_many("comments", "comments")
///     .build();
///
/// let article = Article { id: 1, title: "JSON:API paints my bikeshed!".into() };
/// assert_eq!(articles.id_of(&article).as_deref(), Some("1"));
/// assert_eq!(articles.attributes_of(&article).unwrap()["title"], "JSON:API paints my bikeshed!");
/// assert_eq!(articles.relationship("comments").unwrap().cardinality, Cardinality::ToMany);
/// ```
pub struct ResourceType {
    name: String,
    rust_type: TypeId,
    rust_type_name: &'static str,
    id: Option<IdAccessor>,
    attributes: Vec<AttributeDescriptor>,
    relationships: Vec<RelationshipDescriptor>,
}

impl ResourceType {
    /// Start describing how `T` maps onto the resource type `name`.
    pub fn builder<T: Any>(name: impl Into<String>) -> ResourceTypeBuilder<T> {
        ResourceTypeBuilder {
            inner: ResourceType {
                name: name.into(),
                rust_type: TypeId::of::<T>(),
                rust_type_name: std::any::type_name::<T>(),
                id: None,
                attributes: Vec::new(),
                relationships: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// JSON:API type name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rust_type(&self) -> TypeId {
        self.rust_type
    }

    pub fn rust_type_name(&self) -> &'static str {
        self.rust_type_name
    }

    pub fn has_id_accessor(&self) -> bool {
        self.id.is_some()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|a| a.name.as_str())
    }

    pub fn relationships(&self) -> &[RelationshipDescriptor] {
        &self.relationships
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Whether `object` is an instance of the Rust type this resource type describes.
    pub fn describes(&self, object: &dyn Any) -> bool {
        object.type_id() == self.rust_type
    }

    /// Read the id of `object`. `None` when `object` is of another Rust
    /// type or no id accessor was declared.
    pub fn id_of(&self, object: &dyn Any) -> Option<String> {
        self.id.as_ref().and_then(|accessor| accessor(object))
    }

    /// Read every declared attribute of `object`.
    pub fn attributes_of(&self, object: &dyn Any) -> Result<Map<String, Value>> {
        if !self.describes(object) {
            return Err(self.mismatch());
        }
        let mut attributes = Map::new();
        for attr in &self.attributes {
            let value = (attr.accessor)(object)
                .ok_or_else(|| self.mismatch())?
                .map_err(|source| ModelError::Attribute {
                    resource_type: self.name.clone(),
                    attribute: attr.name.clone(),
                    source,
                })?;
            attributes.insert(attr.name.clone(), value);
        }
        Ok(attributes)
    }

    fn mismatch(&self) -> ModelError {
        ModelError::TypeMismatch {
            resource_type: self.name.clone(),
            expected: self.rust_type_name,
        }
    }

    /// Structural checks that only need this type: an id accessor exists and
    /// field names are unique and not reserved.
    pub(crate) fn check(&self) -> Result<()> {
        if self.id.is_none() {
            return Err(ModelError::MissingIdAccessor(self.name.clone()));
        }
        let mut seen = std::collections::HashSet::new();
        let fields = self
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.relationships.iter().map(|r| r.name.as_str()));
        for field in fields {
            if field == "id" || field == "type" {
                return Err(ModelError::ReservedField {
                    resource_type: self.name.clone(),
                    field: field.to_string(),
                });
            }
            if !seen.insert(field) {
                return Err(ModelError::DuplicateField {
                    resource_type: self.name.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceType")
            .field("name", &self.name)
            .field("rust_type", &self.rust_type_name)
            .field("attributes", &self.attribute_names().collect::<Vec<_>>())
            .field("relationships", &self.relationships)
            .finish()
    }
}

/// Builder for a [`ResourceType`] describing the Rust type `T`.
pub struct ResourceTypeBuilder<T> {
    inner: ResourceType,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any> ResourceTypeBuilder<T> {
    /// Declare how to read the resource id. Any `ToString` value works;
    /// ids are always strings on the wire.
    pub fn id<F, I>(mut self, accessor: F) -> Self
    where
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: ToString,
    {
        self.inner.id = Some(Box::new(move |object: &dyn Any| {
            object.downcast_ref::<T>().map(|t| accessor(t).to_string())
        }));
        self
    }

    /// Declare an attribute and how to read it.
    pub fn attribute<F, V>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Serialize,
    {
        self.inner.attributes.push(AttributeDescriptor {
            name: name.into(),
            accessor: Box::new(move |object: &dyn Any| {
                object
                    .downcast_ref::<T>()
                    .map(|t| serde_json::to_value(accessor(t)))
            }),
        });
        self
    }

    /// Declare a to-one relationship to resources of `target_type`.
    pub fn to_one(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(name, Cardinality::ToOne, target_type)
    }

    /// Declare a to-many relationship to resources of `target_type`.
    pub fn to_many(self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.relationship(name, Cardinality::ToMany, target_type)
    }

    fn relationship(
        mut self,
        name: impl Into<String>,
        cardinality: Cardinality,
        target_type: impl Into<String>,
    ) -> Self {
        self.inner.relationships.push(RelationshipDescriptor {
            name: name.into(),
            cardinality,
            target_type: target_type.into(),
        });
        self
    }

    pub fn build(self) -> ResourceType {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Person {
        id: u32,
        first_name: String,
        twitter: Option<String>,
    }

    struct Tag;

    fn people() -> ResourceType {
        ResourceType::builder::<Person>("people")
            .id(|p| p.id)
            .attribute("firstName", |p| p.first_name.clone())
            .attribute("twitter", |p| p.twitter.clone())
            .to_many("articles", "articles")
            .build()
    }

    fn dan() -> Person {
        Person {
            id: 9,
            first_name: "Dan".into(),
            twitter: None,
        }
    }

    #[test]
    fn test_id_and_attributes() {
        let rt = people();
        assert_eq!(rt.id_of(&dan()), Some("9".to_string()));
        let attrs = rt.attributes_of(&dan()).unwrap();
        assert_eq!(Value::Object(attrs), json!({"firstName": "Dan", "twitter": null}));
    }

    #[test]
    fn test_other_type_is_rejected() {
        let rt = people();
        assert!(rt.id_of(&Tag).is_none());
        assert!(!rt.describes(&Tag));
        let err = rt.attributes_of(&Tag).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));
    }

    #[test]
    fn test_relationship_lookup() {
        let rt = people();
        let rel = rt.relationship("articles").unwrap();
        assert_eq!(rel.cardinality, Cardinality::ToMany);
        assert_eq!(rel.target_type, "articles");
        assert!(rt.relationship("author").is_none());
    }

    #[test]
    fn test_attribute_serialization_error() {
        struct Broken;
        struct Opaque;
        impl Serialize for Opaque {
            fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("opaque"))
            }
        }
        let rt = ResourceType::builder::<Broken>("broken")
            .id(|_| "1")
            .attribute("secret", |_| Opaque)
            .build();
        let err = rt.attributes_of(&Broken).unwrap_err();
        assert!(matches!(err, ModelError::Attribute { ref attribute, .. } if attribute == "secret"));
    }

    #[test]
    fn test_check_rejects_reserved_and_duplicate_fields() {
        let rt = ResourceType::builder::<Person>("people")
            .id(|p| p.id)
            .attribute("type", |p| p.id)
            .build();
        assert!(matches!(rt.check(), Err(ModelError::ReservedField { .. })));

        let rt = ResourceType::builder::<Person>("people")
            .id(|p| p.id)
            .attribute("articles", |p| p.id)
            .to_many("articles", "articles")
            .build();
        assert!(matches!(rt.check(), Err(ModelError::DuplicateField { .. })));

        let rt = ResourceType::builder::<Person>("people").build();
        assert!(matches!(rt.check(), Err(ModelError::MissingIdAccessor(_))));

        assert!(people().check().is_ok());
    }

    #[test]
    fn test_debug_lists_fields() {
        let debug = format!("{:?}", people());
        assert!(debug.contains("firstName"));
        assert!(debug.contains("people"));
    }

    #[test]
    fn test_cardinality_display() {
        assert_eq!(Cardinality::ToOne.to_string(), "to-one");
        assert_eq!(Cardinality::ToMany.to_string(), "to-many");
    }
}
