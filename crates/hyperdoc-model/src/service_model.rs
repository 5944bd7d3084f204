//! The registry of resource types a document can contain.

use crate::error::{ModelError, Result};
use crate::resource_type::ResourceType;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use tracing::debug;

/// Registry mapping Rust domain types to JSON:API resource types.
///
/// Built once through [`ServiceModel::builder`], which validates the whole
/// set: type names and Rust types are unique, every type has an id
/// accessor, and every relationship targets a registered type.
///
/// # Example
///
/// ```
/// use hyperdoc_model::{ResourceType, ServiceModel};
///
/// struct Article { id: u64 }
/// struct Person { id: u64 }
///
/// let model = ServiceModel::builder()
///     .resource_type(
///         ResourceType::builder::<Article>("articles")
///             .id(|a| a.id)
///             .to_one("author", "people")
///             .build(),
///     )
///     .resource_type(ResourceType::builder::<Person>("people").id(|p| p.id).build())
///     .build()
///     .unwrap();
///
/// assert_eq!(model.resource_type_of::<Article>().unwrap().name(), "articles");
/// assert!(model.resource_type("people").is_some());
/// ```
#[derive(Debug)]
pub struct ServiceModel {
    types: Vec<ResourceType>,
    by_name: HashMap<String, usize>,
    by_rust_type: HashMap<TypeId, usize>,
}

impl ServiceModel {
    pub fn builder() -> ServiceModelBuilder {
        ServiceModelBuilder::default()
    }

    /// Look up a resource type by its JSON:API type name.
    pub fn resource_type(&self, name: &str) -> Option<&ResourceType> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    /// Look up the resource type registered for the Rust type `T`.
    pub fn resource_type_of<T: Any>(&self) -> Option<&ResourceType> {
        self.by_rust_type
            .get(&TypeId::of::<T>())
            .map(|&i| &self.types[i])
    }

    /// Look up the resource type registered for the concrete type of `object`.
    pub fn resource_type_for(&self, object: &dyn Any) -> Option<&ResourceType> {
        self.by_rust_type
            .get(&object.type_id())
            .map(|&i| &self.types[i])
    }

    /// All registered resource types, in registration order.
    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.types.iter()
    }
}

/// Builder for a [`ServiceModel`].
#[derive(Default)]
pub struct ServiceModelBuilder {
    types: Vec<ResourceType>,
}

impl ServiceModelBuilder {
    /// Register a resource type.
    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.types.push(resource_type);
        self
    }

    /// Validate and freeze the registry.
    pub fn build(self) -> Result<ServiceModel> {
        let mut by_name = HashMap::new();
        let mut by_rust_type = HashMap::new();

        for (i, rt) in self.types.iter().enumerate() {
            rt.check()?;
            if by_name.insert(rt.name().to_string(), i).is_some() {
                return Err(ModelError::DuplicateResourceType(rt.name().to_string()));
            }
            if by_rust_type.insert(rt.rust_type(), i).is_some() {
                return Err(ModelError::DuplicateRustType(rt.rust_type_name()));
            }
        }

        for rt in &self.types {
            for rel in rt.relationships() {
                if !by_name.contains_key(&rel.target_type) {
                    return Err(ModelError::UnknownRelationshipTarget {
                        resource_type: rt.name().to_string(),
                        relationship: rel.name.clone(),
                        target_type: rel.target_type.clone(),
                    });
                }
            }
        }

        debug!(resource_types = self.types.len(), "service model built");
        Ok(ServiceModel {
            types: self.types,
            by_name,
            by_rust_type,
        })
    }
}
