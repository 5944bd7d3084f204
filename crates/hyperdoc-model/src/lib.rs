#![doc = include_str!("../README.md")]

mod error;
mod hypermedia;
mod resource_type;
mod service_model;
mod urls;

pub use error::{ModelError, Result};
pub use hypermedia::{
    DefaultHypermediaAssembler, HypermediaAssembler, HypermediaAssemblerRegistry, LinkContext,
    LinkScope, RuleHypermediaAssembler,
};
pub use resource_type::{Cardinality, RelationshipDescriptor, ResourceType, ResourceTypeBuilder};
pub use service_model::{ServiceModel, ServiceModelBuilder};
pub use urls::{UrlBuilder, UrlBuilderConfiguration};
