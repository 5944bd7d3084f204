#![doc = include_str!("../README.md")]

mod builder;
mod context;
mod error;
mod included;
mod links;
mod path;
mod resource;
mod tree;
mod writer;

pub use builder::{DocumentBuilder, ErrorsBuilder, TreeAccess};
pub use context::{ContextConfig, DocumentContext, HypermediaConfig, PathMode};
pub use error::{BuildError, Result};
pub use hyperdoc::v1::keywords;
pub use included::{IncludeBuilder, IncludedBuilder};
pub use links::LinksBuilder;
pub use path::RequestPath;
pub use resource::{
    RelationshipBuilder, RelationshipsBuilder, ResourceBuilder, ResourceIdentifierBuilder,
};
pub use tree::{
    DocumentTree, LinkNode, LinkSet, PrimaryNode, RelationshipNode, ResourceKey, ResourceNode,
};
pub use writer::DocumentWriter;
