use crate::tree::ResourceKey;
use hyperdoc_model::{Cardinality, ModelError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Why a document could not be built.
///
/// Builder calls do not return errors one by one: the first failure is
/// recorded in the tree, later calls become no-ops, and
/// [`write_document`](crate::DocumentBuilder::write_document) returns it.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid request URL `{url}`: {reason}")]
    InvalidRequestUrl { url: String, reason: String },

    #[error("`{0}` is not registered in the service model")]
    UnregisteredType(&'static str),

    #[error("resource type `{0}` is not registered in the service model")]
    UnknownResourceType(String),

    #[error("`{resource_type}` object has an empty id")]
    MissingId { resource_type: String },

    #[error("primary data is already set")]
    PrimaryDataAlreadySet,

    #[error("resource {0} must be in the document before related resources can be included")]
    SourceNotInDocument(ResourceKey),

    #[error("`{resource_type}` has no relationship `{relationship}`")]
    UnknownRelationship {
        resource_type: String,
        relationship: String,
    },

    #[error("relationship `{relationship}` of `{resource_type}` is {declared}, not {requested}")]
    CardinalityMismatch {
        resource_type: String,
        relationship: String,
        declared: Cardinality,
        requested: Cardinality,
    },

    #[error("relationship `{relationship}` of `{resource_type}` targets `{expected}`, got `{actual}`")]
    TargetTypeMismatch {
        resource_type: String,
        relationship: String,
        expected: String,
        actual: String,
    },

    #[error("`{rel}` links cannot be derived for {scope}")]
    UnsupportedLink { rel: String, scope: &'static str },

    #[error("meta must be a JSON object")]
    MetaNotObject,

    #[error("a document cannot contain both data and errors")]
    DataWithErrors,

    #[error("a document cannot contain included resources without primary data")]
    IncludedWithoutData,
}
