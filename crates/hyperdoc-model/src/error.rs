use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("resource type `{0}` is registered more than once")]
    DuplicateResourceType(String),

    #[error("Rust type `{0}` is registered for more than one resource type")]
    DuplicateRustType(&'static str),

    #[error("resource type `{0}` has no id accessor")]
    MissingIdAccessor(String),

    #[error("field `{field}` is declared more than once on `{resource_type}`")]
    DuplicateField { resource_type: String, field: String },

    #[error("field name `{field}` on `{resource_type}` is reserved")]
    ReservedField { resource_type: String, field: String },

    #[error(
        "relationship `{relationship}` of `{resource_type}` targets unregistered type `{target_type}`"
    )]
    UnknownRelationshipTarget {
        resource_type: String,
        relationship: String,
        target_type: String,
    },

    #[error("object is not a `{expected}` (resource type `{resource_type}`)")]
    TypeMismatch {
        resource_type: String,
        expected: &'static str,
    },

    #[error("failed to serialize attribute `{attribute}` of `{resource_type}`: {source}")]
    Attribute {
        resource_type: String,
        attribute: String,
        source: serde_json::Error,
    },

    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
