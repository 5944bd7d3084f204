use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Free-form meta information (`"meta": { … }`).
pub type Meta = Map<String, Value>;

/// A links object keyed by link relation name.
pub type Links = BTreeMap<String, Link>;

/// Link relation names that carry meaning in JSON:API documents.
pub mod keywords {
    /// The link that generated the current document or identifies a resource.
    pub const SELF: &str = "self";
    /// A related resource link on a relationship.
    pub const RELATED: &str = "related";
    /// The parent of the current request path.
    pub const UP: &str = "up";
    /// The canonical location of a resource, independent of the request path.
    pub const CANONICAL: &str = "canonical";
    /// Further details about an error occurrence.
    pub const ABOUT: &str = "about";
}

/// A JSON:API document.
///
/// Every member is optional; absent members are omitted when serialized.
/// `data` distinguishes an absent member (`None`) from an explicit `null`
/// (`Some(PrimaryData::Null)`), which JSON:API treats differently.
///
/// # JSON shape
///
/// ```json
/// {
///   "jsonapi": { "version": "1.0" },
///   "links": { "self": "http://api.example.com/articles/1" },
///   "data": {
///     "type": "articles",
///     "id": "1",
///     "attributes": { "title": "JSON:API paints my bikeshed!" },
///     "relationships": {
///       "author": { "data": { "type": "people", "id": "9" } }
///     }
///   },
///   "included": [
///     { "type": "people", "id": "9", "attributes": { "name": "Dan" } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApi>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
}

/// The `jsonapi` member describing the server implementation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonApi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Which shape a document's top level takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// No `data` and no `errors` (typically meta-only).
    Empty,
    /// `"data": null`: a single resource that does not exist.
    NullResource,
    Resource,
    ResourceCollection,
    ResourceIdentifier,
    ResourceIdentifierCollection,
    Errors,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentKind::Empty => "empty",
            DocumentKind::NullResource => "null-resource",
            DocumentKind::Resource => "resource",
            DocumentKind::ResourceCollection => "resource-collection",
            DocumentKind::ResourceIdentifier => "resource-identifier",
            DocumentKind::ResourceIdentifierCollection => "resource-identifier-collection",
            DocumentKind::Errors => "errors",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Primary data
// ============================================================================

/// The top-level `data` member.
///
/// Serialized untagged. Deserialization classifies by shape: objects that
/// carry `attributes`, `relationships` or `links` (or have no `id`) are
/// resources, the rest are resource identifiers. An empty array is read as
/// an empty resource collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Null,
    Resource(Box<Resource>),
    Resources(Vec<Resource>),
    Identifier(ResourceIdentifier),
    Identifiers(Vec<ResourceIdentifier>),
}

const RESOURCE_ONLY_MEMBERS: [&str; 3] = ["attributes", "relationships", "links"];

fn has_identifier_shape(value: &Value) -> bool {
    value.as_object().is_some_and(|obj| {
        obj.contains_key("id") && !RESOURCE_ONLY_MEMBERS.iter().any(|m| obj.contains_key(*m))
    })
}

impl<'de> Deserialize<'de> for PrimaryData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Null => Ok(PrimaryData::Null),
            Value::Array(items) => {
                if !items.is_empty() && items.iter().all(has_identifier_shape) {
                    items
                        .into_iter()
                        .map(serde_json::from_value)
                        .collect::<Result<Vec<ResourceIdentifier>, _>>()
                        .map(PrimaryData::Identifiers)
                        .map_err(de::Error::custom)
                } else {
                    items
                        .into_iter()
                        .map(serde_json::from_value)
                        .collect::<Result<Vec<Resource>, _>>()
                        .map(PrimaryData::Resources)
                        .map_err(de::Error::custom)
                }
            }
            Value::Object(_) if has_identifier_shape(&value) => serde_json::from_value(value)
                .map(PrimaryData::Identifier)
                .map_err(de::Error::custom),
            Value::Object(_) => serde_json::from_value(value)
                .map(|r| PrimaryData::Resource(Box::new(r)))
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "primary data must be null, an object or an array, found {other}"
            ))),
        }
    }
}

/// Deserialize a member that is present in the input, keeping an explicit
/// `null` as `Some(..)` rather than collapsing it into `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ============================================================================
// Resources
// ============================================================================

/// A resource object.
///
/// `id` is optional only for resources created by a client; documents built
/// by a server always carry one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<BTreeMap<String, Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// A `{ "type", "id" }` pair referencing a resource without embedding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// A relationship object. At least one member should be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Linkage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Resource linkage in a relationship's `data` member.
///
/// `ToOne(None)` serializes as `null`, `ToMany(vec![])` as `[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linkage {
    ToOne(Option<ResourceIdentifier>),
    ToMany(Vec<ResourceIdentifier>),
}

impl Linkage {
    /// Identifiers referenced by this linkage, in order.
    pub fn identifiers(&self) -> Vec<&ResourceIdentifier> {
        match self {
            Linkage::ToOne(one) => one.iter().collect(),
            Linkage::ToMany(many) => many.iter().collect(),
        }
    }
}

// ============================================================================
// Links
// ============================================================================

/// A link: either a bare URL string or a link object with meta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Link {
    Href(String),
    Object(LinkObject),
}

/// Link object form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkObject {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

// ============================================================================
// Errors
// ============================================================================

/// An error object in the top-level `errors` member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
    /// HTTP status code, as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Application-specific error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Where in the request an error originated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    /// JSON Pointer into the request document (e.g. `/data/attributes/title`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// Query parameter that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

// ============================================================================
// Convenience methods
// ============================================================================

impl Document {
    /// Parse a JSON:API document from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// An errors document holding the given error objects.
    pub fn from_errors(errors: impl IntoIterator<Item = ErrorObject>) -> Self {
        Self {
            errors: errors.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Classify the document by its top-level shape. Errors take precedence
    /// over data when both are (invalidly) present.
    pub fn kind(&self) -> DocumentKind {
        if !self.errors.is_empty() {
            return DocumentKind::Errors;
        }
        match &self.data {
            None => DocumentKind::Empty,
            Some(PrimaryData::Null) => DocumentKind::NullResource,
            Some(PrimaryData::Resource(_)) => DocumentKind::Resource,
            Some(PrimaryData::Resources(_)) => DocumentKind::ResourceCollection,
            Some(PrimaryData::Identifier(_)) => DocumentKind::ResourceIdentifier,
            Some(PrimaryData::Identifiers(_)) => DocumentKind::ResourceIdentifierCollection,
        }
    }
}

impl JsonApi {
    /// `{ "version": "1.0" }`
    pub fn v1_0() -> Self {
        Self {
            version: Some("1.0".to_string()),
            meta: None,
        }
    }

    /// `{ "version": "1.1" }`
    pub fn v1_1() -> Self {
        Self {
            version: Some("1.1".to_string()),
            meta: None,
        }
    }
}

impl Resource {
    /// Create a resource with no members beyond `type` and `id`
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: Some(id.into()),
            attributes: None,
            relationships: None,
            links: None,
            meta: None,
        }
    }

    /// The identifier of this resource, if it has an id.
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.resource_type.clone(), id.clone()))
    }

    /// Set an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Add or replace a relationship
    pub fn with_relationship(mut self, name: impl Into<String>, rel: Relationship) -> Self {
        self.relationships
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), rel);
        self
    }

    /// Add or replace a link
    pub fn with_link(mut self, rel: impl Into<String>, link: impl Into<Link>) -> Self {
        self.links
            .get_or_insert_with(BTreeMap::new)
            .insert(rel.into(), link.into());
        self
    }

    /// Set a meta entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Relationship by name
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.as_ref().and_then(|r| r.get(name))
    }
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            meta: None,
        }
    }

    /// Set a meta entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Whether this identifier refers to the given resource.
    pub fn refers_to(&self, resource: &Resource) -> bool {
        self.resource_type == resource.resource_type && resource.id.as_deref() == Some(&self.id)
    }
}

impl Relationship {
    /// A relationship carrying only linkage
    pub fn with_linkage(linkage: Linkage) -> Self {
        Self {
            data: Some(linkage),
            ..Default::default()
        }
    }

    /// `true` when no member is present, which JSON:API does not allow.
    pub fn is_empty(&self) -> bool {
        self.links.is_none() && self.data.is_none() && self.meta.is_none()
    }
}

impl Link {
    /// The URL of the link regardless of form
    pub fn href(&self) -> &str {
        match self {
            Link::Href(href) => href,
            Link::Object(obj) => &obj.href,
        }
    }

    /// Link object form with meta attached.
    pub fn with_meta(href: impl Into<String>, meta: Meta) -> Self {
        Link::Object(LinkObject {
            href: href.into(),
            meta: Some(meta),
        })
    }
}

impl From<String> for Link {
    fn from(href: String) -> Self {
        Link::Href(href)
    }
}

impl From<&str> for Link {
    fn from(href: &str) -> Self {
        Link::Href(href.to_string())
    }
}

impl ErrorObject {
    /// Create an empty error object; populate it with the `with_*` methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error object from a Rust error. The display text becomes
    /// `detail`; the source chain, if any, is listed under `meta.causes`.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(Value::String(cause.to_string()));
            source = cause.source();
        }
        let mut error = Self::new().with_detail(err.to_string());
        if !causes.is_empty() {
            error = error.with_meta("causes", Value::Array(causes));
        }
        error
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Point at the offending member of the request document
    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).pointer = Some(pointer.into());
        self
    }

    /// Name the offending query parameter
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source.get_or_insert_with(ErrorSource::default).parameter = Some(parameter.into());
        self
    }

    /// Set the `about` link
    pub fn with_about_link(mut self, href: impl Into<String>) -> Self {
        self.links
            .get_or_insert_with(BTreeMap::new)
            .insert(keywords::ABOUT.to_string(), Link::Href(href.into()));
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}
