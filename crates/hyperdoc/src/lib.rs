#![doc = include_str!("../README.md")]

mod query;
mod types;

pub mod v1 {
    //! Versioned public API for JSON:API document types and queries.
    //!
    //! Everything you need is re-exported from this module. Types are organized
    //! into three groups:
    //!
    //! # Documents
    //!
    //! - [`Document`] — the top-level document
    //! - [`PrimaryData`] — the `data` member: `null`, resource(s) or identifier(s)
    //! - [`DocumentKind`] — classification of a document by its top-level shape
    //! - [`JsonApi`] — the `jsonapi` member
    //!
    //! # Resources and relationships
    //!
    //! - [`Resource`] — a resource object
    //! - [`ResourceIdentifier`] — a `{type, id}` reference
    //! - [`Relationship`] — links, linkage and meta for one relationship
    //! - [`Linkage`] — to-one or to-many resource linkage
    //! - [`Link`], [`LinkObject`], [`Links`] — hypermedia links
    //! - [`keywords`] — link relation names
    //!
    //! # Errors
    //!
    //! - [`ErrorObject`], [`ErrorSource`] — members of the top-level `errors`
    //! - [`Violation`] — structural rules a document breaks (see [`query::violations`])
    //!
    //! # Example — a resource with a related author
    //!
    //! ```
    //! use hyperdoc::v1::*;
    //!
    //! let article = Resource::new("articles", "1")
    //!     .with_attribute("title", "JSON:API paints my bikeshed!")
    //!     .with_link(keywords::SELF, "http://example.com/articles/1")
    //!     .with_relationship(
    //!         "author",
    //!         Relationship::with_linkage(Linkage::ToOne(Some(
    //!             ResourceIdentifier::new("people", "9"),
    //!         ))),
    //!     );
    //!
    //! let doc = Document {
    //!     jsonapi: Some(JsonApi::v1_0()),
    //!     data: Some(PrimaryData::Resource(Box::new(article))),
    //!     included: vec![Resource::new("people", "9").with_attribute("firstName", "Dan")],
    //!     ..Default::default()
    //! };
    //!
    //! assert_eq!(doc.kind(), DocumentKind::Resource);
    //! assert!(query::violations(&doc).is_empty());
    //!
    //! let json = doc.to_json_pretty().unwrap();
    //! assert!(json.contains("\"people\""));
    //! ```

    /// Lookup and validation functions over a [`Document`].
    ///
    /// # Example — detect an included resource nothing links to
    ///
    /// ```
    /// use hyperdoc::v1::{Document, PrimaryData, Resource, Violation, query};
    ///
    /// let doc = Document {
    ///     data: Some(PrimaryData::Resource(Box::new(Resource::new("articles", "1")))),
    ///     included: vec![Resource::new("people", "9")],
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(
    ///     query::violations(&doc),
    ///     vec![Violation::UnlinkedInclusion { resource_type: "people".into(), id: "9".into() }]
    /// );
    /// ```
    pub mod query {
        pub use crate::query::{
            find_resource, included_types, primary_resources, related, violations,
        };
    }
    pub use crate::query::Violation;
    pub use crate::types::{
        Document, DocumentKind, ErrorObject, ErrorSource, JsonApi, Link, LinkObject, Linkage,
        Links, Meta, PrimaryData, Relationship, Resource, ResourceIdentifier, keywords,
    };
}
