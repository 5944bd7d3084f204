//! Lookup and structural validation operations for JSON:API documents.

use crate::types::{Document, PrimaryData, Resource};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// A structural rule of the JSON:API specification that a document breaks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("document contains both data and errors")]
    DataWithErrors,

    #[error("document contains included resources but no primary data")]
    IncludedWithoutData,

    #[error("document contains none of data, errors or meta")]
    MissingTopLevel,

    #[error("resource {resource_type}/{id} appears more than once")]
    DuplicateResource { resource_type: String, id: String },

    #[error("included resource {resource_type}/{id} is not reachable from primary data")]
    UnlinkedInclusion { resource_type: String, id: String },
}

/// Primary data resources, in document order. Identifiers and `null` yield
/// nothing.
///
/// # Examples
///
/// ```
/// use hyperdoc::v1::{Document, query};
///
/// let doc = Document::from_json(
///     r#"{"data":[{"type":"articles","id":"1","attributes":{}},
///                 {"type":"articles","id":"2","attributes":{}}]}"#,
/// ).unwrap();
/// let ids: Vec<_> = query::primary_resources(&doc)
///     .iter()
///     .filter_map(|r| r.id.as_deref())
///     .collect();
/// assert_eq!(ids, ["1", "2"]);
/// ```
pub fn primary_resources(doc: &Document) -> Vec<&Resource> {
    match &doc.data {
        Some(PrimaryData::Resource(r)) => vec![r.as_ref()],
        Some(PrimaryData::Resources(rs)) => rs.iter().collect(),
        _ => Vec::new(),
    }
}

/// Find a resource by type and id among primary data and included resources.
pub fn find_resource<'a>(doc: &'a Document, resource_type: &str, id: &str) -> Option<&'a Resource> {
    primary_resources(doc)
        .into_iter()
        .chain(doc.included.iter())
        .find(|r| r.resource_type == resource_type && r.id.as_deref() == Some(id))
}

/// Resolve a relationship's linkage to the resources present in the document.
///
/// Identifiers that point at resources not embedded in the document are
/// skipped, so the result may be shorter than the linkage.
///
/// # Examples
///
/// ```
/// use hyperdoc::v1::{Document, query};
///
/// let doc = Document::from_json(r#"{
///   "data": {
///     "type": "articles", "id": "1",
///     "relationships": { "author": { "data": { "type": "people", "id": "9" } } }
///   },
///   "included": [ { "type": "people", "id": "9", "attributes": { "name": "Dan" } } ]
/// }"#).unwrap();
///
/// let authors = query::related(&doc, "articles", "1", "author");
/// assert_eq!(authors.len(), 1);
/// assert_eq!(authors[0].id.as_deref(), Some("9"));
/// ```
pub fn related<'a>(
    doc: &'a Document,
    resource_type: &str,
    id: &str,
    relationship: &str,
) -> Vec<&'a Resource> {
    let Some(linkage) = find_resource(doc, resource_type, id)
        .and_then(|r| r.relationship(relationship))
        .and_then(|rel| rel.data.as_ref())
    else {
        return Vec::new();
    };

    linkage
        .identifiers()
        .into_iter()
        .filter_map(|ident| find_resource(doc, &ident.resource_type, &ident.id))
        .collect()
}

/// Count included resources per type.
pub fn included_types(doc: &Document) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for resource in &doc.included {
        *counts.entry(resource.resource_type.clone()).or_insert(0) += 1;
    }
    counts
}

/// Check the document against the top-level structural rules and full
/// linkage. An empty result means the document is well formed.
pub fn violations(doc: &Document) -> Vec<Violation> {
    let mut found = Vec::new();

    if doc.data.is_some() && !doc.errors.is_empty() {
        found.push(Violation::DataWithErrors);
    }
    if doc.data.is_none() && !doc.included.is_empty() {
        found.push(Violation::IncludedWithoutData);
    }
    if doc.data.is_none() && doc.errors.is_empty() && doc.meta.is_none() {
        found.push(Violation::MissingTopLevel);
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for resource in primary_resources(doc).into_iter().chain(doc.included.iter()) {
        let Some(id) = resource.id.as_deref() else {
            continue;
        };
        let key = (resource.resource_type.as_str(), id);
        if !seen.insert(key) && reported.insert(key) {
            found.push(Violation::DuplicateResource {
                resource_type: key.0.to_string(),
                id: key.1.to_string(),
            });
        }
    }

    found.extend(unlinked_inclusions(doc));
    found
}

/// Included resources not reachable from primary data by following
/// relationship linkage, breadth first through other included resources.
fn unlinked_inclusions(doc: &Document) -> Vec<Violation> {
    let included: HashMap<(&str, &str), &Resource> = doc
        .included
        .iter()
        .filter_map(|r| Some(((r.resource_type.as_str(), r.id.as_deref()?), r)))
        .collect();

    let mut reached: HashSet<(&str, &str)> = HashSet::new();
    let mut queue: VecDeque<&Resource> = primary_resources(doc).into_iter().collect();

    while let Some(resource) = queue.pop_front() {
        let Some(relationships) = &resource.relationships else {
            continue;
        };
        for rel in relationships.values() {
            let Some(linkage) = &rel.data else {
                continue;
            };
            for ident in linkage.identifiers() {
                let key = (ident.resource_type.as_str(), ident.id.as_str());
                if let Some(target) = included.get(&key)
                    && reached.insert(key)
                {
                    queue.push_back(*target);
                }
            }
        }
    }

    doc.included
        .iter()
        .filter_map(|r| {
            let id = r.id.as_deref()?;
            (!reached.contains(&(r.resource_type.as_str(), id))).then(|| {
                Violation::UnlinkedInclusion {
                    resource_type: r.resource_type.clone(),
                    id: id.to_string(),
                }
            })
        })
        .collect()
}
