use crate::cmd_query::{print_json, read_doc};
use anyhow::Result;
use hyperdoc::v1::query;
use serde_json::json;
use std::path::PathBuf;

pub fn run(input: PathBuf, pretty: bool) -> Result<()> {
    let doc = read_doc(&input)?;
    let primary = query::primary_resources(&doc);
    let summary = json!({
        "kind": doc.kind().to_string(),
        "primary": primary.len(),
        "included": query::included_types(&doc),
        "errors": doc.errors.len(),
        "links": doc.links.as_ref().map(|l| l.keys().cloned().collect::<Vec<_>>()).unwrap_or_default(),
    });
    print_json(&summary, pretty)
}
