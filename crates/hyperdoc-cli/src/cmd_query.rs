use anyhow::{Context, Result};
use clap::Subcommand;
use hyperdoc::v1::{Document, query};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Subcommand, Debug)]
pub enum QueryOp {
    /// Find a resource in primary data or included
    Find {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Resource type
        #[arg(long = "type")]
        resource_type: String,

        /// Resource id
        #[arg(long)]
        id: String,
    },
    /// List the resources a relationship points to
    Related {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Type of the source resource
        #[arg(long = "type")]
        resource_type: String,

        /// Id of the source resource
        #[arg(long)]
        id: String,

        /// Relationship name
        #[arg(long)]
        relationship: String,
    },
}

pub fn run(op: QueryOp, pretty: bool) -> Result<()> {
    match op {
        QueryOp::Find {
            input,
            resource_type,
            id,
        } => run_find(input, resource_type, id, pretty),
        QueryOp::Related {
            input,
            resource_type,
            id,
            relationship,
        } => run_related(input, resource_type, id, relationship, pretty),
    }
}

pub fn read_doc(path: &PathBuf) -> Result<Document> {
    debug!(path = ?path, "reading document");
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Document::from_json(&content).with_context(|| format!("Failed to parse {:?}", path))
}

pub fn print_json(value: &impl Serialize, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn run_find(input: PathBuf, resource_type: String, id: String, pretty: bool) -> Result<()> {
    let doc = read_doc(&input)?;
    let resource = query::find_resource(&doc, &resource_type, &id)
        .ok_or_else(|| anyhow::anyhow!("No resource {}/{} in {:?}", resource_type, id, input))?;
    print_json(resource, pretty)
}

fn run_related(
    input: PathBuf,
    resource_type: String,
    id: String,
    relationship: String,
    pretty: bool,
) -> Result<()> {
    let doc = read_doc(&input)?;
    if query::find_resource(&doc, &resource_type, &id).is_none() {
        anyhow::bail!("No resource {}/{} in {:?}", resource_type, id, input);
    }
    let related = query::related(&doc, &resource_type, &id, &relationship);
    debug!(count = related.len(), relationship = %relationship, "resolved related resources");
    print_json(&related, pretty)
}
