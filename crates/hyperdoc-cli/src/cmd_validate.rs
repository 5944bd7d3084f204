use crate::cmd_query::read_doc;
use anyhow::Result;
use hyperdoc::v1::query;
use std::path::PathBuf;

pub fn run(input: PathBuf) -> Result<()> {
    let doc = read_doc(&input)?;
    let violations = query::violations(&doc);

    if violations.is_empty() {
        println!("Valid JSON:API document ({})", doc.kind());
        return Ok(());
    }

    for violation in &violations {
        eprintln!("  - {}", violation);
    }
    anyhow::bail!("{} violation(s) in {:?}", violations.len(), input)
}
