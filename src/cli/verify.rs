//! CLI `verify` command — check a store and print a short report.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use papervec::config::PapervecConfig;
use papervec::verify;

pub fn verify(config: &PapervecConfig, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| config.resolved_output_dir());

    if !dir.exists() {
        bail!(
            "no store at {}; run `papervec build` to create it",
            dir.display()
        );
    }

    let report = verify::verify_store(&dir)
        .with_context(|| format!("store at {} failed verification", dir.display()))?;

    println!("Store Report");
    println!("============");
    println!();
    println!("Directory:         {}", dir.display());
    println!("Rows:              {}", report.rows);
    println!("Dimension:         {}", report.dimension);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", report.model.as_deref().unwrap_or("(no manifest)"));
    println!("  Configured:      {}", config.embedding.model);
    if let Some(stored) = &report.model {
        if stored != &config.embedding.model
            || report.max_input_length != Some(config.embedding.max_input_length)
        {
            println!("  WARNING: configuration mismatch! Queries will not be comparable; rebuild or pass --model.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    if let Some(created_at) = &report.created_at {
        println!("Built at:          {created_at}");
    }
    println!();
    println!("Alignment check:   PASSED");
    Ok(())
}
