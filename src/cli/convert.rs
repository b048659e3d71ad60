//! CLI `convert` command — JSON-lines snapshot to input CSV.

use std::path::Path;

use anyhow::Result;
use papervec::corpus::convert;

pub fn convert(input: &Path, output: &Path) -> Result<()> {
    println!("Converting {}...", input.display());
    let stats = convert::convert_file(input, output)?;

    println!("Conversion complete:");
    println!("  Records written:     {}", stats.written);
    println!("  Missing title/abstract: {}", stats.missing_text);
    if stats.malformed > 0 {
        println!("  Malformed lines:     {} (skipped)", stats.malformed);
    }
    println!("Saved to {}", output.display());
    Ok(())
}
