//! Import command implementation.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use fieldrec_core::storage::split_object_name;
use fieldrec_core::{CaptureDetails, ObjectKind};
use tracing::info;

use crate::utils::open_store;
use crate::GlobalOpts;

/// Execute the import command.
pub async fn execute(opts: &GlobalOpts, files: Vec<PathBuf>) -> Result<()> {
    let store = open_store(opts)?;

    let mut stored = 0usize;
    for file in &files {
        let Some(file_name) = file.file_name().and_then(|n| n.to_str()) else {
            bail!("Invalid capture filename: {}", file.display());
        };
        let Some((ObjectKind::Asset, base)) = split_object_name(file_name) else {
            bail!(
                "Invalid capture filename: {} (expected a {} recording)",
                file.display(),
                ObjectKind::Asset.suffix()
            );
        };
        CaptureDetails::parse(base)
            .with_context(|| format!("Invalid capture filename: {}", file.display()))?;

        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read file: {}", file.display()))?;

        if store.put_asset(base, &bytes).await? {
            info!(name = base, bytes = bytes.len(), "Imported recording");
            stored += 1;
            if !opts.quiet {
                println!("   {} {}", "✓".green(), base);
            }
        } else if !opts.quiet {
            println!("   {} {} {}", "-".dimmed(), base, "(already present)".dimmed());
        }
    }

    if !opts.quiet {
        println!();
        println!("   Imported {} of {} recordings", stored, files.len());
    }
    Ok(())
}
