//! Set command implementation.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use fieldrec_core::fields;

use crate::utils::{listed_records, open_store, resolve_record};
use crate::GlobalOpts;

/// Execute the set command.
pub async fn execute(opts: &GlobalOpts, record: String, field: String, value: String) -> Result<()> {
    let store = open_store(opts)?;
    if store.is_legacy() {
        bail!("Metadata documents are not supported in legacy mode");
    }
    if field == fields::HISTORY {
        bail!("Unknown field: {field} (history is edited with `trim`)");
    }
    if !store.schema().field_ids().iter().any(|id| *id == field) {
        bail!(
            "Unknown field: {field} (expected one of {})",
            store.schema().field_ids().join(", ")
        );
    }

    let rows = listed_records(&store).await?;
    let name = resolve_record(&rows, &record)?;

    let doc = store
        .update(&name, |doc| {
            if doc.get_str(&field).as_deref() == Some(value.as_str()) {
                return Ok(false);
            }
            doc.set(field.clone(), value.clone());
            Ok(true)
        })
        .await
        .with_context(|| format!("Failed to update {name}"))?;

    if !opts.quiet {
        println!("   {} {} {} = {}", "✓".green(), name, field.bold(), value);
        let missing = store.schema().missing_required(&name, &doc);
        if !missing.is_empty() {
            println!(
                "   {} {}",
                "Missing required fields:".yellow(),
                missing.join(", ")
            );
        }
    }
    Ok(())
}
