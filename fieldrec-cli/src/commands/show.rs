//! Show command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use fieldrec_core::{CaptureDetails, ObjectKind};
use tracing::debug;

use crate::utils::{listed_records, open_store, resolve_record};
use crate::GlobalOpts;

/// Execute the show command.
pub async fn execute(opts: &GlobalOpts, record: String, json: bool) -> Result<()> {
    let store = open_store(opts)?;
    let rows = listed_records(&store).await?;
    let name = resolve_record(&rows, &record)?;

    let details = CaptureDetails::parse(&name).ok();
    let doc = if store.is_legacy() {
        debug!("Legacy mode, showing filename details only");
        None
    } else {
        Some(
            store
                .get_or_create_metadata(&name)
                .await
                .with_context(|| format!("Failed to load metadata for {name}"))?,
        )
    };

    if json {
        let text = match &doc {
            Some(doc) => doc.to_text()?,
            None => serde_json::to_string_pretty(
                &details.as_ref().map(|d| d.display(&ObjectKind::Asset.object_name(&name))),
            )
            .context("Failed to serialize capture details")?,
        };
        println!("{text}");
        return Ok(());
    }
    if opts.quiet {
        return Ok(());
    }

    println!();
    println!("   {} {}", "Record:".dimmed(), name.bold());
    match &details {
        Some(details) => {
            let display = details.display(&ObjectKind::Asset.object_name(&name));
            println!("   {} {} {}", "Captured:".dimmed(), display.date, display.time);
            println!("   {} {}", "Location:".dimmed(), display.location);
            println!("   {} {} m", "Accuracy:".dimmed(), display.accuracy);
            if !display.altitude.is_empty() {
                println!("   {} {} m", "Altitude:".dimmed(), display.altitude);
            }
        }
        None => println!("   {}", "Name is not a capture identity".yellow()),
    }

    if let Some(doc) = doc {
        println!();
        for id in store.schema().field_ids() {
            if id == fieldrec_core::fields::HISTORY {
                continue;
            }
            let value = doc.get_str(id).unwrap_or_default();
            println!("   {:<16} {}", format!("{id}:").dimmed(), value);
        }

        let history = doc.history();
        for category in fieldrec_core::HistoryCategory::ALL {
            let entries = history.entries(category);
            if !entries.is_empty() {
                println!(
                    "   {:<16} {}",
                    format!("{category}:").dimmed(),
                    entries.join(", ")
                );
            }
        }

        let missing = store.schema().missing_required(&name, &doc);
        if !missing.is_empty() {
            println!();
            println!(
                "   {} {}",
                "Missing required fields:".yellow(),
                missing.join(", ")
            );
        }
    }
    Ok(())
}
