//! List command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use fieldrec_core::RecordSummary;

use crate::utils::{listed_records, open_store};
use crate::GlobalOpts;

/// Execute the list command.
pub async fn execute(opts: &GlobalOpts, json: bool) -> Result<()> {
    let store = open_store(opts)?;
    let rows = listed_records(&store).await?;

    if json {
        let text = serde_json::to_string_pretty(&rows).context("Failed to serialize listing")?;
        println!("{text}");
        return Ok(());
    }
    if opts.quiet {
        return Ok(());
    }
    if rows.is_empty() {
        println!("{}", "No records.".dimmed());
        return Ok(());
    }

    for (index, row) in rows.iter().enumerate() {
        println!("{}", format_row(index + 1, row));
    }
    Ok(())
}

fn format_row(index: usize, row: &RecordSummary) -> String {
    let halves = format!(
        "{}{}",
        if row.has_asset { "A" } else { "-" },
        if row.has_document { "D" } else { "-" }
    );
    let species = if row.scientific_name.is_empty() {
        "(unidentified)".dimmed().to_string()
    } else {
        row.scientific_name.italic().to_string()
    };
    let mut line = format!(
        "{:>3}  {}  {} {:<8}  {:<12}  {}  {}",
        index,
        halves.cyan(),
        row.date,
        row.time,
        row.gridref,
        species,
        row.name.dimmed()
    );
    if !row.history.is_empty() {
        line.push_str(&format!("  [{}]", row.history.join(",")).yellow().to_string());
    }
    if row.unreadable {
        line.push_str(&format!("  {}", "unreadable document".red()));
    }
    line
}
