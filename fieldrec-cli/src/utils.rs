//! Common utility functions shared across CLI commands.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use fieldrec_core::storage::split_object_name;
use fieldrec_core::{
    summarize, BatchReport, FsStorage, ItemOutcome, RecordStore, RecordSummary, Selection,
    StoreConfig,
};
use tracing::debug;

use crate::{GlobalOpts, SelectionArgs};

/// Open the storage area with configuration from the environment.
///
/// `--legacy` turns asset-only mode on; it never turns it off.
pub fn open_store(opts: &GlobalOpts) -> Result<Arc<RecordStore>> {
    let mut config = StoreConfig::from_env();
    if opts.legacy {
        config = config.with_legacy_mode(true);
    }
    let storage = FsStorage::new(&opts.store)
        .with_context(|| format!("Storage area unavailable: {}", opts.store.display()))?;
    debug!(store = %opts.store.display(), legacy = config.legacy_mode, "Opened storage area");
    Ok(Arc::new(RecordStore::new(Arc::new(storage), config)))
}

/// Records in display order, as `list` numbers them.
pub async fn listed_records(store: &RecordStore) -> Result<Vec<RecordSummary>> {
    summarize(store).await.context("Failed to list records")
}

/// Strip an asset or document suffix from a record argument.
pub fn base_name_of(arg: &str) -> &str {
    split_object_name(arg).map(|(_, base)| base).unwrap_or(arg)
}

/// Resolve one record argument: a 1-based index into `list` output or a base name.
pub fn resolve_record(rows: &[RecordSummary], arg: &str) -> Result<String> {
    if let Ok(index) = arg.parse::<usize>() {
        return match index.checked_sub(1).and_then(|i| rows.get(i)) {
            Some(row) => Ok(row.name.clone()),
            None => bail!("Record index {index} out of range (1..={})", rows.len()),
        };
    }
    let base = base_name_of(arg);
    if rows.iter().any(|row| row.name == base) {
        Ok(base.to_string())
    } else {
        bail!("Unknown record: {arg}")
    }
}

/// Build the selection a batch command applies to.
pub async fn resolve_selection(store: &RecordStore, args: &SelectionArgs) -> Result<Selection> {
    let rows = listed_records(store).await?;
    let selection = if args.all {
        let names: Vec<String> = rows.iter().map(|row| row.name.clone()).collect();
        Selection::all(&names)
    } else {
        let names = args
            .records
            .iter()
            .map(|arg| resolve_record(&rows, arg))
            .collect::<Result<Vec<_>>>()?;
        Selection::from_names(names)
    };

    if selection.is_empty() {
        bail!("No records selected (pass record indices, names, or --all)");
    }
    debug!(records = selection.len(), "Resolved selection");
    Ok(selection)
}

/// Print a batch report and fail when any item failed.
///
/// The report only says what was attempted; callers list again to see what
/// the storage area actually holds.
pub fn finish_report(report: &BatchReport, verb: &str, quiet: bool) -> Result<()> {
    if !quiet {
        for item in &report.items {
            match &item.outcome {
                ItemOutcome::Completed => {
                    println!("   {} {} {}", "✓".green(), verb, item.name)
                }
                ItemOutcome::Skipped(reason) => {
                    println!("   {} {} ({})", "-".dimmed(), item.name, reason.dimmed())
                }
                ItemOutcome::Failed(reason) => {
                    println!("   {} {} {}", "✗".red(), item.name, reason.red())
                }
            }
        }
        println!();
        println!(
            "   {} {} completed, {} skipped, {} failed",
            format!("{}:", report.operation).dimmed(),
            report.completed(),
            report.skipped(),
            report.failed()
        );
    }

    if report.failed() > 0 {
        bail!(
            "Batch partially failed: {} of {} items failed",
            report.failed(),
            report.items.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<RecordSummary> {
        ["newest", "older"]
            .iter()
            .map(|name| RecordSummary {
                name: name.to_string(),
                has_asset: true,
                has_document: false,
                date: String::new(),
                time: String::new(),
                gridref: String::new(),
                scientific_name: String::new(),
                history: Vec::new(),
                unreadable: false,
            })
            .collect()
    }

    #[test]
    fn test_resolve_record_by_index_and_name() {
        let rows = rows();
        assert_eq!(resolve_record(&rows, "1").unwrap(), "newest");
        assert_eq!(resolve_record(&rows, "older.wav").unwrap(), "older");
        assert!(resolve_record(&rows, "0").is_err());
        assert!(resolve_record(&rows, "3").is_err());
        assert!(resolve_record(&rows, "missing").is_err());
    }

    #[test]
    fn test_base_name_of() {
        assert_eq!(base_name_of("rec.wav"), "rec");
        assert_eq!(base_name_of("rec.txt"), "rec");
        assert_eq!(base_name_of("rec"), "rec");
    }

    #[test]
    fn test_finish_report_fails_on_item_failure() {
        let report = BatchReport::new(
            "delete",
            vec![fieldrec_core::ItemReport::failed("a.wav", "denied")],
        );
        assert!(finish_report(&report, "deleted", true).is_err());
        assert!(finish_report(&BatchReport::new("delete", Vec::new()), "deleted", true).is_ok());
    }
}
