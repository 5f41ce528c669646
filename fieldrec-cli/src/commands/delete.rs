//! Delete command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use fieldrec_core::{BatchOperation, BatchOperationEngine, BatchOutcome};

use crate::utils::{finish_report, open_store, resolve_selection};
use crate::{GlobalOpts, SelectionArgs};

/// Execute the delete command.
pub async fn execute(opts: &GlobalOpts, selection: SelectionArgs, asset_only: bool) -> Result<()> {
    let store = open_store(opts)?;
    let selection = resolve_selection(&store, &selection).await?;
    let engine = BatchOperationEngine::new(store.clone());

    let operation = if asset_only {
        BatchOperation::DeleteAssetOnly
    } else {
        BatchOperation::DeleteAll
    };
    let outcome = engine
        .run(&selection, operation)
        .await
        .context("Failed to delete records")?;

    let result = match outcome {
        BatchOutcome::Report(report) => finish_report(&report, "deleted", opts.quiet),
        BatchOutcome::Share(_) => Ok(()),
    };

    // Report what is really left, not what the batch claims
    let remaining = store
        .enumerate()
        .await
        .context("Failed to list records")?
        .len();
    if !opts.quiet {
        println!("   {} {}", "Records remaining:".dimmed(), remaining);
    }
    result
}
