//! Trim command implementation.

use anyhow::{Context, Result};
use fieldrec_core::{BatchOperationEngine, TrimMode, TrimPlan};
use tracing::debug;

use crate::utils::{finish_report, open_store, resolve_selection};
use crate::{GlobalOpts, SelectionArgs};

/// Execute the trim command.
pub async fn execute(
    opts: &GlobalOpts,
    selection: SelectionArgs,
    downloads: TrimMode,
    shares: TrimMode,
    csvs: TrimMode,
) -> Result<()> {
    let store = open_store(opts)?;
    let selection = resolve_selection(&store, &selection).await?;
    let plan = TrimPlan {
        downloads,
        shares,
        csvs,
    };
    debug!(?plan, "Trimming history");

    let report = BatchOperationEngine::new(store)
        .trim_history(&selection, plan)
        .await
        .context("Failed to trim history")?;

    finish_report(&report, "trimmed", opts.quiet)
}
