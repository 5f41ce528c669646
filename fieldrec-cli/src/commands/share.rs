//! Share command implementation.
//!
//! A terminal has no share sheet, so the share capability is always
//! reported as unsupported.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use fieldrec_core::{BatchOperationEngine, ShareOutcome, UnsupportedShareTarget};

use crate::utils::{open_store, resolve_selection};
use crate::{GlobalOpts, SelectionArgs};

/// Execute the share command.
pub async fn execute(opts: &GlobalOpts, selection: SelectionArgs) -> Result<()> {
    let store = open_store(opts)?;
    let selection = resolve_selection(&store, &selection).await?;

    let outcome = BatchOperationEngine::new(store)
        .share(&selection, &UnsupportedShareTarget)
        .await
        .context("Failed to share records")?;

    match outcome {
        ShareOutcome::Shared => {
            if !opts.quiet {
                println!("   {} Shared {} records", "✓".green(), selection.len());
            }
            Ok(())
        }
        ShareOutcome::Cancelled => Ok(()),
        ShareOutcome::Failed(reason) => bail!("Share failed: {reason}"),
        ShareOutcome::Unsupported => bail!("Sharing is not supported on this platform"),
    }
}
