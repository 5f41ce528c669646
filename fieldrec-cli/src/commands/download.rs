//! Download command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use fieldrec_core::{BatchOperationEngine, DirectoryExportSink};

use crate::utils::{finish_report, open_store, resolve_selection};
use crate::{GlobalOpts, SelectionArgs};

/// Execute the download command.
pub async fn execute(opts: &GlobalOpts, selection: SelectionArgs, out: PathBuf) -> Result<()> {
    let store = open_store(opts)?;
    let selection = resolve_selection(&store, &selection).await?;
    let sink = DirectoryExportSink::new(&out)
        .with_context(|| format!("Failed to write to {}", out.display()))?;

    let report = BatchOperationEngine::new(store)
        .download(&selection, &sink)
        .await
        .context("Failed to download records")?;

    finish_report(&report, "exported", opts.quiet)
}
