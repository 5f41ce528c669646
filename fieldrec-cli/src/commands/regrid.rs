//! Regrid command implementation.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use fieldrec_core::{fields, CoordinateBasis, PrecisionReconciler};
use tracing::info;

use crate::utils::{listed_records, open_store, resolve_record};
use crate::GlobalOpts;

/// Execute the regrid command.
pub async fn execute(opts: &GlobalOpts, record: String, precision: usize, save: bool) -> Result<()> {
    let store = open_store(opts)?;
    if store.is_legacy() {
        bail!("Grid references live in metadata documents, which legacy mode does not use");
    }
    let rows = listed_records(&store).await?;
    let name = resolve_record(&rows, &record)?;

    let reconciler = PrecisionReconciler::for_format(store.config().georef_format);
    let Some(result) = reconciler
        .reconcile_record(&store, &name, precision)
        .await
        .with_context(|| format!("Failed to reconcile {name}"))?
    else {
        bail!("Record {name} has no grid reference");
    };

    if save {
        let reference = result.reference.clone();
        store
            .update(&name, move |doc| {
                if doc.get_str(fields::GRIDREF).as_deref() == Some(reference.as_str()) {
                    return Ok(false);
                }
                doc.set(fields::GRIDREF, reference);
                Ok(true)
            })
            .await
            .with_context(|| format!("Failed to update {name}"))?;
        info!(name = %name, reference = %result.reference, "Saved recomputed reference");
    }

    if opts.quiet {
        return Ok(());
    }
    let basis = match result.basis {
        CoordinateBasis::OriginalFix(c) => format!("original fix {:.5}, {:.5}", c.lat, c.lon),
        CoordinateBasis::StoredCentroid(c) => {
            format!("centre of stored cell {:.5}, {:.5}", c.lat, c.lon)
        }
    };
    println!();
    println!("   {} {}", "Reference:".dimmed(), result.reference.bold());
    println!(
        "   {} {} -> {}",
        "Precision:".dimmed(),
        result.stored_precision,
        result.requested_precision
    );
    println!("   {} {}", "Basis:".dimmed(), basis);
    if !result.consistent {
        println!("   {}", "Stored reference was edited by hand".yellow());
    }
    let corners: Vec<String> = result
        .polygon
        .iter()
        .map(|c| format!("({:.5}, {:.5})", c.lat, c.lon))
        .collect();
    println!("   {} {}", "Cell:".dimmed(), corners.join(" "));
    if save {
        println!("   {} Saved", "✓".green());
    }
    Ok(())
}
