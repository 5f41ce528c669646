//! Locate command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use fieldrec_core::{GeorefFormat, NominatimGeocoder, PrecisionReconciler, StoreConfig};

use crate::GlobalOpts;

/// Execute the locate command.
pub async fn execute(
    opts: &GlobalOpts,
    lat: f64,
    lon: f64,
    grid: Option<GeorefFormat>,
    precision: Option<usize>,
    describe: bool,
) -> Result<()> {
    let config = StoreConfig::from_env();
    let format = grid.unwrap_or(config.georef_format);
    let precision = precision.unwrap_or(if format == config.georef_format {
        config.georef_precision
    } else {
        format.default_precision()
    });
    let (reference, polygon) = PrecisionReconciler::for_format(format)
        .reference_for_point(lat, lon, precision)
        .with_context(|| format!("Failed to locate {lat}, {lon}"))?;

    // Soft failure: an empty description just means no place name
    let place = if describe {
        NominatimGeocoder::default().describe(lat, lon).await
    } else {
        String::new()
    };

    if opts.quiet {
        return Ok(());
    }
    println!("   {} {}", "Reference:".dimmed(), reference.bold());
    let corners: Vec<String> = polygon
        .iter()
        .map(|c| format!("({:.5}, {:.5})", c.lat, c.lon))
        .collect();
    println!("   {} {}", "Cell:".dimmed(), corners.join(" "));
    if describe {
        if place.is_empty() {
            println!("   {} {}", "Place:".dimmed(), "(not found)".dimmed());
        } else {
            println!("   {} {}", "Place:".dimmed(), place);
        }
    }
    Ok(())
}
