//! Example demonstrating store and reconciler tracing instrumentation.
//!
//! Run with: cargo run -p fieldrec-core --example regrid_tracing

use std::sync::Arc;

use fieldrec_core::{
    fields, GeohashGrid, GridSystem, MemoryStorage, PrecisionReconciler, RecordStore, StoreConfig,
};
use tracing_subscriber::{fmt, EnvFilter};

const NAME: &str = "2024-03-21_14-05-30_51.50101_-0.12419_10_52";

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("fieldrec_core=debug,info"))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    println!("=== Grid reference reconciliation demo ===\n");

    let storage = Arc::new(MemoryStorage::new());
    let store = RecordStore::new(storage, StoreConfig::default());
    let reconciler = PrecisionReconciler::default();

    let doc = match store.get_or_create_metadata(NAME).await {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Failed to create document: {}", e);
            return;
        }
    };
    println!("Stored reference: {:?}\n", doc.get_str(fields::GRIDREF));

    for precision in [4, 8] {
        match reconciler.reconcile_record(&store, NAME, precision).await {
            Ok(Some(r)) => println!(
                "precision {precision}: {} (consistent: {}, basis: {:?})",
                r.reference, r.consistent, r.basis
            ),
            Ok(None) => println!("precision {precision}: no stored reference"),
            Err(e) => println!("precision {precision}: failed: {e}"),
        }
    }

    // Move the record by hand, then zoom in again
    let moved = GeohashGrid.reference_at(51.6, 0.3, 6).unwrap_or_default();
    let updated = store
        .update(NAME, |doc| {
            doc.set(fields::GRIDREF, moved.clone());
            Ok(true)
        })
        .await;
    if let Err(e) = updated {
        eprintln!("Failed to override reference: {}", e);
        return;
    }

    match reconciler.reconcile_record(&store, NAME, 8).await {
        Ok(Some(r)) => println!(
            "\nAfter override: {} (consistent: {}, basis: {:?})",
            r.reference, r.consistent, r.basis
        ),
        Ok(None) => println!("\nAfter override: no stored reference"),
        Err(e) => println!("\nAfter override: failed: {e}"),
    }
}
