#![no_main]

//! Fuzz target for MetadataDocument::from_bytes() followed by migration
//!
//! Migration must never panic and must be idempotent.
//!
//! Run with: cargo +nightly fuzz run fuzz_migrate_document

use std::sync::Arc;

use fieldrec_core::{GeohashGrid, MetadataDocument, Schema, StoreConfig};
use libfuzzer_sys::fuzz_target;

const NAME: &str = "2024-03-21_14-05-30_51.50101_-0.12419_10_52";

fuzz_target!(|data: &[u8]| {
    let schema = Schema::new(StoreConfig::default(), Arc::new(GeohashGrid));
    if let Ok(mut doc) = MetadataDocument::from_bytes("fuzz.txt", data) {
        schema.migrate(NAME, &mut doc);
        assert!(schema.migrate(NAME, &mut doc).is_empty());
        let _ = doc.history();
        let _ = schema.missing_required(NAME, &doc);
        let _ = doc.to_text();
    }
});
