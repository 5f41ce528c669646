//! End-to-end record lifecycle tests against a real storage directory.
//!
//! These tests drive the store, the batch engine and the reconciler the way
//! a caller does: enumerate, select, run, then re-enumerate to observe the
//! actual post-state.

use std::path::Path;
use std::sync::Arc;

use fieldrec_core::{
    fields, summarize, BatchOperation, BatchOperationEngine, BatchOutcome, CaptureDetails,
    CoordinateBasis, DirectoryExportSink, FieldrecError, FsStorage, GeohashGrid, GeorefFormat,
    GridSystem, MemoryStorage, OsGrid, PrecisionReconciler, RecordStore, Selection, ShareOutcome,
    StoreConfig, TrimMode, TrimPlan, UnsupportedShareTarget,
};
use tempfile::TempDir;

const FIX_NAME: &str = "2024-03-21_14-05-30_51.50101_-0.12419_10_52";
const GRID_NAME: &str = "20240320_091500_gcpvj0_5_none";

fn fs_store(dir: &Path, config: StoreConfig) -> Arc<RecordStore> {
    let storage = FsStorage::new(dir).expect("storage dir");
    Arc::new(RecordStore::new(Arc::new(storage), config))
}

fn seed_assets(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(format!("{name}.wav")), b"RIFF....WAVE").unwrap();
    }
}

// ============================================================================
// Store
// ============================================================================

#[tokio::test]
async fn test_document_created_from_capture_name() {
    let dir = TempDir::new().unwrap();
    let store = fs_store(dir.path(), StoreConfig::default());

    let doc = store.get_or_create_metadata(FIX_NAME).await.unwrap();

    assert_eq!(doc.get_str(fields::DATE).unwrap(), "2024-03-21");
    assert_eq!(doc.get_str(fields::TIME).unwrap(), "14:05");
    assert_eq!(doc.get_str(fields::LATITUDE).unwrap(), "51.50101");
    assert_eq!(
        doc.get_str(fields::GRIDREF).unwrap(),
        GeohashGrid.reference_at(51.50101, -0.12419, 6).unwrap()
    );
    assert!(dir.path().join(format!("{FIX_NAME}.txt")).exists());
}

#[tokio::test]
async fn test_old_document_is_migrated_and_unknown_fields_kept() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(format!("{GRID_NAME}.txt")),
        r#"{"recorder":"J. Smith","gridref":"gcpvj0","legacy-notes":"wet"}"#,
    )
    .unwrap();
    let store = fs_store(dir.path(), StoreConfig::default());

    let doc = store.get_or_create_metadata(GRID_NAME).await.unwrap();

    assert_eq!(doc.get_str(fields::RECORDER).unwrap(), "J. Smith");
    assert_eq!(doc.get_str(fields::DATE).unwrap(), "2024-03-20");
    assert_eq!(doc.get_str("legacy-notes").unwrap(), "wet");
    assert!(doc.history().is_empty());

    let on_disk = std::fs::read_to_string(dir.path().join(format!("{GRID_NAME}.txt"))).unwrap();
    assert!(on_disk.contains("\"metadata\""));
}

#[tokio::test]
async fn test_required_fields_from_config() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig {
        required_fields: vec![fields::SCIENTIFIC_NAME.to_string()],
        ..StoreConfig::default()
    };
    let store = fs_store(dir.path(), config);

    let doc = store.get_or_create_metadata(GRID_NAME).await.unwrap();
    assert_eq!(
        store.schema().missing_required(GRID_NAME, &doc),
        vec![fields::SCIENTIFIC_NAME]
    );

    let doc = store
        .update(GRID_NAME, |doc| {
            doc.set(fields::SCIENTIFIC_NAME, "Erithacus rubecula");
            Ok(true)
        })
        .await
        .unwrap();
    assert!(store.schema().missing_required(GRID_NAME, &doc).is_empty());
}

#[tokio::test]
async fn test_missing_storage_root_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("area");
    let store = fs_store(&root, StoreConfig::default());
    std::fs::remove_dir_all(&root).unwrap();

    assert!(matches!(
        store.enumerate().await,
        Err(FieldrecError::StorageUnavailable(_))
    ));
}

#[tokio::test]
async fn test_missing_storage_root_fails_document_access() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("area");
    let store = fs_store(&root, StoreConfig::default());
    std::fs::remove_dir_all(&root).unwrap();

    assert!(matches!(
        store.get_or_create_metadata(FIX_NAME).await,
        Err(FieldrecError::StorageUnavailable(_))
    ));
    let doc = store.schema().new_document(FIX_NAME);
    assert!(matches!(
        store.save(FIX_NAME, &doc).await,
        Err(FieldrecError::StorageUnavailable(_))
    ));
    assert!(matches!(
        store.update(FIX_NAME, |_| Ok(true)).await,
        Err(FieldrecError::StorageUnavailable(_))
    ));
}

// ============================================================================
// Batch operations
// ============================================================================

#[tokio::test]
async fn test_delete_then_reenumerate() {
    let dir = TempDir::new().unwrap();
    seed_assets(dir.path(), &[FIX_NAME, GRID_NAME]);
    let store = fs_store(dir.path(), StoreConfig::default());
    store.get_or_create_metadata(FIX_NAME).await.unwrap();
    store.get_or_create_metadata(GRID_NAME).await.unwrap();
    let engine = BatchOperationEngine::new(store.clone());

    let records = store.enumerate().await.unwrap();
    assert_eq!(records.len(), 2);
    let mask: Vec<bool> = records.iter().map(|r| r == FIX_NAME).collect();

    engine
        .run(&Selection::from_mask(&records, &mask), BatchOperation::DeleteAll)
        .await
        .unwrap();

    assert_eq!(store.enumerate().await.unwrap(), vec![GRID_NAME.to_string()]);
}

#[tokio::test]
async fn test_delete_isolation_with_forced_failure() {
    let storage = Arc::new(MemoryStorage::new());
    let names = ["r1", "r2", "r3", "r4"];
    for name in names {
        storage.insert(format!("{name}.wav"), vec![1]);
    }
    storage.fail_deletes_of("r3.wav");
    let store = Arc::new(RecordStore::new(storage, StoreConfig::default()));
    let engine = BatchOperationEngine::new(store.clone());

    let outcome = engine
        .run(&Selection::from_names(names), BatchOperation::DeleteAll)
        .await
        .unwrap();

    let BatchOutcome::Report(report) = outcome else {
        panic!("delete yields a report");
    };
    assert_eq!(report.completed(), 3);
    assert_eq!(report.failed(), 1);
    assert_eq!(store.enumerate().await.unwrap(), vec!["r3".to_string()]);
}

#[tokio::test]
async fn test_download_csv_then_trim_history() {
    let dir = TempDir::new().unwrap();
    let area = dir.path().join("area");
    let out = dir.path().join("out");
    std::fs::create_dir_all(&area).unwrap();
    seed_assets(&area, &[FIX_NAME]);
    let store = fs_store(&area, StoreConfig::default());
    store.get_or_create_metadata(FIX_NAME).await.unwrap();
    let engine = BatchOperationEngine::new(store.clone());
    let sink = DirectoryExportSink::new(&out).unwrap();
    let selection = Selection::from_names([FIX_NAME]);

    engine
        .run(&selection, BatchOperation::Download(&sink))
        .await
        .unwrap();
    engine
        .run(&selection, BatchOperation::Download(&sink))
        .await
        .unwrap();
    engine
        .run(&selection, BatchOperation::ExportCsv(&sink))
        .await
        .unwrap();

    assert!(out.join(format!("{FIX_NAME}.wav")).exists());
    assert!(out.join(format!("{FIX_NAME}.txt")).exists());
    let csv_count = std::fs::read_dir(&out)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".csv"))
        .count();
    assert_eq!(csv_count, 1);

    let history = store.get_or_create_metadata(FIX_NAME).await.unwrap().history();
    assert_eq!(history.downloads.len(), 2);
    assert_eq!(history.csvs.len(), 1);

    let plan = TrimPlan {
        downloads: TrimMode::Last,
        csvs: TrimMode::All,
        ..TrimPlan::default()
    };
    engine
        .run(&selection, BatchOperation::TrimHistory(plan))
        .await
        .unwrap();

    let history = store.get_or_create_metadata(FIX_NAME).await.unwrap().history();
    assert_eq!(history.downloads.len(), 1);
    assert!(history.csvs.is_empty());
}

#[tokio::test]
async fn test_share_unsupported_is_distinct() {
    let dir = TempDir::new().unwrap();
    seed_assets(dir.path(), &[FIX_NAME]);
    let store = fs_store(dir.path(), StoreConfig::default());
    let engine = BatchOperationEngine::new(store);

    let outcome = engine
        .run(
            &Selection::from_names([FIX_NAME]),
            BatchOperation::Share(&UnsupportedShareTarget),
        )
        .await
        .unwrap();
    assert_eq!(outcome, BatchOutcome::Share(ShareOutcome::Unsupported));
}

// ============================================================================
// Listing and legacy mode
// ============================================================================

#[tokio::test]
async fn test_listing_newest_first() {
    let dir = TempDir::new().unwrap();
    seed_assets(dir.path(), &[GRID_NAME, FIX_NAME]);
    let store = fs_store(dir.path(), StoreConfig::default());

    let rows = summarize(&store).await.unwrap();

    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec![FIX_NAME, GRID_NAME]);
}

#[tokio::test]
async fn test_legacy_mode_never_writes_documents() {
    let dir = TempDir::new().unwrap();
    seed_assets(dir.path(), &[FIX_NAME]);
    let store = fs_store(dir.path(), StoreConfig::default().with_legacy_mode(true));
    let engine = BatchOperationEngine::new(store.clone());
    let out = dir.path().join("out");
    let sink = DirectoryExportSink::new(&out).unwrap();

    summarize(&store).await.unwrap();
    engine
        .download(&Selection::from_names([FIX_NAME]), &sink)
        .await
        .unwrap();

    assert!(!dir.path().join(format!("{FIX_NAME}.txt")).exists());
    assert!(out.join(format!("{FIX_NAME}.wav")).exists());
}

// ============================================================================
// Precision reconciliation
// ============================================================================

#[tokio::test]
async fn test_reconcile_record_respects_manual_override() {
    let dir = TempDir::new().unwrap();
    let store = fs_store(dir.path(), StoreConfig::default());
    let reconciler = PrecisionReconciler::default();

    let fix = CaptureDetails::parse(FIX_NAME).unwrap();
    let (lat, lon) = fix.original_fix().unwrap();

    let zoomed = reconciler
        .reconcile_record(&store, FIX_NAME, 10)
        .await
        .unwrap()
        .unwrap();
    assert!(zoomed.consistent);
    assert_eq!(zoomed.reference, GeohashGrid.reference_at(lat, lon, 10).unwrap());

    let moved = GeohashGrid.reference_at(lat + 0.5, lon, 6).unwrap();
    store
        .update(FIX_NAME, |doc| {
            doc.set(fields::GRIDREF, moved.clone());
            Ok(true)
        })
        .await
        .unwrap();

    let zoomed = reconciler
        .reconcile_record(&store, FIX_NAME, 10)
        .await
        .unwrap()
        .unwrap();
    assert!(!zoomed.consistent);
    assert!(matches!(zoomed.basis, CoordinateBasis::StoredCentroid(_)));
    assert!(zoomed.reference.starts_with(&moved));
}

#[tokio::test]
async fn test_reconcile_os_grid_record() {
    let dir = TempDir::new().unwrap();
    let name = "20240321_140530_SU1234_10_52";
    seed_assets(dir.path(), &[name]);
    let store = fs_store(dir.path(), StoreConfig::default());

    let doc = store.get_or_create_metadata(name).await.unwrap();
    assert_eq!(doc.get_str(fields::GRIDREF).unwrap(), "SU1234");

    let result = PrecisionReconciler::default()
        .reconcile_record(&store, name, 100)
        .await
        .unwrap()
        .unwrap();
    assert!(result.consistent);
    assert_eq!(result.stored_precision, 1000);
    assert_eq!(result.reference, "SU125345");
}

#[tokio::test]
async fn test_os_grid_format_derives_national_grid_reference() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::default().with_georef_format(GeorefFormat::Osgr);
    let store = fs_store(dir.path(), config);

    let doc = store.get_or_create_metadata(FIX_NAME).await.unwrap();
    let gridref = doc.get_str(fields::GRIDREF).unwrap();
    assert_eq!(gridref, OsGrid.reference_at(51.50101, -0.12419, 100).unwrap());
    assert!(gridref.starts_with("TQ"));

    let result = PrecisionReconciler::for_format(GeorefFormat::Osgr)
        .reconcile_record(&store, FIX_NAME, 10)
        .await
        .unwrap()
        .unwrap();
    assert!(result.consistent);
    assert_eq!(result.reference, OsGrid.reference_at(51.50101, -0.12419, 10).unwrap());
}

#[tokio::test]
async fn test_reconcile_record_without_reference() {
    let dir = TempDir::new().unwrap();
    let store = fs_store(dir.path(), StoreConfig::default());
    store
        .update(FIX_NAME, |doc| {
            doc.set(fields::GRIDREF, "");
            Ok(true)
        })
        .await
        .unwrap();

    let result = PrecisionReconciler::default()
        .reconcile_record(&store, FIX_NAME, 8)
        .await
        .unwrap();
    assert!(result.is_none());
}
