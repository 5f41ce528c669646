//! Sorted record summaries for display.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::filename::CaptureDetails;
use crate::history::HistoryCategory;
use crate::schema::fields;
use crate::store::{RecordPresence, RecordStore};

/// One row of the record list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    pub name: String,
    pub has_asset: bool,
    pub has_document: bool,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM` from the document, `HH:MM:SS` from the filename
    pub time: String,
    pub gridref: String,
    pub scientific_name: String,
    /// History categories with at least one entry.
    pub history: Vec<String>,
    /// Document could not be read; the row falls back to the filename.
    pub unreadable: bool,
}

impl RecordSummary {
    fn from_filename(name: &str, presence: RecordPresence) -> Self {
        let details = CaptureDetails::parse(name).ok();
        Self {
            name: name.to_string(),
            has_asset: presence.asset,
            has_document: presence.document,
            date: details.as_ref().map(|d| d.date_iso()).unwrap_or_default(),
            time: details
                .as_ref()
                .map(|d| d.time_display())
                .unwrap_or_default(),
            gridref: details
                .as_ref()
                .map(|d| d.location_display())
                .unwrap_or_default(),
            scientific_name: String::new(),
            history: Vec::new(),
            unreadable: false,
        }
    }
}

/// Summaries of every record, newest capture first.
///
/// In legacy mode summaries come from filenames alone and no document is
/// read or created. Otherwise each record's document is loaded through the
/// store, which creates or migrates it as usual.
pub async fn summarize(store: &RecordStore) -> Result<Vec<RecordSummary>> {
    let names = store.enumerate().await?;
    let legacy = store.is_legacy();

    let rows = names.iter().map(|name| async move {
        let presence = store.presence(name).await;
        if legacy {
            return RecordSummary::from_filename(name, presence);
        }
        match store.get_or_create_metadata(name).await {
            Ok(doc) => {
                let history = doc.history();
                RecordSummary {
                    name: name.clone(),
                    has_asset: presence.asset,
                    has_document: true,
                    date: doc.get_str(fields::DATE).unwrap_or_default(),
                    time: doc.get_str(fields::TIME).unwrap_or_default(),
                    gridref: doc.get_str(fields::GRIDREF).unwrap_or_default(),
                    scientific_name: doc.get_str(fields::SCIENTIFIC_NAME).unwrap_or_default(),
                    history: HistoryCategory::ALL
                        .iter()
                        .filter(|c| !history.entries(**c).is_empty())
                        .map(|c| c.to_string())
                        .collect(),
                    unreadable: false,
                }
            }
            Err(e) => {
                warn!(name = %name, error = %e, "Could not load document for listing");
                RecordSummary {
                    unreadable: true,
                    ..RecordSummary::from_filename(name, presence)
                }
            }
        }
    });

    let mut summaries = join_all(rows).await;
    sort_newest_first(&mut summaries);
    debug!(records = summaries.len(), legacy, "Summarized records");
    Ok(summaries)
}

/// Date descending, then time descending, then name for a stable order.
pub fn sort_newest_first(summaries: &mut [RecordSummary]) {
    summaries.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.time.cmp(&a.time))
            .then_with(|| a.name.cmp(&b.name))
    });
}
