//! Export history embedded in metadata documents.
//!
//! Each document carries three append-only logs under the `metadata` field:
//! downloads, shares and CSV exports. Entries are opaque labels. The logs
//! only grow at the tail and only shrink from the tail or to empty.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The three export histories of a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataHistory {
    #[serde(default)]
    pub downloads: Vec<String>,
    #[serde(default)]
    pub shares: Vec<String>,
    #[serde(default)]
    pub csvs: Vec<String>,
}

/// One of the three history logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryCategory {
    Downloads,
    Shares,
    Csvs,
}

impl HistoryCategory {
    pub const ALL: [HistoryCategory; 3] = [Self::Downloads, Self::Shares, Self::Csvs];
}

impl std::fmt::Display for HistoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloads => write!(f, "downloads"),
            Self::Shares => write!(f, "shares"),
            Self::Csvs => write!(f, "csvs"),
        }
    }
}

/// How to trim one history log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrimMode {
    #[default]
    None,
    /// Drop the most recently appended entry.
    Last,
    /// Clear the log.
    All,
}

impl std::str::FromStr for TrimMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "last" => Ok(Self::Last),
            "all" => Ok(Self::All),
            other => Err(format!("unknown trim mode '{other}' (expected none, last or all)")),
        }
    }
}

/// Trim modes chosen independently for each history log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimPlan {
    pub downloads: TrimMode,
    pub shares: TrimMode,
    pub csvs: TrimMode,
}

impl TrimPlan {
    pub fn mode(&self, category: HistoryCategory) -> TrimMode {
        match category {
            HistoryCategory::Downloads => self.downloads,
            HistoryCategory::Shares => self.shares,
            HistoryCategory::Csvs => self.csvs,
        }
    }

    /// True when every category is `None`.
    pub fn is_noop(&self) -> bool {
        HistoryCategory::ALL
            .iter()
            .all(|c| self.mode(*c) == TrimMode::None)
    }
}

impl MetadataHistory {
    pub fn entries(&self, category: HistoryCategory) -> &[String] {
        match category {
            HistoryCategory::Downloads => &self.downloads,
            HistoryCategory::Shares => &self.shares,
            HistoryCategory::Csvs => &self.csvs,
        }
    }

    fn entries_mut(&mut self, category: HistoryCategory) -> &mut Vec<String> {
        match category {
            HistoryCategory::Downloads => &mut self.downloads,
            HistoryCategory::Shares => &mut self.shares,
            HistoryCategory::Csvs => &mut self.csvs,
        }
    }

    /// Append an entry at the tail of a log.
    pub fn append(&mut self, category: HistoryCategory, label: impl Into<String>) {
        self.entries_mut(category).push(label.into());
    }

    /// Trim one log. Returns whether anything was removed.
    pub fn trim(&mut self, category: HistoryCategory, mode: TrimMode) -> bool {
        let entries = self.entries_mut(category);
        match mode {
            TrimMode::None => false,
            TrimMode::Last => entries.pop().is_some(),
            TrimMode::All => {
                let changed = !entries.is_empty();
                entries.clear();
                changed
            }
        }
    }

    /// Apply a plan to all three logs. Returns whether anything was removed.
    pub fn apply(&mut self, plan: &TrimPlan) -> bool {
        HistoryCategory::ALL
            .iter()
            .fold(false, |changed, c| self.trim(*c, plan.mode(*c)) || changed)
    }

    pub fn is_empty(&self) -> bool {
        HistoryCategory::ALL
            .iter()
            .all(|c| self.entries(*c).is_empty())
    }
}

/// Label for a history entry recorded now.
pub fn timestamp_label() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn test_trim_none_leaves_log() {
        let mut history = MetadataHistory {
            downloads: abc(),
            ..Default::default()
        };
        assert!(!history.trim(HistoryCategory::Downloads, TrimMode::None));
        assert_eq!(history.downloads, abc());
    }

    #[test]
    fn test_trim_last_pops_tail() {
        let mut history = MetadataHistory {
            shares: abc(),
            ..Default::default()
        };
        assert!(history.trim(HistoryCategory::Shares, TrimMode::Last));
        assert_eq!(history.shares, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_trim_last_on_empty_is_noop() {
        let mut history = MetadataHistory::default();
        assert!(!history.trim(HistoryCategory::Csvs, TrimMode::Last));
        assert!(history.csvs.is_empty());
    }

    #[test]
    fn test_trim_all_clears() {
        let mut history = MetadataHistory {
            csvs: abc(),
            ..Default::default()
        };
        assert!(history.trim(HistoryCategory::Csvs, TrimMode::All));
        assert!(history.csvs.is_empty());
    }

    #[test]
    fn test_apply_plan_per_category() {
        let mut history = MetadataHistory {
            downloads: abc(),
            shares: abc(),
            csvs: abc(),
        };
        let plan = TrimPlan {
            downloads: TrimMode::Last,
            shares: TrimMode::None,
            csvs: TrimMode::All,
        };
        assert!(history.apply(&plan));
        assert_eq!(history.downloads, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(history.shares, abc());
        assert!(history.csvs.is_empty());
    }

    #[test]
    fn test_append_goes_to_tail() {
        let mut history = MetadataHistory::default();
        history.append(HistoryCategory::Downloads, "first");
        history.append(HistoryCategory::Downloads, "second");
        assert_eq!(
            history.entries(HistoryCategory::Downloads),
            &["first".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_trim_mode_parse() {
        assert_eq!("LAST".parse::<TrimMode>().unwrap(), TrimMode::Last);
        assert_eq!("none".parse::<TrimMode>().unwrap(), TrimMode::None);
        assert!("some".parse::<TrimMode>().is_err());
        assert!(TrimPlan::default().is_noop());
    }
}
