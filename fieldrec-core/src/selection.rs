//! Caller-owned selections over an enumerated record list.
//!
//! The engine keeps no notion of a current or selected record. Callers
//! enumerate, choose, and pass the chosen base names into every operation.

/// Base names chosen for one batch operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    names: Vec<String>,
}

impl Selection {
    /// Select the entries of `records` whose mask bit is set.
    ///
    /// Mask entries past the end of `records` are ignored and missing ones
    /// read as unselected.
    pub fn from_mask(records: &[String], mask: &[bool]) -> Self {
        let names: Vec<String> = records
            .iter()
            .zip(mask)
            .filter(|(_, selected)| **selected)
            .map(|(name, _)| name.clone())
            .collect();
        Self::from_names(names)
    }

    /// Select explicit base names. Duplicates collapse to the first occurrence.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        Self { names: out }
    }

    /// Select every record.
    pub fn all(records: &[String]) -> Self {
        Self::from_names(records.iter().cloned())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn test_from_mask() {
        let selection = Selection::from_mask(&records(), &[true, false, true]);
        assert_eq!(selection.names(), &["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_short_mask_reads_as_unselected() {
        let selection = Selection::from_mask(&records(), &[false, true]);
        assert_eq!(selection.names(), &["b".to_string()]);
    }

    #[test]
    fn test_from_mask_collapses_repeated_records() {
        let records = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        let selection = Selection::from_mask(&records, &[true, true, true, true]);
        assert_eq!(selection.names(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_from_names_dedups() {
        let selection = Selection::from_names(["b", "a", "b"]);
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.names()[0], "b");
    }

    #[test]
    fn test_all() {
        assert_eq!(Selection::all(&records()).len(), 3);
        assert!(Selection::default().is_empty());
    }
}
