// 🗃️ Record Store - The external data capability the matcher reads and writes through
//
// The matcher never talks to a database directly. Everything it needs is
// behind RecordStore: component lookup, alias lookup, the two candidate
// queries and the result append.

use crate::recommend::MatchResult;
use crate::record::{ComponentRecord, ComponentRow, MasterCandidate, StandardName};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Failure of the underlying store. Fatal for the record being identified.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("component line {line_num} matched {rows} rows")]
    AmbiguousComponent { line_num: i64, rows: usize },

    #[error("invalid table name {0:?}")]
    InvalidIdentifier(String),

    #[error("could not decode {what}: {reason}")]
    Decode { what: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// RECORD STORE CAPABILITY
// ============================================================================

pub trait RecordStore {
    /// Fetch one component row. More than one row is an anomaly and is
    /// reported as `StoreError::AmbiguousComponent`.
    fn lookup_component(&self, line_num: i64) -> StoreResult<Option<ComponentRecord>>;

    /// Canonical forms registered for an exact raw spelling, most frequent first
    fn lookup_standard_names(&self, raw_name: &str) -> StoreResult<Vec<StandardName>>;

    /// Candidates ordered by (id, casen) ascending
    fn find_candidates_by_first_last(
        &self,
        first: &str,
        last: &str,
    ) -> StoreResult<Vec<MasterCandidate>>;

    /// Candidates ordered by (id, casen) ascending
    fn find_candidates_by_first_middle(
        &self,
        first: &str,
        middle: &str,
    ) -> StoreResult<Vec<MasterCandidate>>;

    fn append_result(&mut self, result: &MatchResult) -> StoreResult<()>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Vector-backed store for tests and for callers that already hold the data
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub year: i32,
    pub components: Vec<ComponentRow>,
    pub aliases: Vec<(String, StandardName)>,
    pub master: Vec<MasterCandidate>,
    pub results: Vec<MatchResult>,
}

impl MemoryStore {
    pub fn new(year: i32) -> Self {
        MemoryStore {
            year,
            ..Default::default()
        }
    }

    pub fn add_component(&mut self, row: ComponentRow) {
        self.components.push(row);
    }

    pub fn add_alias(&mut self, raw: &str, canonical: &str, appearances: i64) {
        self.aliases.push((
            raw.to_string(),
            StandardName {
                canonical: canonical.to_string(),
                appearances,
            },
        ));
    }

    pub fn add_candidate(&mut self, candidate: MasterCandidate) {
        self.master.push(candidate);
    }

    fn find_candidates<F>(&self, predicate: F) -> Vec<MasterCandidate>
    where
        F: Fn(&MasterCandidate) -> bool,
    {
        let mut found: Vec<MasterCandidate> =
            self.master.iter().filter(|c| predicate(c)).cloned().collect();
        found.sort_by_key(|c| (c.id, c.casen));
        found
    }
}

fn same_name(stored: &Option<String>, wanted: &str) -> bool {
    stored
        .as_deref()
        .map_or(false, |s| s.eq_ignore_ascii_case(wanted))
}

impl RecordStore for MemoryStore {
    fn lookup_component(&self, line_num: i64) -> StoreResult<Option<ComponentRecord>> {
        let rows: Vec<&ComponentRow> = self
            .components
            .iter()
            .filter(|r| r.line_num == line_num)
            .collect();

        match rows.as_slice() {
            [] => Ok(None),
            [row] => Ok(Some(ComponentRecord::from_row((*row).clone(), self.year))),
            _ => Err(StoreError::AmbiguousComponent {
                line_num,
                rows: rows.len(),
            }),
        }
    }

    fn lookup_standard_names(&self, raw_name: &str) -> StoreResult<Vec<StandardName>> {
        let mut names: Vec<StandardName> = self
            .aliases
            .iter()
            .filter(|(raw, _)| raw == raw_name)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort_by(|a, b| {
            b.appearances
                .cmp(&a.appearances)
                .then_with(|| a.canonical.cmp(&b.canonical))
        });
        Ok(names)
    }

    fn find_candidates_by_first_last(
        &self,
        first: &str,
        last: &str,
    ) -> StoreResult<Vec<MasterCandidate>> {
        Ok(self.find_candidates(|c| same_name(&c.smfname, first) && same_name(&c.mlname, last)))
    }

    fn find_candidates_by_first_middle(
        &self,
        first: &str,
        middle: &str,
    ) -> StoreResult<Vec<MasterCandidate>> {
        Ok(self.find_candidates(|c| same_name(&c.smfname, first) && same_name(&c.smmname, middle)))
    }

    fn append_result(&mut self, result: &MatchResult) -> StoreResult<()> {
        self.results.push(result.clone());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, casen: i32, first: &str, last: &str) -> MasterCandidate {
        MasterCandidate {
            id,
            casen,
            smfname: Some(first.to_string()),
            mlname: Some(last.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_component_is_surfaced() {
        let mut store = MemoryStore::new(1458);
        store.add_component(ComponentRow {
            line_num: 5,
            ..Default::default()
        });
        store.add_component(ComponentRow {
            line_num: 5,
            ..Default::default()
        });

        let err = store.lookup_component(5).unwrap_err();
        assert!(matches!(
            err,
            StoreError::AmbiguousComponent { line_num: 5, rows: 2 }
        ));
        assert!(store.lookup_component(6).unwrap().is_none());
    }

    #[test]
    fn test_alias_ranking_is_deterministic() {
        let mut store = MemoryStore::new(1458);
        store.add_alias("Zanobi", "zanobius", 3);
        store.add_alias("Zanobi", "zanobi", 9);
        store.add_alias("Zanobi", "cenobi", 9);
        store.add_alias("Other", "altro", 50);

        let names = store.lookup_standard_names("Zanobi").unwrap();
        let canonical: Vec<&str> = names.iter().map(|n| n.canonical.as_str()).collect();
        assert_eq!(canonical, vec!["cenobi", "zanobi", "zanobius"]);
    }

    #[test]
    fn test_candidates_are_ordered_by_id_then_case() {
        let mut store = MemoryStore::new(1458);
        store.add_candidate(candidate(20, 2, "giovanni", "Medici"));
        store.add_candidate(candidate(10, 1, "giovanni", "MEDICI"));
        store.add_candidate(candidate(20, 1, "giovanni", "medici"));
        store.add_candidate(candidate(15, 1, "piero", "medici"));

        let found = store
            .find_candidates_by_first_last("giovanni", "medici")
            .unwrap();
        let keys: Vec<(i64, i32)> = found.iter().map(|c| (c.id, c.casen)).collect();
        assert_eq!(keys, vec![(10, 1), (20, 1), (20, 2)]);
    }
}
