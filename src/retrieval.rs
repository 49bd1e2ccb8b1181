// 🔎 Candidate Retriever - Registry rows that plausibly name the same person
//
// Strategy 1: standardized first + last name.
// Strategy 2: standardized first + middle name, only when strategy 1 found nothing.
// No first name → no retrieval at all.

use crate::record::{ComponentRecord, MasterCandidate};
use crate::store::{RecordStore, StoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalStrategy {
    FirstLast,
    FirstMiddle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// The record has no standardized first name
    MissingFirstName,

    /// Neither strategy returned rows
    NoCandidates,

    /// Rows ordered by (id, casen), not yet filtered to canonical cases
    Found {
        strategy: RetrievalStrategy,
        candidates: Vec<MasterCandidate>,
    },
}

impl Retrieval {
    pub fn candidates(&self) -> &[MasterCandidate] {
        match self {
            Retrieval::Found { candidates, .. } => candidates,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates().is_empty()
    }
}

pub struct CandidateRetriever;

impl CandidateRetriever {
    pub fn new() -> Self {
        CandidateRetriever
    }

    pub fn retrieve<S: RecordStore>(
        &self,
        store: &S,
        record: &ComponentRecord,
    ) -> StoreResult<Retrieval> {
        let Some(first) = record.first_name.standardized_str() else {
            return Ok(Retrieval::MissingFirstName);
        };

        if let Some(last) = record.last_name.standardized_str().filter(|s| !s.is_empty()) {
            let candidates = store.find_candidates_by_first_last(first, last)?;
            if !candidates.is_empty() {
                return Ok(Retrieval::Found {
                    strategy: RetrievalStrategy::FirstLast,
                    candidates,
                });
            }
        }

        if let Some(middle) = record.middle_name.standardized_str() {
            let candidates = store.find_candidates_by_first_middle(first, middle)?;
            if !candidates.is_empty() {
                return Ok(Retrieval::Found {
                    strategy: RetrievalStrategy::FirstMiddle,
                    candidates,
                });
            }
        }

        Ok(Retrieval::NoCandidates)
    }
}

impl Default for CandidateRetriever {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;
    use crate::store::MemoryStore;

    fn standardized(value: Option<&str>) -> Field<String> {
        let mut field = Field::text(value.map(String::from));
        field.standardized = value.map(String::from);
        field
    }

    fn record(first: Option<&str>, last: Option<&str>, middle: Option<&str>) -> ComponentRecord {
        let mut record = ComponentRecord::new(1, 1458);
        record.first_name = standardized(first);
        record.last_name = standardized(last);
        record.middle_name = standardized(middle);
        record
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new(1458);
        store.add_candidate(MasterCandidate {
            id: 2,
            casen: 1,
            smfname: Some("Giovanni".to_string()),
            mlname: Some("Medici".to_string()),
            smmname: Some("Bicci".to_string()),
            ..Default::default()
        });
        store.add_candidate(MasterCandidate {
            id: 9,
            casen: 1,
            smfname: Some("giovanni".to_string()),
            mlname: Some("Tornabuoni".to_string()),
            smmname: Some("francesco".to_string()),
            ..Default::default()
        });
        store
    }

    #[test]
    fn test_missing_first_name_short_circuits() {
        let retrieval = CandidateRetriever::new()
            .retrieve(&store(), &record(None, Some("medici"), Some("bicci")))
            .unwrap();
        assert_eq!(retrieval, Retrieval::MissingFirstName);
        assert!(retrieval.is_empty());
    }

    #[test]
    fn test_first_last_wins() {
        let retrieval = CandidateRetriever::new()
            .retrieve(&store(), &record(Some("giovanni"), Some("medici"), Some("francesco")))
            .unwrap();

        match retrieval {
            Retrieval::Found { strategy, candidates } => {
                assert_eq!(strategy, RetrievalStrategy::FirstLast);
                assert_eq!(candidates.len(), 1);
                assert_eq!(candidates[0].id, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_falls_back_to_middle_name() {
        let retrieval = CandidateRetriever::new()
            .retrieve(&store(), &record(Some("giovanni"), Some("strozzi"), Some("francesco")))
            .unwrap();

        match retrieval {
            Retrieval::Found { strategy, candidates } => {
                assert_eq!(strategy, RetrievalStrategy::FirstMiddle);
                assert_eq!(candidates[0].id, 9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_middle_name_used_without_last_name() {
        let retrieval = CandidateRetriever::new()
            .retrieve(&store(), &record(Some("giovanni"), None, Some("bicci")))
            .unwrap();
        assert_eq!(retrieval.candidates()[0].id, 2);
    }

    #[test]
    fn test_nothing_found() {
        let retrieval = CandidateRetriever::new()
            .retrieve(&store(), &record(Some("giovanni"), Some("strozzi"), None))
            .unwrap();
        assert_eq!(retrieval, Retrieval::NoCandidates);
    }
}
