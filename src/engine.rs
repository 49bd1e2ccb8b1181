// 🧭 Matching Engine - standardize → retrieve → score → recommend → persist
//
// One component record is processed completely before the next one starts.
// A store failure aborts that record only; the batch keeps going.

use crate::config::MatcherConfig;
use crate::recommend::{Correctness, MatchResult, RecommendationPolicy, Recommender};
use crate::record::ComponentRecord;
use crate::retrieval::{CandidateRetriever, Retrieval, RetrievalStrategy};
use crate::scoring::{FitnessScorer, MatchAssessment};
use crate::standardize::{Standardizer, UnrecognizedName};
use crate::store::{RecordStore, StoreResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// OUTCOMES
// ============================================================================

/// Everything computed while identifying one record
#[derive(Debug, Clone)]
pub struct MatchReport {
    pub record: ComponentRecord,
    pub unrecognized: Vec<UnrecognizedName>,
    pub retrieval: Option<RetrievalStrategy>,
    pub candidates_found: usize,
    pub assessments: Vec<MatchAssessment>,
    pub result: MatchResult,
}

#[derive(Debug, Clone)]
pub enum IdentifyOutcome {
    /// No component row with this line number
    NotFound,

    /// The record has no manual identification to measure against
    Skipped,

    /// A result row was appended
    Recorded(Box<MatchReport>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub no_candidates: usize,
    pub not_found: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn add_result(&mut self, result: &MatchResult) {
        self.processed += 1;
        match result.correct {
            Correctness::Correct => self.correct += 1,
            Correctness::Incorrect => self.incorrect += 1,
            Correctness::NoCandidates => self.no_candidates += 1,
        }
    }

    pub fn add_outcome(&mut self, outcome: &IdentifyOutcome) {
        match outcome {
            IdentifyOutcome::NotFound => self.not_found += 1,
            IdentifyOutcome::Skipped => self.skipped += 1,
            IdentifyOutcome::Recorded(report) => self.add_result(&report.result),
        }
    }

    /// Tally results already stored
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a MatchResult>,
    {
        let mut summary = BatchSummary::default();
        for result in results {
            summary.add_result(result);
        }
        summary
    }

    /// Share of processed records judged correct
    pub fn accuracy(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.correct as f64 / self.processed as f64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Processed: {}, Correct: {} ({:.1}%), Incorrect: {}, No candidates: {}, Not found: {}, Skipped: {}, Failed: {}",
            self.processed,
            self.correct,
            self.accuracy() * 100.0,
            self.incorrect,
            self.no_candidates,
            self.not_found,
            self.skipped,
            self.failed
        )
    }
}

// ============================================================================
// MATCHING ENGINE
// ============================================================================

pub struct MatchingEngine {
    pub standardizer: Standardizer,
    pub retriever: CandidateRetriever,
    pub scorer: FitnessScorer,
    pub recommender: Recommender,
}

impl MatchingEngine {
    pub fn new(policy: RecommendationPolicy) -> Self {
        MatchingEngine {
            standardizer: Standardizer::new(),
            retriever: CandidateRetriever::new(),
            scorer: FitnessScorer::new(),
            recommender: Recommender::new(policy),
        }
    }

    pub fn from_config(config: &MatcherConfig) -> Self {
        MatchingEngine {
            recommender: Recommender::with_threshold(config.policy, config.fitness_threshold),
            ..Self::new(config.policy)
        }
    }

    /// Identify one component record and append its result
    pub fn identify<S: RecordStore>(
        &self,
        store: &mut S,
        line_num: i64,
    ) -> StoreResult<IdentifyOutcome> {
        let Some(mut record) = store.lookup_component(line_num)? else {
            return Ok(IdentifyOutcome::NotFound);
        };
        let Some(ground_truth) = record.ground_truth else {
            debug!(line_num, "no ground-truth id, skipping");
            return Ok(IdentifyOutcome::Skipped);
        };

        let unrecognized = self.standardizer.standardize_all(store, &mut record)?;
        debug!(record = %record, "standardized");

        let retrieval = self.retriever.retrieve(store, &record)?;
        let (strategy, candidates) = match &retrieval {
            Retrieval::Found {
                strategy,
                candidates,
            } => (Some(*strategy), candidates.as_slice()),
            Retrieval::MissingFirstName => {
                info!(line_num, "no first name");
                (None, &[][..])
            }
            Retrieval::NoCandidates => (None, &[][..]),
        };

        let assessments = self.scorer.assess(&record, candidates);
        let scored = if retrieval.is_empty() {
            None
        } else {
            Some(assessments.as_slice())
        };
        let result = self.recommender.recommend(line_num, ground_truth, scored);

        store.append_result(&result)?;

        Ok(IdentifyOutcome::Recorded(Box::new(MatchReport {
            record,
            unrecognized,
            retrieval: strategy,
            candidates_found: candidates.len(),
            assessments,
            result,
        })))
    }

    /// Identify every line number in `start..=stop`, in order
    pub fn run_batch<S: RecordStore>(&self, store: &mut S, start: i64, stop: i64) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for line_num in start..=stop {
            match self.identify(store, line_num) {
                Ok(outcome) => summary.add_outcome(&outcome),
                Err(e) => {
                    warn!(line_num, error = %e, "identification failed");
                    summary.failed += 1;
                }
            }

            if line_num % 500 == 0 {
                info!(line_num, processed = summary.processed, "batch progress");
            }
        }

        summary
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::Recommendation;
    use crate::record::{ComponentRow, MasterCandidate, StandardName};
    use crate::store::{MemoryStore, StoreError};

    fn row(line_num: i64, last: &str, first: &str, middle: Option<&str>, id: i64) -> ComponentRow {
        ComponentRow {
            line_num,
            lname: Some(last.to_string()),
            fname: Some(first.to_string()),
            mname: middle.map(String::from),
            m2name: None,
            nb: Some(12),
            id: Some(id),
        }
    }

    fn medici(id: i64) -> MasterCandidate {
        MasterCandidate {
            id,
            casen: 1,
            mlname: Some("Medici".to_string()),
            smfname: Some("giovanni".to_string()),
            smmname: Some("bicci".to_string()),
            ngh427: Some(12),
            byr_augm: Some(1400),
            dyr: Some(1470),
            ..Default::default()
        }
    }

    fn florence() -> MemoryStore {
        let mut store = MemoryStore::new(1458);
        store.add_alias("Giovanni", "Giovanni", 300);
        store.add_alias("Bicci", "bicci", 12);
        store.add_alias("Averardo", "averardo", 5);
        store
    }

    fn recorded(outcome: IdentifyOutcome) -> MatchReport {
        match outcome {
            IdentifyOutcome::Recorded(report) => *report,
            other => panic!("expected a recorded result, got {:?}", other),
        }
    }

    #[test]
    fn test_perfect_match_end_to_end() {
        let mut store = florence();
        store.add_component(row(1, "Medici, di", "Giovanni", Some("Bicci"), 100));
        store.add_candidate(medici(100));

        let engine = MatchingEngine::new(RecommendationPolicy::StrictBest);
        let report = recorded(engine.identify(&mut store, 1).unwrap());

        assert_eq!(report.retrieval, Some(RetrievalStrategy::FirstLast));
        assert_eq!(report.assessments.len(), 1);
        let a = &report.assessments[0];
        assert_eq!((a.neighborhood, a.name.score, a.year.score), (1.0, 1.0, 1.0));
        assert_eq!(a.overall, 1.0);
        assert_eq!(report.result.recommendation, Recommendation::Single(100));
        assert_eq!(report.result.correct, Correctness::Correct);
        assert_eq!(store.results.len(), 1);
    }

    #[test]
    fn test_missing_first_name_records_no_candidates() {
        let mut store = florence();
        store.add_component(row(2, "Medici", "Zzz", None, 100));
        store.add_candidate(medici(100));

        let engine = MatchingEngine::new(RecommendationPolicy::StrictBest);
        let report = recorded(engine.identify(&mut store, 2).unwrap());

        assert_eq!(report.unrecognized.len(), 1);
        assert_eq!(report.retrieval, None);
        assert_eq!(report.result.recommendation, Recommendation::NoMatch);
        assert_eq!(report.result.correct, Correctness::NoCandidates);
        assert_eq!(report.result.recommendation.to_string(), "No Matches");
    }

    #[test]
    fn test_tie_through_middle_name_fallback() {
        let mut store = florence();
        let mut component = row(3, "Rossi", "Giovanni", Some("Bicci"), 99);
        component.m2name = Some("Averardo".to_string());
        store.add_component(component);
        for id in [10, 20] {
            store.add_candidate(MasterCandidate {
                smm2name: Some("averardo".to_string()),
                ..medici(id)
            });
        }

        let engine = MatchingEngine::new(RecommendationPolicy::StrictBest);
        let report = recorded(engine.identify(&mut store, 3).unwrap());

        assert_eq!(report.retrieval, Some(RetrievalStrategy::FirstMiddle));
        assert!((report.assessments[0].overall - 0.6).abs() < 1e-9);
        assert_eq!(report.result.recommendation, Recommendation::Tied(vec![10, 20]));
        assert_eq!(report.result.correct, Correctness::Incorrect);
    }

    #[test]
    fn test_repeat_identification_is_stable() {
        let mut store = florence();
        store.add_component(row(4, "Medici", "Giovanni", None, 100));
        store.add_candidate(medici(100));
        store.add_candidate(MasterCandidate {
            ngh427: None,
            dyr: None,
            ..medici(101)
        });

        let engine = MatchingEngine::new(RecommendationPolicy::RankedList);
        let first = recorded(engine.identify(&mut store, 4).unwrap()).result;
        let second = recorded(engine.identify(&mut store, 4).unwrap()).result;

        assert_eq!(first, second);
        assert_eq!(first.recommendation, Recommendation::Single(100));
    }

    #[test]
    fn test_skips_and_missing_rows() {
        let mut store = florence();
        store.add_component(ComponentRow {
            line_num: 5,
            fname: Some("Giovanni".to_string()),
            ..Default::default()
        });

        let engine = MatchingEngine::new(RecommendationPolicy::StrictBest);
        assert!(matches!(engine.identify(&mut store, 5).unwrap(), IdentifyOutcome::Skipped));
        assert!(matches!(engine.identify(&mut store, 6).unwrap(), IdentifyOutcome::NotFound));
        assert!(store.results.is_empty());
    }

    /// Fails every append for one line number
    struct FlakyStore {
        inner: MemoryStore,
        fail_on: i64,
    }

    impl RecordStore for FlakyStore {
        fn lookup_component(&self, line_num: i64) -> StoreResult<Option<ComponentRecord>> {
            self.inner.lookup_component(line_num)
        }
        fn lookup_standard_names(&self, raw_name: &str) -> StoreResult<Vec<StandardName>> {
            self.inner.lookup_standard_names(raw_name)
        }
        fn find_candidates_by_first_last(&self, f: &str, l: &str) -> StoreResult<Vec<MasterCandidate>> {
            self.inner.find_candidates_by_first_last(f, l)
        }
        fn find_candidates_by_first_middle(&self, f: &str, m: &str) -> StoreResult<Vec<MasterCandidate>> {
            self.inner.find_candidates_by_first_middle(f, m)
        }
        fn append_result(&mut self, result: &MatchResult) -> StoreResult<()> {
            if result.line_num == self.fail_on {
                return Err(StoreError::Unavailable("disk full".to_string()));
            }
            self.inner.append_result(result)
        }
    }

    #[test]
    fn test_batch_continues_after_store_failure() {
        let mut inner = florence();
        inner.add_component(row(1, "Medici", "Giovanni", Some("Bicci"), 100));
        inner.add_component(row(2, "Medici", "Giovanni", Some("Bicci"), 100));
        inner.add_component(row(3, "Medici", "Giovanni", Some("Bicci"), 555));
        inner.add_component(row(5, "Strozzi", "Giovanni", None, 7));
        inner.add_candidate(medici(100));
        let mut store = FlakyStore { inner, fail_on: 2 };

        let engine = MatchingEngine::new(RecommendationPolicy::StrictBest);
        let summary = engine.run_batch(&mut store, 1, 5);

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.correct, 1);
        assert_eq!(summary.incorrect, 1);
        assert_eq!(summary.no_candidates, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_found, 1);
        assert_eq!(store.inner.results.len(), 3);
        assert!((summary.accuracy() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_from_stored_results() {
        let mut store = florence();
        store.add_component(row(1, "Medici", "Giovanni", Some("Bicci"), 100));
        store.add_candidate(medici(100));

        let engine = MatchingEngine::from_config(&MatcherConfig::default());
        engine.run_batch(&mut store, 1, 1);

        let summary = BatchSummary::from_results(&store.results);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.correct, 1);
        assert!(summary.summary().contains("Correct: 1 (100.0%)"));
    }
}
