// ⚖️ Fitness Scorer - neighborhood × name × year, per canonical candidate
//
// Only casen == 1 rows are scored. The same-identity rows that follow a
// canonical row in (id, casen) order are its siblings and feed it their
// marriage years.

pub mod names;
pub mod neighborhood;
pub mod years;

pub use names::{decision_table, name_fitness, Agreement, NameFitness};
pub use neighborhood::neighborhood_fitness;
pub use years::{year_fitness, YearEvidence, YearFitness};

use crate::record::{ComponentRecord, MasterCandidate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scores for one (component, canonical candidate) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAssessment {
    pub candidate_id: i64,
    pub neighborhood: f64,
    pub name: NameFitness,
    pub year: YearFitness,
    /// Product of the three sub-scores, never negative
    pub overall: f64,
}

impl MatchAssessment {
    pub fn no_years(&self) -> bool {
        self.year.no_years
    }
}

pub struct FitnessScorer;

impl FitnessScorer {
    pub fn new() -> Self {
        FitnessScorer
    }

    /// Score one canonical candidate given its siblings
    pub fn assess_one(
        &self,
        record: &ComponentRecord,
        canonical: &MasterCandidate,
        siblings: &[MasterCandidate],
    ) -> MatchAssessment {
        let neighborhood = neighborhood_fitness(canonical, record.neighborhood.standardized);
        let name = name_fitness(record, canonical);
        let year = year_fitness(&YearEvidence::gather(canonical, siblings), record.year);

        let overall = (neighborhood * name.score * year.score).max(0.0);

        debug!(
            line_num = record.line_num,
            candidate = canonical.id,
            neighborhood_fit = neighborhood,
            name_fit = name.score,
            year_fit = year.score,
            overall,
            "scored candidate"
        );

        MatchAssessment {
            candidate_id: canonical.id,
            neighborhood,
            name,
            year,
            overall,
        }
    }

    /// Score every canonical row of an (id, casen)-ordered candidate list.
    ///
    /// Assessments keep the candidate order.
    pub fn assess(
        &self,
        record: &ComponentRecord,
        candidates: &[MasterCandidate],
    ) -> Vec<MatchAssessment> {
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_canonical())
            .map(|(i, canonical)| {
                let siblings = same_identity_run(candidates, i);
                self.assess_one(record, canonical, siblings)
            })
            .collect()
    }
}

impl Default for FitnessScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows right after `index` sharing its identity id, up to the first other id
fn same_identity_run(candidates: &[MasterCandidate], index: usize) -> &[MasterCandidate] {
    let id = candidates[index].id;
    let rest = &candidates[index + 1..];
    let len = rest.iter().take_while(|c| c.id == id).count();
    &rest[..len]
}

// ============================================================================
// TESTS
// ============================================================================
