// 🏘️ Neighborhood fitness
//
// exact census neighborhood > same balia quarter > some location known > nothing known

use crate::record::{known, MasterCandidate};

pub const EXACT_NEIGHBORHOOD: f64 = 1.0;
pub const SAME_QUARTER: f64 = 0.8;
pub const NO_LOCATION_EVIDENCE: f64 = 0.65;
pub const LOCATION_MISMATCH: f64 = 0.5;

/// Score how well the candidate's known neighborhoods fit the component's.
///
/// An absent component neighborhood never counts as a match.
pub fn neighborhood_fitness(candidate: &MasterCandidate, component_nb: Option<i32>) -> f64 {
    let neighborhoods = candidate.neighborhoods();

    if let Some(nb) = component_nb {
        if neighborhoods.iter().any(|n| *n == Some(nb)) {
            return EXACT_NEIGHBORHOOD;
        }
    }

    let quarter = known(candidate.balia_quarter);
    if let (Some(quarter), Some(nb)) = (quarter, component_nb) {
        // Gonfalone codes carry the quarter in the tens digit
        if quarter == nb / 10 {
            return SAME_QUARTER;
        }
    }

    if neighborhoods.iter().any(Option::is_some) || quarter.is_some() {
        LOCATION_MISMATCH
    } else {
        NO_LOCATION_EVIDENCE
    }
}
