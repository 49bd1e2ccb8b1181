// 🪪 Name fitness - (last, first, middle) decision table + second middle name adjustment

use crate::record::{known_text, ComponentRecord, MasterCandidate};
use serde::{Deserialize, Serialize};

/// Adjustment applied for second-middle-name agreement / disagreement
pub const SECOND_MIDDLE_ADJUSTMENT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Agreement {
    Agree,
    Disagree,
    /// Missing on either side
    Indeterminate,
}

use Agreement::{Agree, Disagree, Indeterminate};

impl Agreement {
    pub const ALL: [Agreement; 3] = [Agree, Disagree, Indeterminate];

    /// Last names agree when the component's is contained in the registry's
    pub fn by_containment(component: Option<&str>, candidate: &Option<String>) -> Self {
        match (component, known_text(candidate)) {
            (Some(c), Some(m)) if !c.is_empty() => {
                if m.to_lowercase().contains(c) {
                    Agree
                } else {
                    Disagree
                }
            }
            _ => Indeterminate,
        }
    }

    /// Given names agree on case-insensitive equality
    pub fn by_equality(component: Option<&str>, candidate: &Option<String>) -> Self {
        match (component, known_text(candidate)) {
            (Some(c), Some(m)) => {
                if m.to_lowercase() == c {
                    Agree
                } else {
                    Disagree
                }
            }
            _ => Indeterminate,
        }
    }
}

/// The decision table over (last, first, middle).
///
/// `None` means the pattern is unclassifiable and the name fitness is 0.
pub fn decision_table(last: Agreement, first: Agreement, middle: Agreement) -> Option<f64> {
    match (last, first, middle) {
        (Agree, Agree, Agree) => Some(1.0),
        (Agree, Agree, Indeterminate) => Some(0.85),
        (Indeterminate, Agree, Agree) => Some(0.7),
        (Disagree, Agree, Agree) => Some(0.5),
        (Agree, Disagree, Agree) => Some(0.5),
        (Agree, Agree, Disagree) => Some(0.5),

        // first name does not agree (except the single-disagreement row above)
        (_, Disagree | Indeterminate, _) => None,
        // first name agrees but neither last nor middle does
        (Indeterminate | Disagree, Agree, Indeterminate | Disagree) => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameFitness {
    pub last: Agreement,
    pub first: Agreement,
    pub middle: Agreement,
    pub second_middle: Agreement,
    /// False when the (last, first, middle) pattern is not in the table
    pub classified: bool,
    pub score: f64,
}

pub fn name_fitness(record: &ComponentRecord, candidate: &MasterCandidate) -> NameFitness {
    let last = Agreement::by_containment(record.last_name.standardized_str(), &candidate.mlname);
    let first = Agreement::by_equality(record.first_name.standardized_str(), &candidate.smfname);
    let middle = Agreement::by_equality(record.middle_name.standardized_str(), &candidate.smmname);
    let second_middle = Agreement::by_equality(
        record.second_middle_name.standardized_str(),
        &candidate.smm2name,
    );

    let (classified, score) = match decision_table(last, first, middle) {
        Some(base) => {
            let adjusted = match second_middle {
                Agree => base + SECOND_MIDDLE_ADJUSTMENT,
                Disagree => base - SECOND_MIDDLE_ADJUSTMENT,
                Indeterminate => base,
            };
            (true, adjusted)
        }
        None => (false, 0.0),
    };

    NameFitness {
        last,
        first,
        middle,
        second_middle,
        classified,
        score,
    }
}
