// 📅 Year fitness - Is the observation year plausible for this identity's lifetime?
//
// Evidence: birth year, death year and a bag of "active" years (marriages,
// guild matriculations, offices, tax censuses, other records).
// All window comparisons are strict.

use crate::record::{known, MasterCandidate};
use serde::{Deserialize, Serialize};

// Windows after birth
const BIRTH_FULL: i32 = 60;
const BIRTH_LIKELY: i32 = 80;
const BIRTH_POSSIBLE: i32 = 90;

// Windows before death
const DEATH_FULL: i32 = 50;
const DEATH_LIKELY: i32 = 70;
const DEATH_POSSIBLE: i32 = 80;

// Windows around the active years
const ACTIVE_FULL: i32 = 50;
const ACTIVE_LIKELY: i32 = 65;
const ACTIVE_POSSIBLE: i32 = 80;

/// The year-bearing evidence for one identity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearEvidence {
    pub birth: Option<i32>,
    pub death: Option<i32>,
    /// Unordered; may contain duplicates
    pub active_years: Vec<i32>,
}

impl YearEvidence {
    /// Gather evidence from the canonical row and its same-identity siblings.
    ///
    /// Siblings only contribute marriage years.
    pub fn gather(canonical: &MasterCandidate, siblings: &[MasterCandidate]) -> Self {
        let mut years = Vec::new();

        // Marriages
        years.extend(known(canonical.marr));
        years.extend(siblings.iter().filter_map(|s| known(s.marr)));

        // Guild matriculation
        years.extend(
            [
                canonical.lanam,
                canonical.ritagl_matr,
                canonical.silkm,
                canonical.calimm,
                canonical.cambm,
            ]
            .into_iter()
            .filter_map(known),
        );

        // Political offices
        years.extend(
            [
                canonical.prior1,
                canonical.buonuomini1,
                canonical.gonfalonieri1,
                canonical.balia1,
                canonical.consultepratiche1,
                canonical.acapir1,
                canonical.capitani1,
            ]
            .into_iter()
            .filter_map(known),
        );

        // Tax censuses: presence in the census dates the person
        // (the 1458 census itself is excluded)
        let censuses = [
            (canonical.ngh351, 1351),
            (canonical.ngh378, 1378),
            (canonical.ngh403, 1403),
            (canonical.qt403, 1403),
            (canonical.ngh427, 1427),
            (canonical.ngh480, 1480),
        ];
        years.extend(appearances(&censuses));

        // Other records carrying a year
        years.extend(known(canonical.mercanzia));
        years.extend(known(canonical.lana).map(|y| if y < 1000 { y + 1000 } else { y }));
        years.extend(known(canonical.calim1));
        years.extend(known(canonical.fpart));
        years.extend(known(canonical.nc427).map(|_| 1427));
        years.extend(
            [
                canonical.calimcon1,
                canonical.cambcons1,
                canonical.lanacons1,
                canonical.setacons1,
            ]
            .into_iter()
            .filter_map(known),
        );

        let flagged = [
            (canonical.antmed_66, 1466),
            (canonical.mediceans_49, 1449),
            (canonical.scrut363ngh, 1363),
            (canonical.scrut382ngh, 1382),
            (canonical.scrut392ngh, 1392),
            (canonical.scrut411ngh, 1411),
            (canonical.scrut433ngh, 1433),
        ];
        years.extend(appearances(&flagged));

        YearEvidence {
            birth: known(canonical.byr_augm),
            death: known(canonical.dyr),
            active_years: years,
        }
    }

    /// True when there is no temporal evidence at all
    pub fn is_empty(&self) -> bool {
        self.birth.is_none() && self.death.is_none() && self.active_years.is_empty()
    }
}

fn appearances(sources: &[(Option<i32>, i32)]) -> impl Iterator<Item = i32> + '_ {
    sources
        .iter()
        .filter(|(value, _)| known(*value).is_some())
        .map(|(_, year)| *year)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearFitness {
    pub score: f64,
    /// No birth, death or active year existed
    pub no_years: bool,
}

fn between(low: i32, year: i32, high: i32) -> bool {
    low < year && year < high
}

/// Tiered score: the first window containing the year wins
fn tiered(full: bool, likely: bool, possible: bool) -> f64 {
    if full {
        1.0
    } else if likely {
        0.75
    } else if possible {
        0.5
    } else {
        0.0
    }
}

pub fn year_fitness(evidence: &YearEvidence, year: i32) -> YearFitness {
    let active_min = evidence.active_years.iter().copied().min();
    let active_max = evidence.active_years.iter().copied().max();
    let active = active_min.zip(active_max);

    let score = match (evidence.birth, evidence.death, active) {
        (Some(birth), Some(death), _) => {
            if between(birth, year, death) {
                1.0
            } else {
                0.0
            }
        }
        (Some(birth), None, Some((_, max))) => tiered(
            between(birth, year, max) || between(birth, year, birth + BIRTH_FULL),
            between(birth, year, birth + BIRTH_LIKELY),
            between(birth, year, birth + BIRTH_POSSIBLE),
        ),
        (Some(birth), None, None) => tiered(
            between(birth, year, birth + BIRTH_FULL),
            between(birth, year, birth + BIRTH_LIKELY),
            between(birth, year, birth + BIRTH_POSSIBLE),
        ),
        (None, Some(death), Some((min, _))) => tiered(
            between(min, year, death) || between(death - DEATH_FULL, year, death),
            between(death - DEATH_LIKELY, year, death),
            between(death - DEATH_POSSIBLE, year, death),
        ),
        (None, Some(death), None) => tiered(
            between(death - DEATH_FULL, year, death),
            between(death - DEATH_LIKELY, year, death),
            between(death - DEATH_POSSIBLE, year, death),
        ),
        (None, None, Some((min, max))) => tiered(
            between(max - ACTIVE_FULL, year, min + ACTIVE_FULL),
            between(max - ACTIVE_LIKELY, year, min + ACTIVE_LIKELY),
            between(max - ACTIVE_POSSIBLE, year, min + ACTIVE_POSSIBLE),
        ),
        (None, None, None) => {
            return YearFitness {
                score: 0.0,
                no_years: true,
            }
        }
    };

    YearFitness {
        score,
        no_years: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(birth: Option<i32>, death: Option<i32>, active: &[i32]) -> YearEvidence {
        YearEvidence {
            birth,
            death,
            active_years: active.to_vec(),
        }
    }

    #[test]
    fn test_birth_and_death_bracket() {
        assert_eq!(year_fitness(&evidence(Some(1400), Some(1470), &[]), 1458).score, 1.0);
        assert_eq!(year_fitness(&evidence(Some(1400), Some(1458), &[]), 1458).score, 0.0);
        assert_eq!(year_fitness(&evidence(Some(1460), Some(1500), &[1470]), 1458).score, 0.0);
    }

    #[test]
    fn test_birth_only_tiers() {
        let at = |birth| year_fitness(&evidence(Some(birth), None, &[]), 1458).score;
        assert_eq!(at(1420), 1.0);
        assert_eq!(at(1398), 0.75); // exactly 60 years: outside the full window
        assert_eq!(at(1380), 0.75);
        assert_eq!(at(1378), 0.5);
        assert_eq!(at(1368), 0.0);
        assert_eq!(at(1458), 0.0);
    }

    #[test]
    fn test_birth_with_late_active_year() {
        // 88 years after birth but still before the last recorded activity
        let fit = year_fitness(&evidence(Some(1370), None, &[1400, 1460]), 1458);
        assert_eq!(fit.score, 1.0);
        let fit = year_fitness(&evidence(Some(1370), None, &[1400]), 1458);
        assert_eq!(fit.score, 0.5);
    }

    #[test]
    fn test_death_only_tiers() {
        let at = |death| year_fitness(&evidence(None, Some(death), &[]), 1458).score;
        assert_eq!(at(1480), 1.0);
        assert_eq!(at(1520), 0.75);
        assert_eq!(at(1530), 0.5);
        assert_eq!(at(1538), 0.0);
        assert_eq!(at(1458), 0.0);
    }

    #[test]
    fn test_death_with_early_active_year() {
        let fit = year_fitness(&evidence(None, Some(1530), &[1440]), 1458);
        assert_eq!(fit.score, 1.0);
    }

    #[test]
    fn test_active_years_only() {
        let at = |active: &[i32]| year_fitness(&evidence(None, None, active), 1458).score;
        assert_eq!(at(&[1427, 1433]), 1.0);
        assert_eq!(at(&[1400]), 0.75);
        assert_eq!(at(&[1385]), 0.5);
        assert_eq!(at(&[1351]), 0.0);
        // Wide spread: the window narrows from both ends
        assert_eq!(at(&[1351, 1480]), 0.0);
    }

    #[test]
    fn test_no_years_flag() {
        let fit = year_fitness(&YearEvidence::default(), 1458);
        assert!(fit.no_years);
        assert_eq!(fit.score, 0.0);

        let fit = year_fitness(&evidence(None, None, &[1200]), 1458);
        assert!(!fit.no_years);
    }

    #[test]
    fn test_gather_collects_every_source() {
        let canonical = MasterCandidate {
            id: 7,
            casen: 1,
            byr_augm: Some(1400),
            dyr: Some(0),
            marr: Some(1425),
            silkm: Some(1422),
            prior1: Some(1445),
            ngh427: Some(12),
            qt403: Some(2),
            lana: Some(431),
            nc427: Some(1),
            antmed_66: Some(1),
            scrut433ngh: Some(12),
            ..Default::default()
        };
        let siblings = vec![MasterCandidate {
            id: 7,
            casen: 2,
            marr: Some(1440),
            prior1: Some(1499),
            ..Default::default()
        }];

        let evidence = YearEvidence::gather(&canonical, &siblings);

        assert_eq!(evidence.birth, Some(1400));
        assert_eq!(evidence.death, None);
        let mut years = evidence.active_years.clone();
        years.sort_unstable();
        assert_eq!(
            years,
            vec![1403, 1422, 1425, 1427, 1427, 1431, 1433, 1440, 1445, 1466]
        );
    }

    #[test]
    fn test_value_set_is_closed() {
        let allowed = [0.0, 0.5, 0.75, 1.0];
        for birth in [None, Some(1380), Some(1400), Some(1450)] {
            for death in [None, Some(1460), Some(1520)] {
                for active in [&[][..], &[1390][..], &[1400, 1470][..]] {
                    let score = year_fitness(&evidence(birth, death, active), 1458).score;
                    assert!(allowed.contains(&score));
                }
            }
        }
    }
}
