// 🏆 Recommender - Pick the identity (or identities) to propose for a component record
//
// Two policies:
// - StrictBest: every identity tied at the single best fitness ≥ threshold
// - RankedList: every identity ≥ threshold, best first, the top one recommended

use crate::scoring::MatchAssessment;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_FITNESS_THRESHOLD: f64 = 0.5;

// ============================================================================
// POLICY
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPolicy {
    #[default]
    StrictBest,
    RankedList,
}

impl RecommendationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationPolicy::StrictBest => "strict_best",
            RecommendationPolicy::RankedList => "ranked_list",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strict_best" => Some(RecommendationPolicy::StrictBest),
            "ranked_list" => Some(RecommendationPolicy::RankedList),
            _ => None,
        }
    }
}

// ============================================================================
// RESULT
// ============================================================================

pub const NO_MATCH: &str = "No Matches";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Recommendation {
    NoMatch,
    Single(i64),
    /// Several identities tied at the best fitness
    Tied(Vec<i64>),
}

impl Recommendation {
    pub fn ids(&self) -> &[i64] {
        match self {
            Recommendation::NoMatch => &[],
            Recommendation::Single(id) => std::slice::from_ref(id),
            Recommendation::Tied(ids) => ids,
        }
    }

    /// Inverse of `Display`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == NO_MATCH || s.is_empty() {
            return Some(Recommendation::NoMatch);
        }
        let ids = s
            .split_whitespace()
            .map(|part| part.parse::<i64>().ok())
            .collect::<Option<Vec<_>>>()?;
        match ids.as_slice() {
            [id] => Some(Recommendation::Single(*id)),
            _ => Some(Recommendation::Tied(ids)),
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::NoMatch => f.write_str(NO_MATCH),
            Recommendation::Single(id) => write!(f, "{}", id),
            Recommendation::Tied(ids) => {
                let joined: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                f.write_str(&joined.join("  "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Correctness {
    Correct,
    Incorrect,
    /// Retrieval found no candidates at all
    NoCandidates,
}

impl Correctness {
    pub fn code(&self) -> i64 {
        match self {
            Correctness::Correct => 1,
            Correctness::Incorrect => 0,
            Correctness::NoCandidates => -1,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Correctness::Correct),
            0 => Some(Correctness::Incorrect),
            -1 => Some(Correctness::NoCandidates),
            _ => None,
        }
    }

    fn from_bool(correct: bool) -> Self {
        if correct {
            Correctness::Correct
        } else {
            Correctness::Incorrect
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub id: i64,
    pub fitness: f64,
}

/// Final output for one component record. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub line_num: i64,
    pub recommendation: Recommendation,
    /// Fitness of the recommendation (ranked-list policy only)
    pub fitness: Option<f64>,
    pub ground_truth: i64,
    pub correct: Correctness,
    /// Every qualifying identity, best first (ranked-list policy only)
    pub ranked: Option<Vec<RankedMatch>>,
    pub policy: RecommendationPolicy,
}

impl MatchResult {
    /// Ranked list as "id:fitness, id:fitness"
    pub fn ranked_string(&self) -> Option<String> {
        self.ranked.as_ref().map(|ranked| format_ranked(ranked))
    }
}

pub fn format_ranked(ranked: &[RankedMatch]) -> String {
    ranked
        .iter()
        .map(|m| format!("{}:{}", m.id, m.fitness))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn parse_ranked(s: &str) -> Option<Vec<RankedMatch>> {
    if s.trim().is_empty() {
        return Some(Vec::new());
    }
    s.split(", ")
        .map(|entry| {
            let (id, fitness) = entry.split_once(':')?;
            Some(RankedMatch {
                id: id.trim().parse().ok()?,
                fitness: fitness.trim().parse().ok()?,
            })
        })
        .collect()
}

// ============================================================================
// RECOMMENDER
// ============================================================================

pub struct Recommender {
    pub policy: RecommendationPolicy,

    /// Minimum overall fitness for an identity to be recommended (default: 0.5)
    pub threshold: f64,
}

impl Recommender {
    pub fn new(policy: RecommendationPolicy) -> Self {
        Recommender {
            policy,
            threshold: DEFAULT_FITNESS_THRESHOLD,
        }
    }

    pub fn with_threshold(policy: RecommendationPolicy, threshold: f64) -> Self {
        Recommender { policy, threshold }
    }

    /// Build the result for one record.
    ///
    /// `assessments` is `None` when retrieval produced no candidates at all.
    pub fn recommend(
        &self,
        line_num: i64,
        ground_truth: i64,
        assessments: Option<&[MatchAssessment]>,
    ) -> MatchResult {
        let Some(assessments) = assessments else {
            return MatchResult {
                line_num,
                recommendation: Recommendation::NoMatch,
                fitness: None,
                ground_truth,
                correct: Correctness::NoCandidates,
                ranked: None,
                policy: self.policy,
            };
        };

        match self.policy {
            RecommendationPolicy::StrictBest => {
                self.strict_best(line_num, ground_truth, assessments)
            }
            RecommendationPolicy::RankedList => {
                self.ranked_list(line_num, ground_truth, assessments)
            }
        }
    }

    /// Distinct identities at or above the threshold, in candidate order
    fn qualifying(&self, assessments: &[MatchAssessment]) -> Vec<RankedMatch> {
        let mut qualifying: Vec<RankedMatch> = Vec::new();
        for a in assessments.iter().filter(|a| a.overall >= self.threshold) {
            match qualifying.iter_mut().find(|m| m.id == a.candidate_id) {
                Some(existing) => existing.fitness = a.overall,
                None => qualifying.push(RankedMatch {
                    id: a.candidate_id,
                    fitness: a.overall,
                }),
            }
        }
        qualifying
    }

    fn strict_best(
        &self,
        line_num: i64,
        ground_truth: i64,
        assessments: &[MatchAssessment],
    ) -> MatchResult {
        let qualifying = self.qualifying(assessments);
        let best = qualifying
            .iter()
            .map(|m| m.fitness)
            .fold(f64::NEG_INFINITY, f64::max);
        let best_ids: Vec<i64> = qualifying
            .iter()
            .filter(|m| m.fitness == best)
            .map(|m| m.id)
            .collect();

        let (recommendation, correct) = match best_ids.as_slice() {
            [] => {
                // Identities without any dated evidence are not held against us
                let truth_had_no_years = assessments
                    .iter()
                    .any(|a| a.candidate_id == ground_truth && a.no_years());
                (
                    Recommendation::NoMatch,
                    Correctness::from_bool(truth_had_no_years),
                )
            }
            [id] => (
                Recommendation::Single(*id),
                Correctness::from_bool(*id == ground_truth),
            ),
            ids => (
                Recommendation::Tied(ids.to_vec()),
                Correctness::from_bool(ids.contains(&ground_truth)),
            ),
        };

        MatchResult {
            line_num,
            recommendation,
            fitness: None,
            ground_truth,
            correct,
            ranked: None,
            policy: self.policy,
        }
    }

    fn ranked_list(
        &self,
        line_num: i64,
        ground_truth: i64,
        assessments: &[MatchAssessment],
    ) -> MatchResult {
        let mut ranked = self.qualifying(assessments);
        // Stable: equal fitness keeps candidate order
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let (recommendation, fitness, correct) = match ranked.first() {
            Some(top) => (
                Recommendation::Single(top.id),
                Some(top.fitness),
                Correctness::from_bool(top.id == ground_truth),
            ),
            None => (Recommendation::NoMatch, None, Correctness::Incorrect),
        };

        MatchResult {
            line_num,
            recommendation,
            fitness,
            ground_truth,
            correct,
            ranked: Some(ranked),
            policy: self.policy,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
