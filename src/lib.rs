// Census Linkage - Core Library
// Links census component records to identities in the master registry.
// Exposes all modules for use in the CLI and tests.

pub mod record;
pub mod store;
pub mod standardize;
pub mod retrieval;
pub mod scoring;
pub mod recommend;
pub mod config;
pub mod db;
pub mod engine;

// Re-export commonly used types
pub use record::{AliasRow, ComponentRecord, ComponentRow, Field, MasterCandidate, StandardName};
pub use store::{MemoryStore, RecordStore, StoreError, StoreResult};
pub use standardize::{standardize_last_name, Standardizer, UnrecognizedName};
pub use retrieval::{CandidateRetriever, Retrieval, RetrievalStrategy};
pub use scoring::{
    decision_table, name_fitness, neighborhood_fitness, year_fitness, Agreement,
    FitnessScorer, MatchAssessment, NameFitness, YearEvidence, YearFitness,
};
pub use recommend::{
    Correctness, MatchResult, RankedMatch, Recommendation, RecommendationPolicy, Recommender,
    DEFAULT_FITNESS_THRESHOLD, NO_MATCH,
};
pub use config::{BatchRange, MatcherConfig, TableNames};
pub use db::{load_csv, setup_database, SqliteStore, StoredResult};
pub use engine::{BatchSummary, IdentifyOutcome, MatchReport, MatchingEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
