pub mod filter;
pub mod models;
pub mod money;
pub mod orchestrator;
pub mod preferences;
pub mod ranker;
pub mod synthesizer;

pub use filter::{CandidateSet, Constraint, ConstraintFilter, FilterOutcome};
pub use models::{
    ErrorResponse, FinancialSummary, Rationale, Recommendation, RecommendationResponse, ResponseStatus,
};
pub use money::Money;
pub use orchestrator::{Orchestrator, PipelineError, PipelineReport, PipelineStage};
pub use preferences::Preferences;
pub use ranker::{RankedCandidate, RankerError, SimilarityRanker};
pub use synthesizer::RecommendationSynthesizer;
