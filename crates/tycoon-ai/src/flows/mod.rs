//! The five model-backed features.
//!
//! Each module owns its output schema, prompt template and local generator.

mod component;
mod contract;
mod review;
mod slogans;
mod trends;

pub use component::{local_estimate, ComponentEstimateFlow, RESEARCH_FACTOR};
pub use contract::{
    local_contract, minimal_contract, ContractFlow, CONTRACT_ID_PREFIX, PENALTY_FACTOR,
};
pub use review::{
    assess, local_review, ReviewFlow, SentimentAssessment, MAX_REVIEW_LEN, NEGATIVE_THRESHOLD,
    POSITIVE_THRESHOLD,
};
pub use slogans::{local_slogans, SloganFlow};
pub use trends::TrendFlow;
