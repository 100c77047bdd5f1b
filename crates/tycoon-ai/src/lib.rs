#![deny(warnings)]

//! Generation pipeline for Phone Tycoon's model-backed features.
//!
//! Every feature runs the same sequence: build a prompt, call the model under
//! a timeout, validate the reply against the feature schema, repair what can
//! be repaired, and fall back to a local generator when the feature has one.
//! Offline mode skips the model entirely.

pub mod client;
pub mod flows;
pub mod http;
pub mod mode;
pub mod pipeline;
pub mod prompt;
pub mod repair;

pub use client::{classify_status, parse_model_json, ModelClient, ModelError, UnavailableClient};
pub use flows::{
    ComponentEstimateFlow, ContractFlow, ReviewFlow, SentimentAssessment, SloganFlow, TrendFlow,
};
pub use http::{HttpModelClient, ModelSettings};
pub use mode::GenerationMode;
pub use pipeline::{
    FailurePolicy, Flow, FlowResponse, GenerationError, GenerationOutcome, Generator, Source,
    Stage, DEFAULT_TIMEOUT,
};
pub use prompt::{Prompt, PromptBuilder};
pub use repair::{repair, RepairOutcome};
