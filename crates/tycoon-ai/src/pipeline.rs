//! Per-feature orchestration: prompt, model call, validation, repair and
//! fallback, recorded as a trail of stages.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use tycoon_core::{
    ClientContract, ComponentCostEstimate, ComponentEstimateRequest, ContractRequest,
    ModeConfiguration, OutputSchema, PhoneReview, PhoneSpecs, RandomSource, SloganRequest,
    SloganSet, TrendForecast, TrendForecastRequest, Violation,
};

use crate::client::{ModelClient, ModelError, UnavailableClient};
use crate::flows::{ComponentEstimateFlow, ContractFlow, ReviewFlow, SloganFlow, TrendFlow};
use crate::mode::GenerationMode;
use crate::prompt::Prompt;
use crate::repair::repair;

/// Upper bound on a single model call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What a feature does when the online attempt fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the error to the caller.
    Surface,
    /// Run the local generator instead.
    UseLocal,
}

/// One model-backed feature.
pub trait Flow {
    type Input: Sync;
    type Output: DeserializeOwned + Serialize + Send;

    /// Identifier used in logs and prompts.
    const NAME: &'static str;
    /// Name shown to players in error messages.
    const LABEL: &'static str;
    const ON_MODEL_FAILURE: FailurePolicy;

    fn schema() -> &'static OutputSchema;

    fn prompt(input: &Self::Input) -> Prompt;

    /// Local generator; `None` when the feature has no offline mode.
    fn local(
        input: &Self::Input,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Option<Self::Output>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Building,
    Calling,
    Validating,
    Repairing,
    FallingBack,
    Done,
    Failed,
}

/// Which path produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Model,
    RepairedModel,
    Local,
    LocalAfterModelFailure,
}

impl Source {
    pub fn is_model_derived(self) -> bool {
        matches!(self, Source::Model | Source::RepairedModel)
    }
}

/// A schema-conforming result tagged with its provenance.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome<T> {
    pub data: T,
    pub source: Source,
    pub stages: Vec<Stage>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GenerationError {
    #[error("model invocation failed: {0}")]
    ModelInvocation(#[from] ModelError),
    #[error("model output failed validation with {} violation(s)", .0.len())]
    SchemaValidation(Vec<Violation>),
    #[error("{feature} has no offline mode")]
    FallbackExhausted { feature: &'static str },
}

impl GenerationError {
    /// Player-facing text for the failure.
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::ModelInvocation(ModelError::Timeout(_)) => {
                "The AI service took too long to answer. Please try again.".to_string()
            }
            GenerationError::ModelInvocation(ModelError::RateLimited(_)) => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            GenerationError::ModelInvocation(ModelError::Authentication(_)) => {
                "The AI service rejected the configured API key.".to_string()
            }
            GenerationError::ModelInvocation(_) => {
                "The AI service is unavailable right now. Please try again later.".to_string()
            }
            GenerationError::SchemaValidation(_) => {
                "The AI returned an unusable answer. Please try again.".to_string()
            }
            GenerationError::FallbackExhausted { feature } => {
                format!("{feature} unavailable: enable online features to use it.")
            }
        }
    }
}

/// Discriminated response handed to presentation code.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> From<Result<GenerationOutcome<T>, GenerationError>> for FlowResponse<T> {
    fn from(result: Result<GenerationOutcome<T>, GenerationError>) -> Self {
        match result {
            Ok(outcome) => Self {
                ok: true,
                data: Some(outcome.data),
                source: Some(outcome.source),
                message: None,
            },
            Err(e) => Self {
                ok: false,
                data: None,
                source: None,
                message: Some(e.user_message()),
            },
        }
    }
}

/// Runs flows against one model client.
#[derive(Clone)]
pub struct Generator {
    client: Arc<dyn ModelClient>,
    timeout: Duration,
}

impl Generator {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Generator whose online attempts always fail as unavailable.
    pub fn offline() -> Self {
        Self::new(Arc::new(UnavailableClient::default()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Run one invocation of `F` under the configuration it was started with.
    pub async fn run<F: Flow>(
        &self,
        input: &F::Input,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Result<GenerationOutcome<F::Output>, GenerationError> {
        let mut trail = Trail::new(F::NAME);
        let mode = GenerationMode::select(config);
        info!(feature = F::NAME, ?mode, "generation started");

        if mode == GenerationMode::Local {
            trail.enter(Stage::FallingBack);
            return match F::local(input, config, rng) {
                Some(data) => Ok(trail.done(data, Source::Local)),
                None => {
                    trail.enter(Stage::Failed);
                    warn!(feature = F::NAME, "no offline mode");
                    Err(GenerationError::FallbackExhausted { feature: F::LABEL })
                }
            };
        }

        let failure = match self.attempt_online::<F>(input, rng, &mut trail).await {
            Ok((data, source)) => return Ok(trail.done(data, source)),
            Err(e) => e,
        };
        warn!(feature = F::NAME, error = %failure, "online attempt failed");

        match F::ON_MODEL_FAILURE {
            FailurePolicy::Surface => {
                trail.enter(Stage::Failed);
                Err(failure)
            }
            FailurePolicy::UseLocal => {
                trail.enter(Stage::FallingBack);
                match F::local(input, config, rng) {
                    Some(data) => Ok(trail.done(data, Source::LocalAfterModelFailure)),
                    None => {
                        trail.enter(Stage::Failed);
                        Err(failure)
                    }
                }
            }
        }
    }

    async fn attempt_online<F: Flow>(
        &self,
        input: &F::Input,
        rng: &mut dyn RandomSource,
        trail: &mut Trail,
    ) -> Result<(F::Output, Source), GenerationError> {
        let schema = F::schema();
        debug_assert!(schema.is_well_formed(), "malformed schema for {}", F::NAME);

        trail.enter(Stage::Building);
        let prompt = F::prompt(input);

        trail.enter(Stage::Calling);
        let raw = match tokio::time::timeout(self.timeout, self.client.complete(&prompt, schema)).await {
            Ok(reply) => reply?,
            Err(_) => return Err(ModelError::Timeout(self.timeout).into()),
        };

        trail.enter(Stage::Validating);
        if let Ok(data) = schema.validate_into::<F::Output>(&raw) {
            return Ok((data, Source::Model));
        }

        trail.enter(Stage::Repairing);
        let repaired = repair(raw, schema, rng);
        for action in &repaired.actions {
            debug!(feature = F::NAME, action = %action, "repaired model output");
        }
        schema
            .validate_into::<F::Output>(&repaired.value)
            .map(|data| (data, Source::RepairedModel))
            .map_err(GenerationError::SchemaValidation)
    }

    pub async fn generate_slogans(
        &self,
        request: &SloganRequest,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Result<GenerationOutcome<SloganSet>, GenerationError> {
        self.run::<SloganFlow>(request, config, rng).await
    }

    pub async fn generate_phone_review(
        &self,
        specs: &PhoneSpecs,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Result<GenerationOutcome<PhoneReview>, GenerationError> {
        self.run::<ReviewFlow>(specs, config, rng).await
    }

    pub async fn generate_client_contract(
        &self,
        request: &ContractRequest,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Result<GenerationOutcome<ClientContract>, GenerationError> {
        self.run::<ContractFlow>(request, config, rng).await
    }

    pub async fn forecast_trends(
        &self,
        request: &TrendForecastRequest,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Result<GenerationOutcome<TrendForecast>, GenerationError> {
        self.run::<TrendFlow>(request, config, rng).await
    }

    pub async fn estimate_component_cost(
        &self,
        request: &ComponentEstimateRequest,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Result<GenerationOutcome<ComponentCostEstimate>, GenerationError> {
        self.run::<ComponentEstimateFlow>(request, config, rng).await
    }
}

struct Trail {
    feature: &'static str,
    stages: Vec<Stage>,
}

impl Trail {
    fn new(feature: &'static str) -> Self {
        Self {
            feature,
            stages: vec![Stage::Idle],
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(feature = self.feature, ?stage, "stage");
        self.stages.push(stage);
    }

    fn done<T>(mut self, data: T, source: Source) -> GenerationOutcome<T> {
        self.enter(Stage::Done);
        info!(feature = self.feature, ?source, "generation finished");
        GenerationOutcome {
            data,
            source,
            stages: self.stages,
            generated_at: Utc::now(),
        }
    }
}
