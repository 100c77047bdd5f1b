use once_cell::sync::Lazy;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use tycoon_core::{
    ComponentCostEstimate, ComponentEstimateRequest, CrossFieldRule, FieldKind, FieldSpec,
    ModeConfiguration, OutputSchema, RandomExt, RandomSource, Tier,
};
use tycoon_econ::{baseline_component_cost, ceil_cents, difficulty_cost_multiplier, round_cents};

use crate::pipeline::{FailurePolicy, Flow};
use crate::prompt::{Prompt, PromptBuilder};
use crate::repair::truncate_chars;

/// Research must cost at least this multiple of the unit cost.
pub const RESEARCH_FACTOR: f64 = 10.0;
const MIN_UNIT_COST: i64 = 1;
const MAX_UNIT_COST: i64 = 400;
const MAX_RATIONALE_LEN: usize = 300;

static SCHEMA: Lazy<OutputSchema> = Lazy::new(|| {
    OutputSchema::new("component_estimate")
        .field(FieldSpec::required(
            "unitCost",
            FieldKind::money(MIN_UNIT_COST as f64, Some(MAX_UNIT_COST as f64)),
        ))
        .field(FieldSpec::required("researchCost", FieldKind::money(0.0, None)))
        .field(
            FieldSpec::required("researchDays", FieldKind::Integer { min: 3, max: 60 })
                .with_default(json!(14)),
        )
        .field(
            FieldSpec::required("rationale", FieldKind::text(MAX_RATIONALE_LEN))
                .with_default(json!("Estimate based on comparable components.")),
        )
        .rule(CrossFieldRule::AtLeastMultiple {
            primary: "unitCost",
            secondary: "researchCost",
            factor: RESEARCH_FACTOR,
        })
});

fn research_days_band(tier: Tier) -> (u32, u32) {
    match tier {
        Tier::Budget => (3, 10),
        Tier::Midrange => (7, 20),
        Tier::Upper => (14, 35),
        Tier::Flagship => (25, 60),
    }
}

fn decimal(x: f64) -> Decimal {
    Decimal::from_f64(x).unwrap_or(Decimal::ONE)
}

/// Baseline-driven estimate with market noise and difficulty scaling.
pub fn local_estimate(
    request: &ComponentEstimateRequest,
    config: &ModeConfiguration,
    rng: &mut dyn RandomSource,
) -> ComponentCostEstimate {
    let baseline = baseline_component_cost(request.category, request.tier);
    let noise = decimal(rng.range_f64(0.9, 1.1));
    let unit_cost = round_cents(baseline * noise * difficulty_cost_multiplier(config.difficulty))
        .clamp(Decimal::from(MIN_UNIT_COST), Decimal::from(MAX_UNIT_COST));

    let multiple = decimal(rng.range_f64(12.0, 20.0));
    let research_cost = ceil_cents((unit_cost * multiple).max(unit_cost * decimal(RESEARCH_FACTOR)));

    let (lo, hi) = research_days_band(request.tier);
    let research_days = rng.range_u32(lo, hi);

    let name = match request.component_name.trim() {
        "" => "this component",
        n => n,
    };
    let rationale = format!(
        "{} {} parts like {name} start near ${} per unit; adjusted for supplier variance \
         and {:?} difficulty.",
        request.tier.as_str(),
        request.category.as_str(),
        round_cents(baseline),
        config.difficulty,
    );

    ComponentCostEstimate {
        unit_cost,
        research_cost,
        research_days,
        rationale: truncate_chars(&rationale, MAX_RATIONALE_LEN),
    }
}

/// Unit and research cost of a newly researched component.
pub struct ComponentEstimateFlow;

impl Flow for ComponentEstimateFlow {
    type Input = ComponentEstimateRequest;
    type Output = ComponentCostEstimate;

    const NAME: &'static str = "component_estimate";
    const LABEL: &'static str = "Component estimate";
    const ON_MODEL_FAILURE: FailurePolicy = FailurePolicy::UseLocal;

    fn schema() -> &'static OutputSchema {
        &SCHEMA
    }

    fn prompt(request: &ComponentEstimateRequest) -> Prompt {
        PromptBuilder::new(
            Self::NAME,
            "You are a hardware sourcing analyst. Estimate the production economics of \
             the smartphone component below.",
        )
        .text_field("Component", &request.component_name, "(unnamed component)")
        .field("Category", request.category.as_str())
        .field("Market tier", request.tier.as_str())
        .text_field("Description", &request.description, "(no description)")
        .line(format!(
            "unitCost is in USD between {MIN_UNIT_COST} and {MAX_UNIT_COST}. researchCost is at \
             least {RESEARCH_FACTOR} times unitCost. researchDays is between 3 and 60."
        ))
        .finish(&SCHEMA)
    }

    fn local(
        request: &ComponentEstimateRequest,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Option<ComponentCostEstimate> {
        Some(local_estimate(request, config, rng))
    }
}
