use once_cell::sync::Lazy;
use tycoon_core::{
    FieldKind, FieldSpec, ModeConfiguration, OutputSchema, RandomSource, TrendForecast,
    TrendForecastRequest,
};

use crate::pipeline::{FailurePolicy, Flow};
use crate::prompt::{Prompt, PromptBuilder};

const NO_DATA: &str = "(no data provided)";
const HOT_OR_NOT: &[&str] = &["hot", "not"];

static SCHEMA: Lazy<OutputSchema> = Lazy::new(|| {
    let trend = FieldKind::Object {
        fields: vec![
            FieldSpec::required("feature", FieldKind::text(80)),
            FieldSpec::required("popularityRank", FieldKind::Integer { min: 1, max: 10 }),
            FieldSpec::required("hotOrNot", FieldKind::Enum(HOT_OR_NOT)),
        ],
        min_defined: 0,
    };
    OutputSchema::new("trend_forecast")
        .field(FieldSpec::required("trends", FieldKind::array_of(trend, 1, 10)))
});

/// Market trend forecasting. Model only: there is no local forecast.
pub struct TrendFlow;

impl Flow for TrendFlow {
    type Input = TrendForecastRequest;
    type Output = TrendForecast;

    const NAME: &'static str = "trend_forecast";
    const LABEL: &'static str = "Forecast";
    const ON_MODEL_FAILURE: FailurePolicy = FailurePolicy::Surface;

    fn schema() -> &'static OutputSchema {
        &SCHEMA
    }

    fn prompt(request: &TrendForecastRequest) -> Prompt {
        PromptBuilder::new(
            Self::NAME,
            "You are a consumer-electronics market analyst. Forecast which smartphone \
             features will be hot or not next season.",
        )
        .text_field("Market data", &request.market_data, NO_DATA)
        .text_field("Consumer preferences", &request.consumer_preferences, NO_DATA)
        .text_field(
            "Technological advancements",
            &request.technological_advancements,
            NO_DATA,
        )
        .text_field("Competitor analysis", &request.competitor_analysis, NO_DATA)
        .line("Return up to 10 trends. popularityRank runs from 1 (most popular) to 10.")
        .finish(&SCHEMA)
    }

    fn local(
        _request: &TrendForecastRequest,
        _config: &ModeConfiguration,
        _rng: &mut dyn RandomSource,
    ) -> Option<TrendForecast> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tycoon_core::{HotOrNot, SeededRandom};

    #[test]
    fn schema_is_well_formed() {
        assert!(SCHEMA.is_well_formed());
    }

    #[test]
    fn has_no_local_forecast() {
        let out = TrendFlow::local(
            &TrendForecastRequest::default(),
            &ModeConfiguration::default(),
            &mut SeededRandom::new(0),
        );
        assert!(out.is_none());
    }

    #[test]
    fn blank_inputs_get_placeholders() {
        let p = TrendFlow::prompt(&TrendForecastRequest {
            consumer_preferences: "Bigger batteries".to_string(),
            ..TrendForecastRequest::default()
        });
        assert!(p.text.contains("- Market data: (no data provided)"));
        assert!(p.text.contains("- Consumer preferences: Bigger batteries"));
        assert_eq!(p, TrendFlow::prompt(&TrendForecastRequest {
            consumer_preferences: "Bigger batteries".to_string(),
            ..TrendForecastRequest::default()
        }));
    }

    #[test]
    fn decodes_model_shape() {
        let raw = json!({ "trends": [{ "feature": "eSIM only", "popularityRank": 4, "hotOrNot": "not" }] });
        let f: TrendForecast = SCHEMA.validate_into(&raw).unwrap();
        assert_eq!(f.trends[0].hot_or_not, HotOrNot::Not);
        assert_eq!(f.trends[0].popularity_rank, 4);
    }
}
