use once_cell::sync::Lazy;
use tycoon_core::{
    FieldKind, FieldSpec, MarketingStrategy, ModeConfiguration, OutputSchema, RandomExt,
    RandomSource, SloganRequest, SloganSet,
};

use crate::pipeline::{FailurePolicy, Flow};
use crate::prompt::{Prompt, PromptBuilder};
use crate::repair::truncate_chars;

const MAX_SLOGAN_LEN: usize = 140;
const MAX_BRAND_CHARS: usize = 60;
const BRAND_PLACEHOLDER: &str = "Your Brand";
const BRAND_SLOT: &str = "{{brand}}";

const BASE_TEMPLATES: [&str; 4] = [
    "{{brand}}: Designed Around You.",
    "Think Bigger. Think {{brand}}.",
    "{{brand}}. Power in Every Pocket.",
    "Made for Tomorrow. Made by {{brand}}.",
];

static SCHEMA: Lazy<OutputSchema> = Lazy::new(|| {
    OutputSchema::new("slogans").field(FieldSpec::required(
        "slogans",
        FieldKind::array_of(FieldKind::text(MAX_SLOGAN_LEN), 1, 8),
    ))
});

fn strategy_template(strategy: MarketingStrategy) -> &'static str {
    match strategy {
        MarketingStrategy::Budget => "{{brand}}. Premium Features, Honest Price.",
        MarketingStrategy::MassMarket => "Everyone Deserves a {{brand}}.",
        MarketingStrategy::Premium => "{{brand}}. Crafted Without Compromise.",
        MarketingStrategy::Innovation => "{{brand}}: The Future Arrives Early.",
        MarketingStrategy::Lifestyle => "Live Loud. Live {{brand}}.",
    }
}

/// Brand text safe to splice into a template.
fn brand_for_templates(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '{' | '}')).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        BRAND_PLACEHOLDER.to_string()
    } else {
        truncate_chars(cleaned, MAX_BRAND_CHARS)
    }
}

/// Three or four template slogans for the brand.
pub fn local_slogans(request: &SloganRequest, rng: &mut dyn RandomSource) -> SloganSet {
    let brand = brand_for_templates(&request.brand_name);
    let mut templates: Vec<&str> = BASE_TEMPLATES.to_vec();
    if let Some(strategy) = request.marketing_strategy {
        templates.push(strategy_template(strategy));
    }
    rng.shuffle(&mut templates);
    let take = (rng.range_u32(3, 4) as usize).min(templates.len());
    SloganSet {
        slogans: templates[..take]
            .iter()
            .map(|t| t.replace(BRAND_SLOT, &brand))
            .collect(),
    }
}

pub struct SloganFlow;

impl Flow for SloganFlow {
    type Input = SloganRequest;
    type Output = SloganSet;

    const NAME: &'static str = "slogans";
    const LABEL: &'static str = "Slogan generation";
    const ON_MODEL_FAILURE: FailurePolicy = FailurePolicy::Surface;

    fn schema() -> &'static OutputSchema {
        &SCHEMA
    }

    fn prompt(request: &SloganRequest) -> Prompt {
        let strategy = request
            .marketing_strategy
            .map(|s| s.label())
            .unwrap_or("(not specified)");
        PromptBuilder::new(
            Self::NAME,
            "You are a marketing copywriter for a smartphone company. \
             Write 3 to 5 short, memorable slogans for the brand below.",
        )
        .text_field("Brand name", &request.brand_name, "(unnamed brand)")
        .text_field("Logo", &request.logo_description, "(no logo description)")
        .field("Marketing strategy", strategy)
        .line(format!(
            "Each slogan is one line of at most {MAX_SLOGAN_LEN} characters and mentions the brand."
        ))
        .finish(&SCHEMA)
    }

    fn local(
        request: &SloganRequest,
        _config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Option<SloganSet> {
        Some(local_slogans(request, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tycoon_core::{ScriptedRandom, SeededRandom};

    fn request(brand: &str, strategy: Option<MarketingStrategy>) -> SloganRequest {
        SloganRequest {
            brand_name: brand.to_string(),
            logo_description: String::new(),
            marketing_strategy: strategy,
        }
    }

    #[test]
    fn schema_is_well_formed() {
        assert!(SCHEMA.is_well_formed());
    }

    #[test]
    fn nova_gets_three_or_four_resolved_slogans() {
        for seed in 0..32 {
            let set = local_slogans(&request("Nova", None), &mut SeededRandom::new(seed));
            assert!((3..=4).contains(&set.slogans.len()));
            for s in &set.slogans {
                assert!(!s.trim().is_empty());
                assert!(!s.contains("{{"));
                assert!(s.contains("Nova"));
            }
        }
    }

    #[test]
    fn strategy_adds_a_fifth_candidate() {
        // A low shuffle draw moves the last template to the front.
        let mut rng = ScriptedRandom::new(vec![0.0, 0.9, 0.9, 0.9, 0.99]);
        let set = local_slogans(&request("Nova", Some(MarketingStrategy::Lifestyle)), &mut rng);
        assert_eq!(set.slogans.len(), 4);
        assert!(set.slogans.contains(&"Live Loud. Live Nova.".to_string()));
    }

    #[test]
    fn blank_brand_uses_placeholder() {
        let set = local_slogans(&request("   ", None), &mut SeededRandom::new(1));
        assert!(set.slogans.iter().all(|s| s.contains("Your Brand")));
        let set = local_slogans(&request("{{brand}}", None), &mut SeededRandom::new(1));
        assert!(set.slogans.iter().all(|s| !s.contains("{{")));
    }

    #[test]
    fn stray_braces_never_form_a_slot() {
        for brand in ["{}}{", "{{{}}}", "{{br}}and}}", "N{o}va"] {
            for seed in 0..8 {
                let set = local_slogans(&request(brand, None), &mut SeededRandom::new(seed));
                for s in &set.slogans {
                    assert!(!s.contains("{{"), "{brand:?} gave {s:?}");
                    assert!(!s.contains("}}"), "{brand:?} gave {s:?}");
                }
            }
        }
        let set = local_slogans(&request("N{o}va", None), &mut SeededRandom::new(3));
        assert!(set.slogans.iter().all(|s| s.contains("Nova")));
    }

    #[test]
    fn prompt_is_deterministic() {
        let r = request("Nova", Some(MarketingStrategy::Premium));
        assert_eq!(SloganFlow::prompt(&r), SloganFlow::prompt(&r));
        assert!(SloganFlow::prompt(&r).text.contains("premium luxury positioning"));
    }

    proptest! {
        #[test]
        fn local_output_always_validates(brand in ".{0,200}", seed in any::<u64>(), strat in 0usize..6) {
            let strategy = [
                MarketingStrategy::Budget,
                MarketingStrategy::MassMarket,
                MarketingStrategy::Premium,
                MarketingStrategy::Innovation,
                MarketingStrategy::Lifestyle,
            ]
            .get(strat)
            .copied();
            let set = local_slogans(&request(&brand, strategy), &mut SeededRandom::new(seed));
            prop_assert!(set.slogans.iter().all(|s| !s.contains("{{")));
            let raw = serde_json::to_value(&set).unwrap();
            prop_assert!(SCHEMA.validate(&raw).is_empty());
        }

        #[test]
        fn brace_heavy_brands_resolve(brand in "[{}a ]{0,24}", seed in any::<u64>()) {
            let set = local_slogans(&request(&brand, None), &mut SeededRandom::new(seed));
            prop_assert!(set.slogans.iter().all(|s| !s.contains("{{")));
        }
    }
}
