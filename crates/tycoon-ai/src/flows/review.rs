use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde_json::json;
use tycoon_core::{
    FieldKind, FieldSpec, Material, ModeConfiguration, OutputSchema, PhoneReview, PhoneSpecs,
    RandomExt, RandomSource, RefreshRate, Sentiment, Tier,
};
use tycoon_econ::{round_cents, value_ratio};

use crate::pipeline::{FailurePolicy, Flow};
use crate::prompt::{Prompt, PromptBuilder};
use crate::repair::truncate_chars;

pub const MAX_REVIEW_LEN: usize = 600;
const MAX_POINT_LEN: usize = 120;
const MAX_POINTS: usize = 5;

/// Scores at or above this read as a positive review.
pub const POSITIVE_THRESHOLD: f64 = 3.0;
/// Scores at or below this read as a negative review.
pub const NEGATIVE_THRESHOLD: f64 = -1.5;

static SCHEMA: Lazy<OutputSchema> = Lazy::new(|| {
    OutputSchema::new("phone_review")
        .field(FieldSpec::required("reviewText", FieldKind::text(MAX_REVIEW_LEN)))
        .field(FieldSpec::required(
            "pros",
            FieldKind::array_of(FieldKind::text(MAX_POINT_LEN), 1, MAX_POINTS),
        ))
        .field(FieldSpec::required(
            "cons",
            FieldKind::array_of(FieldKind::text(MAX_POINT_LEN), 1, MAX_POINTS),
        ))
        .field(
            FieldSpec::required("overallSentiment", FieldKind::Enum(&Sentiment::TOKENS))
                .with_default(json!("Neutral")),
        )
});

/// Rule-based read of a design before any text is written.
#[derive(Clone, Debug, PartialEq)]
pub struct SentimentAssessment {
    pub score: f64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

impl SentimentAssessment {
    pub fn sentiment(&self) -> Sentiment {
        if self.score >= POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if self.score <= NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    fn pro(&mut self, weight: f64, text: impl Into<String>) {
        self.score += weight;
        self.pros.push(text.into());
    }

    fn con(&mut self, weight: f64, text: impl Into<String>) {
        self.score -= weight;
        self.cons.push(text.into());
    }
}

/// Accumulate the sentiment score and talking points for `specs`.
pub fn assess(specs: &PhoneSpecs) -> SentimentAssessment {
    let mut a = SentimentAssessment {
        score: 0.0,
        pros: Vec::new(),
        cons: Vec::new(),
    };
    let chip = specs.processor.label();
    let tier = specs.processor.tier();

    match tier {
        Tier::Flagship => a.pro(2.0, format!("Flagship-class {chip} performance")),
        Tier::Upper => a.pro(1.0, format!("Fast {chip} handles anything you throw at it")),
        Tier::Midrange => {}
        Tier::Budget => a.con(1.0, format!("{chip} struggles with heavy apps and games")),
    }

    match specs.ram {
        r if r >= 12 => a.pro(1.0, format!("Generous {r} GB of RAM")),
        r if r >= 8 => a.pro(0.5, format!("Comfortable {r} GB of RAM")),
        r if r <= 4 => a.con(1.0, format!("Only {r} GB of RAM")),
        _ => {}
    }

    match specs.storage {
        s if s >= 512 => a.pro(1.0, format!("Huge {s} GB of storage")),
        s if s >= 256 => a.pro(0.5, format!("Plenty of room with {s} GB of storage")),
        s if s <= 64 => a.con(1.0, format!("Cramped {s} GB of storage")),
        _ => {}
    }

    match specs.camera_resolution {
        mp if mp >= 100 => a.pro(1.0, format!("Stunning {mp} MP main camera")),
        mp if mp >= 48 => a.pro(0.5, format!("Sharp {mp} MP main camera")),
        mp if mp < 24 => a.con(1.0, format!("Dated {mp} MP camera")),
        _ => {}
    }

    match specs.battery_capacity {
        mah if mah >= 5000 => a.pro(1.0, format!("All-day {mah} mAh battery")),
        mah if mah < 3500 => a.con(1.0, format!("Small {mah} mAh battery")),
        _ => {}
    }

    match specs.refresh_rate {
        RefreshRate::Hz120 | RefreshRate::Hz144 => a.pro(
            0.5,
            format!("Silky {} Hz display", specs.refresh_rate.hz()),
        ),
        RefreshRate::Hz60 => a.con(0.5, "Display is stuck at 60 Hz"),
        RefreshRate::Hz90 => {}
    }

    match specs.material {
        Material::Titanium => a.pro(1.0, "Premium titanium build"),
        Material::Glass | Material::Aluminum => {
            a.pro(0.5, format!("Solid {} build", specs.material.as_str()))
        }
        Material::Plastic => a.con(0.5, "Plastic body feels cheap"),
    }

    if specs.nfc_support {
        a.pro(0.25, "NFC for contactless payments");
    }
    if specs.has_ois {
        a.pro(0.5, "Optical image stabilization keeps shots steady");
    }
    for feature in specs
        .special_features
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .take(2)
    {
        a.pro(0.25, format!("Extras like {feature}"));
    }

    let cost = specs.unit_manufacturing_cost;
    match specs.selling_price.map(|price| value_ratio(price, cost)) {
        Some(Ok(ratio)) if ratio > 3.0 => a.con(1.5, "Hard to justify the asking price"),
        Some(Ok(ratio)) if ratio < 1.3 => a.pro(1.0, "Exceptional value for money"),
        Some(_) => {}
        None => {
            if cost <= Decimal::from(200) && tier >= Tier::Upper {
                a.pro(1.0, "High-end hardware at a surprisingly low build cost");
            } else if cost >= Decimal::from(600) {
                a.con(1.0, "Expensive to build, which will show in the price");
            }
        }
    }

    a
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReviewStyle {
    Enthusiast,
    Analyst,
    Skeptic,
}

const STYLES: [ReviewStyle; 3] = [
    ReviewStyle::Enthusiast,
    ReviewStyle::Analyst,
    ReviewStyle::Skeptic,
];

fn review_text(style: ReviewStyle, sentiment: Sentiment, specs: &PhoneSpecs) -> String {
    let name = match specs.name.trim() {
        "" => "this phone",
        n => n,
    };
    let chip = specs.processor.label();
    let cost = round_cents(specs.unit_manufacturing_cost);
    let text = match (style, sentiment) {
        (ReviewStyle::Enthusiast, Sentiment::Positive) => format!(
            "Wow. {name} is the real deal. The {chip} flies, the {} MP camera nails every shot, \
             and the {} mAh battery just keeps going. This is the phone to beat this year.",
            specs.camera_resolution, specs.battery_capacity
        ),
        (ReviewStyle::Enthusiast, Sentiment::Neutral) => format!(
            "There is a lot to like about {name}. The {chip} keeps things moving and the \
             {} GB of RAM helps, but a few compromises hold it back from greatness.",
            specs.ram
        ),
        (ReviewStyle::Enthusiast, Sentiment::Negative) => format!(
            "I really wanted to love {name}, but it never clicks. The {chip} feels sluggish \
             and the hardware choices leave too much on the table."
        ),
        (ReviewStyle::Analyst, Sentiment::Positive) => format!(
            "On paper and in testing, {name} delivers. {chip}, {} GB RAM, {} GB storage and a \
             {} Hz panel form a balanced package built for about ${cost} per unit.",
            specs.ram,
            specs.storage,
            specs.refresh_rate.hz()
        ),
        (ReviewStyle::Analyst, Sentiment::Neutral) => format!(
            "{name} is a measured design. The {chip} and {} GB of storage cover the basics, \
             though the spec sheet rarely stands out against rivals.",
            specs.storage
        ),
        (ReviewStyle::Analyst, Sentiment::Negative) => format!(
            "The numbers do not add up for {name}. Its {chip} and {} mAh battery trail the \
             segment, and a ${cost} build cost leaves little room to compete.",
            specs.battery_capacity
        ),
        (ReviewStyle::Skeptic, Sentiment::Positive) => format!(
            "I went in doubtful and came out impressed. {name} backs its claims with a {chip} \
             and a {} build that feels worth the money.",
            specs.material.as_str()
        ),
        (ReviewStyle::Skeptic, Sentiment::Neutral) => format!(
            "{name} is fine. Not bad, not memorable. The {chip} is adequate and the {} body is \
             what you would expect.",
            specs.material.as_str()
        ),
        (ReviewStyle::Skeptic, Sentiment::Negative) => format!(
            "Hard pass on {name}. Between the {chip} and the corners cut elsewhere, there are \
             better ways to spend your money."
        ),
    };
    truncate_chars(&text, MAX_REVIEW_LEN)
}

fn pick_points(
    points: Vec<String>,
    stock: &str,
    rng: &mut dyn RandomSource,
) -> Vec<String> {
    let mut points: Vec<String> = points
        .into_iter()
        .map(|p| truncate_chars(&p, MAX_POINT_LEN))
        .collect();
    if points.is_empty() {
        points.push(stock.to_string());
    }
    let take = (rng.range_u32(2, 4) as usize).min(points.len());
    points.truncate(take);
    points
}

/// Rule-based review of `specs`.
pub fn local_review(specs: &PhoneSpecs, rng: &mut dyn RandomSource) -> PhoneReview {
    let assessment = assess(specs);
    let sentiment = assessment.sentiment();
    let style = STYLES[rng.index(STYLES.len())];
    PhoneReview {
        review_text: review_text(style, sentiment, specs),
        pros: pick_points(assessment.pros, "Covers the everyday basics", rng),
        cons: pick_points(assessment.cons, "Nothing major to complain about", rng),
        overall_sentiment: sentiment,
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub struct ReviewFlow;

impl Flow for ReviewFlow {
    type Input = PhoneSpecs;
    type Output = PhoneReview;

    const NAME: &'static str = "phone_review";
    const LABEL: &'static str = "Phone review";
    const ON_MODEL_FAILURE: FailurePolicy = FailurePolicy::UseLocal;

    fn schema() -> &'static OutputSchema {
        &SCHEMA
    }

    fn prompt(specs: &PhoneSpecs) -> Prompt {
        let price = specs
            .selling_price
            .map(|p| format!("${}", round_cents(p)))
            .unwrap_or_else(|| "(not set)".to_string());
        PromptBuilder::new(
            Self::NAME,
            "You are a smartphone reviewer for a popular tech site. \
             Review the phone design below honestly, weighing hardware against cost.",
        )
        .text_field("Model name", &specs.name, "(unnamed prototype)")
        .field(
            "Processor",
            format!("{} ({} tier)", specs.processor.label(), specs.processor.tier().as_str()),
        )
        .field("RAM", format!("{} GB", specs.ram))
        .field("Storage", format!("{} GB", specs.storage))
        .field("Main camera", format!("{} MP", specs.camera_resolution))
        .field("Battery", format!("{} mAh", specs.battery_capacity))
        .field("Refresh rate", format!("{} Hz", specs.refresh_rate.hz()))
        .field("Material", specs.material.as_str())
        .field("NFC", yes_no(specs.nfc_support))
        .field("Optical image stabilization", yes_no(specs.has_ois))
        .field(
            "Unit manufacturing cost",
            format!("${}", round_cents(specs.unit_manufacturing_cost)),
        )
        .field("Selling price", price)
        .list_field("Special features", &specs.special_features)
        .line(format!(
            "Keep reviewText under {MAX_REVIEW_LEN} characters. List 1 to {MAX_POINTS} pros and cons. \
             overallSentiment is Positive, Neutral or Negative."
        ))
        .finish(&SCHEMA)
    }

    fn local(
        specs: &PhoneSpecs,
        _config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Option<PhoneReview> {
        Some(local_review(specs, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tycoon_core::{Processor, ScriptedRandom, SeededRandom};

    fn flagship() -> PhoneSpecs {
        serde_json::from_value(json!({
            "ram": 16, "storage": 512, "cameraResolution": 108, "batteryCapacity": 6000,
            "processor": "snapdragon_8_gen_3", "refreshRate": "120hz", "material": "titanium",
            "unitManufacturingCost": 150, "nfcSupport": true, "hasOIS": true
        }))
        .unwrap()
    }

    fn bargain_bin() -> PhoneSpecs {
        PhoneSpecs {
            name: "Brick".to_string(),
            processor: Processor::UnisocT606,
            ram: 3,
            storage: 32,
            camera_resolution: 13,
            battery_capacity: 3000,
            refresh_rate: RefreshRate::Hz60,
            material: Material::Plastic,
            nfc_support: false,
            has_ois: false,
            unit_manufacturing_cost: Decimal::new(90, 0),
            selling_price: Some(Decimal::new(400, 0)),
            special_features: vec![],
        }
    }

    #[test]
    fn schema_is_well_formed() {
        assert!(SCHEMA.is_well_formed());
    }

    #[test]
    fn flagship_scores_positive() {
        let a = assess(&flagship());
        assert!(a.score >= POSITIVE_THRESHOLD, "score {}", a.score);
        assert_eq!(a.sentiment(), Sentiment::Positive);
        let review = local_review(&flagship(), &mut SeededRandom::new(11));
        assert_eq!(review.overall_sentiment, Sentiment::Positive);
    }

    #[test]
    fn weak_overpriced_design_scores_negative() {
        let a = assess(&bargain_bin());
        assert!(a.score <= NEGATIVE_THRESHOLD);
        assert_eq!(a.sentiment(), Sentiment::Negative);
        assert!(a.pros.is_empty());
        let review = local_review(&bargain_bin(), &mut SeededRandom::new(5));
        assert_eq!(review.pros, vec!["Covers the everyday basics".to_string()]);
        assert!(review.cons.len() >= 2);
    }

    #[test]
    fn style_bucket_follows_the_draw() {
        let analyst = local_review(&flagship(), &mut ScriptedRandom::constant(0.5));
        assert!(analyst.review_text.starts_with("On paper"));
        let skeptic = local_review(&bargain_bin(), &mut ScriptedRandom::constant(0.9));
        assert!(skeptic.review_text.starts_with("Hard pass on Brick"));
    }

    #[test]
    fn unnamed_phone_reads_naturally() {
        let review = local_review(&flagship(), &mut ScriptedRandom::constant(0.0));
        assert!(review.review_text.contains("this phone"));
    }

    #[test]
    fn prompt_omits_empty_feature_list_and_is_stable() {
        let mut specs = flagship();
        let p = ReviewFlow::prompt(&specs);
        assert!(!p.text.contains("Special features"));
        assert!(p.text.contains("- Selling price: (not set)"));
        assert_eq!(p, ReviewFlow::prompt(&specs));
        specs.special_features = vec!["Satellite SOS".to_string()];
        assert!(ReviewFlow::prompt(&specs).text.contains("- Special features: Satellite SOS"));
    }

    fn arb_specs() -> impl Strategy<Value = PhoneSpecs> {
        (
            0usize..9,
            1u32..32,
            16u32..2048,
            2u32..200,
            1000u32..9000,
            0usize..4,
            0usize..4,
            any::<(bool, bool)>(),
            (1i64..2000, prop::option::of(1i64..5000)),
            prop::collection::vec(".{0,300}", 0..4),
            ".{0,700}",
        )
            .prop_map(
                |(p, ram, storage, cam, bat, rr, mat, (nfc, ois), (cost, price), features, name)| {
                    PhoneSpecs {
                        name,
                        processor: Processor::ALL[p],
                        ram,
                        storage,
                        camera_resolution: cam,
                        battery_capacity: bat,
                        refresh_rate: [
                            RefreshRate::Hz60,
                            RefreshRate::Hz90,
                            RefreshRate::Hz120,
                            RefreshRate::Hz144,
                        ][rr],
                        material: [
                            Material::Plastic,
                            Material::Aluminum,
                            Material::Glass,
                            Material::Titanium,
                        ][mat],
                        nfc_support: nfc,
                        has_ois: ois,
                        unit_manufacturing_cost: Decimal::new(cost, 0),
                        selling_price: price.map(|p| Decimal::new(p, 0)),
                        special_features: features,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn local_review_always_validates(specs in arb_specs(), seed in any::<u64>()) {
            let review = local_review(&specs, &mut SeededRandom::new(seed));
            let raw = serde_json::to_value(&review).unwrap();
            let violations = SCHEMA.validate(&raw);
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
    }
}
