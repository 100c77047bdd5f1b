use once_cell::sync::Lazy;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::warn;
use tycoon_core::{
    ClientContract, ContractRequest, ContractStatus, CrossFieldRule, FieldKind, FieldSpec,
    Material, ModeConfiguration, OutputSchema, RandomExt, RandomSource, RefreshRate,
    RequiredSpecs, Tier,
};
use tycoon_econ::{
    ceil_cents, difficulty_reward_multiplier, level_reward_bonus, reputation_penalty_discount,
    round_cents,
};

use crate::pipeline::{FailurePolicy, Flow};
use crate::prompt::{Prompt, PromptBuilder};
use crate::repair::generate_id;

pub const CONTRACT_ID_PREFIX: &str = "contract_";
/// Penalty must be at least this multiple of the per-unit reward.
pub const PENALTY_FACTOR: f64 = 5.0;

const MIN_QUANTITY: u32 = 50;
const MAX_QUANTITY: u32 = 300;
const MIN_DEADLINE: u32 = 7;
const MAX_DEADLINE: u32 = 15;
const MIN_REWARD: i64 = 20;
const MAX_REWARD: i64 = 600;

static SCHEMA: Lazy<OutputSchema> = Lazy::new(|| {
    let required_specs = vec![
        FieldSpec::optional("minRam", FieldKind::Integer { min: 1, max: 64 }),
        FieldSpec::optional("minStorage", FieldKind::Integer { min: 16, max: 2048 }),
        FieldSpec::optional("minCameraResolution", FieldKind::Integer { min: 2, max: 200 }),
        FieldSpec::optional(
            "minBatteryCapacity",
            FieldKind::Integer {
                min: 1000,
                max: 10_000,
            },
        ),
        FieldSpec::optional("minProcessorTier", FieldKind::Enum(&Tier::TOKENS)),
        FieldSpec::optional("minRefreshRate", FieldKind::Enum(&RefreshRate::TOKENS)),
        FieldSpec::optional("material", FieldKind::Enum(&Material::TOKENS)),
        FieldSpec::optional("requiresNfc", FieldKind::Bool),
        FieldSpec::optional("requiresOis", FieldKind::Bool),
    ];
    OutputSchema::new("client_contract")
        .field(FieldSpec::required(
            "id",
            FieldKind::Identifier {
                prefix: CONTRACT_ID_PREFIX,
            },
        ))
        .field(FieldSpec::required("clientName", FieldKind::text(80)).with_default(json!("Private Client")))
        .field(
            FieldSpec::required("description", FieldKind::text(400))
                .with_default(json!("Bulk order of custom smartphones.")),
        )
        .field(FieldSpec::required(
            "requiredSpecs",
            FieldKind::Object {
                fields: required_specs,
                min_defined: 1,
            },
        ))
        .field(
            FieldSpec::required(
                "quantity",
                FieldKind::Integer {
                    min: MIN_QUANTITY as i64,
                    max: MAX_QUANTITY as i64,
                },
            )
            .with_default(json!(100)),
        )
        .field(FieldSpec::required(
            "rewardPerUnit",
            FieldKind::money(MIN_REWARD as f64, Some(MAX_REWARD as f64)),
        ))
        .field(FieldSpec::required("penalty", FieldKind::money(0.0, None)))
        .field(
            FieldSpec::required(
                "deadlineDays",
                FieldKind::Integer {
                    min: MIN_DEADLINE as i64,
                    max: MAX_DEADLINE as i64,
                },
            )
            .with_default(json!(10)),
        )
        .field(
            FieldSpec::required("status", FieldKind::Enum(&ContractStatus::TOKENS))
                .fixed(json!("available")),
        )
        .rule(CrossFieldRule::AtLeastMultiple {
            primary: "rewardPerUnit",
            secondary: "penalty",
            factor: PENALTY_FACTOR,
        })
});

struct ClientTemplate {
    client: &'static str,
    pitch: &'static str,
    /// Per-unit reward band before difficulty and level scaling, USD.
    reward: (f64, f64),
    specs: fn() -> RequiredSpecs,
}

static TEMPLATES: [ClientTemplate; 5] = [
    ClientTemplate {
        client: "Campus Connect",
        pitch: "Affordable phones for a university-wide student rollout.",
        reward: (40.0, 90.0),
        specs: || RequiredSpecs {
            min_ram: Some(4),
            min_storage: Some(64),
            ..RequiredSpecs::default()
        },
    },
    ClientTemplate {
        client: "Shutterbug Media",
        pitch: "Camera-first devices for a content studio's field crews.",
        reward: (120.0, 260.0),
        specs: || RequiredSpecs {
            min_camera_resolution: Some(48),
            requires_ois: Some(true),
            ..RequiredSpecs::default()
        },
    },
    ClientTemplate {
        client: "Arena Esports",
        pitch: "High-refresh gaming phones for a tournament league.",
        reward: (200.0, 420.0),
        specs: || RequiredSpecs {
            min_ram: Some(12),
            min_refresh_rate: Some(RefreshRate::Hz120),
            min_processor_tier: Some(Tier::Upper),
            ..RequiredSpecs::default()
        },
    },
    ClientTemplate {
        client: "Northwind Logistics",
        pitch: "Long-lasting handsets for a fleet of delivery drivers.",
        reward: (60.0, 140.0),
        specs: || RequiredSpecs {
            min_battery_capacity: Some(5000),
            requires_nfc: Some(true),
            ..RequiredSpecs::default()
        },
    },
    ClientTemplate {
        client: "Aurum Concierge",
        pitch: "Luxury handsets for a private members' club.",
        reward: (350.0, 600.0),
        specs: || RequiredSpecs {
            material: Some(Material::Titanium),
            min_processor_tier: Some(Tier::Flagship),
            ..RequiredSpecs::default()
        },
    },
];

/// Extra requirements a client may tack on.
#[derive(Clone, Copy, Debug)]
enum Extra {
    Ram,
    Storage,
    Camera,
    Battery,
    RefreshRate,
    Nfc,
    Ois,
}

const EXTRAS: [Extra; 7] = [
    Extra::Ram,
    Extra::Storage,
    Extra::Camera,
    Extra::Battery,
    Extra::RefreshRate,
    Extra::Nfc,
    Extra::Ois,
];

impl Extra {
    /// Sets the requirement; false when it was already present.
    fn apply(self, specs: &mut RequiredSpecs) -> bool {
        fn fill<T>(slot: &mut Option<T>, value: T) -> bool {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        }
        match self {
            Extra::Ram => fill(&mut specs.min_ram, 6),
            Extra::Storage => fill(&mut specs.min_storage, 128),
            Extra::Camera => fill(&mut specs.min_camera_resolution, 24),
            Extra::Battery => fill(&mut specs.min_battery_capacity, 4000),
            Extra::RefreshRate => fill(&mut specs.min_refresh_rate, RefreshRate::Hz90),
            Extra::Nfc => fill(&mut specs.requires_nfc, true),
            Extra::Ois => fill(&mut specs.requires_ois, true),
        }
    }
}

fn decimal(x: f64) -> Decimal {
    Decimal::from_f64(x).unwrap_or_default()
}

/// Known-valid contract used when assembly goes wrong.
pub fn minimal_contract(rng: &mut dyn RandomSource) -> ClientContract {
    ClientContract {
        id: generate_id(CONTRACT_ID_PREFIX, rng),
        client_name: "Private Client".to_string(),
        description: "Bulk order of custom smartphones.".to_string(),
        required_specs: RequiredSpecs {
            min_ram: Some(4),
            ..RequiredSpecs::default()
        },
        quantity: 100,
        reward_per_unit: Decimal::from(50),
        penalty: Decimal::from(250),
        deadline_days: 10,
        status: ContractStatus::Available,
    }
}

/// Template-driven contract scaled to the player and difficulty.
pub fn local_contract(
    request: &ContractRequest,
    config: &ModeConfiguration,
    rng: &mut dyn RandomSource,
) -> ClientContract {
    let template = &TEMPLATES[rng.index(TEMPLATES.len())];
    let mut specs = (template.specs)();

    let mut extras = EXTRAS;
    rng.shuffle(&mut extras);
    let wanted = rng.range_u32(1, 2) as usize;
    let mut added = 0;
    for extra in extras {
        if added == wanted {
            break;
        }
        if extra.apply(&mut specs) {
            added += 1;
        }
    }

    let quantity = rng.range_u32(MIN_QUANTITY, MAX_QUANTITY);
    let deadline_days = rng.range_u32(MIN_DEADLINE, MAX_DEADLINE);

    let (lo, hi) = template.reward;
    let base_reward = decimal(rng.range_f64(lo, hi));
    let reward_per_unit = round_cents(
        base_reward
            * difficulty_reward_multiplier(config.difficulty)
            * level_reward_bonus(request.player_level),
    )
    .clamp(Decimal::from(MIN_REWARD), Decimal::from(MAX_REWARD));

    let share = decimal(rng.range_f64(0.15, 0.30));
    let exposure = reward_per_unit
        * Decimal::from(quantity)
        * share
        * reputation_penalty_discount(request.player_reputation);
    let floor = reward_per_unit * decimal(PENALTY_FACTOR);
    let penalty = ceil_cents(exposure.max(floor));

    let contract = ClientContract {
        id: generate_id(CONTRACT_ID_PREFIX, rng),
        client_name: template.client.to_string(),
        description: format!(
            "{} Needs {quantity} units within {deadline_days} days.",
            template.pitch
        ),
        required_specs: specs,
        quantity,
        reward_per_unit,
        penalty,
        deadline_days,
        status: ContractStatus::Available,
    };

    let violations = serde_json::to_value(&contract)
        .map(|raw| SCHEMA.validate(&raw))
        .unwrap_or_else(|e| vec![tycoon_core::Violation::Decode(e.to_string())]);
    if violations.is_empty() {
        contract
    } else {
        warn!(?violations, "assembled contract failed validation, using minimal contract");
        minimal_contract(rng)
    }
}

pub struct ContractFlow;

impl Flow for ContractFlow {
    type Input = ContractRequest;
    type Output = ClientContract;

    const NAME: &'static str = "client_contract";
    const LABEL: &'static str = "Client contract";
    const ON_MODEL_FAILURE: FailurePolicy = FailurePolicy::UseLocal;

    fn schema() -> &'static OutputSchema {
        &SCHEMA
    }

    fn prompt(request: &ContractRequest) -> Prompt {
        let reputation = request
            .player_reputation
            .map(|r| format!("{} / 100", r.min(100)))
            .unwrap_or_else(|| "(unknown)".to_string());
        let level = request
            .player_level
            .map(|l| l.to_string())
            .unwrap_or_else(|| "(unknown)".to_string());
        PromptBuilder::new(
            Self::NAME,
            "You design bulk-order contracts from business clients for a phone manufacturer. \
             Invent one plausible client and the phones they need.",
        )
        .field("Manufacturer reputation", reputation)
        .field("Manufacturer level", level)
        .line(format!(
            "quantity is between {MIN_QUANTITY} and {MAX_QUANTITY} units, deadlineDays between \
             {MIN_DEADLINE} and {MAX_DEADLINE}, rewardPerUnit between ${MIN_REWARD} and ${MAX_REWARD}."
        ))
        .line(format!(
            "penalty is at least {PENALTY_FACTOR} times rewardPerUnit. status is \"available\". \
             requiredSpecs sets at least one requirement."
        ))
        .finish(&SCHEMA)
    }

    fn local(
        request: &ContractRequest,
        config: &ModeConfiguration,
        rng: &mut dyn RandomSource,
    ) -> Option<ClientContract> {
        Some(local_contract(request, config, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tycoon_core::{is_well_formed_id, Difficulty, ScriptedRandom, SeededRandom};

    fn validate(c: &ClientContract) -> Vec<tycoon_core::Violation> {
        SCHEMA.validate(&serde_json::to_value(c).unwrap())
    }

    #[test]
    fn schema_is_well_formed() {
        assert!(SCHEMA.is_well_formed());
    }

    #[test]
    fn empty_request_yields_available_contract_in_bounds() {
        let request: ContractRequest = serde_json::from_str("{}").unwrap();
        for seed in 0..64 {
            let c = local_contract(&request, &ModeConfiguration::default(), &mut SeededRandom::new(seed));
            assert_eq!(c.status, ContractStatus::Available);
            assert!((50..=300).contains(&c.quantity));
            assert!((7..=15).contains(&c.deadline_days));
            assert!(c.required_specs.defined_count() >= 1);
            assert!(is_well_formed_id(CONTRACT_ID_PREFIX, &c.id));
            assert!(validate(&c).is_empty());
        }
    }

    #[test]
    fn extras_are_added_on_top_of_the_template() {
        // All-zero draws pick Campus Connect (RAM + storage) and shuffle
        // Storage to the front; it is already set, so Camera is added instead.
        let mut rng = ScriptedRandom::new(vec![0.0]);
        let c = local_contract(&ContractRequest::default(), &ModeConfiguration::default(), &mut rng);
        assert_eq!(c.client_name, "Campus Connect");
        assert_eq!(c.required_specs.min_ram, Some(4));
        assert_eq!(c.required_specs.min_camera_resolution, Some(24));
        assert_eq!(c.required_specs.defined_count(), 3);
    }

    #[test]
    fn difficulty_and_level_scale_rewards() {
        let draw = || ScriptedRandom::new(vec![0.5]);
        let easy = ModeConfiguration {
            use_online_features: false,
            difficulty: Difficulty::Easy,
        };
        let hard = ModeConfiguration {
            use_online_features: false,
            difficulty: Difficulty::Hard,
        };
        let veteran = ContractRequest {
            player_reputation: Some(100),
            player_level: Some(10),
        };
        let base = local_contract(&ContractRequest::default(), &easy, &mut draw());
        let harder = local_contract(&ContractRequest::default(), &hard, &mut draw());
        let boosted = local_contract(&veteran, &easy, &mut draw());
        assert!(harder.reward_per_unit < base.reward_per_unit);
        assert!(boosted.reward_per_unit > base.reward_per_unit);
        assert!(boosted.penalty >= boosted.reward_per_unit * Decimal::from(5));
    }

    #[test]
    fn minimal_contract_is_valid() {
        assert!(validate(&minimal_contract(&mut SeededRandom::new(0))).is_empty());
    }

    #[test]
    fn prompt_mentions_player_context() {
        let p = ContractFlow::prompt(&ContractRequest {
            player_reputation: Some(150),
            player_level: None,
        });
        assert!(p.text.contains("- Manufacturer reputation: 100 / 100"));
        assert!(p.text.contains("- Manufacturer level: (unknown)"));
    }

    proptest! {
        #[test]
        fn local_contract_always_validates(
            seed in any::<u64>(),
            rep in prop::option::of(0u32..500),
            level in prop::option::of(0u32..100),
            diff in 0usize..3,
        ) {
            let config = ModeConfiguration {
                use_online_features: false,
                difficulty: [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard][diff],
            };
            let request = ContractRequest { player_reputation: rep, player_level: level };
            let c = local_contract(&request, &config, &mut SeededRandom::new(seed));
            prop_assert!(validate(&c).is_empty());
            prop_assert!(c.penalty >= c.reward_per_unit * Decimal::from(5));
        }

        #[test]
        fn repaired_penalty_meets_floor(reward in -1e4f64..1e4, penalty in prop_oneof![Just(0.0), -1e3f64..1e6]) {
            let raw = json!({ "rewardPerUnit": reward, "penalty": penalty });
            let out = crate::repair::repair(raw, &SCHEMA, &mut SeededRandom::new(1));
            let r = out.value["rewardPerUnit"].as_f64().unwrap();
            let p = out.value["penalty"].as_f64().unwrap();
            prop_assert!((20.0..=600.0).contains(&r));
            prop_assert!(p + 1e-6 >= r * PENALTY_FACTOR);
        }
    }
}
