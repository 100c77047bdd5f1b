//! Typed request and result records for every generated feature.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Game difficulty selected by the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Process-wide settings that decide how generation runs.
///
/// Persisted as a JSON blob; missing keys take their defaults so older saves
/// keep loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModeConfiguration {
    /// Whether the external model may be called.
    pub use_online_features: bool,
    /// Current game difficulty.
    pub difficulty: Difficulty,
}

impl Default for ModeConfiguration {
    fn default() -> Self {
        Self {
            use_online_features: true,
            difficulty: Difficulty::Normal,
        }
    }
}

/// Market tier shared by processors and researched components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Budget,
    Midrange,
    Upper,
    Flagship,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Budget, Tier::Midrange, Tier::Upper, Tier::Flagship];
    pub const TOKENS: [&'static str; 4] = ["budget", "midrange", "upper", "flagship"];

    /// Wire token, e.g. `"flagship"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Budget => "budget",
            Tier::Midrange => "midrange",
            Tier::Upper => "upper",
            Tier::Flagship => "flagship",
        }
    }
}

/// Selectable system-on-chip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Processor {
    #[serde(rename = "snapdragon_8_gen_3")]
    Snapdragon8Gen3,
    #[serde(rename = "dimensity_9300")]
    Dimensity9300,
    #[serde(rename = "snapdragon_8_gen_2")]
    Snapdragon8Gen2,
    #[serde(rename = "exynos_2400")]
    Exynos2400,
    #[serde(rename = "tensor_g3")]
    TensorG3,
    #[serde(rename = "snapdragon_7_gen_3")]
    Snapdragon7Gen3,
    #[serde(rename = "dimensity_7200")]
    Dimensity7200,
    #[serde(rename = "helio_g99")]
    HelioG99,
    #[serde(rename = "unisoc_t606")]
    UnisocT606,
}

impl Processor {
    pub const ALL: [Processor; 9] = [
        Processor::Snapdragon8Gen3,
        Processor::Dimensity9300,
        Processor::Snapdragon8Gen2,
        Processor::Exynos2400,
        Processor::TensorG3,
        Processor::Snapdragon7Gen3,
        Processor::Dimensity7200,
        Processor::HelioG99,
        Processor::UnisocT606,
    ];

    pub fn tier(self) -> Tier {
        match self {
            Processor::Snapdragon8Gen3 | Processor::Dimensity9300 => Tier::Flagship,
            Processor::Snapdragon8Gen2 | Processor::Exynos2400 | Processor::TensorG3 => {
                Tier::Upper
            }
            Processor::Snapdragon7Gen3 | Processor::Dimensity7200 => Tier::Midrange,
            Processor::HelioG99 | Processor::UnisocT606 => Tier::Budget,
        }
    }

    /// Marketing name shown to players and written into prompts.
    pub fn label(self) -> &'static str {
        match self {
            Processor::Snapdragon8Gen3 => "Snapdragon 8 Gen 3",
            Processor::Dimensity9300 => "Dimensity 9300",
            Processor::Snapdragon8Gen2 => "Snapdragon 8 Gen 2",
            Processor::Exynos2400 => "Exynos 2400",
            Processor::TensorG3 => "Tensor G3",
            Processor::Snapdragon7Gen3 => "Snapdragon 7 Gen 3",
            Processor::Dimensity7200 => "Dimensity 7200",
            Processor::HelioG99 => "Helio G99",
            Processor::UnisocT606 => "Unisoc T606",
        }
    }
}

/// Display refresh rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RefreshRate {
    #[serde(rename = "60hz")]
    Hz60,
    #[serde(rename = "90hz")]
    Hz90,
    #[serde(rename = "120hz")]
    Hz120,
    #[serde(rename = "144hz")]
    Hz144,
}

impl RefreshRate {
    pub const TOKENS: [&'static str; 4] = ["60hz", "90hz", "120hz", "144hz"];

    pub fn hz(self) -> u32 {
        match self {
            RefreshRate::Hz60 => 60,
            RefreshRate::Hz90 => 90,
            RefreshRate::Hz120 => 120,
            RefreshRate::Hz144 => 144,
        }
    }
}

/// Chassis material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Plastic,
    Aluminum,
    Glass,
    Titanium,
}

impl Material {
    pub const TOKENS: [&'static str; 4] = ["plastic", "aluminum", "glass", "titanium"];

    pub fn as_str(self) -> &'static str {
        match self {
            Material::Plastic => "plastic",
            Material::Aluminum => "aluminum",
            Material::Glass => "glass",
            Material::Titanium => "titanium",
        }
    }
}

/// A phone design as submitted from the design form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneSpecs {
    /// Model name; may be blank for unnamed prototypes.
    #[serde(default)]
    pub name: String,
    pub processor: Processor,
    /// RAM in GB.
    pub ram: u32,
    /// Storage in GB.
    pub storage: u32,
    /// Main camera resolution in MP.
    pub camera_resolution: u32,
    /// Battery capacity in mAh.
    pub battery_capacity: u32,
    pub refresh_rate: RefreshRate,
    pub material: Material,
    #[serde(default)]
    pub nfc_support: bool,
    #[serde(default, rename = "hasOIS")]
    pub has_ois: bool,
    /// Bill of materials per unit in USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_manufacturing_cost: Decimal,
    /// Planned retail price in USD, if already set.
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub selling_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special_features: Vec<String>,
}

/// Marketing strategy picked on the branding form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketingStrategy {
    Budget,
    MassMarket,
    Premium,
    Innovation,
    Lifestyle,
}

impl MarketingStrategy {
    pub fn label(self) -> &'static str {
        match self {
            MarketingStrategy::Budget => "budget-conscious value",
            MarketingStrategy::MassMarket => "broad mass-market appeal",
            MarketingStrategy::Premium => "premium luxury positioning",
            MarketingStrategy::Innovation => "cutting-edge innovation",
            MarketingStrategy::Lifestyle => "lifestyle and self-expression",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloganRequest {
    pub brand_name: String,
    #[serde(default)]
    pub logo_description: String,
    #[serde(default)]
    pub marketing_strategy: Option<MarketingStrategy>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SloganSet {
    pub slogans: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub const TOKENS: [&'static str; 3] = ["Positive", "Neutral", "Negative"];
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneReview {
    pub review_text: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub overall_sentiment: Sentiment,
}

/// Lifecycle of a client contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    #[default]
    Available,
    Accepted,
    Completed,
    Failed,
}

impl ContractStatus {
    pub const TOKENS: [&'static str; 4] = ["available", "accepted", "completed", "failed"];
}

/// Errors raised by contract bookkeeping.
#[derive(Debug, Error, PartialEq)]
pub enum ContractError {
    /// The requested lifecycle step is not allowed from the current status.
    #[error("cannot move contract from {from:?} to {to:?}")]
    IllegalTransition {
        from: ContractStatus,
        to: ContractStatus,
    },
}

/// Minimum hardware a client asks for. Every field is optional but a valid
/// contract defines at least one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredSpecs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ram: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_storage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_camera_resolution: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_battery_capacity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_processor_tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_refresh_rate: Option<RefreshRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<Material>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_nfc: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_ois: Option<bool>,
}

impl RequiredSpecs {
    /// Number of requirements that are set.
    pub fn defined_count(&self) -> usize {
        [
            self.min_ram.is_some(),
            self.min_storage.is_some(),
            self.min_camera_resolution.is_some(),
            self.min_battery_capacity.is_some(),
            self.min_processor_tier.is_some(),
            self.min_refresh_rate.is_some(),
            self.material.is_some(),
            self.requires_nfc.is_some(),
            self.requires_ois.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Names of the requirements `specs` does not meet.
    pub fn unmet(&self, specs: &PhoneSpecs) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.min_ram.is_some_and(|min| specs.ram < min) {
            missing.push("minRam");
        }
        if self.min_storage.is_some_and(|min| specs.storage < min) {
            missing.push("minStorage");
        }
        if self
            .min_camera_resolution
            .is_some_and(|min| specs.camera_resolution < min)
        {
            missing.push("minCameraResolution");
        }
        if self
            .min_battery_capacity
            .is_some_and(|min| specs.battery_capacity < min)
        {
            missing.push("minBatteryCapacity");
        }
        if self
            .min_processor_tier
            .is_some_and(|min| specs.processor.tier() < min)
        {
            missing.push("minProcessorTier");
        }
        if self
            .min_refresh_rate
            .is_some_and(|min| specs.refresh_rate < min)
        {
            missing.push("minRefreshRate");
        }
        if self.material.is_some_and(|m| specs.material != m) {
            missing.push("material");
        }
        if self.requires_nfc == Some(true) && !specs.nfc_support {
            missing.push("requiresNfc");
        }
        if self.requires_ois == Some(true) && !specs.has_ois {
            missing.push("requiresOis");
        }
        missing
    }

    pub fn is_satisfied_by(&self, specs: &PhoneSpecs) -> bool {
        self.unmet(specs).is_empty()
    }
}

/// Optional player context for contract generation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRequest {
    /// Reputation in [0, 100].
    #[serde(default)]
    pub player_reputation: Option<u32>,
    #[serde(default)]
    pub player_level: Option<u32>,
}

/// A bulk order offered by a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContract {
    pub id: String,
    pub client_name: String,
    pub description: String,
    pub required_specs: RequiredSpecs,
    pub quantity: u32,
    /// Paid per delivered unit, USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub reward_per_unit: Decimal,
    /// Charged when the deadline is missed, USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub penalty: Decimal,
    pub deadline_days: u32,
    pub status: ContractStatus,
}

impl ClientContract {
    /// Total payout when every unit is delivered.
    pub fn total_reward(&self) -> Decimal {
        self.reward_per_unit * Decimal::from(self.quantity)
    }

    pub fn accept(&mut self) -> Result<(), ContractError> {
        self.transition(ContractStatus::Available, ContractStatus::Accepted)
    }

    pub fn complete(&mut self) -> Result<(), ContractError> {
        self.transition(ContractStatus::Accepted, ContractStatus::Completed)
    }

    pub fn fail(&mut self) -> Result<(), ContractError> {
        self.transition(ContractStatus::Accepted, ContractStatus::Failed)
    }

    fn transition(
        &mut self,
        from: ContractStatus,
        to: ContractStatus,
    ) -> Result<(), ContractError> {
        if self.status != from {
            return Err(ContractError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendForecastRequest {
    #[serde(default)]
    pub market_data: String,
    #[serde(default)]
    pub consumer_preferences: String,
    #[serde(default)]
    pub technological_advancements: String,
    #[serde(default)]
    pub competitor_analysis: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotOrNot {
    Hot,
    Not,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub feature: String,
    /// 1 is the most popular.
    pub popularity_rank: u32,
    pub hot_or_not: HotOrNot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendForecast {
    pub trends: Vec<Trend>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentCategory {
    Processor,
    Camera,
    Display,
    Battery,
    Memory,
    Chassis,
    /// Special features such as wireless charging or water resistance.
    Extras,
}

impl ComponentCategory {
    pub const ALL: [ComponentCategory; 7] = [
        ComponentCategory::Processor,
        ComponentCategory::Camera,
        ComponentCategory::Display,
        ComponentCategory::Battery,
        ComponentCategory::Memory,
        ComponentCategory::Chassis,
        ComponentCategory::Extras,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentCategory::Processor => "processor",
            ComponentCategory::Camera => "camera",
            ComponentCategory::Display => "display",
            ComponentCategory::Battery => "battery",
            ComponentCategory::Memory => "memory",
            ComponentCategory::Chassis => "chassis",
            ComponentCategory::Extras => "extras",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEstimateRequest {
    pub component_name: String,
    pub category: ComponentCategory,
    #[serde(default)]
    pub description: String,
    pub tier: Tier,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentCostEstimate {
    /// Per-unit cost once in production, USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_cost: Decimal,
    /// One-off research cost, USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub research_cost: Decimal,
    pub research_days: u32,
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flagship_specs() -> PhoneSpecs {
        PhoneSpecs {
            name: "Nova X".to_string(),
            processor: Processor::Snapdragon8Gen3,
            ram: 16,
            storage: 512,
            camera_resolution: 108,
            battery_capacity: 6000,
            refresh_rate: RefreshRate::Hz120,
            material: Material::Titanium,
            nfc_support: true,
            has_ois: true,
            unit_manufacturing_cost: Decimal::new(150, 0),
            selling_price: None,
            special_features: vec![],
        }
    }

    #[test]
    fn mode_configuration_defaults_missing_keys() {
        let cfg: ModeConfiguration = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ModeConfiguration::default());
        assert!(cfg.use_online_features);
        let cfg: ModeConfiguration =
            serde_json::from_str(r#"{"useOnlineFeatures":false,"difficulty":"hard"}"#).unwrap();
        assert!(!cfg.use_online_features);
        assert_eq!(cfg.difficulty, Difficulty::Hard);
    }

    #[test]
    fn phone_specs_accepts_camel_case_wire_form() {
        let json = r#"{
            "ram": 16, "storage": 512, "cameraResolution": 108,
            "batteryCapacity": 6000, "processor": "snapdragon_8_gen_3",
            "refreshRate": "120hz", "material": "titanium",
            "unitManufacturingCost": 150, "nfcSupport": true, "hasOIS": true
        }"#;
        let specs: PhoneSpecs = serde_json::from_str(json).unwrap();
        assert_eq!(specs.processor.tier(), Tier::Flagship);
        assert_eq!(specs.unit_manufacturing_cost, Decimal::new(150, 0));
        assert!(specs.has_ois);
        assert!(specs.name.is_empty());
    }

    #[test]
    fn required_specs_reports_unmet_fields() {
        let specs = flagship_specs();
        let req = RequiredSpecs {
            min_ram: Some(8),
            material: Some(Material::Titanium),
            ..RequiredSpecs::default()
        };
        assert_eq!(req.defined_count(), 2);
        assert!(req.is_satisfied_by(&specs));

        let strict = RequiredSpecs {
            min_battery_capacity: Some(7000),
            min_refresh_rate: Some(RefreshRate::Hz144),
            requires_nfc: Some(true),
            ..RequiredSpecs::default()
        };
        assert_eq!(
            strict.unmet(&specs),
            vec!["minBatteryCapacity", "minRefreshRate"]
        );
    }

    #[test]
    fn contract_lifecycle_rejects_illegal_steps() {
        let mut c = ClientContract {
            id: "contract_abc123".to_string(),
            client_name: "Test".to_string(),
            description: "Test order".to_string(),
            required_specs: RequiredSpecs {
                min_ram: Some(4),
                ..RequiredSpecs::default()
            },
            quantity: 100,
            reward_per_unit: Decimal::new(50, 0),
            penalty: Decimal::new(250, 0),
            deadline_days: 10,
            status: ContractStatus::Available,
        };
        assert_eq!(c.total_reward(), Decimal::new(5000, 0));
        assert!(c.complete().is_err());
        c.accept().unwrap();
        assert_eq!(
            c.accept(),
            Err(ContractError::IllegalTransition {
                from: ContractStatus::Accepted,
                to: ContractStatus::Accepted,
            })
        );
        c.complete().unwrap();
        assert!(c.fail().is_err());
        assert_eq!(c.status, ContractStatus::Completed);
    }

    #[test]
    fn processor_serde_uses_snake_tokens() {
        let s = serde_json::to_string(&Processor::Snapdragon8Gen3).unwrap();
        assert_eq!(s, "\"snapdragon_8_gen_3\"");
        let back: RefreshRate = serde_json::from_str("\"144hz\"").unwrap();
        assert_eq!(back.hz(), 144);
    }
}
