#![deny(warnings)]

//! Economic helpers for Phone Tycoon: component costs, pricing and the
//! difficulty and reputation adjustments used by local generators.
//!
//! This crate provides validated utilities for:
//! - A per-component cost ledger for a phone design with event modifiers
//! - Baseline research-component costs by category and tier
//! - Cost-plus pricing and value ratios
//! - Reward and penalty scaling by difficulty, player level and reputation

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tycoon_core::{ComponentCategory, Difficulty, Material, PhoneSpecs, RefreshRate, Tier};

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Monetary values must be non-negative; cost used as a divisor must be > 0.
    #[error("invalid price or cost value")]
    InvalidPrice,
    /// Numeric conversion to floating point failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// Round to whole cents (banker's rounding, as `round_dp` does).
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Round up to the next whole cent.
pub fn ceil_cents(value: Decimal) -> Decimal {
    (value * Decimal::ONE_HUNDRED).ceil() / Decimal::ONE_HUNDRED
}

/// Convert a float into a cent-rounded decimal.
pub fn usd_from_f64(value: f64) -> Result<Decimal, EconError> {
    if !value.is_finite() {
        return Err(EconError::NonFinite);
    }
    Decimal::from_f64(value)
        .map(round_cents)
        .ok_or(EconError::NonFinite)
}

/// Retail price as cost plus a fractional margin.
///
/// Example:
/// let cost = Decimal::new(10000, 2); // 100.00
/// let margin = Decimal::new(40, 2); // 0.40
/// assert_eq!(suggested_retail_price(cost, margin).unwrap(), Decimal::new(14000, 2));
pub fn suggested_retail_price(unit_cost: Decimal, margin: Decimal) -> Result<Decimal, EconError> {
    if unit_cost < Decimal::ZERO || margin < Decimal::ZERO {
        return Err(EconError::InvalidPrice);
    }
    Ok(round_cents(unit_cost * (Decimal::ONE + margin)))
}

/// Retail price divided by unit cost. Values above ~3 read as overpriced.
pub fn value_ratio(selling_price: Decimal, unit_cost: Decimal) -> Result<f64, EconError> {
    if unit_cost <= Decimal::ZERO || selling_price < Decimal::ZERO {
        return Err(EconError::InvalidPrice);
    }
    (selling_price / unit_cost)
        .to_f64()
        .filter(|r| r.is_finite())
        .ok_or(EconError::NonFinite)
}

/// Multiplier applied to contract rewards.
pub fn difficulty_reward_multiplier(difficulty: Difficulty) -> Decimal {
    match difficulty {
        Difficulty::Easy => Decimal::new(115, 2),
        Difficulty::Normal => Decimal::ONE,
        Difficulty::Hard => Decimal::new(85, 2),
    }
}

/// Multiplier applied to component and research costs.
pub fn difficulty_cost_multiplier(difficulty: Difficulty) -> Decimal {
    match difficulty {
        Difficulty::Easy => Decimal::new(90, 2),
        Difficulty::Normal => Decimal::ONE,
        Difficulty::Hard => Decimal::new(115, 2),
    }
}

/// +2% reward per player level, capped at +20%.
pub fn level_reward_bonus(level: Option<u32>) -> Decimal {
    let level = level.unwrap_or(0).min(10);
    Decimal::ONE + Decimal::new(2, 2) * Decimal::from(level)
}

/// Trusted suppliers get lighter penalties: up to 30% off at reputation 100.
pub fn reputation_penalty_discount(reputation: Option<u32>) -> Decimal {
    let rep = reputation.unwrap_or(0).min(100);
    Decimal::ONE - Decimal::new(30, 2) * Decimal::from(rep) / Decimal::ONE_HUNDRED
}

/// Typical per-unit cost of a researched component before noise and
/// difficulty scaling.
pub fn baseline_component_cost(category: ComponentCategory, tier: Tier) -> Decimal {
    let base = match category {
        ComponentCategory::Processor => 45,
        ComponentCategory::Camera => 18,
        ComponentCategory::Display => 35,
        ComponentCategory::Battery => 12,
        ComponentCategory::Memory => 20,
        ComponentCategory::Chassis => 14,
        ComponentCategory::Extras => 10,
    };
    let tier_pct = match tier {
        Tier::Budget => 50,
        Tier::Midrange => 100,
        Tier::Upper => 180,
        Tier::Flagship => 320,
    };
    Decimal::from(base) * Decimal::from(tier_pct) / Decimal::ONE_HUNDRED
}

/// Volume discount on a production batch.
pub fn volume_discount(quantity: u32) -> Decimal {
    match quantity {
        q if q >= 10_000 => Decimal::new(8, 2),
        q if q >= 1_000 => Decimal::new(3, 2),
        _ => Decimal::ZERO,
    }
}

/// One component line of a design's bill of materials.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLine {
    pub category: ComponentCategory,
    pub label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_usd: Decimal,
    /// Accumulated event modifier in percent, within
    /// `[-100, MAX_MODIFIER_PCT]`.
    pub modifier_pct: i32,
}

impl CostLine {
    /// Base cost with the modifier applied, in cents.
    pub fn cost(&self) -> Decimal {
        let factor = (Decimal::ONE_HUNDRED + Decimal::from(self.modifier_pct)) / Decimal::ONE_HUNDRED;
        round_cents(self.base_usd * factor)
    }
}

/// Largest accumulated surcharge on one category (an 11x price).
pub const MAX_MODIFIER_PCT: i32 = 1_000;

/// Per-unit cost of each listed special feature.
const EXTRA_FEATURE_USD: i64 = 8;

/// Per-component unit cost breakdown of a phone design.
///
/// Market events (shortages, tariffs) adjust one category at a time instead
/// of guessing a share of the total.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostLedger {
    lines: Vec<CostLine>,
}

impl CostLedger {
    pub fn for_specs(specs: &PhoneSpecs) -> Self {
        let processor = match specs.processor.tier() {
            Tier::Budget => Decimal::new(18, 0),
            Tier::Midrange => Decimal::new(45, 0),
            Tier::Upper => Decimal::new(90, 0),
            Tier::Flagship => Decimal::new(160, 0),
        };
        let memory = Decimal::new(250, 2) * Decimal::from(specs.ram)
            + Decimal::new(8, 2) * Decimal::from(specs.storage);
        let sensor = match specs.camera_resolution {
            0..=12 => Decimal::new(8, 0),
            13..=48 => Decimal::new(15, 0),
            49..=64 => Decimal::new(20, 0),
            65..=108 => Decimal::new(30, 0),
            _ => Decimal::new(40, 0),
        };
        let camera = if specs.has_ois {
            sensor + Decimal::new(6, 0)
        } else {
            sensor
        };
        let display = match specs.refresh_rate {
            RefreshRate::Hz60 => Decimal::new(25, 0),
            RefreshRate::Hz90 => Decimal::new(32, 0),
            RefreshRate::Hz120 => Decimal::new(45, 0),
            RefreshRate::Hz144 => Decimal::new(55, 0),
        };
        let battery = Decimal::new(3, 3) * Decimal::from(specs.battery_capacity);
        let shell = match specs.material {
            Material::Plastic => Decimal::new(6, 0),
            Material::Aluminum => Decimal::new(15, 0),
            Material::Glass => Decimal::new(20, 0),
            Material::Titanium => Decimal::new(45, 0),
        };
        let chassis = if specs.nfc_support {
            shell + Decimal::new(3, 0)
        } else {
            shell
        };
        let features = specs
            .special_features
            .iter()
            .filter(|f| !f.trim().is_empty())
            .count();
        let extras = Decimal::from(EXTRA_FEATURE_USD) * Decimal::from(features);
        let line = |category, label: String, base_usd| CostLine {
            category,
            label,
            base_usd,
            modifier_pct: 0,
        };
        Self {
            lines: vec![
                line(
                    ComponentCategory::Processor,
                    specs.processor.label().to_string(),
                    processor,
                ),
                line(
                    ComponentCategory::Memory,
                    format!("{} GB RAM / {} GB storage", specs.ram, specs.storage),
                    memory,
                ),
                line(
                    ComponentCategory::Camera,
                    format!("{} MP camera", specs.camera_resolution),
                    camera,
                ),
                line(
                    ComponentCategory::Display,
                    format!("{} Hz display", specs.refresh_rate.hz()),
                    display,
                ),
                line(
                    ComponentCategory::Battery,
                    format!("{} mAh battery", specs.battery_capacity),
                    battery,
                ),
                line(
                    ComponentCategory::Chassis,
                    format!("{} chassis", specs.material.as_str()),
                    chassis,
                ),
                line(
                    ComponentCategory::Extras,
                    format!("{features} special feature(s)"),
                    extras,
                ),
            ],
        }
    }

    pub fn lines(&self) -> &[CostLine] {
        &self.lines
    }

    /// Adjust one category by `pct` percent; modifiers accumulate.
    pub fn apply_modifier(&mut self, category: ComponentCategory, pct: i32) {
        for line in self.lines.iter_mut().filter(|l| l.category == category) {
            line.modifier_pct = line
                .modifier_pct
                .saturating_add(pct)
                .clamp(-100, MAX_MODIFIER_PCT);
            debug!(
                category = category.as_str(),
                pct,
                total_pct = line.modifier_pct,
                "cost modifier applied"
            );
        }
    }

    /// Cost of one category after modifiers.
    pub fn category_cost(&self, category: ComponentCategory) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.category == category)
            .map(CostLine::cost)
            .sum()
    }

    pub fn unit_cost(&self) -> Decimal {
        self.lines.iter().map(CostLine::cost).sum()
    }

    /// Cost of producing `quantity` units after the volume discount.
    pub fn batch_cost(&self, quantity: u32) -> Decimal {
        let gross = self.unit_cost() * Decimal::from(quantity);
        round_cents(gross * (Decimal::ONE - volume_discount(quantity)))
    }
}
