#![deny(warnings)]

//! Headless front end for Phone Tycoon's generated content.
//!
//! Each command mirrors one of the game's forms and prints the JSON response
//! the game would render. Settings are read once per invocation.

mod config;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use persistence::{
    default_sqlite_url, ensure_save_dir, KeyValueStore, MemoryStore, SettingsAccessor, SqliteStore,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;
use tycoon_ai::{FlowResponse, Generator, HttpModelClient, ModelClient, UnavailableClient};
use tycoon_core::{
    ComponentCategory, ComponentEstimateRequest, ContractRequest, ModeConfiguration, PhoneSpecs,
    SeededRandom, SloganRequest, TrendForecastRequest,
};
use tycoon_econ::{suggested_retail_price, CostLedger, CostLine};

use crate::config::{AppConfig, MEMORY_STORAGE};

const USAGE: &str = "usage: tycoon <command> [--flag value]...
commands:
  slogans   --brand NAME [--logo TEXT] [--strategy budget|mass_market|premium|innovation|lifestyle]
  review    --input FILE | --json SPECS
  contract  [--reputation N] [--level N]
  trends    [--market-data T] [--preferences T] [--tech T] [--competitors T]
  estimate  --name NAME --category CAT --tier TIER [--description TEXT]
  cost      --input FILE | --json SPECS [--quantity N] [--modifier CAT:PCT[,CAT:PCT]]
  settings  [--online true|false] [--difficulty easy|normal|hard] [--reset]
  version
global flags: --config FILE, --storage URL, --seed N";

/// Retail margin suggested by `cost`.
const SUGGESTED_MARGIN_PCT: i64 = 40;

#[derive(Debug, Default, PartialEq)]
struct Args {
    command: Option<String>,
    flags: BTreeMap<String, String>,
}

impl Args {
    fn get(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    fn text(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| anyhow!("missing --{name}"))
    }

    fn number<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|v| v.parse().map_err(|_| anyhow!("--{name} expects a number, got {v:?}")))
            .transpose()
    }

    /// A wire token such as `flagship` or `mass_market`.
    fn token<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.get(name).map(|v| parse_token(name, v)).transpose()
    }
}

/// First bare word is the command; `--flag value` pairs follow. A flag with
/// no value reads as `true`.
fn parse_args(raw: impl IntoIterator<Item = String>) -> Args {
    let mut args = Args::default();
    let mut it = raw.into_iter().peekable();
    while let Some(arg) = it.next() {
        match arg.strip_prefix("--") {
            Some(name) => {
                let value = match it.peek() {
                    Some(next) if !next.starts_with("--") => it.next().unwrap_or_default(),
                    _ => "true".to_string(),
                };
                args.flags.insert(name.to_string(), value);
            }
            None if args.command.is_none() => args.command = Some(arg),
            None => {}
        }
    }
    args
}

fn parse_token<T: DeserializeOwned>(flag: &str, value: &str) -> Result<T> {
    serde_json::from_value(Value::String(value.to_string()))
        .with_context(|| format!("--{flag}: unknown value {value:?}"))
}

/// `camera:+20,display:-10` into per-category percentages.
fn parse_modifiers(spec: &str) -> Result<Vec<(ComponentCategory, i32)>> {
    spec.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let (category, pct) = part
                .split_once(':')
                .ok_or_else(|| anyhow!("modifier {part:?} is not CATEGORY:PCT"))?;
            let pct = pct
                .trim()
                .trim_start_matches('+')
                .parse::<i32>()
                .with_context(|| format!("modifier {part:?} has a bad percentage"))?;
            Ok((parse_token("modifier", category.trim())?, pct))
        })
        .collect()
}

fn read_specs(args: &Args) -> Result<PhoneSpecs> {
    let text = match (args.get("input"), args.get("json")) {
        (Some(path), _) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("reading phone specs from {path}"))?,
        (None, Some(json)) => json.to_string(),
        (None, None) => bail!("expected --input FILE or --json SPECS"),
    };
    serde_json::from_str(&text).context("invalid phone specs")
}

async fn open_store(url: &str) -> Result<Box<dyn KeyValueStore>> {
    if url == MEMORY_STORAGE {
        return Ok(Box::new(MemoryStore::new()));
    }
    ensure_save_dir(url)?;
    Ok(Box::new(SqliteStore::connect(url).await?))
}

fn model_client(cfg: &AppConfig) -> Result<Arc<dyn ModelClient>> {
    Ok(match cfg.model.api_key() {
        Some(key) => Arc::new(HttpModelClient::new(cfg.model.clone(), key)?),
        None => {
            warn!(env = %cfg.model.api_key_env, "no model API key set, online features will fail over");
            Arc::new(UnavailableClient::new(format!(
                "{} is not set",
                cfg.model.api_key_env
            )))
        }
    })
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_response<T: Serialize>(response: FlowResponse<T>) -> Result<()> {
    print_json(&response)
}

/// Bill of materials for a design, printed by `cost`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CostReport {
    name: String,
    lines: Vec<CostLine>,
    #[serde(with = "rust_decimal::serde::float")]
    unit_cost: Decimal,
    quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    batch_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    suggested_retail_price: Decimal,
}

fn cost_report(args: &Args) -> Result<CostReport> {
    let specs = read_specs(args)?;
    let quantity = args.number::<u32>("quantity")?.unwrap_or(1);
    let mut ledger = CostLedger::for_specs(&specs);
    if let Some(spec) = args.get("modifier") {
        for (category, pct) in parse_modifiers(spec)? {
            ledger.apply_modifier(category, pct);
        }
    }
    let unit_cost = ledger.unit_cost();
    Ok(CostReport {
        name: specs.name,
        lines: ledger.lines().to_vec(),
        unit_cost,
        quantity,
        batch_cost: ledger.batch_cost(quantity),
        suggested_retail_price: suggested_retail_price(
            unit_cost,
            Decimal::new(SUGGESTED_MARGIN_PCT, 2),
        )?,
    })
}

async fn run_settings(args: &Args, settings: &SettingsAccessor<Box<dyn KeyValueStore>>) -> Result<()> {
    if args.get("reset").is_some() {
        settings.reset().await?;
    }
    if let Some(online) = args.get("online") {
        let enabled = online
            .parse::<bool>()
            .map_err(|_| anyhow!("--online expects true or false"))?;
        settings.set_online_features(enabled).await?;
    }
    if let Some(difficulty) = args.token("difficulty")? {
        settings.set_difficulty(difficulty).await?;
    }
    print_json(&settings.load().await)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1));
    let command = args.command.clone().unwrap_or_default();
    info!(%command, "starting CLI");

    match command.as_str() {
        "version" => {
            println!("tycoon {} ({})", env!("GIT_SHA"), env!("BUILD_DATE"));
            return Ok(());
        }
        "" | "help" => {
            println!("{USAGE}");
            return Ok(());
        }
        _ => {}
    }

    let cfg = AppConfig::resolve(args.get("config"))?;
    let url = args
        .get("storage")
        .map(str::to_string)
        .or_else(|| cfg.storage_url.clone())
        .unwrap_or_else(|| default_sqlite_url().to_string());
    let settings = SettingsAccessor::new(open_store(&url).await?);

    if command == "settings" {
        return run_settings(&args, &settings).await;
    }
    if command == "cost" {
        return print_json(&cost_report(&args)?);
    }

    let mode: ModeConfiguration = settings.load().await;
    let generator = Generator::new(model_client(&cfg)?)
        .with_timeout(Duration::from_millis(cfg.model.timeout_ms));
    let seed = args.number::<u64>("seed")?.or(cfg.seed);
    let mut rng = seed.map(SeededRandom::new).unwrap_or_else(SeededRandom::from_entropy);
    info!(
        online = mode.use_online_features,
        difficulty = ?mode.difficulty,
        client = generator.client_name(),
        ?seed,
        "settings loaded"
    );

    match command.as_str() {
        "slogans" => {
            let request = SloganRequest {
                brand_name: args.require("brand")?.to_string(),
                logo_description: args.text("logo"),
                marketing_strategy: args.token("strategy")?,
            };
            print_response(generator.generate_slogans(&request, &mode, &mut rng).await.into())
        }
        "review" => {
            let specs = read_specs(&args)?;
            print_response(generator.generate_phone_review(&specs, &mode, &mut rng).await.into())
        }
        "contract" => {
            let request = ContractRequest {
                player_reputation: args.number("reputation")?,
                player_level: args.number("level")?,
            };
            print_response(generator.generate_client_contract(&request, &mode, &mut rng).await.into())
        }
        "trends" => {
            let request = TrendForecastRequest {
                market_data: args.text("market-data"),
                consumer_preferences: args.text("preferences"),
                technological_advancements: args.text("tech"),
                competitor_analysis: args.text("competitors"),
            };
            print_response(generator.forecast_trends(&request, &mode, &mut rng).await.into())
        }
        "estimate" => {
            let request = ComponentEstimateRequest {
                component_name: args.require("name")?.to_string(),
                category: parse_token("category", args.require("category")?)?,
                description: args.text("description"),
                tier: parse_token("tier", args.require("tier")?)?,
            };
            print_response(generator.estimate_component_cost(&request, &mode, &mut rng).await.into())
        }
        other => bail!("unknown command {other:?}\n{USAGE}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tycoon_core::{Difficulty, MarketingStrategy, Tier};

    fn args(line: &str) -> Args {
        parse_args(line.split_whitespace().map(str::to_string))
    }

    #[test]
    fn command_and_flags() {
        let a = args("slogans --brand Nova --strategy premium --seed 7");
        assert_eq!(a.command.as_deref(), Some("slogans"));
        assert_eq!(a.get("brand"), Some("Nova"));
        assert_eq!(a.number::<u64>("seed").unwrap(), Some(7));
        assert_eq!(
            a.token::<MarketingStrategy>("strategy").unwrap(),
            Some(MarketingStrategy::Premium)
        );
    }

    #[test]
    fn bare_flags_read_as_true() {
        let a = args("settings --reset --difficulty hard");
        assert_eq!(a.get("reset"), Some("true"));
        assert_eq!(a.token::<Difficulty>("difficulty").unwrap(), Some(Difficulty::Hard));
    }

    #[test]
    fn bad_values_are_errors() {
        let a = args("estimate --tier legendary --level x");
        assert!(a.token::<Tier>("tier").is_err());
        assert!(a.number::<u32>("level").is_err());
        assert!(a.require("name").is_err());
    }

    #[test]
    fn modifiers_parse() {
        let m = parse_modifiers("camera:+20, display:-10").unwrap();
        assert_eq!(
            m,
            vec![(ComponentCategory::Camera, 20), (ComponentCategory::Display, -10)]
        );
        assert!(parse_modifiers("camera20").is_err());
        assert!(parse_modifiers("antenna:5").is_err());
    }

    #[test]
    fn cost_report_totals_the_ledger() {
        let specs = r#"{"processor":"snapdragon_7_gen_3","ram":8,"storage":128,"cameraResolution":50,
            "batteryCapacity":4500,"refreshRate":"120hz","material":"aluminum","unitManufacturingCost":200}"#;
        let mut a = Args::default();
        a.flags.insert("json".to_string(), specs.to_string());
        a.flags.insert("quantity".to_string(), "10".to_string());

        let plain = cost_report(&a).unwrap();
        assert_eq!(plain.lines.len(), 7);
        assert_eq!(plain.batch_cost, plain.unit_cost * Decimal::from(10));
        assert!(plain.suggested_retail_price > plain.unit_cost);

        a.flags.insert("modifier".to_string(), "camera:+50".to_string());
        let shortage = cost_report(&a).unwrap();
        assert!(shortage.unit_cost > plain.unit_cost);
    }

    #[tokio::test]
    async fn settings_set_then_show() {
        let settings = SettingsAccessor::new(open_store(MEMORY_STORAGE).await.unwrap());
        run_settings(&args("settings --online false --difficulty hard"), &settings)
            .await
            .unwrap();
        let saved = settings.try_load().await.unwrap();
        assert!(!saved.use_online_features);
        assert_eq!(saved.difficulty, Difficulty::Hard);

        // Showing alone changes nothing
        run_settings(&args("settings"), &settings).await.unwrap();
        assert_eq!(settings.try_load().await.unwrap(), saved);

        run_settings(&args("settings --reset"), &settings).await.unwrap();
        assert_eq!(settings.try_load().await.unwrap(), ModeConfiguration::default());
    }

    #[tokio::test]
    async fn settings_rejects_bad_values() {
        let settings = SettingsAccessor::new(open_store(MEMORY_STORAGE).await.unwrap());
        assert!(run_settings(&args("settings --online maybe"), &settings).await.is_err());
        assert!(run_settings(&args("settings --difficulty brutal"), &settings).await.is_err());
        assert_eq!(settings.try_load().await.unwrap(), ModeConfiguration::default());
    }

    #[test]
    fn cost_needs_specs() {
        assert!(cost_report(&args("cost")).is_err());
    }
}
