use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use serde_json::json;
use tycoon_ai::flows::{local_contract, local_review, local_slogans};
use tycoon_ai::{repair, ContractFlow, Flow};
use tycoon_core::{
    ContractRequest, MarketingStrategy, Material, ModeConfiguration, PhoneSpecs, Processor,
    RefreshRate, SeededRandom, SloganRequest,
};

fn midrange_phone() -> PhoneSpecs {
    PhoneSpecs {
        name: "Bench One".into(),
        processor: Processor::Snapdragon7Gen3,
        ram: 8,
        storage: 256,
        camera_resolution: 50,
        battery_capacity: 5000,
        refresh_rate: RefreshRate::Hz120,
        material: Material::Aluminum,
        nfc_support: true,
        has_ois: false,
        unit_manufacturing_cost: Decimal::new(210, 0),
        selling_price: Some(Decimal::new(499, 0)),
        special_features: vec!["Wireless charging".into()],
    }
}

fn bench_fallbacks(c: &mut Criterion) {
    let config = ModeConfiguration::default();
    let phone = midrange_phone();
    let slogan = SloganRequest {
        brand_name: "Nova".into(),
        logo_description: String::new(),
        marketing_strategy: Some(MarketingStrategy::Innovation),
    };
    let mut rng = SeededRandom::new(42);

    c.bench_function("local review", |b| {
        b.iter(|| black_box(local_review(black_box(&phone), &mut rng)))
    });
    c.bench_function("local slogans", |b| {
        b.iter(|| black_box(local_slogans(black_box(&slogan), &mut rng)))
    });
    c.bench_function("local contract", |b| {
        b.iter(|| black_box(local_contract(&ContractRequest::default(), &config, &mut rng)))
    });
}

fn bench_repair(c: &mut Criterion) {
    let raw = json!({
        "id": "bad id",
        "clientName": "  \"Orbit Telecom\" ",
        "requiredSpecs": { "minRam": "8", "material": "GLASS" },
        "quantity": 5000,
        "rewardPerUnit": "$75.555",
        "penalty": 0,
        "deadlineDays": 30,
        "status": "accepted"
    });
    let mut rng = SeededRandom::new(7);
    c.bench_function("repair contract", |b| {
        b.iter(|| black_box(repair(raw.clone(), ContractFlow::schema(), &mut rng)))
    });
}

criterion_group!(benches, bench_fallbacks, bench_repair);
criterion_main!(benches);
