#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use waybill_core::{
    Actor, DeliveryPatch, DeliveryStatus, ItemField, ItemId, List, ListId, ListItem, Period,
};

#[derive(Clone, Copy, Debug)]
pub struct BenchmarkTier {
    pub name: &'static str,
    pub item_count: usize,
    pub edit_count: usize,
}

pub const TIER_S: BenchmarkTier = BenchmarkTier {
    name: "S",
    item_count: 20,
    edit_count: 500,
};

pub const TIER_M: BenchmarkTier = BenchmarkTier {
    name: "M",
    item_count: 200,
    edit_count: 5_000,
};

pub const TIER_L: BenchmarkTier = BenchmarkTier {
    name: "L",
    item_count: 1_000,
    edit_count: 50_000,
};

pub const TIERS: [BenchmarkTier; 3] = [TIER_S, TIER_M, TIER_L];

/// A list seeded with a deterministic stream of customer and admin edits.
#[derive(Debug)]
pub struct SeededList {
    pub tier: BenchmarkTier,
    pub seed: u64,
    pub end: DateTime<Utc>,
    pub list: List,
}

#[derive(Clone, Copy, Debug)]
pub struct LatencySummary {
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

#[derive(Clone, Copy, Debug)]
struct Prng(u64);

impl Prng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // 64-bit LCG constants from Numerical Recipes.
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    fn next_index(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u64() as usize) % upper_exclusive
    }

    fn chance(&mut self, numerator: u64, denominator: u64) -> bool {
        debug_assert!(numerator <= denominator);
        self.next_u64() % denominator < numerator
    }
}

pub fn generate_list_for_bench(tier: BenchmarkTier, seed: u64) -> SeededList {
    let max_edits = std::env::var("WAYBILL_BENCH_MAX_EDITS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(20_000);
    let edit_limit = tier.edit_count.min(max_edits);
    generate_list_with_edit_limit(tier, seed, edit_limit)
}

pub fn generate_list_with_edit_limit(
    tier: BenchmarkTier,
    seed: u64,
    edit_limit: usize,
) -> SeededList {
    let mut prng = Prng::new(seed);
    let start = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();

    let mut list = List::new_at(
        ListId::new(format!("bench-{}", tier.name)),
        "c-bench",
        "Bench Handelskontor",
        start,
    );
    let mut ids = Vec::with_capacity(tier.item_count);
    for index in 0..tier.item_count {
        let id = ItemId::new(format!("item-{index}"));
        let mut item = ListItem::new(
            id.clone(),
            format!("Article {index}"),
            (prng.next_u64() % 50) as i64,
        );
        if prng.chance(1, 3) {
            item.unit = Some("kg".to_string());
        }
        list.add_item(item).expect("benchmark item ids are unique");
        ids.push(id);
    }

    let mut at = start;
    for _ in 0..edit_limit {
        at += chrono::Duration::minutes(1);
        apply_random_edit(&mut list, &ids, &mut prng, at);
    }

    SeededList {
        tier,
        seed,
        end: at + chrono::Duration::minutes(1),
        list,
    }
}

pub fn sample_latencies(iterations: usize, mut op: impl FnMut()) -> Vec<Duration> {
    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let start = Instant::now();
        op();
        samples.push(start.elapsed());
    }
    samples
}

pub fn summarize_latencies(samples: &[Duration]) -> LatencySummary {
    assert!(!samples.is_empty(), "at least one sample is required");

    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    LatencySummary {
        p50: percentile(&sorted, 50),
        p95: percentile(&sorted, 95),
        p99: percentile(&sorted, 99),
    }
}

fn percentile(sorted: &[Duration], percentile: usize) -> Duration {
    let idx = ((sorted.len() - 1) * percentile) / 100;
    sorted[idx]
}

fn apply_random_edit(list: &mut List, ids: &[ItemId], prng: &mut Prng, at: DateTime<Utc>) {
    let item = &ids[prng.next_index(ids.len())];
    let actor = if prng.chance(7, 10) {
        Actor::customer(format!("user-{}", prng.next_u64() % 8))
    } else {
        Actor::admin("gert")
    };

    if prng.chance(3, 5) {
        let (field, value) = sample_field_edit(prng);
        list.update_field_at(item, field, &value, &actor, at)
            .expect("benchmark field edit is valid");
    } else {
        let period = PERIODS[prng.next_index(PERIODS.len())];
        let patch = sample_patch(prng);
        list.update_delivery_at(
            item,
            &Period::new(period).expect("benchmark period is valid"),
            &patch,
            &actor,
            at,
        )
        .expect("benchmark delivery edit is valid");
    }
}

const PERIODS: [&str; 10] = [
    "2026-W30", "2026-W31", "2026-W32", "2026-W33", "2026-W34", "2026-W35", "2026-W36", "2026-W37",
    "2026-W38", "2026-W39",
];

const UNITS: [&str; 4] = ["kg", "pcs", "crate", "pallet"];

const COMMENTS: [&str; 6] = [
    "urgent",
    "call before delivery",
    "replaces last order",
    "loading dock b",
    "no substitutes",
    "partial ok",
];

fn sample_field_edit(prng: &mut Prng) -> (ItemField, Value) {
    match prng.next_u64() % 100 {
        0..=39 => (ItemField::Quantity, json!(prng.next_u64() % 500)),
        40..=59 => (
            ItemField::Name,
            json!(format!("Article {}", prng.next_u64() % 1_000)),
        ),
        60..=79 => (ItemField::Unit, sample_opt_word(prng, &UNITS)),
        _ => (ItemField::Comment, sample_opt_word(prng, &COMMENTS)),
    }
}

fn sample_opt_word(prng: &mut Prng, words: &[&str]) -> Value {
    if prng.chance(1, 5) {
        Value::Null
    } else {
        json!(words[prng.next_index(words.len())])
    }
}

fn sample_patch(prng: &mut Prng) -> DeliveryPatch {
    DeliveryPatch {
        status: if prng.chance(3, 5) {
            Some(sample_status(prng))
        } else {
            None
        },
        quantity: if prng.chance(1, 2) {
            Some((prng.next_u64() % 200) as i64)
        } else {
            None
        },
        note: if prng.chance(1, 4) {
            Some(format!("pallet {}", prng.next_u64() % 30))
        } else {
            None
        },
    }
}

fn sample_status(prng: &mut Prng) -> DeliveryStatus {
    match prng.next_u64() % 100 {
        0..=39 => DeliveryStatus::Open,
        40..=69 => DeliveryStatus::Packed,
        70..=89 => DeliveryStatus::Shipped,
        _ => DeliveryStatus::Delivered,
    }
}
