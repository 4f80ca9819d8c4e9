use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use routewise_core::{
    Agent, EngineConfig, Location, LocationRequirement, PoolSnapshot, SupportLevel, SupportMode,
    Ticket,
};
use routewise_engine::{evaluate, score_agent};
use std::hint::black_box;

const SKILLS: [&str; 6] = ["password_reset", "vpn", "mfa", "printer", "email", "sso"];
const CITIES: [(&str, &str); 3] = [
    ("Vancouver", "America/Vancouver"),
    ("Toronto", "America/Toronto"),
    ("Berlin", "Europe/Berlin"),
];

fn bench_pool(size: usize) -> Vec<Agent> {
    (0..size)
        .map(|i| {
            let (city, tz) = CITIES[i % CITIES.len()];
            let ages: Vec<u32> = (0..(i % 12) as u32).map(|n| n * 3).collect();
            Agent::new(format!("agent-{i}"), "Bench Agent", SupportLevel::L2)
                .with_skills(&[SKILLS[i % SKILLS.len()], SKILLS[(i + 1) % SKILLS.len()]])
                .with_location(Location::new(city, tz, vec![SupportMode::Remote]))
                .with_open_ticket_ages(&ages)
        })
        .collect()
}

fn bench_ticket() -> Ticket {
    Ticket::new("bench-ticket", "VPN drops every hour", SupportLevel::L1)
        .with_required_skills(&["vpn", "mfa"])
        .with_location(LocationRequirement::new("Vancouver", "America/Vancouver"))
}

fn bench_score_agent(c: &mut Criterion) {
    let config = EngineConfig::default().prepare().expect("default config");
    let ticket = bench_ticket();
    let agent = bench_pool(2).remove(1);

    c.bench_function("engine/score_agent", |b| {
        b.iter(|| {
            let breakdown = score_agent(black_box(&ticket), black_box(&agent), &config);
            black_box(breakdown.total);
        });
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let config = EngineConfig::default().prepare().expect("default config");
    let ticket = bench_ticket();
    let now = Utc::now();

    for size in [10usize, 200] {
        let snapshot = PoolSnapshot {
            agents: bench_pool(size),
            synced_at: Some(now - Duration::minutes(1)),
            version: 1,
        };
        c.bench_function(&format!("engine/evaluate_{size}"), |b| {
            b.iter(|| {
                let decision = evaluate(black_box(&ticket), &snapshot, &config, now);
                black_box(decision.ranked.len());
            });
        });
    }
}

criterion_group!(benches, bench_score_agent, bench_evaluate);
criterion_main!(benches);
