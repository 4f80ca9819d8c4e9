//! Match scoring
//!
//! Five independent factors in [0, 1], combined with the configured
//! (normalized) weights. The full breakdown is kept so the UI can explain
//! a decision and tests can reproduce it.

use crate::workload::compute_weighted_load;
use rayon::prelude::*;
use routewise_core::{
    normalize_skill, Agent, EngineConfig, LevelScoring, LocationScoring, ScoreBreakdown,
    SupportMode, Ticket, VipScoring,
};
use std::collections::HashSet;

/// Pools at least this large are scored on the rayon pool.
const PARALLEL_SCORING_MIN: usize = 32;

/// Fraction of the ticket's required skills the agent has.
pub fn skill_score(ticket: &Ticket, agent: &Agent) -> f64 {
    let required = ticket.normalized_skills();
    if required.is_empty() {
        return 1.0;
    }
    let agent_skills: HashSet<String> = agent.skills.iter().map(|s| normalize_skill(s)).collect();
    let matched = required.iter().filter(|s| agent_skills.contains(*s)).count();
    matched as f64 / required.len() as f64
}

/// 1.0 on an exact level match, decaying linearly with tier distance.
pub fn level_score(ticket: &Ticket, agent: &Agent, curve: &LevelScoring) -> f64 {
    let distance = agent.level.distance(ticket.required_level) as f64;
    (1.0 - distance * curve.decay_per_step).max(0.0)
}

/// `max(0, 1 - load / ceiling)`.
pub fn workload_score(weighted_load: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return 0.0;
    }
    (1.0 - weighted_load / ceiling).max(0.0)
}

/// Full credit for the same city in the same timezone, partial credit for a
/// shared timezone, and a floor for agents able to work remotely (unless the
/// ticket needs someone onsite). A city name matched in another timezone is
/// a different place.
pub fn location_score(ticket: &Ticket, agent: &Agent, credits: &LocationScoring) -> f64 {
    let Some(wanted) = &ticket.location else {
        return 1.0;
    };

    let base = match &agent.location {
        Some(loc) if loc.same_city(&wanted.city) && loc.timezone == wanted.timezone => 1.0,
        Some(loc) if loc.timezone == wanted.timezone => credits.same_timezone_credit,
        _ => 0.0,
    };

    let remote_applies = ticket.support_mode != Some(SupportMode::Onsite)
        && agent.supports_mode(SupportMode::Remote);
    if remote_applies {
        base.max(credits.remote_floor)
    } else {
        base
    }
}

/// VIP factor; always 0 for non-VIP tickets.
pub fn vip_score(ticket: &Ticket, agent: &Agent, credits: &VipScoring) -> f64 {
    if !ticket.vip {
        0.0
    } else if agent.vip_specialist {
        1.0
    } else if agent.vip_capable {
        credits.capable_credit
    } else {
        0.0
    }
}

/// Score one (ticket, agent) pair. Pure: identical inputs give
/// bit-identical breakdowns.
///
/// `config` is expected to have been through `EngineConfig::prepare`, so
/// the weights already sum to 1.0.
pub fn score_agent(ticket: &Ticket, agent: &Agent, config: &EngineConfig) -> ScoreBreakdown {
    let load = compute_weighted_load(agent, &config.decay);
    let ceiling = config.capacity.for_load(load.total);

    let skill = skill_score(ticket, agent);
    let level = level_score(ticket, agent, &config.level);
    let workload = workload_score(load.total, ceiling);
    let location = location_score(ticket, agent, &config.location);
    let vip = vip_score(ticket, agent, &config.vip);

    let w = config.weights;
    let total = (w.skill * skill
        + w.level * level
        + w.workload * workload
        + w.location * location
        + w.vip * vip)
        .clamp(0.0, 1.0);

    ScoreBreakdown {
        agent_id: agent.agent_id.clone(),
        skill,
        level,
        workload,
        location,
        vip,
        weights: w,
        weighted_load: load.total,
        capacity_ceiling: ceiling,
        total,
    }
}

/// Score every candidate, preserving input order.
pub fn score_candidates(ticket: &Ticket, candidates: &[&Agent], config: &EngineConfig) -> Vec<ScoreBreakdown> {
    if candidates.len() >= PARALLEL_SCORING_MIN {
        candidates
            .par_iter()
            .map(|agent| score_agent(ticket, agent, config))
            .collect()
    } else {
        candidates
            .iter()
            .map(|agent| score_agent(ticket, agent, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewise_core::{Location, LocationRequirement, SupportLevel};

    fn config() -> EngineConfig {
        EngineConfig::default().prepare().unwrap()
    }

    fn vancouver_ticket() -> Ticket {
        Ticket::new("t1", "Cannot log in", SupportLevel::L1)
            .with_required_skills(&["password_reset"])
            .with_location(LocationRequirement::new("Vancouver", "America/Vancouver"))
    }

    #[test]
    fn test_skill_score_fraction() {
        let ticket = Ticket::new("t", "x", SupportLevel::L1).with_required_skills(&["vpn", "mfa", "sso", "email"]);
        let agent = Agent::new("a", "A", SupportLevel::L1).with_skills(&["VPN", "sso"]);
        assert_eq!(skill_score(&ticket, &agent), 0.5);

        let open = Ticket::new("t2", "x", SupportLevel::L1);
        assert_eq!(skill_score(&open, &agent), 1.0);
    }

    #[test]
    fn test_level_score_linear_decay() {
        let curve = LevelScoring::default();
        let ticket = Ticket::new("t", "x", SupportLevel::L1);
        assert_eq!(level_score(&ticket, &Agent::new("a", "A", SupportLevel::L1), &curve), 1.0);
        assert_eq!(level_score(&ticket, &Agent::new("b", "B", SupportLevel::L2), &curve), 0.5);
        assert_eq!(level_score(&ticket, &Agent::new("c", "C", SupportLevel::L3), &curve), 0.0);
    }

    #[test]
    fn test_workload_score_bounds() {
        assert_eq!(workload_score(0.0, 10.0), 1.0);
        assert_eq!(workload_score(5.0, 10.0), 0.5);
        assert_eq!(workload_score(15.0, 10.0), 0.0);
        assert_eq!(workload_score(1.0, 0.0), 0.0);
    }

    #[test]
    fn test_location_score_tiers() {
        let credits = LocationScoring::default();
        let ticket = vancouver_ticket();

        let same_city = Agent::new("a", "A", SupportLevel::L1)
            .with_location(Location::new("vancouver", "America/Vancouver", vec![]));
        let same_tz = Agent::new("b", "B", SupportLevel::L1)
            .with_location(Location::new("Seattle", "America/Vancouver", vec![]));
        let elsewhere = Agent::new("c", "C", SupportLevel::L1)
            .with_location(Location::new("Berlin", "Europe/Berlin", vec![]));
        let remote = Agent::new("d", "D", SupportLevel::L1)
            .with_location(Location::new("Berlin", "Europe/Berlin", vec![SupportMode::Remote]));

        assert_eq!(location_score(&ticket, &same_city, &credits), 1.0);
        assert_eq!(location_score(&ticket, &same_tz, &credits), 0.5);
        assert_eq!(location_score(&ticket, &elsewhere, &credits), 0.0);
        assert_eq!(location_score(&ticket, &remote, &credits), 0.3);

        let onsite = ticket.clone().with_support_mode(SupportMode::Onsite);
        assert_eq!(location_score(&onsite, &remote, &credits), 0.0);
    }

    #[test]
    fn test_location_same_city_name_other_timezone_is_no_match() {
        let credits = LocationScoring::default();
        let ticket = vancouver_ticket();

        let namesake = Agent::new("a", "A", SupportLevel::L1)
            .with_location(Location::new("Vancouver", "Europe/Berlin", vec![]));
        assert_eq!(location_score(&ticket, &namesake, &credits), 0.0);

        let remote_namesake = Agent::new("b", "B", SupportLevel::L1)
            .with_location(Location::new("Vancouver", "Europe/Berlin", vec![SupportMode::Remote]));
        assert_eq!(location_score(&ticket, &remote_namesake, &credits), credits.remote_floor);
    }

    #[test]
    fn test_vip_score_tiers() {
        let credits = VipScoring::default();
        let vip = Ticket::new("t", "x", SupportLevel::L1).as_vip();
        let plain = Ticket::new("t2", "x", SupportLevel::L1);
        let specialist = Agent::new("a", "A", SupportLevel::L1).with_vip(true);
        let capable = Agent::new("b", "B", SupportLevel::L1).with_vip(false);

        assert_eq!(vip_score(&vip, &specialist, &credits), 1.0);
        assert_eq!(vip_score(&vip, &capable, &credits), 0.5);
        assert_eq!(vip_score(&plain, &specialist, &credits), 0.0);
    }

    #[test]
    fn test_score_agent_scenario() {
        let config = config();
        let agent = Agent::new("A", "Alice", SupportLevel::L1)
            .with_skills(&["password_reset"])
            .with_location(Location::new("Vancouver", "America/Vancouver", vec![SupportMode::Remote]))
            .with_open_ticket_ages(&[0, 1]);

        let breakdown = score_agent(&vancouver_ticket(), &agent, &config);
        assert_eq!(breakdown.skill, 1.0);
        assert_eq!(breakdown.level, 1.0);
        assert_eq!(breakdown.location, 1.0);
        assert_eq!(breakdown.vip, 0.0);
        assert!((breakdown.weighted_load - 4.0).abs() < 1e-12);
        assert_eq!(breakdown.capacity_ceiling, 10.0);
        assert!((breakdown.workload - 0.6).abs() < 1e-12);
        // 0.35 + 0.20 + 0.25 * 0.6 + 0.15
        assert!((breakdown.total - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_score_agent_is_deterministic() {
        let config = config();
        let agent = Agent::new("A", "Alice", SupportLevel::L2)
            .with_skills(&["password_reset", "vpn"])
            .with_open_ticket_ages(&[0, 3, 8, 40]);
        let ticket = vancouver_ticket();
        assert_eq!(score_agent(&ticket, &agent, &config), score_agent(&ticket, &agent, &config));
    }

    #[test]
    fn test_parallel_scoring_preserves_order() {
        let config = config();
        let ticket = vancouver_ticket();
        let pool: Vec<Agent> = (0..100)
            .map(|i| Agent::new(format!("agent-{i}"), "x", SupportLevel::L1).with_skills(&["password_reset"]))
            .collect();
        let refs: Vec<&Agent> = pool.iter().collect();
        let scored = score_candidates(&ticket, &refs, &config);
        assert_eq!(scored.len(), 100);
        for (agent, breakdown) in pool.iter().zip(&scored) {
            assert_eq!(agent.agent_id, breakdown.agent_id);
        }
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
