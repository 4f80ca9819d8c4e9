//! Eligibility filtering
//!
//! Reduces the agent pool to agents allowed to take a ticket. Checks run
//! in a fixed order and stop at the first failure, whose reason code is
//! kept for diagnostics. The scorer never sees rejected agents.

use routewise_core::{Agent, Rejection, RejectionReason, Ticket, Timestamp};
use std::collections::HashSet;

/// Outcome of filtering a pool for one ticket.
#[derive(Debug, Clone)]
pub struct Eligibility<'a> {
    /// Eligible agents, in pool order
    pub eligible: Vec<&'a Agent>,
    pub rejections: Vec<Rejection>,
}

impl Eligibility<'_> {
    pub fn is_empty(&self) -> bool {
        self.eligible.is_empty()
    }
}

/// First failing check for `agent`, or `None` when eligible.
///
/// `required_skills` must be the ticket's normalized skill list.
fn first_failure(
    ticket: &Ticket,
    required_skills: &[String],
    agent: &Agent,
    now: Timestamp,
) -> Option<RejectionReason> {
    if !agent.is_available {
        return Some(RejectionReason::Unavailable);
    }
    if agent.is_on_leave(now) {
        return Some(RejectionReason::OnLeave);
    }

    if let Some(mode) = ticket.support_mode {
        if !agent.supports_mode(mode) {
            return Some(RejectionReason::SupportModeMismatch);
        }
    }

    // Higher tiers may take lower-tier work, never the other way round
    if agent.level < ticket.required_level {
        return Some(RejectionReason::LevelTooLow);
    }

    if !required_skills.is_empty() {
        let agent_skills: HashSet<String> =
            agent.skills.iter().map(|s| routewise_core::normalize_skill(s)).collect();
        if !required_skills.iter().any(|s| agent_skills.contains(s)) {
            return Some(RejectionReason::SkillMismatch);
        }
    }

    if ticket.vip && !agent.handles_vip() {
        return Some(RejectionReason::NotVipCapable);
    }

    None
}

/// Check a single agent against a ticket.
pub fn check_agent(ticket: &Ticket, agent: &Agent, now: Timestamp) -> Result<(), RejectionReason> {
    match first_failure(ticket, &ticket.normalized_skills(), agent, now) {
        Some(reason) => Err(reason),
        None => Ok(()),
    }
}

/// Filter `pool` down to the agents eligible for `ticket` at `now`.
pub fn filter_eligible<'a>(ticket: &Ticket, pool: &'a [Agent], now: Timestamp) -> Eligibility<'a> {
    let required_skills = ticket.normalized_skills();
    let mut eligible = Vec::with_capacity(pool.len());
    let mut rejections = Vec::new();

    for agent in pool {
        match first_failure(ticket, &required_skills, agent, now) {
            None => eligible.push(agent),
            Some(reason) => rejections.push(Rejection {
                agent_id: agent.agent_id.clone(),
                reason,
            }),
        }
    }

    tracing::debug!(
        ticket_id = %ticket.ticket_id,
        pool = pool.len(),
        eligible = eligible.len(),
        rejected = rejections.len(),
        "Eligibility filter applied"
    );

    Eligibility {
        eligible,
        rejections,
    }
}
