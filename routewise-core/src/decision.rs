//! Decision records and the scoring artifacts embedded in them

use crate::{AgentId, DecisionId, ScoringWeights, TicketId, Timestamp};
use serde::{Deserialize, Serialize};

/// Open-ticket counts per age bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBreakdown {
    pub fresh: u32,
    pub recent: u32,
    pub stale: u32,
    pub abandoned: u32,
}

impl LoadBreakdown {
    pub fn ticket_count(&self) -> u32 {
        self.fresh + self.recent + self.stale + self.abandoned
    }
}

/// Age-decayed workload of one agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedLoad {
    pub total: f64,
    pub breakdown: LoadBreakdown,
}

/// Per-factor result of scoring one (ticket, agent) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub agent_id: AgentId,
    pub skill: f64,
    pub level: f64,
    pub workload: f64,
    pub location: f64,
    pub vip: f64,
    /// Normalized weights the total was computed with
    pub weights: ScoringWeights,
    pub weighted_load: f64,
    /// Capacity ceiling the workload factor was measured against
    pub capacity_ceiling: f64,
    /// Weighted sum, clamped to [0, 1]
    pub total: f64,
}

/// Why an agent was excluded from a ticket's candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    Unavailable,
    OnLeave,
    SupportModeMismatch,
    LevelTooLow,
    SkillMismatch,
    NotVipCapable,
}

impl RejectionReason {
    /// Stable reason code, as serialized.
    pub fn code(self) -> &'static str {
        match self {
            RejectionReason::Unavailable => "UNAVAILABLE",
            RejectionReason::OnLeave => "ON_LEAVE",
            RejectionReason::SupportModeMismatch => "SUPPORT_MODE_MISMATCH",
            RejectionReason::LevelTooLow => "LEVEL_TOO_LOW",
            RejectionReason::SkillMismatch => "SKILL_MISMATCH",
            RejectionReason::NotVipCapable => "NOT_VIP_CAPABLE",
        }
    }
}

/// An excluded agent and the first check it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub agent_id: AgentId,
    pub reason: RejectionReason,
}

/// A scored candidate at its position in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based position
    pub rank: usize,
    pub breakdown: ScoreBreakdown,
}

impl RankedCandidate {
    pub fn agent_id(&self) -> &AgentId {
        &self.breakdown.agent_id
    }

    pub fn score(&self) -> f64 {
        self.breakdown.total
    }
}

/// Kind of routing action recorded for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    AutoAssigned,
    Suggested,
    ManualOverride,
}

/// Terminal state of a decision pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    AutoAssigned,
    Suggested,
    ManualOverride,
    /// Nobody passed eligibility; queue for manual triage
    NoEligibleAgent,
    /// Candidates exist but the best one is below the suggest threshold
    NoConfidentMatch,
}

impl DecisionOutcome {
    pub fn decision_type(self) -> Option<DecisionType> {
        match self {
            DecisionOutcome::AutoAssigned => Some(DecisionType::AutoAssigned),
            DecisionOutcome::Suggested => Some(DecisionType::Suggested),
            DecisionOutcome::ManualOverride => Some(DecisionType::ManualOverride),
            DecisionOutcome::NoEligibleAgent | DecisionOutcome::NoConfidentMatch => None,
        }
    }
}

/// Immutable record of how a ticket was (or was not) routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub decision_id: DecisionId,
    pub ticket_id: TicketId,
    pub outcome: DecisionOutcome,
    pub chosen_agent_id: Option<AgentId>,
    pub breakdown: Option<ScoreBreakdown>,
    /// Runner-up candidates after the chosen one
    pub alternatives: Vec<RankedCandidate>,
    /// Every scored candidate, best first
    pub ranked: Vec<RankedCandidate>,
    /// Diagnostics only
    pub rejections: Vec<Rejection>,
    /// Derived from a snapshot older than the freshness window
    pub stale_data: bool,
    pub reason: String,
    /// Decision replaced by this one (manual overrides)
    pub supersedes: Option<DecisionId>,
    pub override_reason: Option<String>,
    pub decided_at: Timestamp,
}

impl Decision {
    pub fn decision_type(&self) -> Option<DecisionType> {
        self.outcome.decision_type()
    }

    /// True when an agent was chosen, pending confirmation or not.
    pub fn is_routed(&self) -> bool {
        self.chosen_agent_id.is_some()
    }

    pub fn chosen_score(&self) -> Option<f64> {
        self.breakdown.as_ref().map(|b| b.total)
    }
}
