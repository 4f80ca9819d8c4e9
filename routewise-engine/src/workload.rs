//! Workload weighting
//!
//! Raw open-ticket counts reward agents who sit on old tickets. Weighting
//! each ticket by an age-decayed multiplier makes the load number track
//! near-term capacity pressure instead.

use routewise_core::{Agent, DecayConfig, LoadBreakdown, WeightedLoad};
use serde::{Deserialize, Serialize};

/// Age bucket of an open ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeBucket {
    Fresh,
    Recent,
    Stale,
    Abandoned,
}

impl AgeBucket {
    /// Bucket for a ticket aged `age_days`. Lower bounds are inclusive.
    pub fn for_age(age_days: u32, decay: &DecayConfig) -> Self {
        if age_days < decay.recent_from_days {
            AgeBucket::Fresh
        } else if age_days < decay.stale_from_days {
            AgeBucket::Recent
        } else if age_days < decay.abandoned_from_days {
            AgeBucket::Stale
        } else {
            AgeBucket::Abandoned
        }
    }

    pub fn multiplier(self, decay: &DecayConfig) -> f64 {
        match self {
            AgeBucket::Fresh => decay.fresh_multiplier,
            AgeBucket::Recent => decay.recent_multiplier,
            AgeBucket::Stale => decay.stale_multiplier,
            AgeBucket::Abandoned => decay.abandoned_multiplier,
        }
    }
}

/// Bucket a list of ticket ages and sum their decayed weights.
pub fn weigh_ticket_ages(ages: impl IntoIterator<Item = u32>, decay: &DecayConfig) -> WeightedLoad {
    let mut breakdown = LoadBreakdown::default();
    for age in ages {
        match AgeBucket::for_age(age, decay) {
            AgeBucket::Fresh => breakdown.fresh += 1,
            AgeBucket::Recent => breakdown.recent += 1,
            AgeBucket::Stale => breakdown.stale += 1,
            AgeBucket::Abandoned => breakdown.abandoned += 1,
        }
    }

    let total = breakdown.fresh as f64 * decay.fresh_multiplier
        + breakdown.recent as f64 * decay.recent_multiplier
        + breakdown.stale as f64 * decay.stale_multiplier
        + breakdown.abandoned as f64 * decay.abandoned_multiplier;

    WeightedLoad { total, breakdown }
}

/// Weighted load of an agent's open tickets.
pub fn compute_weighted_load(agent: &Agent, decay: &DecayConfig) -> WeightedLoad {
    weigh_ticket_ages(agent.open_ticket_ages(), decay)
}


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
