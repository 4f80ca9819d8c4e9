//! Core entity structures
//!
//! Agents and tickets as the decision engine sees them. Both are refreshed
//! from upstream by the sync client and are read-only to the scoring path.

use crate::{AgentId, TicketId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Support tier. Ordered so that `L1 < L2 < L3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SupportLevel {
    L1,
    L2,
    L3,
}

impl SupportLevel {
    /// Position on the ordinal tier scale.
    pub fn ordinal(self) -> u8 {
        match self {
            SupportLevel::L1 => 1,
            SupportLevel::L2 => 2,
            SupportLevel::L3 => 3,
        }
    }

    /// Absolute number of tiers between two levels.
    pub fn distance(self, other: SupportLevel) -> u8 {
        self.ordinal().abs_diff(other.ordinal())
    }
}

/// How a location can deliver support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportMode {
    Remote,
    Onsite,
}

/// Where an agent works from and what it can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    /// IANA timezone name, e.g. "America/Vancouver"
    pub timezone: String,
    pub modes: Vec<SupportMode>,
}

impl Location {
    pub fn new(city: &str, timezone: &str, modes: Vec<SupportMode>) -> Self {
        Self {
            city: city.to_string(),
            timezone: timezone.to_string(),
            modes,
        }
    }

    pub fn supports(&self, mode: SupportMode) -> bool {
        self.modes.contains(&mode)
    }

    /// Case-insensitive city comparison.
    pub fn same_city(&self, city: &str) -> bool {
        self.city.trim().eq_ignore_ascii_case(city.trim())
    }
}

/// Location a ticket should be served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRequirement {
    pub city: String,
    pub timezone: String,
}

impl LocationRequirement {
    pub fn new(city: &str, timezone: &str) -> Self {
        Self {
            city: city.to_string(),
            timezone: timezone.to_string(),
        }
    }
}

/// Lifecycle of a leave / PTO record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveStatus {
    Scheduled,
    Active,
    Cancelled,
    Completed,
}

/// Leave or PTO attached to an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    /// Free-form type as reported upstream ("vacation", "sick", ...)
    pub leave_type: String,
    pub status: LeaveStatus,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
}

impl Leave {
    /// Active leave that has started and has not ended yet.
    pub fn active(leave_type: &str, starts_at: Option<Timestamp>, ends_at: Option<Timestamp>) -> Self {
        Self {
            leave_type: leave_type.to_string(),
            status: LeaveStatus::Active,
            starts_at,
            ends_at,
        }
    }

    /// Whether the leave keeps the agent away at `now`.
    ///
    /// An end date only releases the agent once it is strictly in the past.
    pub fn is_in_effect(&self, now: Timestamp) -> bool {
        if self.status != LeaveStatus::Active {
            return false;
        }
        let started = self.starts_at.map_or(true, |start| start <= now);
        let not_ended = self.ends_at.map_or(true, |end| end >= now);
        started && not_ended
    }
}

/// A ticket currently held by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTicket {
    pub ticket_id: TicketId,
    /// Whole days since the ticket was opened
    pub age_days: u32,
}

/// Normalize a skill tag for comparison.
pub fn normalize_skill(skill: &str) -> String {
    skill.trim().to_lowercase()
}

/// A human support agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    pub name: String,
    pub is_available: bool,
    pub leave: Option<Leave>,
    pub level: SupportLevel,
    pub skills: Vec<String>,
    pub location: Option<Location>,
    #[serde(default)]
    pub open_tickets: Vec<OpenTicket>,
    #[serde(default)]
    pub vip_capable: bool,
    #[serde(default)]
    pub vip_specialist: bool,
}

impl Agent {
    /// Create an available agent with no skills, location or tickets.
    pub fn new(agent_id: impl Into<AgentId>, name: &str, level: SupportLevel) -> Self {
        Self {
            agent_id: agent_id.into(),
            name: name.to_string(),
            is_available: true,
            leave: None,
            level,
            skills: Vec::new(),
            location: None,
            open_tickets: Vec::new(),
            vip_capable: false,
            vip_specialist: false,
        }
    }

    pub fn with_skills(mut self, skills: &[&str]) -> Self {
        self.skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_leave(mut self, leave: Leave) -> Self {
        self.leave = Some(leave);
        self
    }

    pub fn with_availability(mut self, is_available: bool) -> Self {
        self.is_available = is_available;
        self
    }

    /// Mark the agent as VIP-capable, optionally as a VIP specialist.
    pub fn with_vip(mut self, specialist: bool) -> Self {
        self.vip_capable = true;
        self.vip_specialist = specialist;
        self
    }

    /// Attach open tickets with the given ages in days.
    pub fn with_open_ticket_ages(mut self, ages: &[u32]) -> Self {
        self.open_tickets = ages
            .iter()
            .enumerate()
            .map(|(i, age)| OpenTicket {
                ticket_id: TicketId::new(format!("{}-open-{}", self.agent_id, i)),
                age_days: *age,
            })
            .collect();
        self
    }

    /// Ages of all open tickets, in days.
    pub fn open_ticket_ages(&self) -> impl Iterator<Item = u32> + '_ {
        self.open_tickets.iter().map(|t| t.age_days)
    }

    pub fn is_on_leave(&self, now: Timestamp) -> bool {
        self.leave.as_ref().map_or(false, |leave| leave.is_in_effect(now))
    }

    /// Case-insensitive skill lookup.
    pub fn has_skill(&self, skill: &str) -> bool {
        let wanted = normalize_skill(skill);
        self.skills.iter().any(|s| normalize_skill(s) == wanted)
    }

    pub fn supports_mode(&self, mode: SupportMode) -> bool {
        self.location.as_ref().map_or(false, |loc| loc.supports(mode))
    }

    /// Specialists are always able to take VIP work.
    pub fn handles_vip(&self) -> bool {
        self.vip_capable || self.vip_specialist
    }
}

/// A support ticket awaiting assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: TicketId,
    pub subject: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub required_level: SupportLevel,
    #[serde(default)]
    pub vip: bool,
    pub location: Option<LocationRequirement>,
    pub support_mode: Option<SupportMode>,
    pub created_at: Timestamp,
}

impl Ticket {
    /// Create a non-VIP ticket with no skill or location requirement.
    pub fn new(ticket_id: impl Into<TicketId>, subject: &str, required_level: SupportLevel) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            subject: subject.to_string(),
            required_skills: Vec::new(),
            required_level,
            vip: false,
            location: None,
            support_mode: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_required_skills(mut self, skills: &[&str]) -> Self {
        self.required_skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_location(mut self, location: LocationRequirement) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_support_mode(mut self, mode: SupportMode) -> Self {
        self.support_mode = Some(mode);
        self
    }

    pub fn as_vip(mut self) -> Self {
        self.vip = true;
        self
    }

    pub fn created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }

    /// Required skills, normalized and deduplicated, in first-seen order.
    pub fn normalized_skills(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.required_skills.len());
        for skill in &self.required_skills {
            let skill = normalize_skill(skill);
            if !skill.is_empty() && !out.contains(&skill) {
                out.push(skill);
            }
        }
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_support_level_ordering() {
        assert!(SupportLevel::L1 < SupportLevel::L2);
        assert!(SupportLevel::L2 < SupportLevel::L3);
        assert_eq!(SupportLevel::L1.distance(SupportLevel::L3), 2);
        assert_eq!(SupportLevel::L3.distance(SupportLevel::L2), 1);
    }

    #[test]
    fn test_leave_in_effect_until_end_passes() {
        let now = Utc::now();
        let leave = Leave::active("vacation", Some(now - Duration::days(2)), Some(now));
        assert!(leave.is_in_effect(now));

        let ended = Leave::active("vacation", None, Some(now - Duration::seconds(1)));
        assert!(!ended.is_in_effect(now));
    }

    #[test]
    fn test_leave_not_started_or_inactive() {
        let now = Utc::now();
        let future = Leave::active("pto", Some(now + Duration::days(1)), None);
        assert!(!future.is_in_effect(now));

        let mut cancelled = Leave::active("pto", None, None);
        cancelled.status = LeaveStatus::Cancelled;
        assert!(!cancelled.is_in_effect(now));
    }

    #[test]
    fn test_agent_skill_lookup_is_case_insensitive() {
        let agent = Agent::new("a1", "Ada", SupportLevel::L1).with_skills(&["Password_Reset "]);
        assert!(agent.has_skill("password_reset"));
        assert!(!agent.has_skill("billing"));
    }

    #[test]
    fn test_ticket_normalized_skills_dedup() {
        let ticket = Ticket::new("t1", "Login", SupportLevel::L1)
            .with_required_skills(&["VPN", "vpn", " ", "Billing"]);
        assert_eq!(ticket.normalized_skills(), vec!["vpn", "billing"]);
    }

    #[test]
    fn test_specialist_handles_vip() {
        let mut agent = Agent::new("a1", "Ada", SupportLevel::L2);
        assert!(!agent.handles_vip());
        agent.vip_specialist = true;
        assert!(agent.handles_vip());
    }
}
