//! Identity types for ROUTEWISE entities
//!
//! Agents and tickets are keyed by the identifiers the upstream ticketing
//! system hands out, so they are opaque strings. Decisions are minted
//! locally and use UUIDv7 so they sort by creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Identifier for a recorded decision.
pub type DecisionId = Uuid;

/// Generate a new UUIDv7 DecisionId (timestamp-sortable).
pub fn new_decision_id() -> DecisionId {
    Uuid::now_v7()
}

macro_rules! upstream_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

upstream_id!(
    /// Agent identifier as issued by the upstream ticketing system.
    AgentId
);

upstream_id!(
    /// Ticket identifier as issued by the upstream ticketing system.
    TicketId
);
