//! Default values shared across ROUTEWISE crates

// ============================================================================
// SCORING WEIGHTS
// ============================================================================

pub const DEFAULT_SKILL_WEIGHT: f64 = 0.35;
pub const DEFAULT_LEVEL_WEIGHT: f64 = 0.20;
pub const DEFAULT_WORKLOAD_WEIGHT: f64 = 0.25;
pub const DEFAULT_LOCATION_WEIGHT: f64 = 0.15;
pub const DEFAULT_VIP_WEIGHT: f64 = 0.05;

// ============================================================================
// WORKLOAD DECAY
// ============================================================================

/// First age (days) of the "recent" bucket; 0..=1 is "fresh"
pub const DEFAULT_RECENT_FROM_DAYS: u32 = 2;
pub const DEFAULT_STALE_FROM_DAYS: u32 = 6;
pub const DEFAULT_ABANDONED_FROM_DAYS: u32 = 15;

pub const DEFAULT_FRESH_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_RECENT_MULTIPLIER: f64 = 1.2;
pub const DEFAULT_STALE_MULTIPLIER: f64 = 0.5;
pub const DEFAULT_ABANDONED_MULTIPLIER: f64 = 0.1;

// ============================================================================
// FACTOR CURVES
// ============================================================================

/// Level score lost per tier of distance (0 at distance >= 2)
pub const DEFAULT_LEVEL_DECAY_PER_STEP: f64 = 0.5;

/// Location credit for same timezone, different city
pub const DEFAULT_SAME_TIMEZONE_CREDIT: f64 = 0.5;

/// Minimum location score for agents whose location supports remote work
pub const DEFAULT_REMOTE_FLOOR: f64 = 0.3;

/// VIP score for capable but non-specialist agents
pub const DEFAULT_VIP_CAPABLE_CREDIT: f64 = 0.5;

/// Lower bound of the dynamic capacity ceiling
pub const DEFAULT_CAPACITY_FLOOR: f64 = 10.0;

/// Headroom factor of the dynamic capacity ceiling
pub const DEFAULT_CAPACITY_HEADROOM: f64 = 1.2;

// ============================================================================
// DECISION
// ============================================================================

pub const DEFAULT_AUTO_ASSIGN_THRESHOLD: f64 = 0.75;
pub const DEFAULT_SUGGEST_THRESHOLD: f64 = 0.45;
pub const DEFAULT_ALTERNATIVES_COUNT: usize = 3;
pub const DEFAULT_TIE_EPSILON: f64 = 0.001;
pub const MAX_TIE_EPSILON: f64 = 0.1;

/// Snapshot age still trusted for automatic assignment (15 minutes)
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 900;

/// Upper bound for the freshness window (7 days)
pub const MAX_FRESHNESS_WINDOW_SECS: u64 = 604_800;

// ============================================================================
// UPSTREAM RETRY
// ============================================================================

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

// ============================================================================
// SYNC SERVICE
// ============================================================================

pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8080/api/v2";
