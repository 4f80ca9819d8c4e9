//! Configuration types
//!
//! Every knob the engine reads per decision pass lives in [`EngineConfig`].
//! A candidate config only goes live after [`EngineConfig::prepare`], which
//! validates it and normalizes the scoring weights.

use crate::constants::*;
use crate::{ConfigError, RoutewiseError, RoutewiseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relative importance of the five match factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub skill: f64,
    pub level: f64,
    pub workload: f64,
    pub location: f64,
    pub vip: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skill: DEFAULT_SKILL_WEIGHT,
            level: DEFAULT_LEVEL_WEIGHT,
            workload: DEFAULT_WORKLOAD_WEIGHT,
            location: DEFAULT_LOCATION_WEIGHT,
            vip: DEFAULT_VIP_WEIGHT,
        }
    }
}

impl ScoringWeights {
    fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("weights.skill", self.skill),
            ("weights.level", self.level),
            ("weights.workload", self.workload),
            ("weights.location", self.location),
            ("weights.vip", self.vip),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.skill + self.level + self.workload + self.location + self.vip
    }

    /// Rescale so the weights sum to 1.0. Callers must have validated that
    /// the sum is positive.
    pub fn normalized(&self) -> Self {
        let sum = self.sum();
        Self {
            skill: self.skill / sum,
            level: self.level / sum,
            workload: self.workload / sum,
            location: self.location / sum,
            vip: self.vip / sum,
        }
    }
}

/// Ticket-age buckets and their load multipliers.
///
/// A ticket aged `d` days is fresh when `d < recent_from_days`, recent when
/// `d < stale_from_days`, stale when `d < abandoned_from_days`, and
/// abandoned otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub recent_from_days: u32,
    pub stale_from_days: u32,
    pub abandoned_from_days: u32,
    pub fresh_multiplier: f64,
    pub recent_multiplier: f64,
    pub stale_multiplier: f64,
    pub abandoned_multiplier: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            recent_from_days: DEFAULT_RECENT_FROM_DAYS,
            stale_from_days: DEFAULT_STALE_FROM_DAYS,
            abandoned_from_days: DEFAULT_ABANDONED_FROM_DAYS,
            fresh_multiplier: DEFAULT_FRESH_MULTIPLIER,
            recent_multiplier: DEFAULT_RECENT_MULTIPLIER,
            stale_multiplier: DEFAULT_STALE_MULTIPLIER,
            abandoned_multiplier: DEFAULT_ABANDONED_MULTIPLIER,
        }
    }
}

/// Score cut-offs. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub auto_assign: f64,
    pub suggest: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            auto_assign: DEFAULT_AUTO_ASSIGN_THRESHOLD,
            suggest: DEFAULT_SUGGEST_THRESHOLD,
        }
    }
}

/// Level factor curve: linear decay per tier of distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelScoring {
    pub decay_per_step: f64,
}

impl Default for LevelScoring {
    fn default() -> Self {
        Self {
            decay_per_step: DEFAULT_LEVEL_DECAY_PER_STEP,
        }
    }
}

/// Partial credits of the location factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationScoring {
    pub same_timezone_credit: f64,
    pub remote_floor: f64,
}

impl Default for LocationScoring {
    fn default() -> Self {
        Self {
            same_timezone_credit: DEFAULT_SAME_TIMEZONE_CREDIT,
            remote_floor: DEFAULT_REMOTE_FLOOR,
        }
    }
}

/// Capacity the workload factor measures an agent's load against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapacityCeiling {
    /// Same ceiling for every agent
    Fixed { ceiling: f64 },
    /// `max(floor, ceil(load * headroom))`, computed per agent
    Dynamic { floor: f64, headroom: f64 },
}

impl Default for CapacityCeiling {
    fn default() -> Self {
        CapacityCeiling::Dynamic {
            floor: DEFAULT_CAPACITY_FLOOR,
            headroom: DEFAULT_CAPACITY_HEADROOM,
        }
    }
}

impl CapacityCeiling {
    /// Ceiling for an agent carrying `weighted_load`.
    pub fn for_load(&self, weighted_load: f64) -> f64 {
        match *self {
            CapacityCeiling::Fixed { ceiling } => ceiling,
            CapacityCeiling::Dynamic { floor, headroom } => {
                floor.max((weighted_load * headroom).ceil())
            }
        }
    }
}

/// VIP factor credits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VipScoring {
    pub capable_credit: f64,
}

impl Default for VipScoring {
    fn default() -> Self {
        Self {
            capable_credit: DEFAULT_VIP_CAPABLE_CREDIT,
        }
    }
}

/// Retry configuration for upstream operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// `min(initial * multiplier^attempt, max)`
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exp);
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }
}

/// Master configuration for the decision engine and its sync client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: ScoringWeights,
    pub decay: DecayConfig,
    pub thresholds: Thresholds,
    pub level: LevelScoring,
    pub location: LocationScoring,
    pub capacity: CapacityCeiling,
    pub vip: VipScoring,
    /// Runner-up candidates attached to routed decisions
    pub alternatives_count: usize,
    /// Totals closer than this are considered tied
    pub tie_epsilon: f64,
    pub freshness_window_secs: u64,
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            decay: DecayConfig::default(),
            thresholds: Thresholds::default(),
            level: LevelScoring::default(),
            location: LocationScoring::default(),
            capacity: CapacityCeiling::default(),
            vip: VipScoring::default(),
            alternatives_count: DEFAULT_ALTERNATIVES_COUNT,
            tie_epsilon: DEFAULT_TIE_EPSILON,
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            retry: RetryConfig::default(),
        }
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> RoutewiseError {
    RoutewiseError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

fn check_unit_interval(field: &str, value: f64) -> RoutewiseResult<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(invalid(field, value, "must be between 0.0 and 1.0"));
    }
    Ok(())
}

impl EngineConfig {
    /// Validate then normalize. This is the single entry point used on
    /// startup and on every reload.
    pub fn prepare(self) -> RoutewiseResult<Self> {
        self.validate()?;
        Ok(self.normalized())
    }

    /// Copy with scoring weights rescaled to sum to 1.0.
    pub fn normalized(&self) -> Self {
        Self {
            weights: self.weights.normalized(),
            ..self.clone()
        }
    }

    /// Parse TOML and prepare it.
    pub fn from_toml_str(raw: &str) -> RoutewiseResult<Self> {
        let parsed: EngineConfig = toml::from_str(raw).map_err(|e| {
            RoutewiseError::Config(ConfigError::Parse {
                reason: e.to_string(),
            })
        })?;
        parsed.prepare()
    }

    /// Read, parse and prepare a TOML config file.
    pub fn load_file(path: impl AsRef<Path>) -> RoutewiseResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RoutewiseError::Config(ConfigError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.freshness_window_secs.min(MAX_FRESHNESS_WINDOW_SECS) as i64)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - weights are finite, non-negative, and not all zero
    /// - thresholds in [0.0, 1.0] with suggest < auto_assign
    /// - decay buckets strictly increasing, multipliers non-increasing with age
    /// - factor credits in [0.0, 1.0]
    /// - capacity ceiling and retry settings are positive
    pub fn validate(&self) -> RoutewiseResult<()> {
        for (field, value) in self.weights.fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, value, "weight must be a finite, non-negative number"));
            }
        }
        if self.weights.sum() <= 0.0 {
            return Err(invalid(
                "weights",
                self.weights.sum(),
                "weights cannot be normalized because they sum to zero",
            ));
        }

        check_unit_interval("thresholds.auto_assign", self.thresholds.auto_assign)?;
        check_unit_interval("thresholds.suggest", self.thresholds.suggest)?;
        if self.thresholds.suggest >= self.thresholds.auto_assign {
            return Err(RoutewiseError::Config(ConfigError::IncompatibleOptions {
                option_a: format!("thresholds.suggest = {}", self.thresholds.suggest),
                option_b: format!("thresholds.auto_assign = {}", self.thresholds.auto_assign),
            }));
        }

        self.validate_decay()?;

        check_unit_interval("level.decay_per_step", self.level.decay_per_step)?;
        check_unit_interval("location.same_timezone_credit", self.location.same_timezone_credit)?;
        check_unit_interval("location.remote_floor", self.location.remote_floor)?;
        check_unit_interval("vip.capable_credit", self.vip.capable_credit)?;

        match self.capacity {
            CapacityCeiling::Fixed { ceiling } => {
                if !ceiling.is_finite() || ceiling <= 0.0 {
                    return Err(invalid("capacity.ceiling", ceiling, "ceiling must be positive"));
                }
            }
            CapacityCeiling::Dynamic { floor, headroom } => {
                if !floor.is_finite() || floor <= 0.0 {
                    return Err(invalid("capacity.floor", floor, "floor must be positive"));
                }
                if !headroom.is_finite() || headroom < 1.0 {
                    return Err(invalid("capacity.headroom", headroom, "headroom must be at least 1.0"));
                }
            }
        }

        if !self.tie_epsilon.is_finite() || !(0.0..=MAX_TIE_EPSILON).contains(&self.tie_epsilon) {
            return Err(invalid(
                "tie_epsilon",
                self.tie_epsilon,
                "tie_epsilon must be between 0.0 and 0.1",
            ));
        }

        if self.freshness_window_secs == 0 || self.freshness_window_secs > MAX_FRESHNESS_WINDOW_SECS {
            return Err(invalid(
                "freshness_window_secs",
                self.freshness_window_secs,
                "freshness window must be between 1 second and 7 days",
            ));
        }

        if self.retry.initial_delay_ms == 0 {
            return Err(invalid("retry.initial_delay_ms", 0, "initial delay must be positive"));
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(RoutewiseError::Config(ConfigError::IncompatibleOptions {
                option_a: format!("retry.initial_delay_ms = {}", self.retry.initial_delay_ms),
                option_b: format!("retry.max_delay_ms = {}", self.retry.max_delay_ms),
            }));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(invalid(
                "retry.backoff_multiplier",
                self.retry.backoff_multiplier,
                "backoff_multiplier must be at least 1.0",
            ));
        }

        Ok(())
    }

    fn validate_decay(&self) -> RoutewiseResult<()> {
        let d = &self.decay;
        if d.recent_from_days == 0 {
            return Err(invalid("decay.recent_from_days", 0, "fresh bucket must cover day 0"));
        }
        if d.stale_from_days <= d.recent_from_days {
            return Err(invalid(
                "decay.stale_from_days",
                d.stale_from_days,
                "must be greater than recent_from_days",
            ));
        }
        if d.abandoned_from_days <= d.stale_from_days {
            return Err(invalid(
                "decay.abandoned_from_days",
                d.abandoned_from_days,
                "must be greater than stale_from_days",
            ));
        }

        let multipliers = [
            ("decay.fresh_multiplier", d.fresh_multiplier),
            ("decay.recent_multiplier", d.recent_multiplier),
            ("decay.stale_multiplier", d.stale_multiplier),
            ("decay.abandoned_multiplier", d.abandoned_multiplier),
        ];
        for (field, value) in multipliers {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, value, "multiplier must be a finite, non-negative number"));
            }
        }
        for pair in multipliers.windows(2) {
            let (_, younger) = pair[0];
            let (field, older) = pair[1];
            if older > younger {
                return Err(invalid(field, older, "older buckets cannot weigh more than younger ones"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any non-negative weight set with a positive sum normalizes to 1.0
        #[test]
        fn prop_normalized_weights_sum_to_one(
            skill in 0.0f64..10.0,
            level in 0.0f64..10.0,
            workload in 0.0f64..10.0,
            location in 0.0f64..10.0,
            vip in 0.01f64..10.0,
        ) {
            let mut config = EngineConfig::default();
            config.weights = ScoringWeights { skill, level, workload, location, vip };
            let prepared = config.prepare().unwrap();
            prop_assert!((prepared.weights.sum() - 1.0).abs() < 1e-9);
        }

        /// Backoff never exceeds the configured maximum
        #[test]
        fn prop_backoff_bounded(attempt in 0u32..64) {
            let retry = RetryConfig::default();
            prop_assert!(retry.backoff_for_attempt(attempt) <= retry.max_delay());
        }
    }
}
