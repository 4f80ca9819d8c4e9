//! Candidate ranking
//!
//! Sits between scoring and threshold application. Ties are broken by the
//! lower weighted load, then by input order, so identical input always
//! produces the identical ranking.
//!
//! "Within epsilon" is not transitive, so it cannot back a `sort_by`
//! comparator. Each position is instead filled by looking at the best
//! remaining total and picking, among candidates within epsilon of it,
//! the lowest load and then the earliest input position.

use routewise_core::{RankedCandidate, ScoreBreakdown};

/// Index into `remaining` of the candidate that takes the next rank.
fn select_next(remaining: &[(usize, ScoreBreakdown)], epsilon: f64) -> usize {
    let top = remaining
        .iter()
        .map(|(_, b)| b.total)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut best: Option<usize> = None;
    for (i, (position, breakdown)) in remaining.iter().enumerate() {
        if top - breakdown.total > epsilon {
            continue;
        }
        best = match best {
            None => Some(i),
            Some(j) => {
                let (current_position, current) = &remaining[j];
                let lighter = breakdown.weighted_load < current.weighted_load;
                let same_load = breakdown.weighted_load == current.weighted_load;
                if lighter || (same_load && position < current_position) {
                    Some(i)
                } else {
                    Some(j)
                }
            }
        };
    }
    best.unwrap_or(0)
}

/// Rank scored candidates best first. Ranks are 1-based.
pub fn rank_candidates(scored: Vec<ScoreBreakdown>, epsilon: f64) -> Vec<RankedCandidate> {
    let mut remaining: Vec<(usize, ScoreBreakdown)> = scored.into_iter().enumerate().collect();
    let mut ranked = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let next = select_next(&remaining, epsilon);
        let (_, breakdown) = remaining.remove(next);
        ranked.push(RankedCandidate {
            rank: ranked.len() + 1,
            breakdown,
        });
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use routewise_core::ScoringWeights;

    fn scored(id: &str, total: f64, load: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            agent_id: id.into(),
            skill: 0.0,
            level: 0.0,
            workload: 0.0,
            location: 0.0,
            vip: 0.0,
            weights: ScoringWeights::default(),
            weighted_load: load,
            capacity_ceiling: 10.0,
            total,
        }
    }

    fn order(ranked: &[RankedCandidate]) -> Vec<&str> {
        ranked.iter().map(|c| c.agent_id().as_str()).collect()
    }

    #[test]
    fn test_sorted_descending_by_total() {
        let ranked = rank_candidates(
            vec![scored("a", 0.4, 0.0), scored("b", 0.9, 0.0), scored("c", 0.6, 0.0)],
            0.001,
        );
        assert_eq!(order(&ranked), vec!["b", "c", "a"]);
        assert_eq!(ranked.iter().map(|c| c.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_near_tie_prefers_lower_load() {
        let ranked = rank_candidates(vec![scored("busy", 0.8005, 6.0), scored("idle", 0.8, 1.0)], 0.001);
        assert_eq!(order(&ranked), vec!["idle", "busy"]);
    }

    #[test]
    fn test_full_tie_keeps_input_order() {
        let ranked = rank_candidates(
            vec![scored("first", 0.7, 2.0), scored("second", 0.7, 2.0), scored("third", 0.7, 2.0)],
            0.001,
        );
        assert_eq!(order(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_gap_beyond_epsilon_ignores_load() {
        let ranked = rank_candidates(vec![scored("idle", 0.70, 0.0), scored("busy", 0.75, 9.0)], 0.001);
        assert_eq!(order(&ranked), vec!["busy", "idle"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(rank_candidates(Vec::new(), 0.001).is_empty());
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
