//! The scaling decision engine.
//!
//! Stateful mapping from `(metric, replicas)` to an optional target replica
//! count. Owns only breach-accumulation state; cooldowns are a control-loop
//! concern.

use crate::config::{Direction, Policy};

/// Region a metric sample falls into relative to the configured band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Up,
    Down,
    InBand,
}

impl Region {
    fn classify(metric: f64, policy: &Policy) -> Self {
        if metric > policy.scale_up_threshold {
            Region::Up
        } else if metric < policy.scale_down_threshold {
            Region::Down
        } else {
            Region::InBand
        }
    }

    fn direction(self) -> Option<Direction> {
        match self {
            Region::Up => Some(Direction::Up),
            Region::Down => Some(Direction::Down),
            Region::InBand => None,
        }
    }
}

/// The decision engine's owned state: consecutive same-direction breach count.
#[derive(Debug, Default)]
pub struct DecisionEngine {
    breach_count: u32,
    breach_direction: Option<Direction>,
}

impl DecisionEngine {
    /// Current count of consecutive same-direction breaches. Exposed for
    /// reporting/metrics only.
    #[must_use]
    pub fn breach_count(&self) -> u32 {
        self.breach_count
    }

    /// Current breach direction being accumulated, if any.
    #[must_use]
    pub fn breach_direction(&self) -> Option<Direction> {
        self.breach_direction
    }

    fn reset(&mut self) {
        self.breach_count = 0;
        self.breach_direction = None;
    }

    /// Evaluate one tick. Returns `Some(target)` when a scaling decision
    /// fires, `None` otherwise. `replicas` is the currently observed replica
    /// count (used for clamping and delta computation).
    pub fn decide(&mut self, metric: Option<f64>, replicas: u32, policy: &Policy) -> Option<u32> {
        // Step 1: missing metric is a first-class in-band signal.
        let Some(metric) = metric else {
            self.reset();
            return None;
        };

        // Step 2-3: classify and handle in-band.
        let region = Region::classify(metric, policy);
        let Some(direction) = region.direction() else {
            self.reset();
            return None;
        };

        // Step 4: breach accumulation, direction flip restarts at 1.
        if self.breach_direction == Some(direction) {
            self.breach_count += 1;
        } else {
            self.breach_direction = Some(direction);
            self.breach_count = 1;
        }

        // Step 5: confirmation gate.
        if self.breach_count < direction.breaches_required(policy) {
            return None;
        }

        // Step 6: clamp check.
        let clamped = match direction {
            Direction::Up => replicas >= policy.max_replicas,
            Direction::Down => replicas <= policy.min_replicas,
        };
        if clamped {
            self.reset();
            return None;
        }

        // Step 7: compute delta and target.
        let target = match direction {
            Direction::Up => {
                let overshoot = metric / policy.scale_up_threshold;
                let delta = if overshoot > 2.0 { 2 } else { 1 };
                (replicas + delta).min(policy.max_replicas)
            }
            Direction::Down => replicas.saturating_sub(1).max(policy.min_replicas),
        };

        // Step 8: emit, resetting breach state regardless of caller's next action.
        self.reset();
        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn policy() -> Policy {
        Policy {
            scale_up_threshold: 0.6,
            scale_down_threshold: 0.2,
            min_replicas: 1,
            max_replicas: 6,
            scale_up_breaches_required: 2,
            scale_down_breaches_required: 3,
            ..Policy::default()
        }
    }

    /// Sustained moderate overload confirms after two breaches and steps up by one.
    #[test]
    fn sustained_moderate_overload_scales_up_by_one() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        assert_eq!(engine.decide(Some(0.7), 2, &policy), None);
        assert_eq!(engine.decide(Some(0.7), 2, &policy), Some(3));
        // Breach state reset after firing; a third 0.7 starts a fresh count.
        assert_eq!(engine.decide(Some(0.7), 3, &policy), None);
    }

    /// A severe spike (overshoot beyond 2x threshold) jumps by two replicas.
    #[test]
    fn severe_spike_scales_up_by_two() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        assert_eq!(engine.decide(Some(1.5), 2, &policy), None);
        assert_eq!(engine.decide(Some(1.5), 2, &policy), Some(4));
    }

    /// Scale-down requires three confirmations before it fires.
    #[test]
    fn scale_down_requires_three_breaches() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        assert_eq!(engine.decide(Some(0.1), 3, &policy), None);
        assert_eq!(engine.decide(Some(0.1), 3, &policy), None);
        assert_eq!(engine.decide(Some(0.1), 3, &policy), Some(2));
    }

    /// Alternating direction each tick restarts the breach count and never confirms.
    #[test]
    fn flapping_metric_never_fires() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        assert_eq!(engine.decide(Some(0.7), 2, &policy), None);
        assert_eq!(engine.decide(Some(0.1), 2, &policy), None);
        assert_eq!(engine.decide(Some(0.7), 2, &policy), None);
        assert_eq!(engine.decide(Some(0.1), 2, &policy), None);
        assert_eq!(engine.breach_count(), 1);
    }

    /// Clamping at the ceiling resets breach state without acting.
    #[test]
    fn clamp_at_ceiling_resets_without_acting() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        assert_eq!(engine.decide(Some(0.9), 6, &policy), None);
        assert_eq!(engine.decide(Some(0.9), 6, &policy), None);
        assert_eq!(engine.breach_count(), 0);
    }

    /// A missing sample resets accumulation; recovery needs a fresh pair of
    /// confirmations.
    #[test]
    fn missing_metric_resets_accumulation() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        assert_eq!(engine.decide(Some(0.7), 2, &policy), None);
        assert_eq!(engine.decide(None, 2, &policy), None);
        assert_eq!(engine.decide(Some(0.7), 2, &policy), None);
        assert_eq!(engine.decide(Some(0.7), 2, &policy), Some(3));
    }

    /// Every emitted target stays within [min, max].
    #[test]
    fn targets_are_always_clamped_to_bounds() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        engine.decide(Some(5.0), 5, &policy);
        let target = engine.decide(Some(5.0), 5, &policy).unwrap();
        assert!(target <= policy.max_replicas);
    }

    /// A stream held entirely in-band yields zero actuations.
    #[test]
    fn in_band_stream_never_fires() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        for _ in 0..20 {
            assert_eq!(engine.decide(Some(0.4), 3, &policy), None);
        }
    }

    /// An all-absent metric stream yields zero actuations.
    #[test]
    fn all_absent_stream_never_fires() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        for _ in 0..20 {
            assert_eq!(engine.decide(None, 3, &policy), None);
        }
    }

    /// One breach short of the required count never fires.
    #[test]
    fn under_confirmed_breach_never_fires() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        assert_eq!(
            engine.decide(Some(0.7), 2, &policy),
            None,
            "one breach short of scale_up_breaches_required must not fire"
        );
    }

    #[test]
    fn equal_to_threshold_is_in_band() {
        let policy = policy();
        let mut engine = DecisionEngine::default();
        assert_eq!(engine.decide(Some(0.6), 2, &policy), None);
        assert_eq!(engine.breach_count(), 0);
    }
}
