use anyhow::{anyhow, Result};
use serde::Serialize;

use super::policy::{Decision, DecisionPolicy};
use crate::DEFAULT_DECISION_PERIOD;

/// What happened when the trigger fired.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Decided { policy: String, decision: Decision },
    Failed { policy: String, error: String },
}

/// Hands the mean grid to a policy on every `period`th frame.
///
/// Policy errors are logged and reported, never propagated: a failing policy
/// costs that frame's decision and nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecisionTrigger {
    period: u64,
}

impl Default for DecisionTrigger {
    fn default() -> Self {
        Self {
            period: DEFAULT_DECISION_PERIOD,
        }
    }
}

impl DecisionTrigger {
    pub fn new(period: u64) -> Result<Self> {
        if period == 0 {
            return Err(anyhow!("decision period must be > 0"));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    /// `counter` is the post-increment frame counter (first frame = 1).
    pub fn is_due(&self, counter: u64) -> bool {
        counter % self.period == 0
    }

    pub fn on_frame(
        &self,
        counter: u64,
        grid: &[Vec<f32>],
        policy: &mut dyn DecisionPolicy,
    ) -> Option<DecisionOutcome> {
        if !self.is_due(counter) {
            return None;
        }

        let name = policy.name().to_string();
        match policy.decide(grid) {
            Ok(decision) => {
                log::info!(
                    "frame #{} decision [{}]: {} ({})",
                    counter,
                    name,
                    decision.label,
                    decision.detail
                );
                Some(DecisionOutcome::Decided {
                    policy: name,
                    decision,
                })
            }
            Err(e) => {
                log::warn!("frame #{} decision [{}] failed: {:#}", counter, name, e);
                Some(DecisionOutcome::Failed {
                    policy: name,
                    error: format!("{:#}", e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Vec<usize>,
        fail: bool,
    }

    impl DecisionPolicy for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn decide(&mut self, grid: &[Vec<f32>]) -> Result<Decision> {
            self.seen.push(grid.len());
            if self.fail {
                return Err(anyhow!("policy offline"));
            }
            Ok(Decision::new("ok", ""))
        }
    }

    #[test]
    fn fires_on_multiples_of_period_only() {
        let trigger = DecisionTrigger::default();
        let fired: Vec<u64> = (1..=20).filter(|&c| trigger.is_due(c)).collect();
        assert_eq!(fired, vec![5, 10, 15, 20]);
        for c in [1, 2, 3, 4, 6, 7, 8, 9] {
            assert!(!trigger.is_due(c));
        }
    }

    #[test]
    fn non_due_frames_do_not_call_policy() {
        let trigger = DecisionTrigger::default();
        let mut policy = Recorder {
            seen: vec![],
            fail: false,
        };
        let grid = vec![vec![1.0; 3]; 3];
        assert!(trigger.on_frame(4, &grid, &mut policy).is_none());
        assert!(policy.seen.is_empty());

        let outcome = trigger.on_frame(5, &grid, &mut policy);
        assert!(matches!(outcome, Some(DecisionOutcome::Decided { .. })));
        assert_eq!(policy.seen, vec![3]);
    }

    #[test]
    fn policy_failure_is_reported_not_propagated() {
        let trigger = DecisionTrigger::new(2).unwrap();
        let mut policy = Recorder {
            seen: vec![],
            fail: true,
        };
        let outcome = trigger.on_frame(2, &[vec![0.5]], &mut policy);
        match outcome {
            Some(DecisionOutcome::Failed { policy, error }) => {
                assert_eq!(policy, "recorder");
                assert!(error.contains("policy offline"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(DecisionTrigger::new(0).is_err());
    }
}
