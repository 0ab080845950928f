//! Threshold evaluation: which stage an invocation count has earned.
//!
//! Everything here is a pure function of the count. Evaluating the same
//! count any number of times yields the same answer, which is what lets
//! replay converge on the live state.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One row of the threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    /// Stage reached once the count is met.
    pub stage: u32,
    /// Invocations needed to reach `stage`.
    pub required_count: u64,
}

/// A validated, ascending threshold table.
///
/// Stages run contiguously from 1 and required counts strictly increase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thresholds {
    rows: Vec<Threshold>,
}

impl Thresholds {
    /// Validate and wrap a threshold table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the table is empty, the stages
    /// are not `1, 2, 3, ...`, a count is zero, or the counts do not
    /// strictly increase.
    pub fn new(rows: Vec<Threshold>) -> Result<Self, ConfigError> {
        if rows.is_empty() {
            return Err(invalid("evolution.thresholds must not be empty".to_owned()));
        }

        let mut previous_count = 0_u64;
        for (expected_stage, row) in (1_u32..).zip(&rows) {
            if row.stage != expected_stage {
                return Err(invalid(format!(
                    "evolution.thresholds: expected stage {expected_stage}, found {}",
                    row.stage
                )));
            }
            if row.required_count <= previous_count {
                return Err(invalid(format!(
                    "evolution.thresholds: stage {} needs more than {previous_count} invocations",
                    row.stage
                )));
            }
            previous_count = row.required_count;
        }

        Ok(Self { rows })
    }

    /// Highest stage whose required count is at most `count`, or 0.
    pub fn stage_for(&self, count: u64) -> u32 {
        self.rows
            .iter()
            .take_while(|row| row.required_count <= count)
            .last()
            .map_or(0, |row| row.stage)
    }

    /// The stage `count` has earned, if it is above `current`.
    ///
    /// `None` means no change: the count has not crossed a new threshold.
    pub fn evaluate(&self, count: u64, current: u32) -> Option<u32> {
        let earned = self.stage_for(count);
        (earned > current).then_some(earned)
    }

    /// The threshold following `stage`, if there is one.
    pub fn next_after(&self, stage: u32) -> Option<Threshold> {
        self.rows.iter().find(|row| row.stage > stage).copied()
    }

    /// The final stage.
    pub fn max_stage(&self) -> u32 {
        self.rows.last().map_or(0, |row| row.stage)
    }

    /// The rows, in ascending order.
    pub fn rows(&self) -> &[Threshold] {
        &self.rows
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rows: [(1, 10), (2, 25), (3, 50), (4, 100), (5, 250)]
                .into_iter()
                .map(|(stage, required_count)| Threshold {
                    stage,
                    required_count,
                })
                .collect(),
        }
    }
}

fn invalid(reason: String) -> ConfigError {
    ConfigError::Invalid { reason }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table(pairs: &[(u32, u64)]) -> Result<Thresholds, ConfigError> {
        Thresholds::new(
            pairs
                .iter()
                .map(|&(stage, required_count)| Threshold {
                    stage,
                    required_count,
                })
                .collect(),
        )
    }

    #[test]
    fn stage_for_default_table() {
        let t = Thresholds::default();
        assert_eq!(t.stage_for(0), 0);
        assert_eq!(t.stage_for(9), 0);
        assert_eq!(t.stage_for(10), 1);
        assert_eq!(t.stage_for(24), 1);
        assert_eq!(t.stage_for(25), 2);
        assert_eq!(t.stage_for(249), 4);
        assert_eq!(t.stage_for(250), 5);
        assert_eq!(t.stage_for(u64::MAX), 5);
    }

    #[test]
    fn stage_never_regresses_as_count_grows() {
        let t = Thresholds::default();
        let mut last = 0;
        for count in 0..300 {
            let stage = t.stage_for(count);
            assert!(stage >= last);
            assert!(stage <= last.saturating_add(1), "skipped a stage at {count}");
            last = stage;
        }
    }

    #[test]
    fn evaluate_is_idempotent() {
        let t = Thresholds::default();
        assert_eq!(t.evaluate(10, 0), Some(1));
        assert_eq!(t.evaluate(10, 0), Some(1));
        assert_eq!(t.evaluate(10, 1), None);
        assert_eq!(t.evaluate(11, 1), None);
        assert_eq!(t.evaluate(60, 1), Some(3));
    }

    #[test]
    fn evaluate_never_lowers_a_forced_stage() {
        let t = Thresholds::default();
        assert_eq!(t.evaluate(12, 3), None);
    }

    #[test]
    fn next_after_and_max_stage() {
        let t = Thresholds::default();
        assert_eq!(t.next_after(0).map(|r| r.required_count), Some(10));
        assert_eq!(t.next_after(4).map(|r| r.stage), Some(5));
        assert_eq!(t.next_after(5), None);
        assert_eq!(t.max_stage(), 5);
    }

    #[test]
    fn custom_table_accepted() {
        let t = table(&[(1, 2), (2, 4)]).unwrap();
        assert_eq!(t.stage_for(3), 1);
        assert_eq!(t.rows().len(), 2);
    }

    #[test]
    fn malformed_tables_rejected() {
        assert!(table(&[]).is_err());
        assert!(table(&[(2, 10)]).is_err());
        assert!(table(&[(1, 0)]).is_err());
        assert!(table(&[(1, 10), (2, 10)]).is_err());
        assert!(table(&[(1, 10), (3, 20)]).is_err());
    }
}
