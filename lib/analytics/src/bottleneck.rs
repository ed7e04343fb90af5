//! Per-step dwell-time bottleneck analysis.
//!
//! Dwell times come from consecutive history-entry timestamp deltas: the
//! interval between entering a step and entering the next one is
//! attributed to the step occupied during it. Time an instance is still
//! spending in its current step is not counted until it moves on.

use caseflow_workflow::WorkflowState;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregated dwell statistics for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepBottleneck {
    /// The step the instances dwelled in.
    pub step_id: String,
    /// Mean dwell time across all completed visits.
    pub average_duration: Duration,
    /// Longest single visit.
    pub max_duration: Duration,
    /// Number of completed visits.
    pub count: usize,
}

/// A suggestion produced for a step that exceeds the dwell threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationRecommendation {
    /// The flagged step.
    pub step_id: String,
    /// Human-readable suggestion.
    pub message: String,
}

/// Aggregates dwell times per step, sorted by average descending.
#[must_use]
pub(crate) fn analyze(instances: &[WorkflowState]) -> Vec<StepBottleneck> {
    struct Acc {
        total: Duration,
        max: Duration,
        count: usize,
    }

    let mut by_step: HashMap<&str, Acc> = HashMap::new();
    for state in instances {
        for pair in state.history.windows(2) {
            let dwell = pair[1].timestamp - pair[0].timestamp;
            let acc = by_step.entry(pair[0].step_id.as_str()).or_insert(Acc {
                total: Duration::zero(),
                max: Duration::zero(),
                count: 0,
            });
            acc.total = acc.total + dwell;
            if dwell > acc.max {
                acc.max = dwell;
            }
            acc.count += 1;
        }
    }

    let mut bottlenecks: Vec<StepBottleneck> = by_step
        .into_iter()
        .map(|(step_id, acc)| StepBottleneck {
            step_id: step_id.to_string(),
            average_duration: acc.total / i32::try_from(acc.count).unwrap_or(i32::MAX),
            max_duration: acc.max,
            count: acc.count,
        })
        .collect();
    bottlenecks.sort_by(|a, b| b.average_duration.cmp(&a.average_duration));
    bottlenecks
}

/// Flags steps whose average dwell exceeds 24 hours.
#[must_use]
pub(crate) fn recommendations(bottlenecks: &[StepBottleneck]) -> Vec<OptimizationRecommendation> {
    let threshold = Duration::hours(24);
    bottlenecks
        .iter()
        .filter(|b| b.average_duration > threshold)
        .map(|b| OptimizationRecommendation {
            step_id: b.step_id.clone(),
            message: format!(
                "step '{}' averages {} hours of dwell time across {} visits; \
                 consider splitting the step or adding staffing",
                b.step_id,
                b.average_duration.num_hours(),
                b.count
            ),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_core::Actor;
    use std::collections::HashMap as Map;

    /// Builds an instance whose history visits the given steps, dwelling
    /// the given number of hours in each before moving on.
    fn instance_with_dwells(visits: &[(&str, i64)], final_step: &str) -> WorkflowState {
        let mut state =
            WorkflowState::new("order_fulfillment", visits[0].0, "order-1", "order", Map::new());
        for window in visits.windows(2) {
            state.advance(window[1].0, Actor::System, Map::new());
        }
        state.advance(final_step, Actor::System, Map::new());

        // Rewrite timestamps so each visit lasts exactly its dwell.
        let start = state.created_at - Duration::hours(visits.iter().map(|(_, h)| h).sum());
        let mut cursor = start;
        state.created_at = start;
        for (entry, (_, hours)) in state.history.iter_mut().zip(visits) {
            entry.timestamp = cursor;
            cursor += Duration::hours(*hours);
        }
        state.history.last_mut().expect("history").timestamp = cursor;
        state.updated_at = cursor;
        state
    }

    #[test]
    fn aggregates_dwell_per_step() {
        let instances = vec![
            instance_with_dwells(&[("new", 2), ("design", 30)], "production"),
            instance_with_dwells(&[("new", 4), ("design", 10)], "production"),
        ];

        let bottlenecks = analyze(&instances);
        assert_eq!(bottlenecks.len(), 2);

        // design averages 20h, new averages 3h; sorted descending.
        assert_eq!(bottlenecks[0].step_id, "design");
        assert_eq!(bottlenecks[0].average_duration, Duration::hours(20));
        assert_eq!(bottlenecks[0].max_duration, Duration::hours(30));
        assert_eq!(bottlenecks[0].count, 2);

        assert_eq!(bottlenecks[1].step_id, "new");
        assert_eq!(bottlenecks[1].average_duration, Duration::hours(3));
        assert_eq!(bottlenecks[1].max_duration, Duration::hours(4));
    }

    #[test]
    fn instances_without_transitions_contribute_nothing() {
        let state =
            WorkflowState::new("order_fulfillment", "new", "order-1", "order", Map::new());
        assert!(analyze(&[state]).is_empty());
    }

    #[test]
    fn recommendations_flag_only_steps_over_threshold() {
        let bottlenecks = vec![
            StepBottleneck {
                step_id: "design".to_string(),
                average_duration: Duration::hours(36),
                max_duration: Duration::hours(50),
                count: 4,
            },
            StepBottleneck {
                step_id: "new".to_string(),
                average_duration: Duration::hours(3),
                max_duration: Duration::hours(4),
                count: 4,
            },
        ];

        let recommendations = recommendations(&bottlenecks);
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].step_id, "design");
        assert!(recommendations[0].message.contains("36 hours"));
    }

    #[test]
    fn exactly_threshold_is_not_flagged() {
        let bottlenecks = vec![StepBottleneck {
            step_id: "design".to_string(),
            average_duration: Duration::hours(24),
            max_duration: Duration::hours(24),
            count: 1,
        }];
        assert!(recommendations(&bottlenecks).is_empty());
    }
}
