use crate::models::{DashboardResponse, GoalValues, HealthMetric, MetricProgress};
use chrono::NaiveDate;

/// Percent of `goal` reached by `value`, clamped to `0..=100`.
///
/// A goal that is not a positive finite number yields 0; the settings form
/// never stores one, but rows written by older versions might.
pub fn progress(value: f64, goal: f64) -> f64 {
    if !(goal.is_finite() && goal > 0.0) || !value.is_finite() {
        return 0.0;
    }
    (value / goal * 100.0).clamp(0.0, 100.0)
}

/// Today's four metrics against the goals in effect, in display order.
pub fn build_dashboard(
    date: NaiveDate,
    record: Option<HealthMetric>,
    goals: GoalValues,
) -> DashboardResponse {
    let (steps, water, weight, sleep) = match &record {
        Some(r) => (f64::from(r.steps), r.water_intake, r.weight, r.sleep_hours),
        None => (0.0, 0.0, 0.0, 0.0),
    };

    let metrics = vec![
        metric("steps", "Steps", steps, f64::from(goals.steps_goal), "steps"),
        metric("water_intake", "Water Intake", water, goals.water_goal, "L"),
        metric("weight", "Weight", weight, goals.weight_goal, "kg"),
        metric("sleep_hours", "Sleep", sleep, goals.sleep_goal, "hrs"),
    ];

    DashboardResponse {
        date,
        record,
        goals,
        metrics,
    }
}

fn metric(key: &str, title: &str, value: f64, goal: f64, suffix: &str) -> MetricProgress {
    MetricProgress {
        key: key.to_string(),
        title: title.to_string(),
        value,
        goal,
        suffix: suffix.to_string(),
        percent: progress(value, goal),
    }
}
