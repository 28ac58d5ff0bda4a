//! Readiness aggregation: three normalized inputs, fixed 40/30/30 weighting.
//!
//! Every input is on a 0-100 scale. A source with no data contributes 0.

pub use crate::models::view::ReadinessBand;

pub const TEST_WEIGHT: f64 = 0.4;
pub const TASK_WEIGHT: f64 = 0.3;
pub const PRACTICE_WEIGHT: f64 = 0.3;

/// Solved-problem count that maps to a full practice contribution.
pub const PRACTICE_SOLVED_CAP: u32 = 300;

/// `round(0.4*t + 0.3*k + 0.3*p)`, clamped to `[0, 100]`.
pub fn compute_readiness(
    test_average: f64,
    task_completion_rate: f64,
    practice_scaled_score: f64,
) -> u8 {
    let weighted = TEST_WEIGHT * sanitize(test_average)
        + TASK_WEIGHT * sanitize(task_completion_rate)
        + PRACTICE_WEIGHT * sanitize(practice_scaled_score);
    weighted.round().clamp(0.0, 100.0) as u8
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Mean of the given percentages, 0 when there are none.
pub fn test_average(percentages: impl IntoIterator<Item = u8>) -> f64 {
    let (sum, count) = percentages
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), p| (sum + u64::from(p), count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// `round(completed / total * 100)`, 0 when there are no tasks.
pub fn task_completion_rate(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    (f64::from(completed.min(total)) / f64::from(total) * 100.0).round() as u8
}

/// `min(total_solved / 300 * 100, 100)`.
pub fn practice_scaled_score(total_solved: u32) -> f64 {
    (f64::from(total_solved) / f64::from(PRACTICE_SOLVED_CAP) * 100.0).min(100.0)
}
