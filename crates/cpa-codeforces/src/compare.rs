use std::cmp::Ordering;

use serde::Serialize;

use cpa_types::codeforces::{CfUser, RatingChange};

use crate::derive::{self, DEFAULT_TOP_TAGS, HandleStats};
use crate::snapshot::HandleSnapshot;

/// How far back the shared rating chart reaches at most.
pub const TIMELINE_WINDOW_SECS: i64 = 2 * 365 * 24 * 60 * 60;

/// One handle's rating history together with its registration time.
#[derive(Debug, Clone, Copy)]
pub struct TimelineSeries<'a> {
    pub handle: &'a str,
    pub registered_at: i64,
    pub history: &'a [RatingChange],
}

/// A rating update on the shared time axis. Only the owning handle has a
/// value at this timestamp; the other series is empty there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub time: i64,
    pub handle: String,
    pub rating: i64,
}

/// Earliest timestamp shown on the comparison chart:
/// `max(min(reg_a, reg_b), now - 2 years)`.
pub fn timeline_floor(registered_a: i64, registered_b: i64, now: i64) -> i64 {
    registered_a.min(registered_b).max(now - TIMELINE_WINDOW_SECS)
}

/// Merge two rating histories onto one ascending time axis, dropping points
/// before [`timeline_floor`]. Points at equal times keep `a` before `b`.
pub fn merge_rating_timelines(
    a: TimelineSeries<'_>,
    b: TimelineSeries<'_>,
    now: i64,
) -> Vec<TimelinePoint> {
    let floor = timeline_floor(a.registered_at, b.registered_at, now);

    let mut points: Vec<TimelinePoint> = [a, b]
        .iter()
        .flat_map(|series| {
            series
                .history
                .iter()
                .filter(move |change| change.rating_update_time_seconds >= floor)
                .map(move |change| TimelinePoint {
                    time: change.rating_update_time_seconds,
                    handle: series.handle.to_string(),
                    rating: change.new_rating,
                })
        })
        .collect();

    points.sort_by_key(|point| point.time);
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Left,
    Right,
    Tie,
}

/// Strictly greater wins, or strictly lesser when `lower_is_better`.
/// Equal or incomparable values tie.
pub fn compare_metric<T: PartialOrd>(left: T, right: T, lower_is_better: bool) -> Winner {
    match left.partial_cmp(&right) {
        Some(Ordering::Greater) if lower_is_better => Winner::Right,
        Some(Ordering::Greater) => Winner::Left,
        Some(Ordering::Less) if lower_is_better => Winner::Left,
        Some(Ordering::Less) => Winner::Right,
        _ => Winner::Tie,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricComparison {
    pub metric: &'static str,
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub lower_is_better: bool,
    pub winner: Winner,
}

impl MetricComparison {
    fn new(metric: &'static str, left: Option<f64>, right: Option<f64>, lower_is_better: bool) -> Self {
        let winner = match (left, right) {
            (Some(l), Some(r)) => compare_metric(l, r, lower_is_better),
            _ => Winner::Tie,
        };
        Self {
            metric,
            left,
            right,
            lower_is_better,
            winner,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SideSummary {
    pub profile: CfUser,
    pub stats: HandleStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub left: SideSummary,
    pub right: SideSummary,
    pub metrics: Vec<MetricComparison>,
    pub timeline: Vec<TimelinePoint>,
}

/// Side-by-side view of two handles. Unrated handles count as rating 0.
pub fn compare_snapshots(left: &HandleSnapshot, right: &HandleSnapshot, now: i64) -> Comparison {
    let left_stats = derive::handle_stats(left, DEFAULT_TOP_TAGS);
    let right_stats = derive::handle_stats(right, DEFAULT_TOP_TAGS);

    let rating = |user: &CfUser| Some(user.rating.unwrap_or(0) as f64);
    let max_rating = |user: &CfUser| Some(user.max_rating.unwrap_or(0) as f64);

    let metrics = vec![
        MetricComparison::new("rating", rating(&left.profile), rating(&right.profile), false),
        MetricComparison::new(
            "max_rating",
            max_rating(&left.profile),
            max_rating(&right.profile),
            false,
        ),
        MetricComparison::new(
            "solved",
            Some(left_stats.solved_count as f64),
            Some(right_stats.solved_count as f64),
            false,
        ),
        MetricComparison::new(
            "total_submissions",
            Some(left_stats.total_submissions as f64),
            Some(right_stats.total_submissions as f64),
            false,
        ),
        MetricComparison::new("average_rank", left_stats.average_rank, right_stats.average_rank, true),
    ];

    let timeline = merge_rating_timelines(
        TimelineSeries {
            handle: &left.profile.handle,
            registered_at: left.profile.registration_time_seconds,
            history: &left.rating_history,
        },
        TimelineSeries {
            handle: &right.profile.handle,
            registered_at: right.profile.registration_time_seconds,
            history: &right.rating_history,
        },
        now,
    );

    Comparison {
        left: SideSummary {
            profile: left.profile.clone(),
            stats: left_stats,
        },
        right: SideSummary {
            profile: right.profile.clone(),
            stats: right_stats,
        },
        metrics,
        timeline,
    }
}
