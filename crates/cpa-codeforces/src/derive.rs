use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use cpa_types::codeforces::{RatingChange, Submission};

use crate::snapshot::HandleSnapshot;

/// Number of tags shown in per-handle summaries.
pub const DEFAULT_TOP_TAGS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingBucket {
    pub rating: i64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerdictCount {
    pub verdict: String,
    pub count: u32,
}

/// Identity keys of every problem with at least one accepted submission.
pub fn solved_set(submissions: &[Submission]) -> HashSet<String> {
    submissions
        .iter()
        .filter(|s| s.is_accepted())
        .map(|s| s.problem.key())
        .collect()
}

/// Tag frequency over accepted submissions, highest first. Equal counts keep
/// the order in which the tags were first seen.
pub fn tag_histogram(submissions: &[Submission], top_n: usize) -> Vec<TagCount> {
    let mut counts = first_seen_counts(
        submissions
            .iter()
            .filter(|s| s.is_accepted())
            .flat_map(|s| s.problem.tags.iter().map(String::as_str)),
    );

    // stable sort: ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(top_n);

    counts
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect()
}

/// Accepted submissions per exact problem rating, ascending. Unrated problems
/// are skipped.
pub fn rating_buckets(submissions: &[Submission]) -> Vec<RatingBucket> {
    let mut buckets: BTreeMap<i64, u32> = BTreeMap::new();
    for rating in submissions
        .iter()
        .filter(|s| s.is_accepted())
        .filter_map(|s| s.problem.rating)
    {
        *buckets.entry(rating).or_default() += 1;
    }

    buckets
        .into_iter()
        .map(|(rating, count)| RatingBucket { rating, count })
        .collect()
}

/// Submission count per verdict label in first-seen order. Submissions that
/// are still being judged have no verdict and are skipped.
pub fn verdict_breakdown(submissions: &[Submission]) -> Vec<VerdictCount> {
    first_seen_counts(
        submissions
            .iter()
            .filter_map(|s| s.verdict.as_ref())
            .map(|v| v.label()),
    )
    .into_iter()
    .map(|(verdict, count)| VerdictCount { verdict, count })
    .collect()
}

/// Mean contest placement, `None` for handles that never competed.
pub fn average_rank(history: &[RatingChange]) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let total: i64 = history.iter().map(|change| change.rank).sum();
    Some(total as f64 / history.len() as f64)
}

fn first_seen_counts<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, u32)> {
    let mut order: Vec<(String, u32)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for label in labels {
        match index.get(label) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(label, order.len());
                order.push((label.to_string(), 1));
            }
        }
    }
    order
}

/// Statistics derived from one handle's snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HandleStats {
    pub solved_count: usize,
    pub total_submissions: usize,
    pub submissions_available: bool,
    pub contests_played: usize,
    pub average_rank: Option<f64>,
    pub top_tags: Vec<TagCount>,
    pub rating_buckets: Vec<RatingBucket>,
    pub verdicts: Vec<VerdictCount>,
}

pub fn handle_stats(snapshot: &HandleSnapshot, top_tags: usize) -> HandleStats {
    let submissions = &snapshot.submissions;
    HandleStats {
        solved_count: solved_set(submissions).len(),
        total_submissions: submissions.len(),
        submissions_available: snapshot.submissions_available,
        contests_played: snapshot.rating_history.len(),
        average_rank: average_rank(&snapshot.rating_history),
        top_tags: tag_histogram(submissions, top_tags),
        rating_buckets: rating_buckets(submissions),
        verdicts: verdict_breakdown(submissions),
    }
}
