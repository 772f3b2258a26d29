use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::Serialize;

use cpa_types::codeforces::{Contest, Problem, ProblemSet, ProblemStatistics};

/// Selection criteria for the problem recommender. Every set criterion must
/// match for a problem to pass.
#[derive(Debug, Clone, Default)]
pub struct ProblemFilter {
    /// All of these tags must be present (AND, not OR).
    pub tags: Vec<String>,
    /// Inclusive `(min, max)`. Unrated problems never pass a set range.
    pub rating_range: Option<(i64, i64)>,
    /// Case-insensitive substring of the name or identity key.
    pub search: Option<String>,
    pub solved_only: bool,
}

impl ProblemFilter {
    pub fn matches(&self, problem: &Problem, solved: &HashSet<String>) -> bool {
        if self.solved_only && !solved.contains(&problem.key()) {
            return false;
        }

        if !self.tags.iter().all(|tag| problem.has_tag(tag)) {
            return false;
        }

        if let Some((min, max)) = self.rating_range {
            match problem.rating {
                Some(rating) if rating >= min && rating <= max => {}
                _ => return false,
            }
        }

        if let Some(query) = self.search.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let query = query.to_lowercase();
            if !problem.name.to_lowercase().contains(&query)
                && !problem.key().to_lowercase().contains(&query)
            {
                return false;
            }
        }

        true
    }
}

pub fn filter_catalog(
    problems: Vec<Problem>,
    filter: &ProblemFilter,
    solved: &HashSet<String>,
) -> Vec<Problem> {
    problems
        .into_iter()
        .filter(|problem| filter.matches(problem, solved))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Most solved first, then easiest first.
    #[default]
    MostSolved,
    RatingAsc,
    RatingDesc,
    Name,
    /// Newest contest first.
    ContestDesc,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key '{0}'")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solved" => Ok(SortKey::MostSolved),
            "rating-asc" => Ok(SortKey::RatingAsc),
            "rating-desc" => Ok(SortKey::RatingDesc),
            "name" => Ok(SortKey::Name),
            "contest" => Ok(SortKey::ContestDesc),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

/// Solve counts keyed by problem identity key.
pub fn solve_counts(stats: &[ProblemStatistics]) -> HashMap<String, u64> {
    stats.iter().map(|stat| (stat.key(), stat.solved_count)).collect()
}

/// Sorts in place. Any remaining tie is broken by identity key so the
/// resulting order does not depend on the input order.
pub fn sort_catalog(problems: &mut [Problem], key: SortKey, solve_counts: &HashMap<String, u64>) {
    let solved_of = |p: &Problem| solve_counts.get(&p.key()).copied().unwrap_or(0);

    problems.sort_by(|a, b| {
        let primary = match key {
            SortKey::MostSolved => solved_of(b)
                .cmp(&solved_of(a))
                .then_with(|| rating_unrated_last(a, b)),
            SortKey::RatingAsc => rating_unrated_last(a, b),
            SortKey::RatingDesc => b.rating.unwrap_or(0).cmp(&a.rating.unwrap_or(0)),
            SortKey::Name => a.name.cmp(&b.name),
            // None < Some, so reversing puts problems without a contest last
            SortKey::ContestDesc => b.contest_id.cmp(&a.contest_id),
        };
        primary.then_with(|| a.key().cmp(&b.key()))
    });
}

fn rating_unrated_last(a: &Problem, b: &Problem) -> Ordering {
    match (a.rating, b.rating) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A recommender row: the problem plus what the caller needs to badge it.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub problem: Problem,
    pub key: String,
    pub solved_count: u64,
    pub solved: bool,
}

/// Filter, sort and truncate a problem set in one pass.
pub fn recommend(
    set: ProblemSet,
    filter: &ProblemFilter,
    sort: SortKey,
    solved: &HashSet<String>,
    limit: Option<usize>,
) -> Vec<CatalogEntry> {
    let counts = solve_counts(&set.problem_statistics);
    let mut problems = filter_catalog(set.problems, filter, solved);
    sort_catalog(&mut problems, sort, &counts);
    if let Some(limit) = limit {
        problems.truncate(limit);
    }

    problems
        .into_iter()
        .map(|problem| {
            let key = problem.key();
            CatalogEntry {
                solved_count: counts.get(&key).copied().unwrap_or(0),
                solved: solved.contains(&key),
                key,
                problem,
            }
        })
        .collect()
}

/// Contests still open for registration or in progress, soonest first.
pub fn upcoming_contests(contests: Vec<Contest>) -> Vec<Contest> {
    let mut upcoming: Vec<Contest> = contests
        .into_iter()
        .filter(Contest::is_upcoming_or_running)
        .collect();
    upcoming.sort_by_key(|c| c.start_time_seconds.unwrap_or(i64::MAX));
    upcoming
}
