use serde::{Deserialize, Serialize};

/// Codeforces account as returned by `user.info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfUser {
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default)]
    pub contribution: i64,
    // Unrated accounts carry no rank or rating fields at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<i64>,
    #[serde(default)]
    pub last_online_time_seconds: i64,
    pub registration_time_seconds: i64,
    #[serde(default)]
    pub friend_of_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_photo: Option<String>,
}

/// One entry of `user.rating`: the outcome of a rated contest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingChange {
    pub contest_id: i64,
    pub contest_name: String,
    pub handle: String,
    pub rank: i64,
    pub rating_update_time_seconds: i64,
    pub old_rating: i64,
    pub new_rating: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problemset_name: Option<String>,
    pub index: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Problem {
    /// Identity key: contest id concatenated with the problem index (`1520A`).
    pub fn key(&self) -> String {
        problem_key(self.contest_id, &self.index)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Builds the identity key shared by problems, statistics and bookmarks.
pub fn problem_key(contest_id: Option<i64>, index: &str) -> String {
    match contest_id {
        Some(id) => format!("{}{}", id, index),
        None => index.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<i64>,
    pub index: String,
    #[serde(default)]
    pub solved_count: u64,
}

impl ProblemStatistics {
    pub fn key(&self) -> String {
        problem_key(self.contest_id, &self.index)
    }
}

/// Result of `problemset.problems`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSet {
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub problem_statistics: Vec<ProblemStatistics>,
}

/// Submission outcome. Upstream sends `OK` for accepted solutions and a
/// screaming-case name (`WRONG_ANSWER`, `TIME_LIMIT_EXCEEDED`, ...) otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Accepted,
    Other(String),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    /// Human-facing label; accepted submissions read as "Accepted".
    pub fn label(&self) -> &str {
        match self {
            Verdict::Accepted => "Accepted",
            Verdict::Other(raw) => raw,
        }
    }
}

impl From<String> for Verdict {
    fn from(raw: String) -> Self {
        if raw == "OK" {
            Verdict::Accepted
        } else {
            Verdict::Other(raw)
        }
    }
}

impl From<Verdict> for String {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Accepted => "OK".to_string(),
            Verdict::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_id: Option<i64>,
    pub creation_time_seconds: i64,
    pub problem: Problem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programming_language: Option<String>,
    /// Absent while the submission is still being judged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        self.verdict.as_ref().is_some_and(Verdict::is_accepted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub phase: String,
    #[serde(default)]
    pub frozen: bool,
    pub duration_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_time_seconds: Option<i64>,
}

impl Contest {
    /// Registration is open or the contest is running.
    pub fn is_upcoming_or_running(&self) -> bool {
        self.phase == "BEFORE" || self.phase == "CODING"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_maps_ok_to_accepted() {
        let sub: Submission = serde_json::from_str(
            r#"{"id":1,"contestId":1520,"creationTimeSeconds":10,
                "problem":{"contestId":1520,"index":"A","name":"Do Not Be Distracted!","tags":["brute force"]},
                "verdict":"OK"}"#,
        )
        .unwrap();
        assert!(sub.is_accepted());
        assert_eq!(sub.problem.key(), "1520A");

        let judging: Submission = serde_json::from_str(
            r#"{"id":2,"creationTimeSeconds":11,"problem":{"index":"B","name":"x"}}"#,
        )
        .unwrap();
        assert!(!judging.is_accepted());
        assert!(judging.problem.tags.is_empty());
        assert_eq!(judging.problem.rating, None);
    }

    #[test]
    fn verdict_serializes_back_to_upstream_form() {
        let json = serde_json::to_string(&Verdict::Accepted).unwrap();
        assert_eq!(json, "\"OK\"");
        let wa = Verdict::from("WRONG_ANSWER".to_string());
        assert_eq!(wa.label(), "WRONG_ANSWER");
    }

    #[test]
    fn unrated_user_parses() {
        let user: CfUser = serde_json::from_str(
            r#"{"handle":"newbie","registrationTimeSeconds":1600000000,"contribution":0}"#,
        )
        .unwrap();
        assert_eq!(user.rating, None);
        assert_eq!(user.rank, None);
    }
}
