use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use cpa_api::auth::create_token;
use cpa_api::google::{FederatedIdentity, IdentityVerifier};
use cpa_api::{AppState, AppStateInner, routes};
use cpa_codeforces::{CfError, ContestSource};
use cpa_db::Database;
use cpa_types::codeforces::{CfUser, Contest, Problem, ProblemSet, RatingChange, Submission};

const SECRET: &str = "test-secret";

/// Knows the handles `tourist` and `errichto`; everything else is not found.
struct FakeCodeforces;

fn known(handle: &str) -> Result<(), CfError> {
    match handle {
        "tourist" | "errichto" => Ok(()),
        other => Err(CfError::NotFound(format!(
            "handles: User with handle {} not found",
            other
        ))),
    }
}

fn problem(contest_id: i64, index: &str, rating: i64, tags: &[&str]) -> Problem {
    serde_json::from_value(json!({
        "contestId": contest_id,
        "index": index,
        "name": format!("Problem {}{}", contest_id, index),
        "rating": rating,
        "tags": tags,
    }))
    .unwrap()
}

#[async_trait]
impl ContestSource for FakeCodeforces {
    async fn user_info(&self, handle: &str) -> Result<CfUser, CfError> {
        known(handle)?;
        let rating = if handle == "tourist" { 3800 } else { 2900 };
        Ok(serde_json::from_value(json!({
            "handle": handle,
            "rating": rating,
            "maxRating": 3900,
            "registrationTimeSeconds": 1_265_987_288,
        }))?)
    }

    async fn user_rating(&self, handle: &str) -> Result<Vec<RatingChange>, CfError> {
        known(handle)?;
        let now = chrono::Utc::now().timestamp();
        Ok(vec![RatingChange {
            contest_id: 1,
            contest_name: "Round 1".into(),
            handle: handle.to_string(),
            rank: if handle == "tourist" { 1 } else { 7 },
            rating_update_time_seconds: now - 86_400,
            old_rating: 1500,
            new_rating: 2000,
        }])
    }

    async fn user_status(&self, handle: &str) -> Result<Vec<Submission>, CfError> {
        known(handle)?;
        Ok(serde_json::from_value(json!([{
            "id": 1,
            "contestId": 100,
            "creationTimeSeconds": 1_600_000_000,
            "problem": { "contestId": 100, "index": "A", "name": "Problem 100A", "rating": 800, "tags": ["dp"] },
            "verdict": "OK",
        }]))?)
    }

    async fn problemset(&self, _tags: Option<&str>) -> Result<ProblemSet, CfError> {
        Ok(ProblemSet {
            problems: vec![
                problem(100, "A", 800, &["dp"]),
                problem(100, "B", 1200, &["dp", "graphs"]),
                problem(101, "C", 1600, &["graphs"]),
            ],
            problem_statistics: Vec::new(),
        })
    }

    async fn contests(&self) -> Result<Vec<Contest>, CfError> {
        Ok(serde_json::from_value(json!([
            { "id": 3, "name": "Later", "phase": "BEFORE", "durationSeconds": 7200, "startTimeSeconds": 300 },
            { "id": 2, "name": "Done", "phase": "FINISHED", "durationSeconds": 7200, "startTimeSeconds": 100 },
            { "id": 1, "name": "Sooner", "phase": "BEFORE", "durationSeconds": 7200, "startTimeSeconds": 200 },
        ]))?)
    }
}

/// Accepts the token "valid-google-token" as ada@example.com.
struct FakeGoogle;

#[async_trait]
impl IdentityVerifier for FakeGoogle {
    async fn verify(&self, token: &str) -> anyhow::Result<FederatedIdentity> {
        anyhow::ensure!(token == "valid-google-token", "bad token");
        Ok(FederatedIdentity {
            sub: "google-123".into(),
            email: "ada@example.com".into(),
            name: Some("Ada Lovelace".into()),
            picture: Some("https://img.example.com/ada.png".into()),
        })
    }
}

fn app() -> Router {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: SECRET.into(),
        token_ttl: chrono::Duration::hours(6),
        contests: Arc::new(FakeCodeforces),
        identity: Arc::new(FakeGoogle),
    });
    routes::router(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn signup(app: &Router, username: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "username": username, "email": email, "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn signup_then_login_by_username_or_email() {
    let app = app();
    signup(&app, "alice", "alice@example.com").await;

    for identifier in [json!({ "username": "alice" }), json!({ "email": "alice@example.com" })] {
        let mut body = identifier;
        body["password"] = json!("hunter22");
        let (status, body) = send(&app, "POST", "/auth/login", None, Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
        assert!(body["token"].as_str().is_some());
    }

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn signup_validation_and_conflicts() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "username": "bob", "email": "" , "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username, email, and password are required");

    signup(&app, "bob", "bob@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "username": "bob2", "email": "bob@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "An account with this email already exists");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "username": "bob", "email": "other@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already taken");
}

#[tokio::test]
async fn google_only_account_is_steered_to_google_login() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/auth/google",
        None,
        Some(json!({ "token": "valid-google-token" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "adalovelace");
    assert_eq!(body["profile_picture"], "https://img.example.com/ada.png");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({ "username": "ada", "email": "ada@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "An account with this email already exists. Please use Google login."
    );

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "This account uses Google login. Please sign in with Google.");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/google",
        None,
        Some(json!({ "token": "forged" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid Google token");
}

#[tokio::test]
async fn protected_routes_reject_bad_tokens() {
    let app = app();

    let (status, body) = send(&app, "GET", "/users/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authorized, no token");

    let (status, body) = send(&app, "GET", "/users/profile", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authorized, token failed");

    let expired = create_token(SECRET, Uuid::new_v4(), "ghost", chrono::Duration::hours(-1)).unwrap();
    let (status, body) = send(&app, "GET", "/users/profile", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authorized, token failed");

    let orphan = create_token(SECRET, Uuid::new_v4(), "ghost", chrono::Duration::hours(1)).unwrap();
    let (status, body) = send(&app, "GET", "/users/profile", Some(&orphan), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Not authorized, user not found");
}

#[tokio::test]
async fn profile_update_sets_and_clears_handle() {
    let app = app();
    let token = signup(&app, "carol", "carol@example.com").await;
    signup(&app, "dave", "dave@example.com").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/users/profile",
        Some(&token),
        Some(json!({ "codeforces_handle": "tourist" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["codeforces_handle"], "tourist");
    assert_eq!(body["email"], "carol@example.com");
    assert!(body.get("password").is_none());

    let (status, body) = send(
        &app,
        "PUT",
        "/users/profile",
        Some(&token),
        Some(json!({ "codeforces_handle": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["codeforces_handle"].is_null());

    let (status, _) = send(
        &app,
        "PUT",
        "/users/profile",
        Some(&token),
        Some(json!({ "email": "dave@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn bookmark_lifecycle_is_owner_scoped() {
    let app = app();
    let alice = signup(&app, "alice", "alice@example.com").await;
    let mallory = signup(&app, "mallory", "mallory@example.com").await;

    let new_bookmark = json!({
        "problem_id": "1520A",
        "problem_name": "Do Not Be Distracted!",
        "rating": 800,
        "tags": ["brute force", "implementation"],
    });
    let (status, created) =
        send(&app, "POST", "/users/bookmarks", Some(&alice), Some(new_bookmark.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["tags"], json!(["brute force", "implementation"]));

    let (status, _) =
        send(&app, "POST", "/users/bookmarks", Some(&alice), Some(new_bookmark)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, list) = send(&app, "GET", "/users/bookmarks", Some(&alice), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["problem_id"], "1520A");

    let id = created["id"].as_str().unwrap();
    let uri = format!("/users/bookmarks/{}", id);

    let (status, body) = send(&app, "DELETE", &uri, Some(&mallory), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Bookmark not found");

    let (status, body) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bookmark removed");

    let (_, list) = send(&app, "GET", "/users/bookmarks", Some(&alice), None).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bookmark_requires_problem_fields() {
    let app = app();
    let token = signup(&app, "erin", "erin@example.com").await;
    let (status, _) = send(
        &app,
        "POST",
        "/users/bookmarks",
        Some(&token),
        Some(json!({ "problem_id": "1A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn proxy_maps_unknown_handle_to_404() {
    let app = app();
    let (status, body) = send(&app, "GET", "/cf/user/ghost", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");

    let (status, body) = send(&app, "GET", "/cf/user/ghost/rating", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Rating history not found");

    let (status, body) = send(&app, "GET", "/cf/user/tourist", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["handle"], "tourist");
}

#[tokio::test]
async fn contests_are_upcoming_only_and_sorted() {
    let app = app();
    let (status, body) = send(&app, "GET", "/cf/contests", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Sooner", "Later"]);
}

#[tokio::test]
async fn summary_includes_derived_stats() {
    let app = app();
    let (status, body) = send(&app, "GET", "/cf/user/tourist/summary", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["handle"], "tourist");
    assert_eq!(body["stats"]["solved_count"], 1);
    assert_eq!(body["stats"]["top_tags"][0]["tag"], "dp");
    assert_eq!(body["rating_history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn compare_validates_and_reports_missing_handle() {
    let app = app();
    let (status, body) = send(&app, "GET", "/cf/compare?handle1=tourist", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please enter both handles");

    let (status, body) =
        send(&app, "GET", "/cf/compare?handle1=tourist&handle2=ghost", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User ghost not found");

    let (status, body) =
        send(&app, "GET", "/cf/compare?handle1=tourist&handle2=errichto", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let rating = body["metrics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["metric"] == "rating")
        .unwrap();
    assert_eq!(rating["winner"], "left");
    assert_eq!(body["timeline"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn recommend_combines_tags_with_and() {
    let app = app();
    let (status, body) = send(
        &app,
        "GET",
        "/cf/problems/recommend?tags=dp;graphs&handle=tourist",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["100B"]);
    assert_eq!(body[0]["solved"], false);

    let (status, body) = send(
        &app,
        "GET",
        "/cf/problems/recommend?solved_only=true&handle=tourist",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["key"], "100A");
    assert_eq!(body[0]["solved"], true);

    let (status, _) = send(&app, "GET", "/cf/problems/recommend?sort=bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_signups_for_one_email_yield_one_account() {
    let app = app();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                send(
                    &app,
                    "POST",
                    "/auth/signup",
                    None,
                    Some(json!({
                        "username": format!("racer{}", i),
                        "email": "race@example.com",
                        "password": "hunter22",
                    })),
                )
                .await
            })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        let (status, body) = task.await.unwrap();
        match status {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => {
                assert_eq!(body["error"], "An account with this email already exists")
            }
            other => panic!("unexpected {other}: {body}"),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookmarks_of_one_problem_conflict() {
    let app = app();
    let token = signup(&app, "frank", "frank@example.com").await;

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let app = app.clone();
            let token = token.clone();
            tokio::spawn(async move {
                send(
                    &app,
                    "POST",
                    "/users/bookmarks",
                    Some(&token),
                    Some(json!({ "problem_id": "4A", "problem_name": "Watermelon" })),
                )
                .await
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for task in tasks {
        let (status, body) = task.await.unwrap();
        if status != StatusCode::CREATED {
            assert_eq!(status, StatusCode::CONFLICT, "{body}");
            assert!(body["error"].is_string());
        }
        statuses.push(status);
    }
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::CREATED).count(), 1);

    let (_, list) = send(&app, "GET", "/users/bookmarks", Some(&token), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_malformed_bookmark_id_is_not_found() {
    let app = app();
    let token = signup(&app, "gina", "gina@example.com").await;

    let (status, body) = send(&app, "DELETE", "/users/bookmarks/123", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Bookmark not found");
}

#[tokio::test]
async fn null_bookmark_tags_mean_no_tags() {
    let app = app();
    let token = signup(&app, "hank", "hank@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/users/bookmarks",
        Some(&token),
        Some(json!({ "problem_id": "1A", "problem_name": "Theatre Square", "tags": null })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["tags"], json!([]));
}

#[tokio::test]
async fn malformed_input_answers_with_json_error() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "username": "ivy",
            "email": "ivy@example.com",
            "password": "x",
            "confirmPassword": "x",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("confirmPassword"));

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());

    let (status, body) =
        send(&app, "GET", "/cf/problems/recommend?min_rating=abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
