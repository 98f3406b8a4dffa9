use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{
    multipart::{MultipartForm, Part},
    TestServer,
};
use serde_json::{json, Value};

use edubit_api::api::{create_router, AppState};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn create_test_server() -> TestServer {
    let app = create_router(AppState::in_memory("test-secret"), &[], MAX_UPLOAD_BYTES);
    TestServer::new(app).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

/// Registers an account and returns its access token
async fn register(server: &TestServer, email: &str, role: &str) -> String {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "email": email,
            "password": "s3cret-pass",
            "full_name": email.split('@').next().unwrap(),
            "role": role,
        }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn create_reel(server: &TestServer, token: &str, title: &str, tags: &str, level: &str) -> i64 {
    let response = server
        .post("/api/reels")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({
            "title": title,
            "video_url": format!("https://videos.example/{}.mp4", title),
            "tags": tags,
            "difficulty_level": level,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_i64().unwrap()
}

async fn complete_reel(server: &TestServer, token: &str, reel_id: i64) {
    server
        .post("/api/progress")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({ "reel_id": reel_id }))
        .await
        .assert_status(StatusCode::CREATED);
}

fn ids(items: &Value) -> Vec<i64> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_and_root() {
    let server = create_test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");

    let response = server.get("/").await;
    response.assert_status_ok();
    assert!(response.json::<Value>()["message"].is_string());
}

#[tokio::test]
async fn test_register_login_and_me() {
    let server = create_test_server();
    register(&server, "Ada@Example.com", "learner").await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": "s3cret-pass" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let me: Value = response.json();
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["role"], "learner");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let server = create_test_server();
    register(&server, "dup@example.com", "learner").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": "dup@example.com", "password": "other" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let server = create_test_server();
    register(&server, "bob@example.com", "learner").await;

    server
        .post("/api/auth/login")
        .json(&json!({ "email": "bob@example.com", "password": "nope" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let server = create_test_server();

    server
        .get("/api/reels/feed")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer("not-a-jwt"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_learners_cannot_publish() {
    let server = create_test_server();
    let learner = register(&server, "leo@example.com", "learner").await;

    server
        .post("/api/reels")
        .add_header(AUTHORIZATION, bearer(&learner))
        .json(&json!({ "title": "Mine", "video_url": "https://videos.example/m.mp4" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_feed_ranks_by_history() {
    let server = create_test_server();
    let creator = register(&server, "cara@example.com", "creator").await;
    let learner = register(&server, "lea@example.com", "learner").await;

    let watched = create_reel(&server, &creator, "py-intro", "python,basics", "beginner").await;
    let similar = create_reel(&server, &creator, "py-loops", "python", "beginner").await;
    let other = create_reel(&server, &creator, "go-chan", "go", "advanced").await;

    complete_reel(&server, &learner, watched).await;

    let response = server
        .get("/api/reels/feed")
        .add_header(AUTHORIZATION, bearer(&learner))
        .await;
    response.assert_status_ok();
    let feed: Value = response.json();
    assert_eq!(ids(&feed), vec![similar, other, watched]);
    assert_eq!(feed[0]["creator_name"], "cara");

    let response = server
        .get("/api/reels/feed?tags=python&limit=1")
        .add_header(AUTHORIZATION, bearer(&learner))
        .await;
    assert_eq!(ids(&response.json::<Value>()), vec![similar]);
}

#[tokio::test]
async fn test_feed_rejects_bad_limits() {
    let server = create_test_server();
    let learner = register(&server, "lim@example.com", "learner").await;

    for query in ["limit=0", "limit=101", "offset=-1"] {
        server
            .get(&format!("/api/reels/feed?{}", query))
            .add_header(AUTHORIZATION, bearer(&learner))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_viewing_a_reel_counts_views() {
    let server = create_test_server();
    let creator = register(&server, "vic@example.com", "creator").await;
    let reel = create_reel(&server, &creator, "views", "", "beginner").await;

    for expected in 1..=2 {
        let response = server
            .get(&format!("/api/reels/{}", reel))
            .add_header(AUTHORIZATION, bearer(&creator))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["views_count"], expected);
    }

    server
        .get("/api/reels/999")
        .add_header(AUTHORIZATION, bearer(&creator))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_the_owner_deletes_a_reel() {
    let server = create_test_server();
    let owner = register(&server, "own@example.com", "creator").await;
    let rival = register(&server, "riv@example.com", "creator").await;
    let reel = create_reel(&server, &owner, "mine", "", "beginner").await;

    server
        .delete(&format!("/api/reels/{}", reel))
        .add_header(AUTHORIZATION, bearer(&rival))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .delete(&format!("/api/reels/{}", reel))
        .add_header(AUTHORIZATION, bearer(&owner))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&format!("/api/reels/{}", reel))
        .add_header(AUTHORIZATION, bearer(&owner))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_playlist_additions_are_idempotent() {
    let server = create_test_server();
    let creator = register(&server, "pc@example.com", "creator").await;
    let learner = register(&server, "pl@example.com", "learner").await;
    let reel = create_reel(&server, &creator, "clip", "", "beginner").await;

    let response = server
        .post("/api/playlists")
        .add_header(AUTHORIZATION, bearer(&learner))
        .json(&json!({ "title": "Later" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let playlist = response.json::<Value>()["id"].as_i64().unwrap();

    for _ in 0..2 {
        let response = server
            .post(&format!("/api/playlists/{}/reels", playlist))
            .add_header(AUTHORIZATION, bearer(&learner))
            .json(&json!({ "reel_id": reel }))
            .await;
        response.assert_status_ok();
        assert_eq!(ids(&response.json::<Value>()["reels"]), vec![reel]);
    }

    // Someone else's playlist looks missing
    server
        .get(&format!("/api/playlists/{}", playlist))
        .add_header(AUTHORIZATION, bearer(&creator))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_comments_carry_author_names() {
    let server = create_test_server();
    let creator = register(&server, "cc@example.com", "creator").await;
    let learner = register(&server, "kim@example.com", "learner").await;
    let reel = create_reel(&server, &creator, "talk", "", "beginner").await;

    for content in ["first", "second"] {
        let response = server
            .post("/api/comments")
            .add_header(AUTHORIZATION, bearer(&learner))
            .json(&json!({ "reel_id": reel, "content": content }))
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<Value>()["user_name"], "kim");
    }

    server
        .post("/api/comments")
        .add_header(AUTHORIZATION, bearer(&learner))
        .json(&json!({ "reel_id": reel, "content": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .get(&format!("/api/comments/reel/{}", reel))
        .add_header(AUTHORIZATION, bearer(&creator))
        .await;
    let comments: Value = response.json();
    assert_eq!(comments[0]["content"], "second");
    assert_eq!(comments[1]["content"], "first");
}

#[tokio::test]
async fn test_course_progress_percentage() {
    let server = create_test_server();
    let creator = register(&server, "mc@example.com", "creator").await;
    let learner = register(&server, "ml@example.com", "learner").await;

    let mut reels = Vec::new();
    for title in ["one", "two", "three"] {
        reels.push(create_reel(&server, &creator, title, "sql", "beginner").await);
    }

    let response = server
        .post("/api/courses")
        .add_header(AUTHORIZATION, bearer(&creator))
        .json(&json!({ "title": "SQL basics", "reel_ids": reels }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let course: Value = response.json();
    assert_eq!(ids(&course["reels"]), reels);
    let course_id = course["id"].as_i64().unwrap();

    complete_reel(&server, &learner, reels[0]).await;
    // Repeating a completion does not count twice
    complete_reel(&server, &learner, reels[0]).await;
    // Nor does completing the same reel again inside the course
    server
        .post("/api/progress")
        .add_header(AUTHORIZATION, bearer(&learner))
        .json(&json!({ "reel_id": reels[0], "course_id": course_id }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .get(&format!("/api/progress/course/{}", course_id))
        .add_header(AUTHORIZATION, bearer(&learner))
        .await;
    response.assert_status_ok();
    let progress: Value = response.json();
    assert_eq!(progress["total_reels"], 3);
    assert_eq!(progress["completed_reels"], 1);
    assert_eq!(progress["completion_percentage"], 33.33);
}

#[tokio::test]
async fn test_courses_only_take_own_existing_reels() {
    let server = create_test_server();
    let owner = register(&server, "co@example.com", "creator").await;
    let other = register(&server, "cx@example.com", "creator").await;
    let reel = create_reel(&server, &owner, "owned", "", "beginner").await;

    server
        .post("/api/courses")
        .add_header(AUTHORIZATION, bearer(&other))
        .json(&json!({ "title": "Borrowed", "reel_ids": [reel] }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .post("/api/courses")
        .add_header(AUTHORIZATION, bearer(&owner))
        .json(&json!({ "title": "Ghost", "reel_ids": [reel, 4242] }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ai_placeholders_when_disabled() {
    let server = create_test_server();
    let creator = register(&server, "ai@example.com", "creator").await;
    let reel = create_reel(&server, &creator, "Ownership", "rust", "beginner").await;

    let response = server
        .post("/api/ai/summary")
        .add_header(AUTHORIZATION, bearer(&creator))
        .json(&json!({ "reel_id": reel }))
        .await;
    response.assert_status_ok();
    let summary: Value = response.json();
    assert!(summary["summary"].as_str().unwrap().contains("Ownership"));

    let response = server
        .post("/api/ai/quiz")
        .add_header(AUTHORIZATION, bearer(&creator))
        .json(&json!({ "reel_id": reel }))
        .await;
    response.assert_status_ok();
    assert!(!response.json::<Value>()["questions"]
        .as_array()
        .unwrap()
        .is_empty());

    server
        .post("/api/ai/summary")
        .add_header(AUTHORIZATION, bearer(&creator))
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_media_host_is_unavailable() {
    let server = create_test_server();
    let creator = register(&server, "up@example.com", "creator").await;

    let form = MultipartForm::new().add_text("title", "Clip").add_part(
        "file",
        Part::bytes(vec![0u8; 16])
            .file_name("clip.mp4")
            .mime_type("video/mp4"),
    );

    server
        .post("/api/reels/upload")
        .add_header(AUTHORIZATION, bearer(&creator))
        .multipart(form)
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
