use axum::http::{Method, StatusCode};
use integration_tests::{app, send, service, sign_up, PASSWORD};
use rf_api::AppState;
use serde_json::json;

#[tokio::test]
async fn registration_errors_are_batched() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "a!", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn duplicate_username_conflicts_and_bad_password_is_rejected() {
    let app = app().await;
    sign_up(&app, "alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "alice", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");

    let (status, _) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_can_be_edited_by_its_owner() {
    let app = app().await;
    let token = sign_up(&app, "alice").await;

    let (status, _) = send(&app, Method::PUT, "/user/bio", Some(&token), Some(json!({ "bio": "Rustacean" }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, info) = send(&app, Method::GET, "/users/alice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["bio"], "Rustacean");
    assert_eq!(info["role"], "Regular User");
    assert!(info.get("password_hash").is_none());

    let (status, _) = send(
        &app,
        Method::PUT,
        "/user/password",
        Some(&token),
        Some(json!({ "current_password": "not-my-password", "new_password": "another-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/user/password",
        Some(&token),
        Some(json!({ "current_password": PASSWORD, "new_password": "another-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "alice", "password": "another-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/users/nobody", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_admins_change_roles() {
    let forum = service().await;
    forum.ensure_admin("root", PASSWORD).await.unwrap();
    let app = rf_api::router(AppState::new(forum));

    let member = sign_up(&app, "alice").await;
    let (status, _) = send(&app, Method::PUT, "/users/alice/promote", Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "root", "password": PASSWORD })),
    )
    .await;
    let admin = body["token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::PUT, "/users/alice/promote", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, info) = send(&app, Method::GET, "/users/alice", None, None).await;
    assert_eq!(info["role"], "Admin");

    let (status, _) = send(&app, Method::PUT, "/users/alice/demote", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, info) = send(&app, Method::GET, "/users/alice", None, None).await;
    assert_eq!(info["role"], "Regular User");
}

#[tokio::test]
async fn admin_may_delete_any_thread() {
    let forum = service().await;
    forum.ensure_admin("root", PASSWORD).await.unwrap();
    let app = rf_api::router(AppState::new(forum));

    let author = sign_up(&app, "alice").await;
    let (_, body) = send(
        &app,
        Method::POST,
        "/threads",
        Some(&author),
        Some(json!({ "title": "Welcome to the forum", "content": "Please follow the rules" })),
    )
    .await;
    let a = body["id"].as_i64().unwrap();

    let (_, body) = send(
        &app,
        Method::POST,
        "/login",
        None,
        Some(json!({ "username": "root", "password": PASSWORD })),
    )
    .await;
    let admin = body["token"].as_str().unwrap().to_string();

    let (_, auth) = send(&app, Method::GET, &format!("/threads/{a}/authorization"), Some(&admin), None).await;
    assert_eq!(auth["authorized"], true);
    let (status, _) = send(&app, Method::DELETE, &format!("/threads/{a}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn stats_endpoints_report_activity() {
    let app = app().await;
    let alice = sign_up(&app, "alice").await;
    let bob = sign_up(&app, "bob").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/threads",
        Some(&alice),
        Some(json!({
            "title": "Welcome to the forum",
            "content": "Please follow the rules",
            "category": "general",
            "tag": "intro",
        })),
    )
    .await;
    let a = body["id"].as_i64().unwrap();
    send(
        &app,
        Method::POST,
        &format!("/threads/{a}/comment"),
        Some(&bob),
        Some(json!({ "content": "I agree with this" })),
    )
    .await;
    send(&app, Method::POST, &format!("/threads/{a}/like"), Some(&bob), None).await;

    let (_, metrics) = send(&app, Method::GET, "/users/alice/metrics", None, None).await;
    assert_eq!(
        metrics,
        json!({ "threads_created": 1, "comments_made": 0, "likes_received": 1, "dislikes_received": 0 })
    );

    let (_, scores) = send(&app, Method::GET, "/users/bob/scores", None, None).await;
    assert_eq!(scores["contribution_score"], 2.0);

    let (_, board) = send(&app, Method::GET, "/leaderboard", None, None).await;
    assert_eq!(board[0]["username"], "alice");
    assert_eq!(board[1]["username"], "bob");

    let (_, activity) = send(&app, Method::GET, "/users/bob/activity", None, None).await;
    assert_eq!(activity["threads"], json!([]));
    assert_eq!(activity["comments"][0]["parent_id"], a);

    let (_, categories) = send(&app, Method::GET, "/categories", None, None).await;
    assert_eq!(categories[0]["name"], "general");
    let (_, tags) = send(&app, Method::GET, "/tags", None, None).await;
    assert_eq!(tags[0]["name"], "intro");
}
