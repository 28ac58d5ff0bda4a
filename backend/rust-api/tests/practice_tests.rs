use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use sentinel_prep_api::config::Config;

mod common;

async fn practice_server() -> String {
    let router = Router::new().route(
        "/{username}",
        get(|Path(username): Path<String>| async move {
            let body: Value = if username == "coder42" {
                json!({
                    "totalSolved": 120,
                    "easySolved": 70,
                    "mediumSolved": 40,
                    "hardSolved": 10
                })
            } else {
                json!({ "errors": [{ "message": "That user does not exist." }] })
            };
            Json(body)
        }),
    );
    common::spawn_upstream(router).await
}

#[tokio::test]
async fn test_sync_accepts_profile_url_and_updates_dashboard() {
    let base = practice_server().await;
    let (app, _) = common::create_test_app_with(Config {
        practice_api_url: base,
        ..common::test_config()
    });
    let token = common::student_token("practitioner");

    let (status, body) = common::send(&app, "GET", "/api/v1/practice", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/v1/practice/sync",
        Some(&token),
        Some(json!({ "username": "https://leetcode.com/u/coder42/" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["username"], "coder42");
    assert_eq!(body["stats"]["total"], 120);
    assert_eq!(body["stats"]["hard"], 10);

    let (_, body) = common::send(&app, "GET", "/api/v1/practice", Some(&token), None).await;
    assert_eq!(body["easy"], 70);
    assert!(body["last_synced"].is_string());

    let (_, view) = common::send(&app, "GET", "/api/v1/dashboard", Some(&token), None).await;
    assert_eq!(view["practice_totals"]["total"], 120);
    assert_eq!(view["practice_totals"]["medium"], 40);
    // 120 solved scales to 40; no tests and no tasks count as 0.
    assert_eq!(view["readiness"]["score"], 12);
}

#[tokio::test]
async fn test_sync_reports_upstream_errors() {
    let base = practice_server().await;
    let (app, state) = common::create_test_app_with(Config {
        practice_api_url: base,
        ..common::test_config()
    });
    let token = common::student_token("practitioner");

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/v1/practice/sync",
        Some(&token),
        Some(json!({ "username": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Sync failed: That user does not exist.");

    let events = state.activity.events().await.unwrap();
    assert!(events.iter().any(|e| e.event_type == "PRACTICE_SYNC_FAILED"));

    let (status, _) = common::send(
        &app,
        "POST",
        "/api/v1/practice/sync",
        Some(&token),
        Some(json!({ "username": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_when_upstream_is_unreachable() {
    let (app, _) = common::create_test_app();
    let token = common::student_token("practitioner");

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/v1/practice/sync",
        Some(&token),
        Some(json!({ "username": "coder42" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body["message"],
        "Sync failed: Failed to fetch data. The API might be down."
    );

    let (_, console) = common::send(
        &app,
        "GET",
        "/api/v1/admin/console",
        Some(&common::admin_token()),
        None,
    )
    .await;
    assert_eq!(console["health"]["practice_sync"], "faults");
    assert_eq!(console["requests"][0]["status"], 0);
}
