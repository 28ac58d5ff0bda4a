use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use sentinel_prep_api::utils::time::{day_key, today_key, today_key_at_offset};

mod common;

#[tokio::test]
async fn test_create_and_list_today() {
    let (app, _) = common::create_test_app();
    let token = common::student_token("planner");

    for title in ["Revise graphs", "Mock interview"] {
        let (status, task) = common::send(
            &app,
            "POST",
            "/api/v1/tasks",
            Some(&token),
            Some(json!({ "title": title, "category": "DSA" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["date"], today_key());
        assert_eq!(task["completed"], false);
    }

    let (status, body) = common::send(&app, "GET", "/api/v1/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], today_key());
    assert_eq!(body["total"], 2);
    assert_eq!(body["completed"], 0);
    assert_eq!(body["percentage"], 0);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_toggle_updates_completion_percentage() {
    let (app, _) = common::create_test_app();
    let token = common::student_token("planner");

    let mut ids = Vec::new();
    for title in ["One", "Two", "Three"] {
        let (_, task) = common::send(
            &app,
            "POST",
            "/api/v1/tasks",
            Some(&token),
            Some(json!({ "title": title, "category": "Aptitude" })),
        )
        .await;
        ids.push(task["id"].as_str().unwrap().to_string());
    }

    let (status, body) = common::send(
        &app,
        "PATCH",
        &format!("/api/v1/tasks/{}", ids[0]),
        Some(&token),
        Some(json!({ "completed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], true);

    let (_, body) = common::send(&app, "GET", "/api/v1/tasks", Some(&token), None).await;
    assert_eq!(body["completed"], 1);
    assert_eq!(body["total"], 3);
    assert_eq!(body["percentage"], 33);
}

#[tokio::test]
async fn test_tasks_are_scoped_to_their_owner() {
    let (app, _) = common::create_test_app();
    let owner = common::student_token("owner");
    let other = common::student_token("intruder");

    let (_, task) = common::send(
        &app,
        "POST",
        "/api/v1/tasks",
        Some(&owner),
        Some(json!({ "title": "Private", "category": "Cybersecurity" })),
    )
    .await;
    let uri = format!("/api/v1/tasks/{}", task["id"].as_str().unwrap());

    let (status, _) = common::send(
        &app,
        "PATCH",
        &uri,
        Some(&other),
        Some(json!({ "completed": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::send(&app, "DELETE", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = common::send(&app, "GET", "/api/v1/tasks", Some(&other), None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = common::send(&app, "DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = common::send(&app, "DELETE", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_task_validation() {
    let (app, _) = common::create_test_app();
    let token = common::student_token("planner");

    let (status, body) = common::send(
        &app,
        "POST",
        "/api/v1/tasks",
        Some(&token),
        Some(json!({ "title": "", "category": "DSA" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = common::send(
        &app,
        "POST",
        "/api/v1/tasks",
        Some(&token),
        Some(json!({ "title": "   ", "category": "DSA" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::send(
        &app,
        "POST",
        "/api/v1/tasks",
        Some(&token),
        Some(json!({ "category": "DSA" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tasks_require_authentication() {
    let (app, _) = common::create_test_app();

    let (status, _) = common::send(&app, "GET", "/api/v1/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::send(&app, "GET", "/api/v1/tasks", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tasks_follow_the_client_day() {
    let (app, _) = common::create_test_app();
    let token = common::student_token("traveller");
    let yesterday = day_key(Utc::now().date_naive() - Duration::days(1));

    let (status, task) = common::send(
        &app,
        "POST",
        &format!("/api/v1/tasks?day={}", yesterday),
        Some(&token),
        Some(json!({ "title": "Late night revision", "category": "DSA" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["date"], yesterday);

    let (status, body) = common::send(
        &app,
        "GET",
        &format!("/api/v1/tasks?day={}", yesterday),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], yesterday);
    assert_eq!(body["total"], 1);

    let (status, view) = common::send(
        &app,
        "GET",
        &format!("/api/v1/dashboard?day={}", yesterday),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["task_stats"]["total"], 1);
}

#[tokio::test]
async fn test_timezone_offset_header_picks_the_day() {
    let (app, _) = common::create_test_app();
    let token = common::student_token("traveller");

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/tasks")
        .header("authorization", format!("Bearer {}", token))
        .header("x-timezone-offset", "330")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "title": "Mock interview", "category": "Aptitude" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let task: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(task["date"], today_key_at_offset(330).unwrap());
}

#[tokio::test]
async fn test_implausible_client_day_is_rejected() {
    let (app, _) = common::create_test_app();
    let token = common::student_token("traveller");
    let last_week = day_key(Utc::now().date_naive() - Duration::days(7));

    for uri in [
        "/api/v1/tasks?day=17-10-2026".to_string(),
        format!("/api/v1/tasks?day={}", last_week),
        format!("/api/v1/live/dashboard?day={}", last_week),
    ] {
        let (status, body) = common::send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["status"], 400);
    }

    let request = Request::builder()
        .uri("/api/v1/tasks")
        .header("authorization", format!("Bearer {}", token))
        .header("x-timezone-offset", "+99999")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
