use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

mod common;

async fn call(app: &common::TestApp, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_live() {
    let app = common::create_test_app();
    let (status, body) = call(&app, Method::GET, "/health/live").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_root_with_memory_store() {
    let app = common::create_test_app();
    let (status, body) = call(&app, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "not_configured");
    assert_eq!(body["recommendations"], true);
}

#[tokio::test]
async fn test_get_recommendations_ranks_and_truncates() {
    let app = common::create_test_app();
    common::seed_catalog(&app.store);
    app.store.set_mastery("learner-1", "fractions", 90.0);
    app.store.set_mastery("learner-1", "comprehension", 20.0);

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/users/learner-1/recommendations?limit=3",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);

    let scores: Vec<f64> = items.iter().map(|i| i["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(items[0]["reasons"].as_array().is_some());
    assert!(items[0]["activityId"].is_string());
    assert_eq!(items[0]["estimatedMinutes"], 10);
    assert!(body["data"]["generatedAt"].is_string());
    assert!(body["data"]["expiresAt"].is_string());
}

#[tokio::test]
async fn test_cached_queue_served_within_ttl() {
    let app = common::create_test_app();
    common::seed_catalog(&app.store);

    let (_, first) = call(&app, Method::GET, "/api/users/learner-2/recommendations").await;
    app.clock.advance(Duration::hours(2));
    let (_, second) = call(&app, Method::GET, "/api/users/learner-2/recommendations").await;

    assert_eq!(first["data"]["items"], second["data"]["items"]);
    assert_eq!(first["data"]["generatedAt"], second["data"]["generatedAt"]);
    assert_eq!(second["data"]["cached"], true);
    assert_eq!(app.store.queue_count("learner-2"), 1);
}

#[tokio::test]
async fn test_refresh_always_generates() {
    let app = common::create_test_app();
    common::seed_catalog(&app.store);

    let (_, first) = call(&app, Method::GET, "/api/users/learner-3/recommendations").await;
    app.clock.advance(Duration::minutes(5));
    let (status, refreshed) = call(
        &app,
        Method::POST,
        "/api/users/learner-3/recommendations/refresh",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["data"]["cached"], false);
    assert_ne!(first["data"]["generatedAt"], refreshed["data"]["generatedAt"]);
    assert_eq!(app.store.queue_count("learner-3"), 2);
}

#[tokio::test]
async fn test_invalid_limit_is_rejected() {
    let app = common::create_test_app();
    common::seed_catalog(&app.store);

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/users/learner-4/recommendations?limit=0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/users/learner-4/recommendations?ttlHours=-2",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/users/learner-4/recommendations?ttlHours=1e12",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.store.queue_count("learner-4"), 0);
}

#[tokio::test]
async fn test_store_outage_returns_unavailable() {
    let app = common::create_test_app();
    common::seed_catalog(&app.store);
    app.store.set_unavailable(true);

    let (status, body) = call(&app, Method::GET, "/api/users/learner-5/recommendations").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "RECOMMENDATION_UNAVAILABLE");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = common::create_test_app();
    let (status, body) = call(&app, Method::GET, "/api/unknown").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
