mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{admin_jwt, body_json, build_app, introduced_intro, sent_check_in};
use hirehub_backend::models::parsed_response::CandidateReportedStatus;
use serde_json::json;
use tower::ServiceExt;

fn authed(req: axum::http::request::Builder) -> axum::http::request::Builder {
    req.header("authorization", format!("Bearer {}", admin_jwt()))
        .header("content-type", "application/json")
}

#[tokio::test]
async fn admin_surface_requires_a_valid_admin_token() {
    let app = build_app(CandidateReportedStatus::StillLooking);

    let req = Request::builder()
        .uri("/api/admin/check-ins")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/admin/check-ins")
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn parse_reply_flags_a_reported_hire() {
    let app = build_app(CandidateReportedStatus::HiredThere);
    let intro = app
        .stores
        .introductions
        .create(introduced_intro(31))
        .await
        .unwrap();
    let check_in = app
        .stores
        .check_ins
        .create(sent_check_in(intro.id, 1))
        .await
        .unwrap();

    let req = authed(Request::builder())
        .method("POST")
        .uri("/api/admin/check-ins/parse-reply")
        .body(Body::from(
            json!({
                "check_in_id": check_in.id,
                "email_content": "Hi, just letting you know I started at Acme two weeks ago!"
            })
            .to_string(),
        ))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["risk_level"], "HIGH");
    assert_eq!(body["flag_opened"], true);

    // The flagged filter now returns it.
    let req = authed(Request::builder())
        .uri("/api/admin/check-ins?status=flagged")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn too_short_reply_content_is_rejected() {
    let app = build_app(CandidateReportedStatus::HiredThere);
    let intro = app
        .stores
        .introductions
        .create(introduced_intro(31))
        .await
        .unwrap();
    let check_in = app
        .stores
        .check_ins
        .create(sent_check_in(intro.id, 1))
        .await
        .unwrap();

    let req = authed(Request::builder())
        .method("POST")
        .uri("/api/admin/check-ins/parse-reply")
        .body(Body::from(
            json!({ "check_in_id": check_in.id, "email_content": "ok" }).to_string(),
        ))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn flag_review_lifecycle_over_http() {
    let app = build_app(CandidateReportedStatus::HiredThere);
    let intro = app
        .stores
        .introductions
        .create(introduced_intro(31))
        .await
        .unwrap();
    let check_in = app
        .stores
        .check_ins
        .create(sent_check_in(intro.id, 1))
        .await
        .unwrap();

    // Open a flag through the parse path.
    let req = authed(Request::builder())
        .method("POST")
        .uri("/api/admin/check-ins/parse-reply")
        .body(Body::from(
            json!({
                "check_in_id": check_in.id,
                "email_content": "I accepted their offer and started this Monday."
            })
            .to_string(),
        ))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = authed(Request::builder())
        .uri("/api/admin/circumvention?status=OPEN")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let body = body_json(resp).await;
    let flag_id = body[0]["id"].as_str().unwrap().to_string();

    // Attach an estimated salary; the fee owed follows.
    let req = authed(Request::builder())
        .method("PATCH")
        .uri(format!("/api/admin/circumvention/{}", flag_id))
        .body(Body::from(json!({ "estimated_salary": "100000" }).to_string()))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["estimated_fee_owed"], "20000");

    // Invoice it.
    let req = authed(Request::builder())
        .method("POST")
        .uri(format!("/api/admin/circumvention/{}/send-invoice", flag_id))
        .body(Body::from(json!({}).to_string()))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "INVOICE_SENT");
    assert!(body["invoice_number"].as_str().unwrap().starts_with("CF-"));

    // Deleting anything but a false positive is refused.
    let req = authed(Request::builder())
        .method("DELETE")
        .uri(format!("/api/admin/circumvention/{}", flag_id))
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = authed(Request::builder())
        .method("PATCH")
        .uri(format!("/api/admin/circumvention/{}", flag_id))
        .body(Body::from(json!({ "status": "FALSE_POSITIVE" }).to_string()))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = authed(Request::builder())
        .method("DELETE")
        .uri(format!("/api/admin/circumvention/{}", flag_id))
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn settings_round_trip_bumps_the_version() {
    let app = build_app(CandidateReportedStatus::StillLooking);

    let req = authed(Request::builder())
        .uri("/api/admin/settings")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["version"], 1);
    assert_eq!(body["check_in_interval_days"], 30);

    let req = authed(Request::builder())
        .method("PUT")
        .uri("/api/admin/settings")
        .body(Body::from(
            json!({
                "default_fee_percentage": "22",
                "protection_months": 12,
                "check_in_interval_days": 45,
                "response_token_ttl_days": 7,
                "invoice_due_days": 30,
                "batch_size": 10,
                "batch_delay_ms": 250
            })
            .to_string(),
        ))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["check_in_interval_days"], 45);
    assert!(body["version"].as_i64().unwrap() > 1);
}
