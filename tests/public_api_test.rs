mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use common::{body_json, build_app, introduced_intro, sent_check_in};
use hirehub_backend::models::circumvention_flag::FlagStatus;
use hirehub_backend::models::introduction::IntroductionStatus;
use hirehub_backend::models::parsed_response::CandidateReportedStatus;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn respond_context_includes_names_and_state() {
    let app = build_app(CandidateReportedStatus::StillLooking);
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

    let req = Request::builder()
        .uri(format!("/api/check-ins/respond/{}", check_in.response_token))
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["employer_name"], "Acme Robotics");
    assert_eq!(body["check_in_number"], 1);
    assert_eq!(body["already_responded"], false);
    assert_eq!(body["expired"], false);
}

#[tokio::test]
async fn unknown_token_is_a_distinct_not_found() {
    let app = build_app(CandidateReportedStatus::StillLooking);

    let req = Request::builder()
        .uri("/api/check-ins/respond/no-such-token")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "invalid_link");
}

#[tokio::test]
async fn structured_response_records_once_and_conflicts_after() {
    let app = build_app(CandidateReportedStatus::StillLooking);
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

    let submit = |status: &str| {
        Request::builder()
            .method("POST")
            .uri(format!("/api/check-ins/respond/{}", check_in.response_token))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "status": status }).to_string()))
            .unwrap()
    };

    let resp = app.router.clone().oneshot(submit("rejected")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["risk_level"], "CLEAR");
    assert_eq!(body["flag_opened"], false);

    let resp = app.router.clone().oneshot(submit("hired_there")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "already_responded");

    let stored = app
        .stores
        .check_ins
        .get(check_in.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.response_parsed.unwrap().status,
        CandidateReportedStatus::Rejected
    );
}

#[tokio::test]
async fn hired_there_response_opens_a_flag() {
    let app = build_app(CandidateReportedStatus::StillLooking);
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

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/check-ins/respond/{}", check_in.response_token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "status": "hired_there",
                "start_date": "2026-09-01",
                "role_title": "Staff Engineer"
            })
            .to_string(),
        ))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["risk_level"], "HIGH");
    assert_eq!(body["flag_opened"], true);

    let flags = app.stores.flags.list(Some(FlagStatus::Open)).await.unwrap();
    assert_eq!(flags.len(), 1);

    let intro = app
        .stores
        .introductions
        .get(intro.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intro.status, IntroductionStatus::Hired);

    // Admin alert email went out.
    assert_eq!(app.mailer.sent_count(), 1);
}

#[tokio::test]
async fn expired_link_is_rejected_with_its_own_code() {
    let app = build_app(CandidateReportedStatus::StillLooking);
    let intro = app
        .stores
        .introductions
        .create(introduced_intro(31))
        .await
        .unwrap();
    let mut check_in = sent_check_in(intro.id, 1);
    check_in.response_token_expiry = Utc::now() - Duration::hours(1);
    let check_in = app.stores.check_ins.create(check_in).await.unwrap();

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/check-ins/respond/{}", check_in.response_token))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "status": "rejected" }).to_string()))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "link_expired");
}
