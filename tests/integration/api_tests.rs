// tests/integration/api_tests.rs
use actix_web::{body::MessageBody, http::StatusCode, test, web, App};
use futures::future::poll_fn;
use std::sync::Arc;
use std::time::Duration;

use facewatch::{
    api::{rest::configure, ApiState},
    core::detection::{BoundingBox, Detection},
};

use crate::common::{png, test_config, ScriptedDetector, TestContext};

fn state() -> web::Data<ApiState> {
    let detector = ScriptedDetector::always(vec![Detection::new(
        BoundingBox::new(10.0, 10.0, 50.0, 50.0),
        vec![0.0, 1.0, 0.0, 0.0],
    )]);
    let ctx = TestContext::new(test_config(), Arc::new(detector));
    let manager = Arc::new(ctx.manager);
    web::Data::new(ApiState::new(ctx.services, manager, ctx.relay, ctx.pubsub))
}

#[actix_rt::test]
async fn test_enroll_and_report_activity_over_http() {
    let state = state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/profiles/enroll?id=p7&name=Grace&phone=555-0100")
        .set_payload(png(64, 64))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/health").to_request();
    let health: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(health["references"], 1);

    let req = test::TestRequest::get()
        .uri("/profiles/p7/activity?limit=5&days=1")
        .to_request();
    let report: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
    assert!(report.is_empty());

    let req = test::TestRequest::get().uri("/profiles").to_request();
    let profiles: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["phone"], "555-0100");

    state.manager.shutdown_all().await;
}

#[actix_rt::test]
async fn test_unknown_routes_and_profiles() {
    let state = state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

    let req = test::TestRequest::get().uri("/profiles/nobody/thumbnail").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::put()
        .uri("/cameras/cam-1/locations")
        .set_json(serde_json::json!({ "locations": [] }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_high_threat_sighting_reaches_alert_feed() {
    let state = state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

    let req = test::TestRequest::post()
        .uri("/profiles/enroll?id=p9&name=Mallory&threat=high")
        .set_payload(png(64, 64))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::get().uri("/alerts").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let mut body = Box::pin(resp.into_body());

    let req = test::TestRequest::post()
        .uri("/streams/cam-4/frame")
        .set_payload(png(64, 64))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::ACCEPTED);

    let chunk = tokio::time::timeout(
        Duration::from_secs(5),
        poll_fn(|cx| body.as_mut().poll_next(cx)),
    )
    .await
    .expect("no alert within 5s");
    let chunk = match chunk {
        Some(Ok(bytes)) => String::from_utf8(bytes.to_vec()).unwrap(),
        _ => panic!("alert feed closed"),
    };

    assert!(chunk.starts_with("data: "));
    assert!(chunk.contains("High Security Alert: Mallory spotted at cam-4"));

    state.manager.shutdown_all().await;
}
