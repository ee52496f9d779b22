//! HTTP API tests
//!
//! The full router runs against in-memory stores and scripted gateway/push
//! collaborators.

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use core_kernel::BookingRef;
use domain_notification::RecipientProfile;
use domain_payment::{sign_callback, GatewayError, IntentState, IntentStore, VerificationOutcome};
use interface_api::auth::{create_token, permissions};
use interface_api::{config::ApiConfig, create_router, AppState};
use test_utils::*;

fn server(payments: &PaymentHarness, notifications: &NotificationHarness) -> TestServer {
    let config = ApiConfig {
        callback_secret: SecretFixtures::CALLBACK_SECRET.to_string(),
        jwt_secret: SecretFixtures::JWT_SECRET.to_string(),
        ..ApiConfig::default()
    };
    let state = AppState::new(payments.orchestrator.clone(), notifications.service.clone(), config);
    TestServer::new(create_router(state)).unwrap()
}

async fn payment_server(payments: &PaymentHarness) -> TestServer {
    server(payments, &NotificationHarness::with_profiles(vec![]).await)
}

fn bearer(roles: &[&str]) -> HeaderValue {
    let roles = roles.iter().map(|r| r.to_string()).collect();
    let token = create_token("staff-1", roles, SecretFixtures::JWT_SECRET, 300).unwrap();
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn signed_callback(booking_ref: &str, result: &str) -> Value {
    json!({
        "bookingRef": booking_ref,
        "result": result,
        "signature": sign_callback(SecretFixtures::CALLBACK_SECRET, booking_ref, result).unwrap(),
    })
}

async fn stored(payments: &PaymentHarness, booking_ref: &str) -> domain_payment::PaymentIntent {
    payments
        .store
        .get(&BookingRef::parse(booking_ref).unwrap())
        .await
        .unwrap()
        .unwrap()
}

mod initiate {
    use super::*;

    #[tokio::test]
    async fn test_initiate_returns_gateway_session() {
        let payments = PaymentHarness::new();
        payments.gateway.push_initiate(Ok(GatewayFixtures::session("https://pay/x", None)));
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/initiate")
            .json(&json!({ "bookingId": "B1", "amount": 100, "email": "a@x.com" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body, json!({ "success": true, "paymentUrl": "https://pay/x", "customRef": "B1" }));
        assert_state(&stored(&payments, "B1").await, IntentState::GatewayPending);
    }

    #[tokio::test]
    async fn test_repeated_initiate_replays_single_session() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;
        let request = json!({ "bookingId": "B1", "amount": 100, "email": "a@x.com" });

        let first: Value = server.post("/api/payment/initiate").json(&request).await.json();
        let second: Value = server.post("/api/payment/initiate").json(&request).await.json();

        assert_eq!(first["paymentUrl"], second["paymentUrl"]);
        assert_eq!(payments.gateway.initiate_calls(), 1);
    }

    #[tokio::test]
    async fn test_amount_is_forwarded_in_minor_units() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        server
            .post("/api/payment/initiate")
            .json(&json!({ "bookingId": "B1", "amount": 125.5, "email": "a@x.com", "phone": "+96550000000" }))
            .await
            .assert_status_ok();

        let intent = stored(&payments, "B1").await;
        assert_money_eq(&intent.amount, &MoneyFixtures::usd_nightly());
        assert_eq!(intent.payer_phone.as_deref(), Some("+96550000000"));
    }

    #[tokio::test]
    async fn test_missing_email_is_rejected_without_gateway_call() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/initiate")
            .json(&json!({ "bookingId": "B1", "amount": 100 }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_body(&response.json::<Value>(), "invalid_request");
        assert_eq!(payments.gateway.initiate_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/initiate")
            .json(&json!({ "bookingId": "B1", "amount": 0, "email": "a@x.com" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(payments.gateway.initiate_calls(), 0);
    }

    #[tokio::test]
    async fn test_sub_cent_amount_is_rejected() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/initiate")
            .json(&json!({ "bookingId": "B1", "amount": 10.005, "email": "a@x.com" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_body(&response.json::<Value>(), "invalid_request");
    }

    #[tokio::test]
    async fn test_non_json_body_is_bad_request() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server.post("/api/payment/initiate").text("bookingId=B1").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_body(&response.json::<Value>(), "invalid_request");
    }

    #[tokio::test]
    async fn test_gateway_rejection_is_bad_gateway() {
        let payments = PaymentHarness::new();
        payments.gateway.push_initiate(Err(GatewayError::Rejected {
            status: 500,
            body: "boom".to_string(),
        }));
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/initiate")
            .json(&json!({ "bookingId": "B1", "amount": 100, "email": "a@x.com" }))
            .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert_error_body(&response.json::<Value>(), "gateway_rejected");
        let intent = stored(&payments, "B1").await;
        assert_state(&intent, IntentState::GatewayFailed);
        assert_eq!(intent.attempts, 1);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_gateway_timeout() {
        let payments = PaymentHarness::new();
        payments
            .gateway
            .push_initiate(Err(GatewayError::Unreachable("timed out after 10000ms".to_string())));
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/initiate")
            .json(&json!({ "bookingId": "B1", "amount": 100, "email": "a@x.com" }))
            .await;

        response.assert_status(StatusCode::GATEWAY_TIMEOUT);
        assert_error_body(&response.json::<Value>(), "gateway_unreachable");
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_conflict() {
        let payments = PaymentHarness::seeded(vec![PaymentIntentBuilder::new()
            .failed(5, "gateway unreachable")
            .build()])
        .await;
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/initiate")
            .json(&json!({ "bookingId": "B1", "amount": 100, "email": "a@x.com" }))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_error_body(&response.json::<Value>(), "retry_exhausted");
        assert_eq!(payments.gateway.initiate_calls(), 0);
    }
}

mod verify {
    use super::*;

    #[tokio::test]
    async fn test_verify_confirms_payment_once() {
        let payments = PaymentHarness::seeded(vec![PaymentIntentBuilder::new()
            .pending("https://pay/x")
            .build()])
        .await;
        let server = payment_server(&payments).await;

        let first = server
            .post("/api/payment/verify")
            .json(&json!({ "customRef": "B1" }))
            .await;
        let second: Value = server
            .post("/api/payment/verify")
            .json(&json!({ "customRef": "B1" }))
            .await
            .json();

        first.assert_status_ok();
        let first: Value = first.json();
        assert_eq!(first["success"], true);
        assert_eq!(first["verified"], true);
        assert_eq!(first["customRef"], "B1");
        assert_eq!(second["verified"], true);
        assert_eq!(payments.gateway.verify_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_receipt_is_unverified() {
        let payments = PaymentHarness::seeded(vec![PaymentIntentBuilder::new()
            .pending("https://pay/x")
            .build()])
        .await;
        payments
            .gateway
            .push_outcome(VerificationOutcome::Failed("declined".to_string()));
        let server = payment_server(&payments).await;

        let body: Value = server
            .post("/api/payment/verify")
            .json(&json!({ "customRef": "B1" }))
            .await
            .json();

        assert_eq!(body["verified"], false);
        assert_resolved_with(&stored(&payments, "B1").await, "declined");
    }

    #[tokio::test]
    async fn test_unknown_booking_is_not_found() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/verify")
            .json(&json!({ "customRef": "nope" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_error_body(&response.json::<Value>(), "unknown_booking");
        assert_eq!(payments.gateway.verify_calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_custom_ref_is_bad_request() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/payment/verify")
            .json(&json!({ "customRef": "" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

mod callback {
    use super::*;

    async fn pending_server() -> (PaymentHarness, TestServer) {
        let payments = PaymentHarness::seeded(vec![PaymentIntentBuilder::new()
            .pending("https://pay/x")
            .build()])
        .await;
        let server = payment_server(&payments).await;
        (payments, server)
    }

    #[tokio::test]
    async fn test_signed_callback_verifies_intent() {
        let (payments, server) = pending_server().await;

        let response = server
            .post("/api/payment/callback")
            .json(&signed_callback("B1", "success"))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["state"], "verified");
        assert_eq!(body["replayed"], false);
        assert_resolved_with(&stored(&payments, "B1").await, "success");
        assert_eq!(payments.gateway.verify_calls(), 0);
    }

    #[tokio::test]
    async fn test_replayed_callback_is_acknowledged() {
        let (_payments, server) = pending_server().await;

        server
            .post("/api/payment/callback")
            .json(&signed_callback("B1", "success"))
            .await
            .assert_status_ok();
        let replay: Value = server
            .post("/api/payment/callback")
            .json(&signed_callback("B1", "success"))
            .await
            .json();

        assert_eq!(replay["replayed"], true);
    }

    #[tokio::test]
    async fn test_bad_signature_is_unauthorized() {
        let (payments, server) = pending_server().await;

        let response = server
            .post("/api/payment/callback")
            .json(&json!({ "bookingRef": "B1", "result": "success", "signature": "00ff" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_error_body(&response.json::<Value>(), "unauthenticated_callback");
        assert_state(&stored(&payments, "B1").await, IntentState::GatewayPending);
    }

    #[tokio::test]
    async fn test_conflicting_callback_is_rejected_without_state_change() {
        let (payments, server) = pending_server().await;
        server
            .post("/api/payment/callback")
            .json(&signed_callback("B1", "success"))
            .await
            .assert_status_ok();

        let response = server
            .post("/api/payment/callback")
            .json(&signed_callback("B1", "failed"))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_error_body(&response.json::<Value>(), "callback_conflict");
        let intent = stored(&payments, "B1").await;
        assert_resolved_with(&intent, "success");
        assert!(intent.needs_review);
    }

    #[tokio::test]
    async fn test_callback_for_unknown_booking_is_not_found() {
        let (_payments, server) = pending_server().await;

        let response = server
            .post("/api/payment/callback")
            .json(&signed_callback("B9", "success"))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }
}

mod staff {
    use super::*;

    #[tokio::test]
    async fn test_staff_routes_require_token() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server.get("/api/v1/payments/intents").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_error_body(&response.json::<Value>(), "unauthorized");
    }

    #[tokio::test]
    async fn test_list_intents_newest_first() {
        let payments = PaymentHarness::seeded(vec![
            PaymentIntentBuilder::new()
                .created_at(Utc::now() - Duration::hours(2))
                .build(),
            PaymentIntentBuilder::new()
                .booking(BookingFixtures::secondary())
                .created_at(Utc::now() - Duration::hours(1))
                .build(),
        ])
        .await;
        let server = payment_server(&payments).await;

        let response = server
            .get("/api/v1/payments/intents")
            .add_query_param("limit", 10)
            .add_header(header::AUTHORIZATION, bearer(&[permissions::PAYMENTS_READ]))
            .await;

        response.assert_status_ok();
        let body: Vec<Value> = response.json();
        let refs: Vec<&str> = body.iter().filter_map(|i| i["bookingRef"].as_str()).collect();
        assert_eq!(refs, vec!["B2", "B1"]);
        assert_eq!(body[0]["amount"], "100");
        assert_eq!(body[0]["currency"], "USD");
    }

    #[tokio::test]
    async fn test_get_intent_by_booking() {
        let payments = PaymentHarness::seeded(vec![PaymentIntentBuilder::new()
            .pending("https://pay/x")
            .build()])
        .await;
        let server = payment_server(&payments).await;

        let body: Value = server
            .get("/api/v1/payments/intents/B1")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::PAYMENTS_READ]))
            .await
            .json();

        assert_eq!(body["state"], "gateway_pending");
        assert_eq!(body["paymentUrl"], "https://pay/x");
    }

    #[tokio::test]
    async fn test_get_unknown_intent_is_not_found() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server
            .get("/api/v1/payments/intents/B404")
            .add_header(header::AUTHORIZATION, bearer(&["admin"]))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sweep_requires_sweep_permission() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/v1/payments/sweep")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::PAYMENTS_READ]))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_error_body(&response.json::<Value>(), "forbidden");
    }

    #[tokio::test]
    async fn test_sweep_expires_abandoned_intents() {
        let payments = PaymentHarness::seeded(vec![PaymentIntentBuilder::new()
            .pending("https://pay/x")
            .created_at(Utc::now() - Duration::hours(48))
            .build()])
        .await;
        let server = payment_server(&payments).await;

        let response = server
            .post("/api/v1/payments/sweep")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::PAYMENTS_SWEEP]))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["expired"], json!(["B1"]));
        assert_state(&stored(&payments, "B1").await, IntentState::Expired);
    }
}

mod notifications {
    use super::*;

    fn profiles() -> Vec<RecipientProfile> {
        vec![
            RecipientProfile::new("host-1", Some("device-token-1".to_string()), true),
            RecipientProfile::new("guest-1", Some("device-token-2".to_string()), false),
            RecipientProfile::new("guest-2", None, true),
        ]
    }

    async fn send(server: &TestServer, body: Value) -> axum_test::TestResponse {
        server
            .post("/api/v1/notifications/send")
            .add_header(header::AUTHORIZATION, bearer(&[permissions::NOTIFICATIONS_SEND]))
            .json(&body)
            .await
    }

    #[tokio::test]
    async fn test_send_delivers_push() {
        let notifications = NotificationHarness::with_profiles(profiles()).await;
        let server = server(&PaymentHarness::new(), &notifications);

        let response = send(
            &server,
            json!({
                "type": "booking",
                "recipientId": "host-1",
                "title": "New booking",
                "body": "B1 was booked",
                "data": { "bookingId": "B1", "nights": 3 }
            }),
        )
        .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["messageId"], "projects/test/messages/1");
        assert_eq!(body["type"], "booking");

        let sent = notifications.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token, "device-token-1");
        assert_eq!(sent[0].data["nights"], "3");
        assert_eq!(sent[0].data["type"], "booking");
    }

    #[tokio::test]
    async fn test_disabled_recipient_is_not_sent() {
        let notifications = NotificationHarness::with_profiles(profiles()).await;
        let server = server(&PaymentHarness::new(), &notifications);

        let body: Value = send(
            &server,
            json!({ "type": "message", "recipientId": "guest-1", "title": "Hi", "body": "Hello" }),
        )
        .await
        .json();

        assert_eq!(body["success"], false);
        assert!(notifications.sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_are_listed() {
        let notifications = NotificationHarness::with_profiles(profiles()).await;
        let server = server(&PaymentHarness::new(), &notifications);

        let response = send(&server, json!({ "type": "message", "title": "Hi" })).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("recipientId"));
        assert!(message.contains("body"));
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_not_found() {
        let notifications = NotificationHarness::with_profiles(profiles()).await;
        let server = server(&PaymentHarness::new(), &notifications);

        let response = send(
            &server,
            json!({ "type": "message", "recipientId": "ghost", "title": "Hi", "body": "Hello" }),
        )
        .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_push_token_is_bad_request() {
        let notifications = NotificationHarness::with_profiles(profiles()).await;
        let server = server(&PaymentHarness::new(), &notifications);

        let response = send(
            &server,
            json!({ "type": "message", "recipientId": "guest-2", "title": "Hi", "body": "Hello" }),
        )
        .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_error_body(&response.json::<Value>(), "missing_push_token");
    }

    #[tokio::test]
    async fn test_delivery_failure_is_bad_gateway() {
        let notifications = NotificationHarness::failing(profiles(), "token unregistered").await;
        let server = server(&PaymentHarness::new(), &notifications);

        let response = send(
            &server,
            json!({ "type": "message", "recipientId": "host-1", "title": "Hi", "body": "Hello" }),
        )
        .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoints() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        server.get("/health").await.assert_status_ok();

        let ready: Value = server.get("/health/ready").await.json();
        assert_eq!(ready["status"], "ready");
        assert_eq!(ready["checks"][0]["adapter_id"], "memory-intent-store");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let payments = PaymentHarness::new();
        let server = payment_server(&payments).await;

        let response = server.get("/health").await;

        assert!(response.headers().contains_key("x-request-id"));
    }
}
