//! HTTP route handlers for Formgate.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod health;
mod verify;
mod widget;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/metrics", get(health::metrics))

        // Verification endpoints (for form-submission handlers)
        .route("/verify", post(verify::verify_form))
        .route("/verify/action", post(verify::verify_action))

        // Front-end widget settings
        .route("/widget", get(widget::widget_settings))

        .layer(TraceLayer::new_for_http())

        // Add shared state
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, FormSettings, StoreBackend};
    use crate::gate::SiteVerifyClient;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> AppConfig {
        let mut config = AppConfig {
            store: StoreBackend::Memory,
            ..Default::default()
        };
        config.recaptcha.site_key = "site-key".to_string();
        config.recaptcha.secret_key = "secret-key".to_string();
        config.recaptcha.endpoint = format!("{}/siteverify", server.uri());
        config.forms.insert(
            "user_login_form".to_string(),
            FormSettings {
                action: Some("login".to_string()),
                score: Some(0.5),
            },
        );
        config
    }

    fn app_for(config: AppConfig) -> Router {
        let verifier = SiteVerifyClient::new(config.recaptcha.site_verify_config()).unwrap();
        let state =
            AppState::from_parts(config, Arc::new(MemoryStore::new()), Arc::new(verifier)).unwrap();
        create_router(state)
    }

    async fn mount_siteverify(server: &MockServer, body: Value) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.5, 10.0.0.2")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_verify_accepts_then_rejects_replay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("remoteip=203.0.113.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "action": "login",
                "score": 0.9,
                "hostname": "example.com",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let app = app_for(test_config(&server));
        let request = json!({ "token": "tok-1", "form_id": "user_login_form" });

        let (status, body) = post_json(&app, "/verify", request.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], json!(true));
        assert_eq!(body["result"]["remote_ip"], json!("203.0.113.5"));
        assert_eq!(body["result"]["raw"]["hostname"], json!("example.com"));

        let (_, body) = post_json(&app, "/verify", request).await;
        assert_eq!(body["accepted"], json!(false));
        assert!(body.get("result").is_none());

        let (_, metrics) = get_json(&app, "/metrics").await;
        assert_eq!(metrics["accepted"], json!(1));
        assert_eq!(metrics["rejected_replay"], json!(1));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_action() {
        let server = MockServer::start().await;
        mount_siteverify(&server, json!({ "success": true, "action": "login", "score": 0.9 }))
            .await;

        let app = app_for(test_config(&server));
        let (_, body) = post_json(
            &app,
            "/verify",
            json!({ "token": "tok-2", "form_id": "user_register_form" }),
        )
        .await;

        assert_eq!(body["accepted"], json!(false));
        // The remote was reached, so its answer is reported
        assert_eq!(body["result"]["action"], json!("login"));
    }

    #[tokio::test]
    async fn test_verify_rejects_missing_token_without_remote_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(0)
            .mount(&server)
            .await;

        let app = app_for(test_config(&server));
        let (status, body) = post_json(&app, "/verify", json!({ "form_id": "user_login_form" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], json!(false));
    }

    #[tokio::test]
    async fn test_verify_action_uses_threshold() {
        let server = MockServer::start().await;
        mount_siteverify(&server, json!({ "success": true, "action": "shop/checkout", "score": 0.6 }))
            .await;

        let app = app_for(test_config(&server));

        let (_, strict) = post_json(
            &app,
            "/verify/action",
            json!({ "token": "tok-a", "action": "shop/checkout", "min_score": 0.8 }),
        )
        .await;
        assert_eq!(strict["accepted"], json!(false));

        let (_, lenient) = post_json(
            &app,
            "/verify/action",
            json!({ "token": "tok-b", "action": "shop/checkout" }),
        )
        .await;
        assert_eq!(lenient["accepted"], json!(true));
    }

    #[tokio::test]
    async fn test_remote_outage_fails_closed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let app = app_for(test_config(&server));
        let (_, body) = post_json(
            &app,
            "/verify",
            json!({ "token": "tok-3", "form_id": "user_login_form" }),
        )
        .await;

        assert_eq!(body["accepted"], json!(false));
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn test_widget_hides_secret() {
        let server = MockServer::start().await;
        let mut config = test_config(&server);
        config.recaptcha.hide_badge = true;

        let app = app_for(config);
        let (status, body) = get_json(&app, "/widget").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["site_key"], json!("site-key"));
        assert_eq!(body["hide_badge"], json!(true));
        assert!(body["branding"].as_str().unwrap().contains("reCAPTCHA"));
        assert!(!body.to_string().contains("secret-key"));
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let server = MockServer::start().await;
        let app = app_for(test_config(&server));

        let (status, health) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], json!("ok"));

        let (status, ready) = get_json(&app, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ready["store"], json!("memory"));
    }
}
