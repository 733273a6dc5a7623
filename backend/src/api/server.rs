use axum::{routing::get, Router};
use sqlx::sqlite::SqliteConnectOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::{admin, token, users};
use crate::config::Config;
use crate::engine::token::TokenSource;
use crate::error::AppError;

pub const BANNER: &str = "User Management Service";

pub struct AppState {
    /// Where each request opens its own connection. No pool.
    pub db: SqliteConnectOptions,
    pub tokens: TokenSource,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            db: config.db_options(),
            tokens: TokenSource::new(config.token_seed),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/user", get(users::get_user))
        .route("/token", get(token::generate_token))
        .route("/admin/calc", get(admin::calculate))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> &'static str {
    BANNER
}

pub async fn start_server(config: &Config) -> Result<(), AppError> {
    let state = Arc::new(AppState::new(config));
    let app = router(state);

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(
        addr = %config.bind,
        database = %config.database.display(),
        "server running"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::db::repo;

    async fn test_app(seed: u64) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = SqliteConnectOptions::new().filename(dir.path().join("users.db"));
        repo::init_database(&db).await.unwrap();

        let state = Arc::new(AppState {
            db,
            tokens: TokenSource::new(Some(seed)),
        });
        (router(state), dir)
    }

    async fn send(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = send(app, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_home_banner() {
        let (app, _dir) = test_app(1).await;
        let (status, body) = send(&app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, BANNER.as_bytes());
    }

    #[tokio::test]
    async fn test_get_existing_user() {
        let (app, _dir) = test_app(1).await;
        let (status, body) = send_json(&app, "/user?id=3").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "id": 3, "username": "bob" }));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let (app, _dir) = test_app(1).await;
        let (status, body) = send_json(&app, "/user?id=999").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "User not found" }));
    }

    #[tokio::test]
    async fn test_get_user_without_id() {
        let (app, _dir) = test_app(1).await;
        let (status, _) = send_json(&app, "/user").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_user_lookup_is_injectable() {
        let (app, _dir) = test_app(1).await;
        // id=' OR '1'='1
        let (status, body) = send_json(&app, "/user?id=%27%20OR%20%271%27%3D%271").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].is_i64());
        assert!(body["username"].is_string());
    }

    #[tokio::test]
    async fn test_injected_union_leaks_arbitrary_data() {
        let (app, _dir) = test_app(1).await;
        // id=' UNION SELECT 99, sqlite_version() --
        let uri = "/user?id=%27%20UNION%20SELECT%2099%2C%20sqlite_version()%20--";
        let (status, body) = send_json(&app, uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], json!(99));
    }

    #[tokio::test]
    async fn test_malformed_lookup_is_server_error() {
        let (app, _dir) = test_app(1).await;
        let (status, _) = send(&app, "/user?id=%27").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_missing_database_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState {
            db: SqliteConnectOptions::new().filename(dir.path().join("absent.db")),
            tokens: TokenSource::new(None),
        });
        let app = router(state);

        let (status, _) = send(&app, "/user?id=1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_token_is_unit_interval_float() {
        let (app, _dir) = test_app(1).await;
        let (status, body) = send_json(&app, "/token").await;

        assert_eq!(status, StatusCode::OK);
        let value: f64 = body["token"].as_str().unwrap().parse().unwrap();
        assert!((0.0..1.0).contains(&value));
    }

    #[tokio::test]
    async fn test_seeded_tokens_are_predictable() {
        let (first, _a) = test_app(2024).await;
        let (second, _b) = test_app(2024).await;

        for _ in 0..3 {
            let (_, a) = send_json(&first, "/token").await;
            let (_, b) = send_json(&second, "/token").await;
            assert_eq!(a, b);
        }
    }

    #[tokio::test]
    async fn test_calc_arithmetic() {
        let (app, _dir) = test_app(1).await;
        let (status, body) = send_json(&app, "/admin/calc?expr=2%2B2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": 4 }));
    }

    #[tokio::test]
    async fn test_calc_accepts_any_script() {
        let (app, _dir) = test_app(1).await;
        // fn f(n) { if n < 2 { n } else { f(n - 1) + f(n - 2) } } f(6)
        let uri = "/admin/calc?expr=fn%20f(n)%20%7B%20if%20n%20%3C%202%20%7B%20n%20%7D%20else%20%7B%20f(n%20-%201)%20%2B%20f(n%20-%202)%20%7D%20%7D%20f(6)";
        let (status, body) = send_json(&app, uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": 8 }));
    }

    #[tokio::test]
    async fn test_calc_reaches_host_environment() {
        let (app, _dir) = test_app(1).await;
        let (status, body) = send_json(&app, "/admin/calc?expr=env(%22CARGO_PKG_NAME%22)").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": env!("CARGO_PKG_NAME") }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_other_routes_answer_during_long_evaluation() {
        let (app, _dir) = test_app(1).await;

        // let n = 0; while n < 300000 { n += 1; } n
        let slow = tokio::spawn({
            let app = app.clone();
            async move {
                send_json(
                    &app,
                    "/admin/calc?expr=let%20n%20%3D%200%3B%20while%20n%20%3C%20300000%20%7B%20n%20%2B%3D%201%3B%20%7D%20n",
                )
                .await
            }
        });
        tokio::task::yield_now().await;

        let (status, body) = tokio::time::timeout(Duration::from_secs(5), send(&app, "/"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, BANNER.as_bytes());

        let (status, body) = slow.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": 300000 }));
    }

    #[tokio::test]
    async fn test_calc_deep_nesting_is_server_error() {
        let (app, _dir) = test_app(1).await;
        let uri = format!(
            "/admin/calc?expr={}1{}",
            "(".repeat(10_000),
            ")".repeat(10_000)
        );
        let (status, _) = send(&app, &uri).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_calc_bad_expression_is_server_error() {
        let (app, _dir) = test_app(1).await;
        let (status, _) = send(&app, "/admin/calc?expr=2%20%2B").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_calc_without_expr_is_server_error() {
        let (app, _dir) = test_app(1).await;
        let (status, _) = send(&app, "/admin/calc").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (app, _dir) = test_app(1).await;
        let (status, _) = send(&app, "/admin").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
