//! Router tests: in-memory SQLite, stub classifier, requests via `oneshot`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use ndarray::ArrayView1;
use nids_engine::{
    Classifier, ConfigurationError, Detector, LabelEncoder, RawPrediction, StandardScaler,
    FEATURE_COUNT, FEATURE_LAYOUT,
};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tower::ServiceExt;

use crate::config::Config;
use crate::models::{CreateUser, Prediction, User, UserRole};
use crate::{create_router, db, AppState};

const REFERENCE_VALUES: [&str; FEATURE_COUNT] =
    ["1000", "10", "5", "200.5", "15.2", "64.0", "128.0", "50.1", "60.3", "1"];

/// Always answers PortScan with 97% and counts its calls
struct StubClassifier {
    calls: Arc<AtomicUsize>,
}

impl Classifier for StubClassifier {
    fn kind(&self) -> &'static str {
        "stub"
    }

    fn n_features(&self) -> usize {
        FEATURE_COUNT
    }

    fn n_classes(&self) -> usize {
        3
    }

    fn has_probability(&self) -> bool {
        true
    }

    fn predict(&self, _x: ArrayView1<'_, f64>) -> Result<RawPrediction, ConfigurationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RawPrediction {
            class_index: 2,
            probabilities: Some(vec![0.01, 0.02, 0.97]),
        })
    }
}

struct TestApp {
    state: AppState,
    router: Router,
    calls: Arc<AtomicUsize>,
}

async fn setup_with(config: Config) -> TestApp {
    let calls = Arc::new(AtomicUsize::new(0));
    let detector = Detector::new(
        StandardScaler::new(vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]).unwrap(),
        Box::new(StubClassifier { calls: calls.clone() }),
        LabelEncoder::new(["BENIGN", "DDoS", "PortScan"]).unwrap(),
    )
    .unwrap();

    let pool = db::create_pool(&config).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    db::ensure_admin(&pool, &config).await.unwrap();

    let state = AppState::new(pool, config, detector).await.unwrap();
    TestApp {
        router: create_router(state.clone()),
        state,
        calls,
    }
}

async fn setup() -> TestApp {
    setup_with(Config::for_tests()).await
}

async fn setup_with_admin() -> TestApp {
    let mut config = Config::for_tests();
    config.admin_password = Some("admin-pass".to_string());
    setup_with(config).await
}

fn reference_form() -> Vec<(&'static str, &'static str)> {
    FEATURE_LAYOUT.iter().copied().zip(REFERENCE_VALUES).collect()
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, pairs: &[(&str, &str)], cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let body = serde_urlencoded::to_string(pairs).unwrap();
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn register(&self, username: &str, password: &str) -> Response {
        let email = format!("{}@example.com", username);
        self.post_form(
            "/register",
            &[
                ("username", username),
                ("email", email.as_str()),
                ("password", password),
                ("confirm_password", password),
                ("fav_car", "Toyota"),
            ],
            None,
        )
        .await
    }

    /// Log in and return the `Cookie` header value
    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form("/login", &[("username", username), ("password", password)], None)
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login failed for {username}");
        session_cookie(&response)
    }

    async fn signed_in_user(&self, username: &str) -> String {
        let response = self.register(username, "secret123").await;
        assert_eq!(location(&response), "/login?notice=registered");
        self.login(username, "secret123").await
    }

    async fn prediction_rows(&self, username: &str) -> i64 {
        Prediction::count_for_user(&self.state.pool, username).await.unwrap()
    }

    fn classifier_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn session_cookie(response: &Response) -> String {
    response.headers()[SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

fn location(response: &Response) -> &str {
    response.headers()[LOCATION].to_str().unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

// ============================================================================
// PUBLIC ROUTES
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "stub");
    assert_eq!(body["classes"], 3);
}

#[tokio::test]
async fn test_static_pages() {
    let app = setup().await;
    for uri in ["/", "/home", "/about", "/login", "/register", "/forgot_password"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        assert!(body_text(response).await.contains("NIDS AI"), "{uri}");
    }
}

#[tokio::test]
async fn test_unknown_route_renders_404() {
    let app = setup().await;
    let response = app.get("/no/such/page", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("404"));
}

// ============================================================================
// INFERENCE
// ============================================================================

#[tokio::test]
async fn test_dashboard_requires_login() {
    let app = setup().await;

    let response = app.get("/dashboard", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?notice=login_required");

    let response = app.post_form("/dashboard", &reference_form(), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
        .fetch_one(&app.state.pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
    assert_eq!(app.classifier_calls(), 0);
}

#[tokio::test]
async fn test_port_scan_prediction_recorded_once() {
    let app = setup().await;
    let cookie = app.signed_in_user("alice").await;

    let response = app.post_form("/dashboard", &reference_form(), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_text(response).await;
    assert!(page.contains("PortScan"));
    assert!(page.contains("97.0%"));

    assert_eq!(app.prediction_rows("alice").await, 1);
    assert_eq!(app.classifier_calls(), 1);

    let recent = Prediction::recent_for_user(&app.state.pool, "alice", 10).await.unwrap();
    assert_eq!(recent[0].prediction, "PortScan");
    assert_eq!(recent[0].username, "alice");
}

#[tokio::test]
async fn test_missing_feature_is_rejected_before_classification() {
    let app = setup().await;
    let cookie = app.signed_in_user("alice").await;

    let form: Vec<_> = reference_form()
        .into_iter()
        .filter(|(name, _)| *name != "SYN Flag Count")
        .collect();
    let response = app.post_form("/dashboard", &form, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("SYN Flag Count"));
    assert_eq!(app.prediction_rows("alice").await, 0);
    assert_eq!(app.classifier_calls(), 0);
}

#[tokio::test]
async fn test_non_numeric_feature_is_rejected() {
    let app = setup().await;
    let cookie = app.signed_in_user("alice").await;

    let mut form = reference_form();
    form[3] = ("Flow Bytes/s", "fast");
    let response = app.post_form("/dashboard", &form, Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Flow Bytes/s"));
    assert_eq!(app.classifier_calls(), 0);
}

#[tokio::test]
async fn test_record_failure_still_shows_prediction() {
    let app = setup().await;
    let cookie = app.signed_in_user("alice").await;

    sqlx::raw_sql("DROP TABLE predictions")
        .execute(&app.state.pool)
        .await
        .unwrap();

    let response = app.post_form("/dashboard", &reference_form(), Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("PortScan"));
    assert!(page.contains("could not be saved"));

    assert_eq!(app.state.activity.tally()["PortScan"], 1);
}

#[tokio::test]
async fn test_server_error_uses_site_layout() {
    let app = setup().await;
    let cookie = app.signed_in_user("alice").await;

    sqlx::raw_sql("DROP TABLE predictions")
        .execute(&app.state.pool)
        .await
        .unwrap();

    let response = app.get("/profile", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let page = body_text(response).await;
    assert!(page.contains("<title>Internal Server Error - NIDS AI</title>"));
    assert!(page.contains("Database error occurred"));
    assert!(page.contains("<a href=\"/logout\">Logout</a>"));
    assert!(!page.contains("no such table"));
}

#[tokio::test]
async fn test_stats_reflect_activity() {
    let app = setup().await;
    let cookie = app.signed_in_user("alice").await;
    app.post_form("/dashboard", &reference_form(), Some(&cookie)).await;

    let stats = body_json(app.get("/api/stats", None).await).await;
    assert_eq!(
        stats,
        json!({
            "total_users": 1,
            "total_predictions": 1,
            "prediction_types": { "PortScan": 1 },
            "active_sessions": 1,
        })
    );
}

#[tokio::test]
async fn test_profile_lists_history() {
    let app = setup().await;
    let cookie = app.signed_in_user("alice").await;
    for _ in 0..2 {
        app.post_form("/dashboard", &reference_form(), Some(&cookie)).await;
    }

    let response = app.get("/profile", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("Prediction history (2)"));
    assert!(page.contains("alice@example.com"));
}

// ============================================================================
// ACCOUNTS
// ============================================================================

#[tokio::test]
async fn test_register_validation() {
    let app = setup().await;

    let response = app
        .post_form(
            "/register",
            &[
                ("username", "alice"),
                ("email", "alice@example.com"),
                ("password", "secret123"),
                ("confirm_password", "secret124"),
                ("fav_car", "Toyota"),
            ],
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("Passwords do not match!"));

    let response = app.post_form("/register", &[("username", "alice")], None).await;
    assert!(body_text(response).await.contains("All fields are required!"));

    app.register("alice", "secret123").await;
    let response = app.register("ALICE", "secret123").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_text(response).await.contains("Username already exists!"));

    assert_eq!(User::count(&app.state.pool).await.unwrap(), 1);
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let app = setup().await;
    app.register("alice", "secret123").await;

    let response = app
        .post_form("/login", &[("username", "alice"), ("password", "nope")], None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Invalid username or password!"));
}

#[tokio::test]
async fn test_login_updates_last_login() {
    let app = setup().await;
    app.signed_in_user("alice").await;

    let user = User::find_by_username(&app.state.pool, "alice").await.unwrap().unwrap();
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let app = setup().await;
    let cookie = app.signed_in_user("alice").await;
    assert_eq!(app.get("/dashboard", Some(&cookie)).await.status(), StatusCode::OK);

    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(location(&response), "/?notice=logged_out");

    let response = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.state.sessions.active_count(), 0);
}

#[tokio::test]
async fn test_legacy_hash_upgraded_on_login() {
    let app = setup().await;
    let legacy = format!("{:x}", Sha256::digest(b"oldpass1"));
    User::create(
        &app.state.pool,
        CreateUser {
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password_hash: legacy,
            security_answer: "unused".to_string(),
            role: UserRole::User,
        },
    )
    .await
    .unwrap();

    app.login("carol", "oldpass1").await;

    let user = User::find_by_username(&app.state.pool, "carol").await.unwrap().unwrap();
    assert!(user.password_hash.starts_with("$argon2"));
    app.login("carol", "oldpass1").await;
}

// ============================================================================
// ADMIN
// ============================================================================

#[tokio::test]
async fn test_admin_lands_on_console() {
    let app = setup_with_admin().await;
    let response = app
        .post_form("/login", &[("username", "admin"), ("password", "admin-pass")], None)
        .await;
    assert_eq!(location(&response), "/admin");

    let cookie = session_cookie(&response);
    let page = body_text(app.get("/admin", Some(&cookie)).await).await;
    assert!(page.contains("User management"));
}

#[tokio::test]
async fn test_admin_console_forbidden_for_users() {
    let app = setup_with_admin().await;
    let cookie = app.signed_in_user("alice").await;

    let response = app.get("/admin", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?notice=admin_only");
}

#[tokio::test]
async fn test_admin_delete_rules() {
    let app = setup_with_admin().await;
    let bob_cookie = app.signed_in_user("bob").await;
    let admin_cookie = app.login("admin", "admin-pass").await;

    let admin = User::find_by_username(&app.state.pool, "admin").await.unwrap().unwrap();
    let bob = User::find_by_username(&app.state.pool, "bob").await.unwrap().unwrap();

    let response = app
        .post_form(&format!("/admin/delete/{}", admin.id), &[], Some(&admin_cookie))
        .await;
    assert_eq!(location(&response), "/admin?notice=admin_protected");

    let response = app.post_form("/admin/delete/9999", &[], Some(&admin_cookie)).await;
    assert_eq!(location(&response), "/admin?notice=user_not_found");

    let response = app
        .post_form(&format!("/admin/delete/{}", bob.id), &[], Some(&admin_cookie))
        .await;
    assert_eq!(location(&response), "/admin?notice=user_deleted");

    assert!(User::find_by_username(&app.state.pool, "bob").await.unwrap().is_none());
    assert!(User::find_by_id(&app.state.pool, admin.id).await.unwrap().is_some());

    // Bob's live session went with the account
    let response = app.get("/dashboard", Some(&bob_cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stats = body_json(app.get("/api/stats", None).await).await;
    assert_eq!(stats["total_users"], 1);
}

// ============================================================================
// PASSWORD RESET
// ============================================================================

#[tokio::test]
async fn test_password_reset_flow() {
    let app = setup().await;
    app.register("alice", "secret123").await;

    let response = app
        .post_form(
            "/forgot_password",
            &[("email", "alice@example.com"), ("fav_car", "Mazda")],
            None,
        )
        .await;
    assert!(body_text(response).await.contains("Security answer incorrect!"));

    let response = app
        .post_form(
            "/forgot_password",
            &[("email", "alice@example.com"), ("fav_car", "  toyota ")],
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let token = location(&response)
        .strip_prefix("/reset_password?token=")
        .unwrap()
        .to_string();

    let page = app.get(&format!("/reset_password?token={}", token), None).await;
    assert_eq!(page.status(), StatusCode::OK);

    let response = app
        .post_form(
            "/reset_password",
            &[("token", token.as_str()), ("new_password", "abc"), ("confirm_password", "abc")],
            None,
        )
        .await;
    assert!(body_text(response).await.contains("at least 6 characters"));

    let response = app
        .post_form(
            "/reset_password",
            &[("token", token.as_str()), ("new_password", "newpass1"), ("confirm_password", "newpass1")],
            None,
        )
        .await;
    assert_eq!(location(&response), "/login?notice=password_reset");

    app.login("alice", "newpass1").await;
    let response = app
        .post_form("/login", &[("username", "alice"), ("password", "secret123")], None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The token died with the old password
    let response = app.get(&format!("/reset_password?token={}", token), None).await;
    assert_eq!(location(&response), "/forgot_password?notice=reset_invalid");
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let app = setup().await;
    let response = app
        .post_form(
            "/forgot_password",
            &[("email", "ghost@example.com"), ("fav_car", "Toyota")],
            None,
        )
        .await;
    assert!(body_text(response).await.contains("Email not found!"));
}

#[tokio::test]
async fn test_reset_page_without_token_redirects() {
    let app = setup().await;
    let response = app.get("/reset_password", None).await;
    assert_eq!(location(&response), "/forgot_password?notice=reset_invalid");
}

// ============================================================================
// JSON API
// ============================================================================

async fn api_token(app: &TestApp) -> String {
    app.register("alice", "secret123").await;
    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "username": "alice", "password": "secret123" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"].as_str().unwrap().to_string()
}

fn reference_json() -> Value {
    let features: serde_json::Map<String, Value> = FEATURE_LAYOUT
        .iter()
        .zip(REFERENCE_VALUES)
        .map(|(name, value)| (name.to_string(), json!(value.parse::<f64>().unwrap())))
        .collect();
    json!({ "features": features })
}

#[tokio::test]
async fn test_api_predict() {
    let app = setup().await;
    let token = api_token(&app).await;

    let response = app.post_json("/api/v1/predict", reference_json(), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["label"], "PortScan");
    assert_eq!(body["class_index"], 2);
    assert!((body["confidence"].as_f64().unwrap() - 97.0).abs() < 1e-9);
    assert_eq!(body["recorded"], true);
    assert_eq!(app.prediction_rows("alice").await, 1);
}

#[tokio::test]
async fn test_api_predict_requires_token() {
    let app = setup().await;
    let response = app.post_json("/api/v1/predict", reference_json(), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["status"], 401);
    assert_eq!(app.classifier_calls(), 0);
}

#[tokio::test]
async fn test_api_predict_validation_error() {
    let app = setup().await;
    let token = api_token(&app).await;

    let mut body = reference_json();
    body["features"]["SYN Flag Count"] = Value::Null;
    let response = app.post_json("/api/v1/predict", body, Some(&token)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert!(error["error"].as_str().unwrap().contains("SYN Flag Count"));
    assert_eq!(app.classifier_calls(), 0);
}

#[tokio::test]
async fn test_api_login_bad_credentials() {
    let app = setup().await;
    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "username": "nobody", "password": "x" }),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_model_status() {
    let app = setup().await;
    let token = api_token(&app).await;

    let response = app
        .send(
            Request::builder()
                .uri("/api/v1/model")
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    let status = body_json(response).await;
    assert_eq!(status["model_kind"], "stub");
    assert_eq!(status["classes"], json!(["BENIGN", "DDoS", "PortScan"]));
    assert_eq!(status["layout"]["feature_count"], 10);
    assert_eq!(status["layout"]["feature_names"][9], "SYN Flag Count");
}
