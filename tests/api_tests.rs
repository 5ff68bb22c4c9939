//! Router smoke tests against an in-memory store

use aine::api::{build_router, AppState};
use aine::config::Config;
use aine::db::{create_test_pool, migrations, DatabasePool, DynDatabasePool};
use axum::http::{header, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

async fn server_with_store() -> (TestServer, DynDatabasePool) {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();
    let config = Config::default();
    let state = AppState::new(pool.clone(), &config);
    let server = TestServer::new(build_router(state, &config.server.cors_origin)).unwrap();
    (server, pool)
}

async fn server() -> TestServer {
    server_with_store().await.0
}

async fn setup_admin(server: &TestServer) -> String {
    let response = server
        .post("/api/v1/auth/setup")
        .json(&json!({
            "name": "Asha Menon",
            "email": "admin@aine.edu",
            "password": "correct-horse"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["token"].as_str().unwrap().to_string()
}

async fn account(server: &TestServer, admin: &str, email: &str, role: &str) -> String {
    server
        .post("/api/v1/settings/users")
        .authorization_bearer(admin)
        .json(&json!({
            "name": "Staff Member",
            "email": email,
            "password": "staff-password",
            "role": role
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": email, "password": "staff-password" }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["token"].as_str().unwrap().to_string()
}

fn section_names(nav: &Value) -> Vec<String> {
    nav["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_setup_only_once() {
    let server = server().await;

    let status = server.get("/api/v1/auth/setup").await.json::<Value>();
    assert_eq!(status["has_users"], false);

    let token = setup_admin(&server).await;
    assert!(!token.is_empty());

    server
        .post("/api/v1/auth/setup")
        .json(&json!({ "name": "X", "email": "x@aine.edu", "password": "another-pass" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let server = server().await;
    setup_admin(&server).await;

    let response = server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "admin@aine.edu", "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_missing_or_unknown_session_redirects_to_login() {
    let server = server().await;

    let response = server.get("/api/v1/dashboard").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/login");

    let response = server
        .get("/api/v1/nav")
        .authorization_bearer("no-such-session")
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_session_without_profile_redirects_to_login() {
    let (server, pool) = server_with_store().await;
    let admin = setup_admin(&server).await;
    let clerk = account(&server, &admin, "clerk@aine.edu", "clerk").await;

    server
        .get("/api/v1/nav")
        .authorization_bearer(&clerk)
        .await
        .assert_status_ok();

    // Drop the account row while its session row stays behind
    let mut conn = pool.as_sqlite().unwrap().acquire().await.unwrap();
    sqlx::query("PRAGMA foreign_keys = OFF").execute(&mut *conn).await.unwrap();
    sqlx::query("DELETE FROM users WHERE email = ?")
        .bind("clerk@aine.edu")
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await.unwrap();
    drop(conn);

    let response = server.get("/api/v1/nav").authorization_bearer(&clerk).await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(response.header(header::LOCATION), "/login");

    // The admin's own session is untouched
    server
        .get("/api/v1/nav")
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_navigation_follows_role() {
    let server = server().await;
    let admin = setup_admin(&server).await;

    let nav = server.get("/api/v1/nav").authorization_bearer(&admin).await.json::<Value>();
    assert_eq!(nav["role"], "admin");
    assert_eq!(section_names(&nav).len(), 7);

    let faculty = account(&server, &admin, "faculty@aine.edu", "faculty").await;
    let nav = server.get("/api/v1/nav").authorization_bearer(&faculty).await.json::<Value>();
    assert_eq!(section_names(&nav), vec!["Dashboard", "Students"]);
    assert!(nav["sections"][1]["sub_sections"].as_array().unwrap().len() > 0);

    let accountant = account(&server, &admin, "accounts@aine.edu", "accountant").await;
    let nav = server.get("/api/v1/nav").authorization_bearer(&accountant).await.json::<Value>();
    assert_eq!(section_names(&nav), vec!["Dashboard", "Finance"]);
}

#[tokio::test]
async fn test_section_gate_forbids_other_sections() {
    let server = server().await;
    let admin = setup_admin(&server).await;
    let clerk = account(&server, &admin, "clerk@aine.edu", "clerk").await;

    server
        .get("/api/v1/stock/items")
        .authorization_bearer(&clerk)
        .await
        .assert_status_ok();

    let response = server
        .get("/api/v1/finance/overview")
        .authorization_bearer(&clerk)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"]["code"], "FORBIDDEN");

    server
        .post("/api/v1/settings/users")
        .authorization_bearer(&clerk)
        .json(&json!({ "name": "A", "email": "a@aine.edu", "password": "password1", "role": "admin" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_dashboard_zero_state() {
    let server = server().await;
    let admin = setup_admin(&server).await;

    let summary = server
        .get("/api/v1/dashboard")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(
        summary,
        json!({
            "total_students": 0,
            "total_faculty": 0,
            "pending_leaves": 0,
            "low_stock_items": 0
        })
    );

    let report = server
        .get("/api/v1/reports/financial")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(report["expense_ratio"], 0.0);
    assert_eq!(report["profit_margin"], 0.0);
}

#[tokio::test]
async fn test_student_report_counts_fee_standing() {
    let server = server().await;
    let admin = setup_admin(&server).await;

    for name in ["Anita Singh", "Rahul Verma"] {
        server
            .post("/api/v1/students")
            .authorization_bearer(&admin)
            .json(&json!({
                "name": name,
                "dob": "2003-05-14",
                "course_id": "gnm",
                "year": 2024
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let report = server
        .get("/api/v1/reports/students")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(report["total_students"], 2);
    assert_eq!(report["fees_pending"], 2);
    assert_eq!(report["fees_paid"], 0);
    assert_eq!(report["fees_cleared_percent"], 0.0);
    assert_eq!(report["by_course"][0]["course_id"], "gnm");
    assert_eq!(report["by_course"][0]["students"], 2);
}

#[tokio::test]
async fn test_report_rejects_inverted_period() {
    let server = server().await;
    let admin = setup_admin(&server).await;

    server
        .get("/api/v1/reports/stock?from=2024-06-01&to=2024-01-01")
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stock_adjust_flow() {
    let server = server().await;
    let admin = setup_admin(&server).await;

    let response = server
        .post("/api/v1/stock/items")
        .authorization_bearer(&admin)
        .json(&json!({
            "code": "glv-01",
            "name": "Surgical gloves",
            "category": "Consumables",
            "qty_available": 12,
            "unit_price": 2.5
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let item = response.json::<Value>();
    assert_eq!(item["item"]["code"], "GLV-01");
    assert_eq!(item["item"]["status"], "in-stock");
    let id = item["item"]["id"].as_i64().unwrap();

    server
        .post(&format!("/api/v1/stock/items/{}/adjust", id))
        .authorization_bearer(&admin)
        .json(&json!({ "kind": "out", "quantity": 5, "party": "Ward A", "date": "2024-05-02" }))
        .await
        .assert_status(StatusCode::CREATED);

    let item = server
        .get(&format!("/api/v1/stock/items/{}", id))
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(item["item"]["qty_available"], 7);
    assert_eq!(item["item"]["status"], "low-stock");

    let response = server
        .post(&format!("/api/v1/stock/items/{}/adjust", id))
        .authorization_bearer(&admin)
        .json(&json!({ "kind": "out", "quantity": 8, "date": "2024-05-03" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        response.json::<Value>()["error"]["details"],
        json!({ "requested": 8, "available": 7 })
    );

    let summary = server
        .get("/api/v1/dashboard")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(summary["low_stock_items"], 1);
}

#[tokio::test]
async fn test_leave_decision_is_terminal() {
    let server = server().await;
    let admin = setup_admin(&server).await;

    let faculty = server
        .post("/api/v1/faculty")
        .authorization_bearer(&admin)
        .json(&json!({ "name": "Dr. Rao", "designation": "Professor", "salary": 90000.0 }))
        .await
        .json::<Value>();
    let faculty_id = faculty["faculty"]["id"].as_i64().unwrap();

    let leave = server
        .post("/api/v1/faculty/leaves")
        .authorization_bearer(&admin)
        .json(&json!({
            "faculty_id": faculty_id,
            "date_from": "2024-07-01",
            "date_to": "2024-07-03",
            "reason": "Conference"
        }))
        .await
        .json::<Value>();
    assert_eq!(leave["leave"]["status"], "pending");
    let leave_id = leave["leave"]["id"].as_i64().unwrap();

    let summary = server.get("/api/v1/dashboard").authorization_bearer(&admin).await.json::<Value>();
    assert_eq!(summary["pending_leaves"], 1);

    let approved = server
        .post(&format!("/api/v1/faculty/leaves/{}/approve", leave_id))
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(approved["leave"]["status"], "approved");

    server
        .post(&format!("/api/v1/faculty/leaves/{}/reject", leave_id))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let server = server().await;
    let admin = setup_admin(&server).await;

    let me = server.get("/api/v1/auth/me").authorization_bearer(&admin).await.json::<Value>();
    assert_eq!(me["email"], "admin@aine.edu");

    server
        .post("/api/v1/auth/logout")
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get("/api/v1/auth/me")
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::SEE_OTHER);
}
