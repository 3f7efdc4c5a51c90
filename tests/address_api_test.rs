mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};
use serde_json::json;

fn address_body(label: &str, is_default: bool) -> serde_json::Value {
    json!({
        "label": label,
        "line1": "Musterstrasse 1",
        "city": "Berlin",
        "postal_code": "10115",
        "country": "DE",
        "is_default": is_default
    })
}

#[tokio::test]
async fn address_endpoints_require_authentication() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/account/addresses", None, &[])
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::GET,
            "/api/v1/account/addresses",
            None,
            &[("authorization", "Bearer not-a-token")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_list_update_delete_address() {
    let app = TestApp::new().await;
    let token = app.token_for("user-1");
    let auth = format!("Bearer {}", token);

    // Create
    let response = app
        .request(
            Method::POST,
            "/api/v1/account/addresses",
            Some(address_body("Home", true)),
            &[("authorization", auth.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    assert_eq!(created["label"], "Home");
    assert_eq!(created["is_default"], true);
    let id = created["id"].as_str().unwrap().to_string();

    // List
    let response = app
        .request(
            Method::GET,
            "/api/v1/account/addresses",
            None,
            &[("authorization", auth.as_str())],
        )
        .await;
    let list = read_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Update
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/account/addresses/{}", id),
            Some(address_body("Office", true)),
            &[("authorization", auth.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json(response).await;
    assert_eq!(updated["label"], "Office");

    // Delete
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/addresses/{}", id),
            None,
            &[("authorization", auth.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Deleting again is a miss
    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/addresses/{}", id),
            None,
            &[("authorization", auth.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn marking_default_demotes_previous_default() {
    let app = TestApp::new().await;
    let token = app.token_for("user-1");
    let auth = format!("Bearer {}", token);

    let response = app
        .request(
            Method::POST,
            "/api/v1/account/addresses",
            Some(address_body("Home", true)),
            &[("authorization", auth.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::POST,
            "/api/v1/account/addresses",
            Some(address_body("Office", true)),
            &[("authorization", auth.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::GET,
            "/api/v1/account/addresses",
            None,
            &[("authorization", auth.as_str())],
        )
        .await;
    let list = read_json(response).await;
    let addresses = list.as_array().unwrap();
    assert_eq!(addresses.len(), 2);

    let defaults: Vec<_> = addresses
        .iter()
        .filter(|a| a["is_default"] == true)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["label"], "Office");
}

#[tokio::test]
async fn addresses_are_scoped_to_their_owner() {
    let app = TestApp::new().await;
    let alice = format!("Bearer {}", app.token_for("alice"));
    let bob = format!("Bearer {}", app.token_for("bob"));

    let response = app
        .request(
            Method::POST,
            "/api/v1/account/addresses",
            Some(address_body("Home", false)),
            &[("authorization", alice.as_str())],
        )
        .await;
    let created = read_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    // Bob cannot see it
    let response = app
        .request(
            Method::GET,
            "/api/v1/account/addresses",
            None,
            &[("authorization", bob.as_str())],
        )
        .await;
    let list = read_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 0);

    // Nor update or delete it; someone else's address looks like a miss
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/account/addresses/{}", id),
            Some(address_body("Hijack", false)),
            &[("authorization", bob.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/account/addresses/{}", id),
            None,
            &[("authorization", bob.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_address_is_rejected() {
    let app = TestApp::new().await;
    let auth = format!("Bearer {}", app.token_for("user-1"));

    let response = app
        .request(
            Method::POST,
            "/api/v1/account/addresses",
            Some(json!({
                "line1": "",
                "city": "Berlin",
                "postal_code": "10115",
                "country": "Germany"
            })),
            &[("authorization", auth.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
