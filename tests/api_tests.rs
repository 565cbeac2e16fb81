//! Live server tests
//!
//! Expect a server on localhost:8080 bootstrapped with the `admin` /
//! `admin` librarian account (`CATALOG_BOOTSTRAP__ADMIN_PASSWORD=admin`).

use reqwest::{redirect::Policy, Client};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080";

fn client() -> Client {
    Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("Failed to build client")
}

/// Helper to get a librarian token
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/accounts/login/", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let response = client()
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let response = client()
        .post(format!("{}/accounts/login/", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let response = client()
        .post(format!("{}/accounts/login/", BASE_URL))
        .json(&json!({
            "username": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_my_loans_requires_login() {
    let response = client()
        .get(format!("{}/catalog/mybooks/", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 302);
    assert_eq!(
        response.headers()["location"],
        "/accounts/login/?next=/catalog/mybooks/"
    );
}

#[tokio::test]
#[ignore]
async fn test_create_and_delete_author() {
    let client = client();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/catalog/author/create/", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "first_name": "Test",
            "last_name": "Author"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 303);
    let location = response.headers()["location"]
        .to_str()
        .expect("Bad location header")
        .to_string();

    let response = client
        .post(format!("{}{}/delete/", BASE_URL, location))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 303);
    assert_eq!(response.headers()["location"], "/catalog/authors/");
}

#[tokio::test]
#[ignore]
async fn test_index_with_session() {
    let client = client();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/catalog/", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let cookie = response.headers()["set-cookie"]
        .to_str()
        .expect("Bad cookie header")
        .split(';')
        .next()
        .expect("Empty cookie")
        .to_string();
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["num_visits"], 0);
    assert!(body["num_books"].is_number());

    let response = client
        .get(format!("{}/catalog/", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .header("Cookie", cookie)
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["num_visits"], 1);
}
