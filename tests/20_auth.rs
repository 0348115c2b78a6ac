mod common;

use anyhow::Result;
use common::{parse_id, TestApp, PASSWORD};
use reqwest::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn organization_registration_creates_owner_and_trial() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;

    let org = &clinic.body["organization"];
    assert_eq!(org["slug"], "acme-dental");
    assert_eq!(org["email"], "owner@acme-dental.test");
    assert_eq!(org["subscription"]["plan"], "starter");
    assert_eq!(org["subscription"]["maxUsers"], 5);
    assert_eq!(org["subscription"]["maxPatients"], 500);
    assert!(org["subscription"]["expiresAt"].is_string());

    let user = &clinic.body["user"];
    assert_eq!(user["role"], "owner");
    assert_eq!(parse_id(&user["organizationId"])?, clinic.organization_id);
    assert!(user.get("passwordHash").is_none());
    Ok(())
}

#[tokio::test]
async fn duplicate_organization_email_is_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.register_clinic("Acme Dental").await?;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register-organization",
            None,
            Some(json!({
                "name": "Someone Else",
                "email": "someone@else.test",
                "password": PASSWORD,
                "organizationName": "Acme Again",
                "organizationEmail": "OWNER@acme-dental.test",
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("already exists"));
    Ok(())
}

#[tokio::test]
async fn login_token_identifies_the_user() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Smile Lab").await?;

    let (status, body) = app.login("OWNER@smile-lab.test", PASSWORD).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(parse_id(&body["id"])?, clinic.owner_id);
    assert_eq!(body["role"], "owner");

    let token = body["token"].as_str().unwrap_or_default();
    let subject = app.state.tokens.verify(token)?;
    assert_eq!(subject, clinic.owner_id);
    Ok(())
}

#[tokio::test]
async fn login_failures_are_distinguishable() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Smile Lab").await?;

    let (status, body) = app.login("ghost@smile-lab.test", PASSWORD).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, body) = app.login("owner@smile-lab.test", "wrong-password").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid password");

    let (dentist_id, _) = app.add_staff(&clinic, "dentist", "dr@smile-lab.test").await?;
    let (status, _) = app.patch(&format!("/api/users/{}/toggle-status", dentist_id), &clinic.token).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.login("dr@smile-lab.test", PASSWORD).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "User account is deactivated");
    Ok(())
}

#[tokio::test]
async fn deactivated_users_lose_existing_sessions() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Smile Lab").await?;
    let (dentist_id, dentist_token) = app.add_staff(&clinic, "dentist", "dr@smile-lab.test").await?;

    let (status, _) = app.get("/api/auth/profile", &dentist_token).await?;
    assert_eq!(status, StatusCode::OK);

    app.patch(&format!("/api/users/{}/toggle-status", dentist_id), &clinic.token).await?;
    let (status, _) = app.get("/api/auth/profile", &dentist_token).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn self_registration_creates_unattached_admins_only() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Solo", "email": "solo@example.test", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "admin");
    assert!(body["organizationId"].is_null());
    let token = body["token"].as_str().unwrap_or_default().to_string();

    // No organization means no tenant data
    let (status, _) = app.get("/api/patients", &token).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Doc", "email": "doc@example.test", "password": PASSWORD, "role": "dentist" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fieldErrors"]["role"].is_string());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Solo", "email": "SOLO@example.test", "password": PASSWORD })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("already exists"));
    Ok(())
}

#[tokio::test]
async fn registration_validates_fields() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Bad", "email": "not-an-email", "password": "123" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["fieldErrors"]["email"].is_string());
    assert!(body["fieldErrors"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn profile_can_be_read_and_updated() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Smile Lab").await?;

    let (status, body) = app.get("/api/auth/profile", &clinic.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "owner@smile-lab.test");

    let (status, body) = app
        .put("/api/auth/profile", &clinic.token, json!({ "name": "Dr. Renamed", "role": "secretary" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Dr. Renamed");
    assert_eq!(body["role"], "owner");
    Ok(())
}

#[tokio::test]
async fn password_change_requires_the_current_password() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Smile Lab").await?;

    let (status, body) = app
        .put(
            "/api/auth/password",
            &clinic.token,
            json!({ "currentPassword": "wrong-one", "newPassword": "brand-new-pass" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fieldErrors"]["currentPassword"].is_string());

    let (status, _) = app
        .put(
            "/api/auth/password",
            &clinic.token,
            json!({ "currentPassword": PASSWORD, "newPassword": "brand-new-pass" }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.login("owner@smile-lab.test", PASSWORD).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.login("owner@smile-lab.test", "brand-new-pass").await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
