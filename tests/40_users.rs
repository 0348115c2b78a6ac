mod common;

use anyhow::Result;
use common::{parse_id, TestApp, PASSWORD};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn owners_create_staff_with_role_defaults() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;

    let (status, body) = app
        .post(
            "/api/users",
            &clinic.token,
            json!({ "name": "Dr. Ana", "email": "Ana@Acme.test", "password": PASSWORD, "role": "dentist" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let user = &body["user"];
    assert_eq!(user["email"], "ana@acme.test");
    assert_eq!(user["role"], "dentist");
    assert_eq!(parse_id(&user["organizationId"])?, clinic.organization_id);
    let permissions = user["permissions"].as_array().cloned().unwrap_or_default();
    assert!(permissions.contains(&json!("patients.create")));
    assert!(!permissions.contains(&json!("users.create")));

    let (_, body) = app.get("/api/users", &clinic.token).await?;
    assert_eq!(body["pagination"]["total"], 2);

    let (_, body) = app.get("/api/users?role=dentist", &clinic.token).await?;
    assert_eq!(body["pagination"]["total"], 1);

    let (status, body) = app.get("/api/users/stats", &clinic.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["byRole"]["owner"], 1);
    assert_eq!(body["byRole"]["dentist"], 1);
    Ok(())
}

#[tokio::test]
async fn role_and_email_are_validated_on_create() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;

    let (status, body) = app
        .post("/api/users", &clinic.token, json!({ "name": "No Role", "email": "norole@acme.test", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fieldErrors"]["role"].is_string());

    let (status, body) = app
        .post(
            "/api/users",
            &clinic.token,
            json!({ "name": "Dup", "email": "owner@acme-dental.test", "password": PASSWORD, "role": "secretary" }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().contains("already exists"));
    Ok(())
}

#[tokio::test]
async fn staff_without_permission_cannot_manage_users() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;
    let (_, dentist) = app.add_staff(&clinic, "dentist", "dr@acme.test").await?;

    let (status, _) = app.get("/api/users", &dentist).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/api/users", &dentist, json!({ "name": "X", "email": "x@acme.test", "password": PASSWORD, "role": "secretary" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app.get("/api/users/stats", &dentist).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn only_owners_hand_out_or_modify_the_owner_role() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;
    let (_, admin) = app.add_staff(&clinic, "admin", "admin@acme.test").await?;

    let (status, _) = app
        .post("/api/users", &admin, json!({ "name": "Boss", "email": "boss@acme.test", "password": PASSWORD, "role": "owner" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(&format!("/api/users/{}", clinic.owner_id), &admin, json!({ "name": "Demoted" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn role_change_resets_permissions() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;
    let (id, _) = app.add_staff(&clinic, "secretary", "desk@acme.test").await?;

    let (status, body) = app
        .put(&format!("/api/users/{}", id), &clinic.token, json!({ "role": "dentist", "name": "Promoted" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "dentist");
    assert_eq!(body["user"]["name"], "Promoted");
    let permissions = body["user"]["permissions"].as_array().cloned().unwrap_or_default();
    assert!(permissions.contains(&json!("patients.create")));

    let (status, _) = app
        .put(&format!("/api/users/{}", clinic.owner_id), &clinic.token, json!({ "role": "admin" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn toggling_a_user_twice_restores_access() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;
    let (id, _) = app.add_staff(&clinic, "dentist", "dr@acme.test").await?;
    let path = format!("/api/users/{}/toggle-status", id);

    let (status, body) = app.patch(&path, &clinic.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["isActive"], false);
    assert_eq!(body["message"], "User deactivated");

    let (_, body) = app.patch(&path, &clinic.token).await?;
    assert_eq!(body["user"]["isActive"], true);

    let (status, _) = app.login("dr@acme.test", PASSWORD).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.patch(&format!("/api/users/{}/toggle-status", clinic.owner_id), &clinic.token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn delete_rules_for_self_same_tenant_and_other_tenant() -> Result<()> {
    let app = TestApp::spawn().await?;
    let acme = app.register_clinic("Acme Dental").await?;
    let smile = app.register_clinic("Smile Lab").await?;
    let (dentist_id, _) = app.add_staff(&acme, "dentist", "dr@acme.test").await?;

    let (status, _) = app.delete(&format!("/api/users/{}", acme.owner_id), &acme.token).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&format!("/api/users/{}", dentist_id), &smile.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.delete(&format!("/api/users/{}", dentist_id), &acme.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, _) = app.get(&format!("/api/users/{}", dentist_id), &acme.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.login("dr@acme.test", PASSWORD).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn starter_plan_caps_the_team_size() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;

    // The owner is the first of five seats
    for i in 0..4 {
        app.add_staff(&clinic, "secretary", &format!("desk{}@acme.test", i)).await?;
    }

    let (status, body) = app
        .post(
            "/api/users",
            &clinic.token,
            json!({ "name": "One Too Many", "email": "extra@acme.test", "password": PASSWORD, "role": "secretary" }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap_or_default().contains("Plan limit"));
    Ok(())
}

#[tokio::test]
async fn nobody_rewrites_their_own_permissions() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;
    let (admin_id, admin) = app.add_staff(&clinic, "admin", "admin@acme.test").await?;
    let organization = format!("/api/organizations/{}", clinic.organization_id);

    let (status, _) = app.put(&organization, &admin, json!({ "name": "Hijacked" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(
            &format!("/api/users/{}", admin_id),
            &admin,
            json!({ "permissions": ["users.read", "organization.manage", "settings.update"] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot change your own permissions");

    let (_, body) = app.get(&format!("/api/users/{}", admin_id), &admin).await?;
    let permissions = body["user"]["permissions"].as_array().cloned().unwrap_or_default();
    assert!(!permissions.contains(&json!("organization.manage")));

    let (status, _) = app.put(&organization, &admin, json!({ "name": "Hijacked" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn grants_are_limited_to_permissions_the_caller_holds() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;
    let (_, admin) = app.add_staff(&clinic, "admin", "admin@acme.test").await?;
    let (desk_id, _) = app.add_staff(&clinic, "secretary", "desk@acme.test").await?;
    let desk = format!("/api/users/{}", desk_id);

    let (status, body) = app
        .post(
            "/api/users",
            &admin,
            json!({
                "name": "Dr. Ana",
                "email": "ana@acme.test",
                "password": PASSWORD,
                "role": "dentist",
                "permissions": ["patients.read", "organization.manage"],
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap_or_default().contains("organization.manage"));

    let (status, _) = app
        .put(&desk, &admin, json!({ "permissions": ["users.read", "patients.read", "organization.manage"] }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&desk, &admin, json!({ "permissions": ["users.read", "patients.read", "reports.read"] }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let permissions = body["user"]["permissions"].as_array().cloned().unwrap_or_default();
    assert!(permissions.contains(&json!("reports.read")));
    assert!(!permissions.contains(&json!("appointments.read")));
    Ok(())
}

#[tokio::test]
async fn patient_delete_is_never_granted() -> Result<()> {
    let app = TestApp::spawn().await?;
    let clinic = app.register_clinic("Acme Dental").await?;
    let (dentist_id, _) = app.add_staff(&clinic, "dentist", "dr@acme.test").await?;

    let (status, body) = app
        .put(
            &format!("/api/users/{}", dentist_id),
            &clinic.token,
            json!({ "permissions": ["patients.read", "patients.delete"] }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fieldErrors"]["permissions"].is_string());

    let (status, _) = app
        .post(
            "/api/users",
            &clinic.token,
            json!({
                "name": "Dr. Bo",
                "email": "bo@acme.test",
                "password": PASSWORD,
                "role": "dentist",
                "permissions": ["patients.delete"],
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn tenants_never_see_each_others_users() -> Result<()> {
    let app = TestApp::spawn().await?;
    let acme = app.register_clinic("Acme Dental").await?;
    let smile = app.register_clinic("Smile Lab").await?;
    let (dentist_id, _) = app.add_staff(&acme, "dentist", "dr@acme.test").await?;
    let path = format!("/api/users/{}", dentist_id);

    let (status, body) = app.get(&path, &smile.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, _) = app.put(&path, &smile.token, json!({ "name": "Poached" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.patch(&format!("{}/toggle-status", path), &smile.token).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get("/api/users", &smile.token).await?;
    assert_eq!(body["pagination"]["total"], 1);

    let (status, body) = app.get(&path, &acme.token).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "dentist user");
    assert_eq!(body["user"]["isActive"], true);
    Ok(())
}
