mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use expedientes_api::auth::password::verify_password;

#[tokio::test]
async fn custom_profile_grants_its_permissions() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let admin = common::admin_token();
    let archivista = common::token_for(&["archivista"]);

    // Unknown role: nothing granted yet.
    let res = server.get("/api/dashboard/stats", &archivista).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .post("/api/profiles", &admin)
        .json(&json!({
            "name": "Archivista",
            "slug": "archivista",
            "description": "Control del archivo físico",
            "permissions": ["expediente:read", "dashboard:stats"]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let profile = res.json::<Value>().await?["data"].clone();
    assert_eq!(profile["is_system"], false);
    let id = profile["id"].as_str().unwrap_or_default().to_string();

    let res = server.get("/api/dashboard/stats", &archivista).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = server.delete(&format!("/api/expedientes/{}", uuid::Uuid::nil()), &archivista).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .put(&format!("/api/profiles/{}/permissions", id), &admin)
        .json(&json!({ "permissions": ["expediente:read"] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get(&format!("/api/profiles/{}/permissions", id), &admin).send().await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["permissions"], json!(["expediente:read"]));

    let res = server.get("/api/dashboard/stats", &archivista).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.delete(&format!("/api/profiles/{}", id), &admin).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let res = server.get("/api/expedientes", &archivista).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn profile_writes_are_validated() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let admin = common::admin_token();

    let res = server
        .post("/api/profiles", &admin)
        .json(&json!({ "name": "Lector", "slug": "lector", "permissions": ["expediente:fly"] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["code"], "VALIDATION_ERROR");

    let res = server
        .post("/api/profiles", &admin)
        .json(&json!({ "name": "Otro juez", "slug": "juez" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server
        .post("/api/profiles", &common::token_for(&["abogado"]))
        .json(&json!({ "name": "Lector", "slug": "lector" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn system_profiles_are_protected() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let admin = common::admin_token();

    let res = server.get("/api/profiles?slug=abogado", &admin).send().await?;
    let page = res.json::<Value>().await?["data"].clone();
    assert_eq!(page["total"], 1);
    let id = page["items"][0]["id"].as_str().unwrap_or_default().to_string();

    let res = server.delete(&format!("/api/profiles/{}", id), &admin).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .put(&format!("/api/profiles/{}/permissions", id), &admin)
        .json(&json!({ "permissions": ["system:admin"] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .put(&format!("/api/profiles/{}", id), &admin)
        .json(&json!({ "description": "Consulta" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["description"], "Consulta");
    Ok(())
}

#[tokio::test]
async fn self_service_profile_and_password() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let (id, token) = server.login_as("ana@archivo.pe", "clave123", &["abogado"]).await?;

    let res = server.get("/api/users/profile", &token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["email"], "ana@archivo.pe");

    let res = server
        .put("/api/users/profile", &token)
        .json(&json!({ "telefono": "987654321", "roles": ["administrador"] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let me = res.json::<Value>().await?["data"].clone();
    assert_eq!(me["telefono"], "987654321");
    assert_eq!(me["roles"], json!(["abogado"]));

    // Other accounts stay out of reach.
    let res = server.put(&format!("/api/users/{}", id), &token).json(&json!({ "telefono": "1" })).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .put("/api/users/password", &token)
        .json(&json!({ "current_password": "equivocada", "new_password": "nueva456" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .put("/api/users/password", &token)
        .json(&json!({ "current_password": "clave123", "new_password": "nueva456" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let stored = server.state.users.get(id).await?;
    assert!(verify_password("nueva456", &stored.password_hash));
    assert!(!verify_password("clave123", &stored.password_hash));
    Ok(())
}
