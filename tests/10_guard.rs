mod common;

use anyhow::Result;
use reqwest::{header, StatusCode};

#[tokio::test]
async fn health_is_public() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    for path in ["/", "/health", "/api/health"] {
        let res = server.client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::OK, "{} should be public", path);
    }
    Ok(())
}

#[tokio::test]
async fn api_without_token_is_unauthorized() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.client.get(server.url("/api/expedientes")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn pages_without_token_redirect_to_login() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.client.get(server.url("/expedientes")).send().await?;
    assert!(res.status().is_redirection(), "got {}", res.status());
    assert_eq!(
        res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
        Some("/login?redirect=%2Fexpedientes")
    );
    Ok(())
}

#[tokio::test]
async fn invalid_token_is_rejected_by_jwt_layer() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.get("/api/expedientes", "not-a-jwt").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_cookie_is_accepted() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = common::admin_token();

    let res = server
        .client
        .get(server.url("/api/auth/whoami"))
        .header(header::COOKIE, format!("auth_token={}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["email"], "administrador@example.com");
    Ok(())
}

#[tokio::test]
async fn permissions_follow_roles() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server.get("/api/permissions", &common::token_for(&["abogado"])).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    let granted: Vec<String> = serde_json::from_value(body["data"]["permissions"].clone())?;
    assert!(granted.contains(&"expediente:read".to_string()));
    assert!(!granted.contains(&"expediente:create".to_string()));
    let available = body["data"]["available"].as_array().map(Vec::len).unwrap_or_default();
    assert!(available > granted.len());

    let res = server.get("/api/permissions", &common::token_for(&["desconocido"])).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
