mod common;

use std::collections::HashSet;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

async fn list(server: &common::TestServer, query: &str) -> Result<(StatusCode, Value)> {
    let res = server
        .get(&format!("/api/expedientes?{}", query), &common::admin_token())
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json::<Value>().await?))
}

#[tokio::test]
async fn last_partial_page() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(23).await?;

    let (status, body) = list(&server, "page=3&limit=10").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["data"]["total"], 23);
    assert_eq!(body["data"]["page"], 3);
    assert_eq!(body["data"]["limit"], 10);
    assert_eq!(body["data"]["totalPages"], 3);
    Ok(())
}

#[tokio::test]
async fn empty_store() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let (status, body) = list(&server, "page=1&limit=10").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], serde_json::json!([]));
    assert_eq!(body["data"]["total"], 0);
    assert_eq!(body["data"]["totalPages"], 0);
    Ok(())
}

#[tokio::test]
async fn page_past_end_keeps_total() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(5).await?;

    let (status, body) = list(&server, "page=4&limit=10").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], serde_json::json!([]));
    assert_eq!(body["data"]["total"], 5);
    assert_eq!(body["data"]["totalPages"], 1);
    Ok(())
}

#[tokio::test]
async fn unknown_sort_field_is_invalid_query() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(3).await?;

    let (status, body) = list(&server, "sortBy=foo").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");
    Ok(())
}

#[tokio::test]
async fn out_of_range_window_is_invalid_query() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    for query in ["page=0", "limit=0", "limit=101", "page=abc"] {
        let (status, body) = list(&server, query).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert_eq!(body["code"], "INVALID_QUERY", "{}", query);
    }
    Ok(())
}

#[tokio::test]
async fn pages_do_not_overlap() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(23).await?;

    let mut seen = HashSet::new();
    for page in 1..=3 {
        let (_, body) = list(&server, &format!("page={}&limit=10&sortBy=cip&sortOrder=desc", page)).await?;
        for item in body["data"]["items"].as_array().cloned().unwrap_or_default() {
            assert!(seen.insert(item["id"].as_str().unwrap_or_default().to_string()));
        }
    }
    assert_eq!(seen.len(), 23);
    Ok(())
}

#[tokio::test]
async fn sorts_descending() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(12).await?;

    let (_, body) = list(&server, "limit=3&sortBy=cip&sortOrder=DESC").await?;
    let cips: Vec<&str> = body["data"]["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["cip"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(cips, vec!["000012", "000011", "000010"]);
    Ok(())
}

#[tokio::test]
async fn filters_narrow_the_total() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(10).await?;

    let (status, body) = list(&server, "grado=cap").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 5);

    let (_, body) = list(&server, "apellidos_nombres=gomez%2000000").await?;
    assert_eq!(body["data"]["total"], 9);

    let (status, body) = list(&server, "color=rojo").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");
    Ok(())
}

#[tokio::test]
async fn date_range_is_inclusive_and_validated() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(4).await?;
    let today = chrono::Utc::now().date_naive().to_string();

    let (_, body) = list(&server, &format!("fecha_inicio={0}&fecha_fin={0}", today)).await?;
    assert_eq!(body["data"]["total"], 4);

    let (status, body) = list(&server, "fecha_inicio=2024-02-01&fecha_fin=2024-01-01").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_QUERY");
    Ok(())
}

#[tokio::test]
async fn search_route_shares_the_listing() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(3).await?;

    let res = server
        .get("/api/expedientes/search?cip=000002", &common::token_for(&["abogado"]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["data"]["total"], 1);
    Ok(())
}
