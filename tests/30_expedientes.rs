mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn body(cip: &str) -> Value {
    json!({
        "grado": "cap",
        "apellidos_nombres": "Quispe Mamani Luis",
        "numero_paginas": 85,
        "situacion_militar": "actividad",
        "cip": cip,
        "orden": 4
    })
}

#[tokio::test]
async fn expediente_lifecycle() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = common::admin_token();

    // Create with canonicalized values and derived location
    let res = server.post("/api/expedientes", &token).json(&body("778899")).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<Value>().await?;
    let record = &created["data"];
    assert_eq!(record["grado"], "CAP");
    assert_eq!(record["situacion_militar"], "Actividad");
    assert_eq!(record["estado"], "dentro");
    assert_eq!(record["ubicacion"], "QU");
    let id = record["id"].as_str().unwrap_or_default().to_string();

    // Read
    let res = server.get(&format!("/api/expedientes/{}", id), &token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Partial update
    let res = server
        .put(&format!("/api/expedientes/{}", id), &token)
        .json(&json!({ "numero_paginas": 90 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let updated = res.json::<Value>().await?;
    assert_eq!(updated["data"]["numero_paginas"], 90);
    assert_eq!(updated["data"]["cip"], "778899");

    // Empty update is a validation error
    let res = server.put(&format!("/api/expedientes/{}", id), &token).json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["code"], "VALIDATION_ERROR");

    // Estado change
    let res = server
        .put(&format!("/api/expedientes/{}/estado", id), &token)
        .json(&json!({ "estado": "fuera" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["estado"], "fuera");

    // Soft delete, then it is gone
    let res = server.delete(&format!("/api/expedientes/{}", id), &token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.get(&format!("/api/expedientes/{}", id), &token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.delete(&format!("/api/expedientes/{}", id), &token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.get("/api/expedientes", &token).send().await?;
    assert_eq!(res.json::<Value>().await?["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn duplicate_cip_conflicts() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let token = common::admin_token();

    let res = server.post("/api/expedientes", &token).json(&body("100200")).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server.post("/api/expedientes", &token).json(&body("100200")).send().await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.json::<Value>().await?["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn invalid_fields_are_reported() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let mut invalid = body("300400");
    invalid["grado"] = json!("ALMIRANTE");
    invalid["numero_paginas"] = json!(0);

    let res = server.post("/api/expedientes", &common::admin_token()).json(&invalid).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err = res.json::<Value>().await?;
    assert_eq!(err["code"], "VALIDATION_ERROR");
    assert!(err["field_errors"].get("grado").is_some());
    assert!(err["field_errors"].get("numero_paginas").is_some());
    Ok(())
}

#[tokio::test]
async fn roles_limit_writes() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server
        .post("/api/expedientes", &common::token_for(&["abogado"]))
        .json(&body("500600"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .post("/api/expedientes", &common::token_for(&["secretario"]))
        .json(&body("500600"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let id = res.json::<Value>().await?["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = server
        .delete(&format!("/api/expedientes/{}", id), &common::token_for(&["secretario"]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn dashboard_stats() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    server.seed_expedientes(4).await?;
    let token = common::admin_token();

    let res = server.get("/api/expedientes?cip=000001", &token).send().await?;
    let id = res.json::<Value>().await?["data"]["items"][0]["id"].as_str().unwrap_or_default().to_string();
    server
        .put(&format!("/api/expedientes/{}/estado", id), &token)
        .json(&json!({ "estado": "fuera" }))
        .send()
        .await?;

    let res = server.get("/api/dashboard/stats", &token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let stats = res.json::<Value>().await?["data"].clone();
    assert_eq!(stats["total_expedientes"], 4);
    assert_eq!(stats["expedientes_dentro"], 3);
    assert_eq!(stats["expedientes_fuera"], 1);
    assert_eq!(stats["personal_actividad"], 4);
    assert_eq!(stats["por_grado"]["CAP"], 2);
    assert_eq!(stats["porcentaje_fuera"], 25.0);
    assert_eq!(stats["total_paginas"], 480);
    assert_eq!(stats["por_ubicacion"][0]["ubicacion"], "PE");
    assert_eq!(stats["por_ubicacion"][0]["total_paginas"], 480);
    assert_eq!(stats["temporal"]["ultimos_30_dias"], 4);
    assert_eq!(stats["temporal"]["por_mes"][0]["total"], 4);

    let res = server.get("/api/dashboard/stats", &common::token_for(&["abogado"])).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
