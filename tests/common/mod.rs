#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use uuid::Uuid;

use expedientes_api::auth::{generate_jwt, Claims};
use expedientes_api::database::models::{CreateExpediente, CreateUser};
use expedientes_api::{app, AppState};

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Serves a fresh in-memory app on an unused port. The server lives on
    /// the calling test's runtime.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(AppState::in_memory()).await
    }

    pub async fn spawn_with(state: AppState) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let router = app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let server = Self { port, base_url, state, client };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn put(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    /// Inserts `count` expedientes directly through the service layer.
    pub async fn seed_expedientes(&self, count: usize) -> Result<()> {
        let actor = Uuid::new_v4();
        for i in 0..count {
            self.state
                .expedientes
                .create(expediente(&format!("{:06}", i + 1), if i % 2 == 0 { "CAP" } else { "TTE" }), actor)
                .await?;
        }
        Ok(())
    }

    /// Creates a real account and returns its id with a token minted for it.
    pub async fn login_as(&self, email: &str, password: &str, roles: &[&str]) -> Result<(Uuid, String)> {
        let user = self
            .state
            .users
            .create(
                CreateUser {
                    email: email.to_string(),
                    password: password.to_string(),
                    nombre: "Ana".to_string(),
                    apellido: "Quispe".to_string(),
                    documento: Uuid::new_v4().simple().to_string(),
                    telefono: String::new(),
                    roles: roles.iter().map(|r| r.to_string()).collect(),
                },
                None,
            )
            .await?;
        let claims = Claims::new(user.id, user.email.clone(), user.roles.clone());
        Ok((user.id, generate_jwt(&claims)?))
    }
}

pub fn expediente(cip: &str, grado: &str) -> CreateExpediente {
    CreateExpediente {
        grado: grado.to_string(),
        apellidos_nombres: format!("PEREZ GOMEZ {}", cip),
        numero_paginas: 120,
        situacion_militar: "Actividad".to_string(),
        cip: cip.to_string(),
        orden: 1,
        ubicacion: None,
        estado: None,
        fecha_registro: None,
    }
}

pub fn token_for(roles: &[&str]) -> String {
    let claims = Claims::new(
        Uuid::new_v4(),
        format!("{}@example.com", roles.first().copied().unwrap_or("nobody")),
        roles.iter().map(|r| r.to_string()).collect(),
    );
    generate_jwt(&claims).expect("failed to sign test token")
}

pub fn admin_token() -> String {
    token_for(&["administrador"])
}
