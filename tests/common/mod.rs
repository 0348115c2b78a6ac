#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use dentcare_api::config::AppConfig;
use dentcare_api::services::auth_service::bootstrap_owner;
use dentcare_api::AppState;

pub const PASSWORD: &str = "secret123";

/// An in-process server over a fresh in-memory store
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
}

/// A registered clinic and the token of its owner
pub struct Clinic {
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub token: String,
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = AppConfig::in_memory("integration-test-secret");
        let state = AppState::from_config(config).await?;
        let app = dentcare_api::app(state.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let test_app = Self {
            base_url,
            client: reqwest::Client::new(),
            state,
        };
        test_app.wait_ready(Duration::from_secs(5)).await?;
        Ok(test_app)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/api/status")).send().await {
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

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, path, Some(token), None).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, path, Some(token), None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(StatusCode, Value)> {
        self.request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Register a clinic through the public endpoint; the owner logs in as `owner@<slug>.test`
    pub async fn register_clinic(&self, name: &str) -> Result<Clinic> {
        let owner_email = format!("owner@{}.test", name.to_lowercase().replace(' ', "-"));
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register-organization",
                None,
                Some(json!({
                    "name": format!("{} Owner", name),
                    "email": owner_email,
                    "password": PASSWORD,
                    "organizationName": name,
                })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "registration failed: {} {}", status, body);

        Ok(Clinic {
            organization_id: parse_id(&body["organization"]["id"])?,
            owner_id: parse_id(&body["user"]["id"])?,
            token: body["token"].as_str().context("missing token")?.to_string(),
            body,
        })
    }

    /// Create a staff member in the clinic and return (id, token)
    pub async fn add_staff(&self, clinic: &Clinic, role: &str, email: &str) -> Result<(Uuid, String)> {
        let (status, body) = self
            .post(
                "/api/users",
                &clinic.token,
                json!({ "name": format!("{} user", role), "email": email, "password": PASSWORD, "role": role }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "user creation failed: {} {}", status, body);
        let id = parse_id(&body["user"]["id"])?;

        let (status, body) = self.login(email, PASSWORD).await?;
        anyhow::ensure!(status == StatusCode::OK, "staff login failed: {} {}", status, body);
        Ok((id, body["token"].as_str().context("missing token")?.to_string()))
    }

    /// Seed a system owner directly in the store and log in as them
    pub async fn system_token(&self) -> Result<String> {
        let email = "root@dentcare.test";
        bootstrap_owner(&self.state.store, "Root".into(), email.into(), PASSWORD.into()).await?;
        let (status, body) = self.login(email, PASSWORD).await?;
        anyhow::ensure!(status == StatusCode::OK, "system login failed: {} {}", status, body);
        Ok(body["token"].as_str().context("missing token")?.to_string())
    }
}

pub fn parse_id(value: &Value) -> Result<Uuid> {
    let raw = value.as_str().with_context(|| format!("not an id: {}", value))?;
    Ok(raw.parse()?)
}
