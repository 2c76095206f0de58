// Homebridge UI HTTP client.
// Handles login, bearer-token requests, and a single re-authentication retry on 401.

use std::future::Future;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Settings;
use crate::error::{HubError, Result};
use crate::services::check_response;

use super::types::{LoginRequest, LoginResponse};

/// Homebridge client holding its own access token.
#[derive(Debug)]
pub struct HomebridgeClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl HomebridgeClient {
    /// Create a client on top of a shared connection pool.
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            token: RwLock::new(None),
        }
    }

    pub fn from_settings(client: Client, settings: &Settings) -> Self {
        Self::new(
            client,
            settings.homebridge_url.clone(),
            settings.homebridge_username.clone(),
            settings.homebridge_password.clone(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and remember the new access token.
    pub async fn login(&self) -> Result<String> {
        let body = LoginRequest {
            username: &self.username,
            password: &self.password,
        };
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&body)
            .send()
            .await?;
        let login: LoginResponse = check_response(response).await?.json().await?;

        *self.token.write().await = Some(login.access_token.clone());
        info!("authenticated with Homebridge");
        Ok(login.access_token)
    }

    /// Run `call` with the current token; on 401, log in once and retry.
    ///
    /// `call` receives the token to attach and must map a 401 response to
    /// [`HubError::Unauthorized`], as [`check_response`] does.
    pub async fn with_reauth<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.token.read().await.clone();
        match call(token).await {
            Err(HubError::Unauthorized) => {
                let token = self.login().await?;
                call(Some(token)).await
            }
            outcome => outcome,
        }
    }

    /// Authenticated GET returning a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        self.with_reauth(|token| {
            let request = authorize(self.client.get(&url), token);
            async move {
                let response = check_response(request.send().await?).await?;
                Ok(response.json::<T>().await?)
            }
        })
        .await
    }

    /// Authenticated PUT; returns the JSON body if the response has one.
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<Value>> {
        let url = self.url(path);
        self.with_reauth(|token| {
            let request = authorize(self.client.put(&url).json(body), token);
            async move {
                let response = check_response(request.send().await?).await?;
                let bytes = response.bytes().await?;
                if bytes.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(serde_json::from_slice(&bytes)?))
                }
            }
        })
        .await
    }
}

fn authorize(request: RequestBuilder, token: Option<String>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}
