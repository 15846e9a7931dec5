use std::time::Duration;

use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::CurrentUser;

use crate::error::ApiError;

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout ({}), using defaults", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>, request_id: &Uuid) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert("X-Request-Id", value);
        }

        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Unauthorized {
                    status: 401,
                    detail: Some("Malformed session token".to_string()),
                })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Sends a request and decodes the JSON response body.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        self.request_with_query(method, path, &[], auth_token, body).await
    }

    pub async fn request_with_query<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let text = self.send(method, path, query, auth_token, body).await?;
        let data = serde_json::from_str::<T>(&text)?;
        Ok(data)
    }

    /// For endpoints answering 200/204 without a meaningful body.
    pub async fn request_no_content(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send(method, path, &[], auth_token, None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let request_id = Uuid::new_v4();
        debug!(%request_id, "{} {}", method, url);

        let headers = self.get_headers(auth_token, &request_id)?;

        let mut req = self.client.request(method.clone(), &url).headers(headers);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(|e| {
            error!(%request_id, "{} {} failed: {}", method, url, e);
            ApiError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!(%request_id, "API error ({}): {}", status, text);
            return Err(ApiError::from_status(status, &text));
        }

        Ok(text)
    }

    /// `GET /auth/me` for the session owner.
    pub async fn current_user(&self, auth_token: &str) -> Result<CurrentUser, ApiError> {
        self.request(Method::GET, "/auth/me", Some(auth_token), None).await
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
