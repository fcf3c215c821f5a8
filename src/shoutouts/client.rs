//! HTTP client for the shout-outs REST API.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::error::{FetchError, Result};
use crate::primitives::polling::{FetchFuture, PageQuery};
use crate::shoutouts::api::ShoutoutApi;
use crate::shoutouts::config::ClientConfig;
use crate::shoutouts::types::{NewShoutout, Shoutout, ShoutoutId, UserEntity};

/// Shout-outs API client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ShoutoutClient {
    base_url: String,
    http: Client,
}

impl ShoutoutClient {
    /// Create a client from a config.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::message(format!("invalid header name {name:?}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::message(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .default_headers(headers);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let http = builder.build().map_err(FetchError::Http)?;

        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }

    /// Create a client with default settings against `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(&ClientConfig::new(base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // ---------- Users ----------

    /// `GET /users`
    pub async fn users(&self) -> Result<Vec<UserEntity>> {
        let url = self.url("users");
        trace!(%url, "GET users");
        let response = self.http.get(&url).send().await?;
        Self::read_json(Self::check_response(response).await?).await
    }

    // ---------- Shout-outs ----------

    /// `GET /shoutouts`, with `limit`/`offset` only when set and non-zero.
    pub async fn shoutouts(&self, query: PageQuery) -> Result<Vec<Shoutout>> {
        let url = self.url("shoutouts");
        let pairs = query.to_query_pairs();
        trace!(%url, ?pairs, "GET shoutouts");
        let response = self.http.get(&url).query(&pairs).send().await?;
        Self::read_json(Self::check_response(response).await?).await
    }

    /// `POST /shoutouts`
    pub async fn create(&self, shoutout: &NewShoutout) -> Result<Shoutout> {
        let url = self.url("shoutouts");
        trace!(%url, "POST shoutouts");
        let response = self.http.post(&url).json(shoutout).send().await?;
        Self::read_json(Self::check_response(response).await?).await
    }

    /// `DELETE /shoutouts?id=`. The response body is ignored.
    pub async fn delete(&self, id: ShoutoutId) -> Result<()> {
        let url = self.url("shoutouts");
        trace!(%url, id, "DELETE shoutouts");
        let response = self
            .http
            .delete(&url)
            .query(&[("id", id.to_string())])
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

impl ShoutoutApi for ShoutoutClient {
    fn list_users(&self) -> FetchFuture<Vec<UserEntity>> {
        let client = self.clone();
        Box::pin(async move { client.users().await })
    }

    fn list_shoutouts(&self, query: PageQuery) -> FetchFuture<Vec<Shoutout>> {
        let client = self.clone();
        Box::pin(async move { client.shoutouts(query).await })
    }

    fn create_shoutout(&self, shoutout: NewShoutout) -> FetchFuture<Shoutout> {
        let client = self.clone();
        Box::pin(async move { client.create(&shoutout).await })
    }

    fn delete_shoutout(&self, id: ShoutoutId) -> FetchFuture<()> {
        let client = self.clone();
        Box::pin(async move { client.delete(id).await })
    }
}
