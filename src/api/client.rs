//! Thin JSON client over `reqwest`.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ClientConfig;

/// JSON client bound to one backend base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        // `Url::join` drops the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Self::build_client(config)?;
        Ok(Self { base_url, client })
    }

    fn build_client(config: &ClientConfig) -> ApiResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        let json = HeaderValue::from_static("application/json");
        headers.insert(CONTENT_TYPE, json.clone());
        headers.insert(ACCEPT, json);

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an API path (`api/roles` or `/api/roles`) against the base URL.
    pub fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// `GET` a path and decode the JSON body.
    pub async fn get_json<T>(&self, path: &str) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!("GET {url}");

        let response = self.client.get(url).send().await?;
        let body = read_success(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `POST` a JSON body and decode the JSON reply.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let reply = self.post(path, body).await?;
        Ok(serde_json::from_slice(&reply)?)
    }

    /// `POST` a JSON body, keeping only the success/failure outcome.
    pub async fn post_discard<B>(&self, path: &str, body: &B) -> ApiResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.post(path, body).await.map(drop)
    }

    async fn post<B>(&self, path: &str, body: &B) -> ApiResult<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        tracing::debug!("POST {url}");

        let response = self.client.post(url).json(body).send().await?;
        read_success(response).await
    }
}

async fn read_success(response: reqwest::Response) -> ApiResult<Vec<u8>> {
    let status = response.status();
    let body = response.bytes().await?.to_vec();

    if status.is_success() {
        return Ok(body);
    }

    let detail = extract_detail(&body);
    tracing::debug!(status = status.as_u16(), ?detail, "backend rejected request");
    Err(ApiError::Status {
        status: status.as_u16(),
        detail,
    })
}

/// Pull a string `detail` out of an error body.
///
/// Validation errors that carry a structured `detail` (arrays, objects) are
/// ignored so callers fall back to their generic message.
#[must_use]
pub fn extract_detail(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .filter(|detail| !detail.trim().is_empty())
        .map(str::to_string)
}
