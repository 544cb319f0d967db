//! Request executor: URL resolution, credential headers, the four verbs.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::HttpError;
use super::retry::RetryPolicy;
use super::transport::{HttpResponse, ReqwestTransport, Transport};

/// Default base URL all relative request paths resolve against.
pub const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/kraken/";

/// Versioned accept header sent with every request.
const ACCEPT_V5: &str = "application/vnd.twitchtv.v5+json";

const CLIENT_ID: HeaderName = HeaderName::from_static("client-id");

/// API credentials, fixed at construction and never mutated.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    oauth_token: Option<String>,
}

impl Credentials {
    pub fn new(client_id: &str, oauth_token: Option<&str>) -> Self {
        Self {
            client_id: client_id.to_string(),
            oauth_token: oauth_token.map(str::to_string),
        }
    }

    /// Builds the headers stamped onto every request. The authorization
    /// header is omitted entirely when no token is present.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V5));
        headers.insert(
            CLIENT_ID,
            HeaderValue::from_str(&self.client_id).context("Invalid client ID")?,
        );

        if let Some(token) = &self.oauth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("OAuth {token}"))
                    .context("Invalid OAuth token")?,
            );
        }

        Ok(headers)
    }
}

/// HTTP request executor for the Twitch v5 API.
///
/// Resolves paths against the configured base URL, stamps credential headers,
/// and retries GETs on server errors per the configured [`RetryPolicy`].
/// Clones share the underlying transport.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    credentials: Credentials,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Creates a client against the production API with the default retry
    /// policy and a reqwest-backed transport.
    pub fn new(client_id: &str, oauth_token: Option<&str>) -> Result<Self> {
        Self::with_base_url(client_id, oauth_token, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL. Used for alternate
    /// environments and test servers.
    pub fn with_base_url(client_id: &str, oauth_token: Option<&str>, base_url: &str) -> Result<Self> {
        Ok(Self {
            transport: Arc::new(ReqwestTransport::default()),
            base_url: Url::parse(base_url)
                .with_context(|| format!("Invalid base URL: {base_url}"))?,
            credentials: Credentials::new(client_id, oauth_token),
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the transport. Used to inject a fake transport in tests.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Performs a GET request and deserializes the JSON response.
    /// Server errors are retried per the configured policy; the final
    /// response must be a success or the call fails with [`HttpError`].
    #[tracing::instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = self.build_url(path, params)?;
        let headers = self.credentials.headers()?;
        debug!("GET {}...", url);

        let mut response = self.transport.get(&url, &headers).await?;
        if response.is_server_error() {
            response = self
                .retry
                .run(self.transport.as_ref(), &url, &headers, response)
                .await?;
        }

        let response = fail_on_error_status(response, &url)?;
        serde_json::from_str(&response.body).context("Failed to parse JSON response")
    }

    /// Performs a POST request with an optional JSON body. Never retried.
    /// Returns the decoded body on status 200 and `None` on any other
    /// success status.
    #[tracing::instrument(skip(self, body))]
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = self.build_url(path, params)?;
        let headers = self.credentials.headers()?;
        debug!("POST {}...", url);

        let response = self.transport.post(&url, &headers, body).await?;
        decode_on_ok(response, &url)
    }

    /// Performs a PUT request with an optional JSON body. Same contract as
    /// [`HttpClient::post`].
    #[tracing::instrument(skip(self, body))]
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = self.build_url(path, params)?;
        let headers = self.credentials.headers()?;
        debug!("PUT {}...", url);

        let response = self.transport.put(&url, &headers, body).await?;
        decode_on_ok(response, &url)
    }

    /// Performs a DELETE request with no body. Same contract as
    /// [`HttpClient::post`].
    #[tracing::instrument(skip(self))]
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = self.build_url(path, params)?;
        let headers = self.credentials.headers()?;
        debug!("DELETE {}...", url);

        let response = self.transport.delete(&url, &headers).await?;
        decode_on_ok(response, &url)
    }

    /// Resolves a path against the base URL. A path starting with `/`
    /// replaces the base's path component; a relative path appends to it.
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .with_context(|| format!("Failed to resolve path: {path}"))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

/// Fails with [`HttpError`] when the final status is a client or server
/// error.
fn fail_on_error_status(response: HttpResponse, url: &Url) -> Result<HttpResponse> {
    if response.status.is_client_error() || response.status.is_server_error() {
        return Err(HttpError::new(response.status, url.clone(), response.body).into());
    }
    Ok(response)
}

/// Decodes the body only on status 200; other success statuses carry no
/// body the caller may rely on.
fn decode_on_ok<T: DeserializeOwned>(response: HttpResponse, url: &Url) -> Result<Option<T>> {
    let response = fail_on_error_status(response, url)?;
    if response.status != StatusCode::OK {
        return Ok(None);
    }
    serde_json::from_str(&response.body)
        .map(Some)
        .context("Failed to parse JSON response")
}
