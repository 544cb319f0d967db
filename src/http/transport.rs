//! Injected HTTP transport capability.
//!
//! The executor and the retry policy talk to the network through the
//! [`Transport`] trait, so tests can substitute a fake transport without any
//! network I/O. [`ReqwestTransport`] is the production implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

/// An HTTP response as plain data: status code plus raw body.
///
/// Held by value so the retry policy can keep the original failing response
/// around while re-issuing the request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    /// True when the status is in the server-error range (>= 500).
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

/// One HTTP round trip per call. Transport-level failures (DNS, refused
/// connection, timeout) surface as errors and are never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse>;
    async fn post<'a>(
        &self,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&'a Value>,
    ) -> Result<HttpResponse>;
    async fn put<'a>(
        &self,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&'a Value>,
    ) -> Result<HttpResponse>;
    async fn delete(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse>;
}

/// Production transport backed by a shared reqwest [`Client`].
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await
            .context("Failed to send request")?;
        Self::read(response).await
    }

    async fn post<'a>(
        &self,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&'a Value>,
    ) -> Result<HttpResponse> {
        let mut request = self.client.post(url.clone()).headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.context("Failed to send request")?;
        Self::read(response).await
    }

    async fn put<'a>(
        &self,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&'a Value>,
    ) -> Result<HttpResponse> {
        let mut request = self.client.put(url.clone()).headers(headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.context("Failed to send request")?;
        Self::read(response).await
    }

    async fn delete(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse> {
        let response = self
            .client
            .delete(url.clone())
            .headers(headers.clone())
            .send()
            .await
            .context("Failed to send request")?;
        Self::read(response).await
    }
}
