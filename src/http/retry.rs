//! Backoff retry for idempotent reads that hit a server error.

use std::time::Duration;

use anyhow::Result;
use log::warn;
use reqwest::Url;
use reqwest::header::HeaderMap;

use super::transport::{HttpResponse, Transport};

/// Default delay before the first retry attempt.
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Default maximum number of retry attempts.
pub const MAX_RETRIES: usize = 3;

/// Bounded doubling backoff applied to GETs that returned a server error.
///
/// Only GETs are retried; the other verbs are not assumed safe to repeat.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    initial_backoff: Duration,
    max_retries: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(initial_backoff: Duration, max_retries: usize) -> Self {
        Self {
            initial_backoff,
            max_retries,
        }
    }

    /// The delay applied before each attempt, doubling every time.
    pub fn backoff_delays(&self) -> impl Iterator<Item = Duration> {
        let initial = self.initial_backoff;
        (0..self.max_retries as u32).map(move |attempt| initial * 2u32.pow(attempt))
    }

    /// Re-issues the identical GET until a response below the server-error
    /// range arrives. A non-retryable client error terminates the loop just
    /// like a success.
    ///
    /// When every attempt comes back >= 500, the caller's original failing
    /// response is returned, not the last attempt's. Existing callers depend
    /// on seeing the response that triggered retrying.
    pub async fn run(
        &self,
        transport: &dyn Transport,
        url: &Url,
        headers: &HeaderMap,
        original: HttpResponse,
    ) -> Result<HttpResponse> {
        let mut backoff = self.initial_backoff;

        for attempt in 1..=self.max_retries {
            warn!(
                "GET {} attempt {}/{} after {:?} backoff...",
                url, attempt, self.max_retries, backoff
            );
            tokio::time::sleep(backoff).await;

            let response = transport.get(url, headers).await?;
            if !response.is_server_error() {
                return Ok(response);
            }
            backoff *= 2;
        }

        Ok(original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::transport::MockTransport;
    use mockall::Sequence;
    use reqwest::StatusCode;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), 3)
    }

    fn kraken_url() -> Url {
        Url::parse("https://api.twitch.tv/kraken/streams").unwrap()
    }

    #[test]
    fn test_default_backoff_sequence_doubles() {
        let delays: Vec<Duration> = RetryPolicy::default().backoff_delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
            ]
        );
    }

    #[tokio::test]
    async fn test_returns_first_response_below_500() {
        let mut seq = Sequence::new();
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(response(503, "still down")));
        transport
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(response(200, r#"{"ok":true}"#)));

        let result = fast_policy()
            .run(
                &transport,
                &kraken_url(),
                &HeaderMap::new(),
                response(500, "original"),
            )
            .await
            .unwrap();

        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_client_error_terminates_like_success() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_, _| Ok(response(404, "gone")));

        let result = fast_policy()
            .run(
                &transport,
                &kraken_url(),
                &HeaderMap::new(),
                response(500, "original"),
            )
            .await
            .unwrap();

        assert_eq!(result.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_original_response() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(3)
            .returning(|_, _| Ok(response(502, "last attempt")));

        let result = fast_policy()
            .run(
                &transport,
                &kraken_url(),
                &HeaderMap::new(),
                response(500, "original"),
            )
            .await
            .unwrap();

        assert_eq!(result.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(result.body, "original");
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));

        let result = fast_policy()
            .run(
                &transport,
                &kraken_url(),
                &HeaderMap::new(),
                response(500, "original"),
            )
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_zero_retries_returns_original_immediately() {
        let transport = MockTransport::new();

        let result = RetryPolicy::new(Duration::from_millis(1), 0)
            .run(
                &transport,
                &kraken_url(),
                &HeaderMap::new(),
                response(500, "original"),
            )
            .await
            .unwrap();

        assert_eq!(result.body, "original");
    }
}
