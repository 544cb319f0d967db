//! Status-carrying failure for requests that complete with an error code.

use reqwest::{StatusCode, Url};

/// Error raised when a request finishes with a client or server error status
/// after all applicable retries.
///
/// Carries the status code and response body so callers can recover them with
/// `downcast_ref::<HttpError>()` on the `anyhow` chain.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    url: Url,
    body: String,
}

impl HttpError {
    pub(crate) fn new(status: StatusCode, url: Url, body: String) -> Self {
        Self { status, url, body }
    }

    /// The final status code of the failed request.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The URL the failed request was issued against.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The raw response body, possibly empty.
    pub fn body(&self) -> &str {
        &self.body
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} for {}", self.status, self.url)?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status_and_url() {
        let err = HttpError::new(
            StatusCode::NOT_FOUND,
            Url::parse("https://api.twitch.tv/kraken/channels/1").unwrap(),
            "channel not found".to_string(),
        );
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("https://api.twitch.tv/kraken/channels/1"));
        assert!(text.contains("channel not found"));
    }

    #[test]
    fn test_display_omits_empty_body() {
        let err = HttpError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            Url::parse("https://api.twitch.tv/kraken/").unwrap(),
            String::new(),
        );
        assert!(!err.to_string().ends_with(": "));
    }

    #[test]
    fn test_downcast_from_anyhow_carries_status() {
        let err = anyhow::Error::from(HttpError::new(
            StatusCode::BAD_REQUEST,
            Url::parse("https://api.twitch.tv/kraken/").unwrap(),
            String::new(),
        ));
        let http_err = err.downcast_ref::<HttpError>().unwrap();
        assert_eq!(http_err.status(), StatusCode::BAD_REQUEST);
    }
}
