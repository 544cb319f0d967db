//! HTTP request executor with credential stamping and GET retry.

mod client;
mod error;
mod retry;
mod transport;

pub use client::{Credentials, HttpClient, DEFAULT_BASE_URL};
pub use error::HttpError;
pub use retry::{RetryPolicy, INITIAL_BACKOFF, MAX_RETRIES};
pub use transport::{HttpResponse, ReqwestTransport, Transport};
