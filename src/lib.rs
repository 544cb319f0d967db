//! Request core for the Twitch v5 ("Kraken") REST API.
//!
//! Stamps every outbound request with the client's credentials, resolves
//! relative paths against a configured base URL, and performs the four basic
//! HTTP verbs. GET requests that hit a server error are retried with a
//! doubling backoff; all other failures surface to the caller unchanged.
//!
//! Endpoint wrappers (channels, users, streams, ...) are built on top of
//! [`HttpClient`] and are not part of this crate.

pub mod http;

pub use http::{Credentials, HttpClient, HttpError, RetryPolicy};
