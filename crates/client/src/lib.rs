//! `vigil-client` -- access to the metrics and alerting backend.
//!
//! [`backend::AlertBackend`] is the capability the engine depends on,
//! [`http::HttpAlertBackend`] implements it over REST, and
//! [`retry::RetryPolicy`] wraps individual calls with bounded backoff.

pub mod backend;
pub mod error;
pub mod http;
pub mod retry;
