//! Zencoder REST API client.
//!
//! This crate provides:
//! - An HTTPS transport that returns decoded bodies or an error envelope
//! - Stateless job verbs (create, progress, details, list, resubmit, cancel)
//! - Environment-driven configuration
//! - Request tracing spans and metrics

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod transport;

pub use client::ZencoderClient;
pub use config::{ClientConfig, API_KEY_HEADER, DEFAULT_HOST, DEFAULT_VERSION};
pub use error::{ClientError, ClientResult};
pub use transport::{Method, Request, RequestBody, Response, Transport};

pub use reqwest::header::HeaderMap;
