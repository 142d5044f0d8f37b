//! The pluggable send side of the forwarder.
//!
//! A [`Transport`] consumes a staged element's bytes and either returns
//! (delivered) or errors (dropped — the engine is at-most-once). It has no
//! visibility into tiering; [`SendElement::payload`] hides whether the
//! bytes live in memory or in a spill file.
//!
//! Transports are injected at construction, not subclassed: pick
//! [`HttpTransport`](crate::transport::http::HttpTransport) for HTTP
//! delivery, [`NoopTransport`] for wiring and tests, or implement the
//! trait for anything else.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::element::SendElement;

#[derive(Error, Debug)]
pub enum TransportError {
    /// Reading the staged payload failed (e.g. the spill file vanished).
    #[error("failed to read staged payload: {0}")]
    Payload(#[from] std::io::Error),
    /// The HTTP request itself failed (connect, timeout, TLS).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The remote collector rejected or failed the send.
    #[error("send failed: {0}")]
    Rejected(String),
}

/// A destination for dispatched elements.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fully consume the element's payload and deliver it.
    ///
    /// Success and failure are both terminal for the element; the worker
    /// releases it either way and never re-dispatches.
    async fn send(&self, element: &SendElement) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, element: &SendElement) -> Result<(), TransportError> {
        (**self).send(element).await
    }
}

/// Transport that reads and discards every payload. Useful for tests and
/// for wiring up producers before a real collector exists.
#[derive(Debug, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, element: &SendElement) -> Result<(), TransportError> {
        let _ = element.payload().await?;
        Ok(())
    }
}
