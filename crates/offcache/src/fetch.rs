//! # Network Fetch
//!
//! This module owns the HTTP client and the [`Fetcher`] trait seam the
//! router and sync handler go through for every network access. Keeping
//! the seam explicit lets callers inject their own transport.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::ProxyError;
use crate::http::{ProxyResponse, Request};

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &FetchConfig) -> Result<Client, ProxyError> {
    let mut client_builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    client_builder.build().map_err(ProxyError::from)
}

/// Transport seam for everything that needs the network.
///
/// A fetch resolves with a buffered [`ProxyResponse`] for any HTTP
/// exchange that completed, successful status or not; only transport-level
/// failures surface as errors. Callers decide what a non-success status
/// means for their strategy.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<ProxyResponse, ProxyError>;
}

/// reqwest-backed fetcher used in production
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, ProxyError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    /// Wrap an existing client, e.g. one shared with other subsystems
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<ProxyResponse, ProxyError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ProxyError::InvalidUrl(format!("invalid method {}", request.method)))?;

        let response = self
            .client
            .request(method, request.url.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        debug!(url = %request.url, status = status, bytes = body.len(), "fetch completed");
        Ok(ProxyResponse::new(status, headers, body))
    }
}
