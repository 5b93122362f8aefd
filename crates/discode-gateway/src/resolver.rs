//! Gateway URL resolution
//!
//! One `GET {api_base}/gateway` lookup per connection attempt. Lookup failures
//! never fail the connection; the configured fallback URL is used instead.

use async_trait::async_trait;
use discode_common::GatewayConfig;
use serde::Deserialize;

/// Produces the URL to open for the next connection
#[async_trait]
pub trait GatewayResolver: Send + Sync {
    async fn resolve(&self) -> String;
}

#[derive(Debug, Deserialize)]
struct GatewayUrlResponse {
    url: String,
}

/// Resolver backed by the REST lookup endpoint
#[derive(Debug, Clone)]
pub struct HttpGatewayResolver {
    client: reqwest::Client,
    lookup_url: String,
    query: String,
    fallback: String,
}

impl HttpGatewayResolver {
    pub fn new(config: &GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.lookup_timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            lookup_url: config.gateway_lookup_url(),
            query: config.gateway_query(),
            fallback: config.fallback_gateway_url(),
        }
    }

    async fn lookup(&self) -> Result<String, reqwest::Error> {
        let response: GatewayUrlResponse = self
            .client
            .get(&self.lookup_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.url)
    }
}

#[async_trait]
impl GatewayResolver for HttpGatewayResolver {
    async fn resolve(&self) -> String {
        match self.lookup().await {
            Ok(url) if !url.is_empty() => {
                let url = with_query(&url, &self.query);
                tracing::debug!(url = %url, "Gateway URL resolved");
                url
            }
            Ok(_) => {
                tracing::warn!(fallback = %self.fallback, "Gateway lookup returned an empty URL");
                self.fallback.clone()
            }
            Err(e) => {
                tracing::warn!(error = %e, fallback = %self.fallback, "Gateway lookup failed");
                self.fallback.clone()
            }
        }
    }
}

/// Always resolves to the same URL
#[derive(Debug, Clone)]
pub struct StaticResolver(pub String);

#[async_trait]
impl GatewayResolver for StaticResolver {
    async fn resolve(&self) -> String {
        self.0.clone()
    }
}

/// Append the connection query unless the URL already carries one
fn with_query(url: &str, query: &str) -> String {
    if url.contains('?') {
        url.to_string()
    } else {
        format!("{}/?{}", url.trim_end_matches('/'), query)
    }
}
