//! Implements the `Source` trait with a single `reqwest` GET per fetch.

use crate::api::{cache_busted_url, Source};
use crate::error::Res;
use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Fetches the published spreadsheet over HTTP. Every fetch carries a fresh `v=<timestamp>` so
/// caches between here and the origin cannot serve stale content. There is no retry: a failed
/// request fails the fetch.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base: Url,
    client: Client,
}

impl HttpSource {
    pub fn new(base: Url, timeout: Option<Duration>) -> Res<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Unable to create the HTTP client")?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

#[async_trait::async_trait]
impl Source for HttpSource {
    async fn fetch(&self, now: DateTime<Utc>) -> Res<Vec<u8>> {
        let url = cache_busted_url(&self.base, now);
        debug!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("The request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("The server rejected the request to {url}"))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Unable to read the response body from {url}"))?;
        trace!("Received {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        self.base.to_string()
    }
}
