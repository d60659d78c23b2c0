//! Implements the `Source` trait over bytes held in memory.
//!
//! This is compiled outside of tests too, so the whole pipeline can be driven without a network.

use crate::api::Source;
use crate::error::Res;
use anyhow::bail;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Hands out the same bytes on every fetch, or fails every fetch when built with `failing`. The
/// timestamps of past fetches are recorded.
#[derive(Debug, Default)]
pub struct MemorySource {
    bytes: Option<Vec<u8>>,
    fetches: Mutex<Vec<DateTime<Utc>>>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            fetches: Mutex::default(),
        }
    }

    /// A source whose every fetch fails, like an unreachable server.
    pub fn failing() -> Self {
        Self::default()
    }

    /// The `now` values of the fetches made so far.
    pub fn fetches(&self) -> Vec<DateTime<Utc>> {
        self.fetches
            .lock()
            .map(|fetches| fetches.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Source for MemorySource {
    async fn fetch(&self, now: DateTime<Utc>) -> Res<Vec<u8>> {
        if let Ok(mut fetches) = self.fetches.lock() {
            fetches.push(now);
        }
        match &self.bytes {
            Some(bytes) => Ok(bytes.clone()),
            None => bail!("The in-memory source is configured to fail"),
        }
    }

    fn describe(&self) -> String {
        match &self.bytes {
            Some(bytes) => format!("memory ({} bytes)", bytes.len()),
            None => "memory (failing)".to_string(),
        }
    }
}
