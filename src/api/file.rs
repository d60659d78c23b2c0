use crate::api::Source;
use crate::error::Res;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a local export of the spreadsheet. The fetch timestamp is irrelevant for a file and is
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Source for FileSource {
    async fn fetch(&self, _now: DateTime<Utc>) -> Res<Vec<u8>> {
        debug!("Reading {}", self.path.display());
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Unable to read the source file {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
