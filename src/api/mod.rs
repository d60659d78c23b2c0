//! The Fetcher: retrieves the raw bytes of the budget spreadsheet.
//!
//! The `Source` trait is the seam between the pipeline and wherever the bytes live. `HttpSource`
//! talks to the published sheet, `FileSource` reads a local export and `MemorySource` holds bytes
//! for tests and offline runs.

mod file;
mod http;
mod memory;

use crate::error::Res;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use tracing::trace;
use url::Url;

pub use file::FileSource;
pub use http::HttpSource;
pub use memory::MemorySource;

/// The query parameter that carries the cache-defeating timestamp.
pub const CACHE_BUST_PARAM: &str = "v";

/// Something that can hand over the current bytes of the budget spreadsheet.
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    /// Fetches the full contents. `now` is the moment of the request, used to defeat caches in
    /// front of remote sources.
    async fn fetch(&self, now: DateTime<Utc>) -> Res<Vec<u8>>;

    /// A human-readable description of where the bytes come from, for logs.
    fn describe(&self) -> String;
}

/// Returns `base` with `v=<unix seconds of now>` appended. Existing query parameters are kept.
pub fn cache_busted_url(base: &Url, now: DateTime<Utc>) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, &now.timestamp().to_string());
    url
}

/// Picks a `Source` for `location`:
/// - `http://` and `https://` URLs are fetched with `HttpSource`
/// - `file://` URLs and plain paths are read with `FileSource`
///
/// `timeout` only applies to HTTP.
pub fn source_for(location: &str, timeout: Option<Duration>) -> Res<Box<dyn Source>> {
    let location = location.trim();
    if location.is_empty() {
        bail!("The source location is empty");
    }
    match Url::parse(location) {
        Ok(url) => match url.scheme() {
            "http" | "https" => {
                trace!("Using an HTTP source for {url}");
                Ok(Box::new(HttpSource::new(url, timeout)?))
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| anyhow::anyhow!("The file URL '{url}' is not a valid path"))?;
                Ok(Box::new(FileSource::new(path)))
            }
            // A Windows drive letter parses as a one-letter scheme.
            scheme if scheme.len() == 1 => Ok(Box::new(FileSource::new(PathBuf::from(location)))),
            scheme => bail!("Unsupported source URL scheme '{scheme}' in '{location}'"),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Ok(Box::new(FileSource::new(PathBuf::from(location))))
        }
        Err(e) => Err(e).with_context(|| format!("Unable to parse the source URL '{location}'")),
    }
}
