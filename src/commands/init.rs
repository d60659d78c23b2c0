use crate::commands::Out;
use crate::error::{Error, ErrorType};
use crate::{Config, Result};
use anyhow::anyhow;
use std::path::Path;

/// Creates the home directory and an initial `config.json` pointing at `source_url`.
///
/// # Arguments
/// - `home` - The directory that will hold the configuration, e.g. `$HOME/presupuestos`
/// - `source_url` - Where the spreadsheet is published. An http(s) URL, a file URL or a path.
///
/// # Errors
/// - Returns an error if `source_url` is missing or unusable, or if any file operations fail.
pub async fn init(home: &Path, source_url: Option<&str>) -> Result<Out<()>> {
    let source_url = source_url.ok_or_else(|| {
        Error::new(
            ErrorType::Config,
            anyhow!("init requires --source-url to know where the spreadsheet is published"),
        )
    })?;
    let config = Config::create(home, source_url).await?;
    Ok(format!("Wrote {}", config.config_path().display()).into())
}
