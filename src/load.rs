use crate::api::{self, Source};
use crate::error::{ErrorType, IntoResult, Result};
use crate::normalize::{Loaded, Normalizer};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Fetches the current spreadsheet from `source` and normalizes it. Every call is independent:
/// nothing is cached and a failure at either step returns no data at all.
pub async fn load(
    source: &dyn Source,
    normalizer: &Normalizer,
    now: DateTime<Utc>,
) -> Result<Loaded> {
    debug!("Fetching from {}", source.describe());
    let bytes = source.fetch(now).await.pub_result(ErrorType::Transport)?;
    let loaded = normalizer.normalize(&bytes)?;
    info!(
        "Loaded {} records from {}",
        loaded.dataset().len(),
        source.describe()
    );
    let report = loaded.report();
    if !report.is_clean() {
        warn!(
            "Coerced cells: {} missing amounts, {} unparseable amounts, {} negative amounts, \
            {} unknown months, {} bad years",
            report.missing_amounts,
            report.unparseable_amounts,
            report.negative_amounts,
            report.unknown_months,
            report.bad_years
        );
    }
    Ok(loaded)
}

/// `load` with the default `Normalizer` and the `Source` that `base_url` calls for.
pub async fn load_url(base_url: &str, now: DateTime<Utc>) -> Result<Loaded> {
    let source = api::source_for(base_url, None).pub_result(ErrorType::Config)?;
    load(source.as_ref(), &Normalizer::default(), now).await
}
