use crate::commands::{fetch_dataset, render_groups, Out};
use crate::model::{Field, Filter, Group};
use crate::{Config, Result};
use std::fmt::Write;

/// Sums `importe` over every combination of `by`.
pub async fn totals(
    config: &Config,
    source_url: Option<&str>,
    by: &[Field],
    filter: &Filter,
) -> Result<Out<Vec<Group>>> {
    let (dataset, _) = fetch_dataset(config, source_url, filter).await?;
    let groups = dataset.totals_by(by);
    let title = by
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" / ");
    let mut message = String::new();
    render_groups(&mut message, &format!("Totals by {title}"), &groups);
    let _ = write!(message, "Total: {}", dataset.total());
    Ok(Out::new(message, groups))
}
