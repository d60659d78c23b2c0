use crate::commands::{fetch_dataset, Out};
use crate::model::{Filter, FilterValues};
use crate::{Config, Result};
use std::fmt::Write;

/// Lists the distinct departments, school years and calendar years, which are the values the
/// filter options accept.
pub async fn filters(config: &Config, source_url: Option<&str>) -> Result<Out<FilterValues>> {
    let (dataset, _) = fetch_dataset(config, source_url, &Filter::new()).await?;
    let values = dataset.filter_values();

    let mut message = String::new();
    let _ = writeln!(message, "Departments:");
    for d in &values.departamentos {
        let _ = writeln!(message, "  {d}");
    }
    let _ = writeln!(message, "School years:");
    for c in &values.cursos {
        let _ = writeln!(message, "  {c}");
    }
    let years: Vec<String> = values.anios.iter().map(ToString::to_string).collect();
    let _ = write!(message, "Years: {}", years.join(", "));

    Ok(Out::new(message, values))
}
