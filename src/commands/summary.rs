use crate::commands::{fetch_dataset, render_groups, Out};
use crate::model::{Field, Filter, Group, Summary};
use crate::normalize::CoercionReport;
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Write;

/// Everything the `summary` command reports.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub summary: Summary,
    pub by_departamento: Vec<Group>,
    pub by_concepto: Vec<Group>,
    pub by_anio: Vec<Group>,
    /// Empty when the spreadsheet has no month column.
    pub by_mes: Vec<Group>,
    pub by_departamento_curso: Vec<Group>,
    pub coercions: CoercionReport,
}

/// Headline figures and the standard breakdowns of the filtered dataset.
pub async fn summary(
    config: &Config,
    source_url: Option<&str>,
    filter: &Filter,
) -> Result<Out<SummaryReport>> {
    let (dataset, coercions) = fetch_dataset(config, source_url, filter).await?;
    let report = SummaryReport {
        summary: dataset.summary(),
        by_departamento: dataset.totals_by(&[Field::Departamento]),
        by_concepto: dataset.totals_by(&[Field::Concepto]),
        by_anio: dataset.totals_by(&[Field::Anio]),
        by_mes: if dataset.has_months() {
            dataset.monthly()
        } else {
            Vec::new()
        },
        by_departamento_curso: dataset.totals_by(&[Field::Departamento, Field::CursoEscolar]),
        coercions,
    };

    if dataset.is_empty() {
        return Ok(Out::new("No records match the selected filters", report));
    }

    let s = &report.summary;
    let mut message = String::new();
    let _ = writeln!(message, "Total:   {}", s.total);
    let _ = writeln!(message, "Records: {}", s.count);
    let _ = writeln!(message, "Mean:    {}", s.mean);
    let _ = writeln!(message, "Max:     {}", s.max);
    let _ = writeln!(message);
    render_groups(&mut message, "By department", &report.by_departamento);
    render_groups(&mut message, "By concept", &report.by_concepto);
    render_groups(&mut message, "By year", &report.by_anio);
    if !report.by_mes.is_empty() {
        render_groups(&mut message, "By month", &report.by_mes);
    }
    render_groups(
        &mut message,
        "By department and school year",
        &report.by_departamento_curso,
    );
    if coercions.amounts_zeroed() > 0 {
        let _ = writeln!(
            message,
            "\n{} amount cells could not be read and count as $0.00",
            coercions.amounts_zeroed()
        );
    }

    Ok(Out::new(message.trim_end(), report))
}
