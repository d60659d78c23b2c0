use crate::commands::{fetch_dataset, Out};
use crate::model::{Filter, Record};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Write;

/// One line of the `top` table.
#[derive(Debug, Clone, Serialize)]
pub struct TopRow {
    pub rank: usize,
    #[serde(flatten)]
    pub record: Record,
}

/// The `n` largest expenses of the filtered dataset, largest first. `n` defaults to `top_n` from
/// the config.
pub async fn top(
    config: &Config,
    source_url: Option<&str>,
    n: Option<usize>,
    filter: &Filter,
) -> Result<Out<Vec<TopRow>>> {
    let n = n.unwrap_or(config.top_n());
    let (dataset, _) = fetch_dataset(config, source_url, filter).await?;
    let rows: Vec<TopRow> = dataset
        .top(n)
        .into_iter()
        .enumerate()
        .map(|(ix, record)| TopRow {
            rank: ix + 1,
            record: record.clone(),
        })
        .collect();

    if rows.is_empty() {
        return Ok(Out::new("No records match the selected filters", rows));
    }

    let amounts: Vec<String> = rows.iter().map(|r| r.record.importe().to_string()).collect();
    let width = amounts.iter().map(String::len).max().unwrap_or(0);
    let mut message = String::new();
    for (row, amount) in rows.iter().zip(&amounts) {
        let _ = writeln!(message, "{}", line(row, amount, width));
    }
    Ok(Out::new(message.trim_end(), rows))
}

fn line(row: &TopRow, amount: &str, width: usize) -> String {
    let r = &row.record;
    let when = match r.mes() {
        Some(mes) => format!("{mes} {}", r.anio()),
        None => r.anio().to_string(),
    };
    let mut parts: Vec<&str> = vec![
        r.concepto(),
        r.descripcion(),
        r.departamento(),
        r.curso_escolar(),
    ];
    parts.retain(|p| !p.is_empty());
    format!(
        "{:>3}. {amount:>width$}  {}  ({when})",
        row.rank,
        parts.join(" | ")
    )
}
