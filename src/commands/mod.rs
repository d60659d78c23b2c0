//! Command handlers for the presupuestos CLI.
//!
//! Each handler fetches a fresh copy of the spreadsheet, so two runs never share data.

mod filters;
mod init;
mod summary;
mod top;
mod totals;

use crate::api::Source;
use crate::model::{Dataset, Filter, Group};
use crate::normalize::CoercionReport;
use crate::{load, Config, Result};
use chrono::Utc;
use serde::Serialize;
use std::fmt::{Debug, Write};
use tracing::{debug, error};

pub use filters::filters;
pub use init::init;
pub use summary::{summary, SummaryReport};
pub use top::{top, TopRow};
pub use totals::totals;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to stdout, or with `json` the structured data (falling back to the
    /// message when there is none).
    pub fn print(&self, json: bool) {
        match (json, self.structure()) {
            (true, Some(structure)) => match serde_json::to_string_pretty(structure) {
                Ok(s) => println!("{s}"),
                Err(e) => error!("Unable to serialize the command output: {e}"),
            },
            _ => println!("{}", self.message),
        }
    }
}

/// Fetches and normalizes the spreadsheet, then applies `filter`.
pub(crate) async fn fetch_dataset(
    config: &Config,
    source_url: Option<&str>,
    filter: &Filter,
) -> Result<(Dataset, CoercionReport)> {
    let source: Box<dyn Source> = config.source(source_url)?;
    let normalizer = config.normalizer()?;
    let loaded = load(source.as_ref(), &normalizer, Utc::now()).await?;
    let report = *loaded.report();
    let filtered = loaded.dataset().filter(filter);
    debug!(
        "{} of {} records match the filter",
        filtered.len(),
        loaded.dataset().len()
    );
    Ok((filtered, report))
}

/// Renders groups as an aligned two-column table under `title`.
pub(crate) fn render_groups(out: &mut String, title: &str, groups: &[Group]) {
    let labels: Vec<String> = groups
        .iter()
        .map(|g| {
            g.keys()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" / ")
        })
        .collect();
    let totals: Vec<String> = groups.iter().map(|g| g.total().to_string()).collect();
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let total_width = totals.iter().map(String::len).max().unwrap_or(0);

    let _ = writeln!(out, "{title}");
    for (label, total) in labels.iter().zip(&totals) {
        let pad = label_width - label.chars().count();
        let _ = writeln!(
            out,
            "  {label}{:pad$}  {total:>total_width$}",
            "",
            pad = pad
        );
    }
}
