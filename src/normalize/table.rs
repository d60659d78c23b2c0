//! Decoding raw document bytes into a `RawTable`: a header row plus rows of `Cell`s.

use crate::error::Res;
use crate::model::Cell;
use anyhow::{bail, Context};
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

/// The header row and data rows of a sheet, before canonicalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Builds a table from a header row and data rows. Short rows are padded with empty cells,
    /// fully blank rows are skipped and a row wider than the headers is an error.
    pub(crate) fn new<H, R>(headers: H, rows: R) -> Res<Self>
    where
        H: IntoIterator<Item = String>,
        R: IntoIterator<Item = Vec<Cell>>,
    {
        let headers: Vec<String> = headers
            .into_iter()
            .enumerate()
            .map(|(ix, h)| {
                if h.trim().is_empty() {
                    format!("unnamed_{ix}")
                } else {
                    h
                }
            })
            .collect();
        let width = headers.len();

        let mut data = Vec::new();
        for (row_ix, mut row) in rows.into_iter().enumerate() {
            if row.iter().all(Cell::is_empty) {
                continue;
            }
            if row.len() > width {
                bail!(
                    "A row longer than the headers list was encountered at row {} \
                    ({} cells, {} headers)",
                    row_ix + 2,
                    row.len(),
                    width
                );
            }
            row.resize(width, Cell::Empty);
            data.push(row);
        }

        Ok(Self {
            headers,
            rows: data,
        })
    }

    pub(crate) fn headers(&self) -> &[String] {
        &self.headers
    }

    pub(crate) fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub(crate) fn width(&self) -> usize {
        self.headers.len()
    }

    /// True when every non-empty cell in `column` is numeric.
    pub(crate) fn is_numeric_column(&self, column: usize) -> bool {
        self.rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|cell| !cell.is_empty())
            .all(|cell| cell.as_number().is_some())
    }

    /// Parses comma-delimited UTF-8 text whose first record is the header row.
    pub(crate) fn from_csv(bytes: &[u8]) -> Res<Self> {
        let text = std::str::from_utf8(bytes).context("The CSV data is not valid UTF-8")?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();

        let headers: Vec<String> = match records.next() {
            Some(header_row) => header_row
                .context("Unable to read the CSV header row")?
                .iter()
                .map(String::from)
                .collect(),
            None => bail!("The CSV data is empty"),
        };

        let mut rows = Vec::new();
        for (ix, record) in records.enumerate() {
            let record = record.with_context(|| format!("Unable to read CSV row {}", ix + 2))?;
            rows.push(record.iter().map(Cell::from_text).collect());
        }

        Self::new(headers, rows)
    }

    /// Reads the worksheet named `sheet` from XLSX bytes. The first row of the sheet's used
    /// range is the header row.
    pub(crate) fn from_xlsx(bytes: &[u8], sheet: &str) -> Res<Self> {
        let mut workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(bytes)).context("Unable to open the XLSX workbook")?;

        let sheet_names = workbook.sheet_names();
        if !sheet_names.iter().any(|name| name == sheet) {
            bail!(
                "The workbook has no sheet named '{sheet}' (found: {})",
                sheet_names.join(", ")
            );
        }

        let range = workbook
            .worksheet_range(sheet)
            .with_context(|| format!("Unable to read the sheet '{sheet}'"))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| cell_from_data(cell).text().into_owned())
                .collect(),
            None => bail!("The sheet '{sheet}' is empty"),
        };
        let data: Vec<Vec<Cell>> = rows
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();

        Self::new(headers, data)
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from_text(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::from_text(other.to_string()),
    }
}
