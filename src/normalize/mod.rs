//! The Normalizer: raw spreadsheet bytes in, a canonical `Dataset` out.
//!
//! Structural problems (unreadable bytes, a missing sheet, missing required columns) fail the
//! whole call. Problems in individual cells never do; they are coerced and counted in a
//! `CoercionReport`.

mod table;

use crate::error::{Error, ErrorType, IntoResult, Result};
use crate::model::mapping::{
    self, ANIO, CONCEPTO, CURSO_ESCOLAR, DEPARTAMENTO, DESCRIPCION, IMPORTE, MES, PROPOSITO,
};
use crate::model::{AliasTable, Amount, AmountShape, Cell, Dataset, Mapping, Month, Record};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub(crate) use table::RawTable;

/// The sheet the budget workbook keeps its rows in.
pub const DEFAULT_SHEET_NAME: &str = "Base datos";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// The document format of the source bytes.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Decide from the bytes: a zip container is XLSX, anything else is CSV.
    #[default]
    Auto,
    Xlsx,
    Csv,
}

serde_plain::derive_display_from_serialize!(SourceFormat);
serde_plain::derive_fromstr_from_deserialize!(SourceFormat);

impl SourceFormat {
    /// Resolves `Auto` by sniffing `bytes`.
    pub fn resolve(self, bytes: &[u8]) -> SourceFormat {
        match self {
            SourceFormat::Auto if bytes.starts_with(ZIP_MAGIC) => SourceFormat::Xlsx,
            SourceFormat::Auto => SourceFormat::Csv,
            other => other,
        }
    }
}

/// Counts of cells that were coerced rather than read as-is. All zero for a clean sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoercionReport {
    /// Amount cells that were empty or `nan`.
    pub missing_amounts: usize,
    /// Amount cells that did not parse under any convention.
    pub unparseable_amounts: usize,
    /// Amount cells holding a negative number.
    pub negative_amounts: usize,
    /// Non-empty month cells that are not one of the twelve abbreviations.
    pub unknown_months: usize,
    /// Year cells that are not a non-negative integer.
    pub bad_years: usize,
}

impl CoercionReport {
    /// Amount cells that ended up as zero instead of their written value.
    pub fn amounts_zeroed(&self) -> usize {
        self.missing_amounts + self.unparseable_amounts + self.negative_amounts
    }

    pub fn is_clean(&self) -> bool {
        *self == CoercionReport::default()
    }
}

/// A freshly normalized dataset together with its coercion diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Loaded {
    dataset: Dataset,
    report: CoercionReport,
}

impl Loaded {
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn report(&self) -> &CoercionReport {
        &self.report
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }
}

/// Turns raw spreadsheet bytes into a `Dataset`. One `Normalizer` serves every variant of the
/// budget sheet; the variants differ only in format, sheet name and header aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalizer {
    format: SourceFormat,
    sheet_name: Option<String>,
    aliases: AliasTable,
    positional: Option<Vec<String>>,
}

impl Normalizer {
    pub fn builder() -> NormalizerBuilder {
        NormalizerBuilder::default()
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn sheet_name(&self) -> &str {
        self.sheet_name.as_deref().unwrap_or(DEFAULT_SHEET_NAME)
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Parses `bytes` and produces the canonical dataset.
    pub fn normalize(&self, bytes: &[u8]) -> Result<Loaded> {
        let format = self.format.resolve(bytes);
        debug!("Parsing {} bytes as {format}", bytes.len());
        let table = match format {
            SourceFormat::Xlsx => RawTable::from_xlsx(bytes, self.sheet_name()),
            _ => RawTable::from_csv(bytes),
        }
        .pub_result(ErrorType::Format)?;
        self.normalize_table(&table)
    }

    pub(crate) fn normalize_table(&self, table: &RawTable) -> Result<Loaded> {
        let mapping = self.mapping(table)?;
        trace!("Canonical columns: {:?}", mapping.columns());

        let missing = mapping.missing_required();
        if !missing.is_empty() {
            return Err(Error::new(
                ErrorType::Schema,
                anyhow!(
                    "Required columns are missing: {} (found: {})",
                    missing.join(", "),
                    mapping.columns().join(", ")
                ),
            ));
        }

        let columns = Columns::new(&mapping, table);
        let mut report = CoercionReport::default();
        let records = table
            .rows()
            .iter()
            .map(|row| columns.record(row, &mut report))
            .collect();

        Ok(Loaded {
            dataset: Dataset::new(records, columns.mes.is_some()),
            report,
        })
    }

    fn mapping(&self, table: &RawTable) -> Result<Mapping> {
        match &self.positional {
            Some(names) if names.len() != table.width() => Err(Error::new(
                ErrorType::Schema,
                anyhow!(
                    "Expected {} columns to assign by position but the sheet has {}",
                    names.len(),
                    table.width()
                ),
            )),
            Some(names) => Mapping::new(names, &self.aliases).pub_result(ErrorType::Schema),
            None => Mapping::new(table.headers(), &self.aliases).pub_result(ErrorType::Schema),
        }
    }
}

/// Configures a `Normalizer`.
#[derive(Debug, Clone, Default)]
pub struct NormalizerBuilder {
    format: SourceFormat,
    sheet_name: Option<String>,
    aliases: AliasTable,
    extra_aliases: Vec<(String, String)>,
    positional: Option<Vec<String>>,
}

impl NormalizerBuilder {
    pub fn format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    /// The worksheet to read from XLSX sources. Defaults to `Base datos`.
    pub fn sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }

    /// Replaces the default alias table.
    pub fn aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// Adds one alias on top of the table.
    pub fn alias(mut self, header: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.extra_aliases.push((header.into(), canonical.into()));
        self
    }

    /// Ignores the sheet's header titles and names the columns by position instead.
    pub fn positional_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.positional = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Names the columns by position using the budget workbook's eight-column layout.
    pub fn budget_workbook_columns(self) -> Self {
        self.positional_columns(mapping::POSITIONAL)
    }

    pub fn build(self) -> Result<Normalizer> {
        let aliases = if self.extra_aliases.is_empty() {
            self.aliases
        } else {
            self.aliases
                .extended(self.extra_aliases)
                .pub_result(ErrorType::Config)?
        };
        Ok(Normalizer {
            format: self.format,
            sheet_name: self.sheet_name,
            aliases,
            positional: self.positional,
        })
    }
}

/// Column indices of the canonical fields in one table.
struct Columns {
    concepto: Option<usize>,
    proposito: Option<usize>,
    descripcion: Option<usize>,
    departamento: usize,
    curso_escolar: usize,
    mes: Option<MonthColumn>,
    anio: usize,
    importe: usize,
}

#[derive(Debug, Clone, Copy)]
struct MonthColumn {
    index: usize,
    numeric: bool,
}

impl Columns {
    /// `mapping` must already have been checked for the required columns.
    fn new(mapping: &Mapping, table: &RawTable) -> Self {
        let required = |name: &str| mapping.index(name).unwrap_or_default();
        Self {
            concepto: mapping.index(CONCEPTO),
            proposito: mapping.index(PROPOSITO),
            descripcion: mapping.index(DESCRIPCION),
            departamento: required(DEPARTAMENTO),
            curso_escolar: required(CURSO_ESCOLAR),
            mes: mapping.index(MES).map(|index| MonthColumn {
                index,
                numeric: table.is_numeric_column(index),
            }),
            anio: required(ANIO),
            importe: required(IMPORTE),
        }
    }

    fn record(&self, row: &[Cell], report: &mut CoercionReport) -> Record {
        let cell = |ix: usize| row.get(ix).unwrap_or(&Cell::Empty);
        let text = |ix: Option<usize>| {
            ix.map(|ix| cell(ix).text().into_owned())
                .unwrap_or_default()
        };

        let coerced = Amount::coerce(cell(self.importe));
        match coerced.shape() {
            AmountShape::Missing => report.missing_amounts += 1,
            AmountShape::Unparseable => report.unparseable_amounts += 1,
            _ if coerced.clamped() => report.negative_amounts += 1,
            _ => {}
        }

        let (mes, mes_num) = match self.mes {
            None => (None, None),
            Some(column) => month(cell(column.index), column.numeric, report),
        };

        Record {
            concepto: text(self.concepto),
            proposito: text(self.proposito),
            descripcion: text(self.descripcion),
            departamento: text(Some(self.departamento)),
            curso_escolar: text(Some(self.curso_escolar)),
            mes,
            mes_num,
            anio: year(cell(self.anio), report),
            importe: coerced.amount(),
        }
    }
}

/// Derives `(mes, mes_num)`. A numeric month column already holds the index and is used as-is,
/// except that a fractional value is an unknown month. A text column goes through the
/// abbreviation table.
fn month(cell: &Cell, numeric: bool, report: &mut CoercionReport) -> (Option<Month>, Option<i64>) {
    if cell.is_empty() {
        return (None, None);
    }
    if numeric {
        let whole = cell
            .as_number()
            .filter(|n| n.fract() == 0.0 && n.abs() <= i64::MAX as f64);
        return match whole {
            Some(n) => {
                let num = n as i64;
                (Month::from_number(num), Some(num))
            }
            None => {
                report.unknown_months += 1;
                (None, None)
            }
        };
    }
    match Month::from_label(&cell.text()) {
        Some(month) => (Some(month), Some(i64::from(month.number()))),
        None => {
            report.unknown_months += 1;
            (None, None)
        }
    }
}

fn year(cell: &Cell, report: &mut CoercionReport) -> u32 {
    let parsed = match cell {
        Cell::Text(s) => s.trim().parse::<u32>().ok().or_else(|| integral(cell)),
        _ => integral(cell),
    };
    parsed.unwrap_or_else(|| {
        report.bad_years += 1;
        0
    })
}

fn integral(cell: &Cell) -> Option<u32> {
    cell.as_number()
        .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Field;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn normalize_csv(csv: &str) -> Result<Loaded> {
        Normalizer::default().normalize(csv.as_bytes())
    }

    #[test]
    fn test_end_to_end_scenario() {
        let csv = "Concepto del Gasto,Departamento,Curso Escolar,Mes,Año,Importe\n\
                   Útiles,Administración,2024-2025,Ene,2024,\"1.500,50\"\n";
        let loaded = normalize_csv(csv).unwrap();
        let dataset = loaded.dataset();
        assert_eq!(dataset.len(), 1);
        let r = &dataset.records()[0];
        assert_eq!(r.concepto(), "Útiles");
        assert_eq!(r.departamento(), "Administración");
        assert_eq!(r.curso_escolar(), "2024-2025");
        assert_eq!(r.mes(), Some(Month::Ene));
        assert_eq!(r.mes_num(), Some(1));
        assert_eq!(r.anio(), 2024);
        assert_eq!(r.importe().value(), dec("1500.50"));
        assert_eq!(r.proposito(), "");
        assert_eq!(r.descripcion(), "");
        assert!(loaded.report().is_clean());
        assert!(dataset.has_months());
    }

    #[test]
    fn test_huge_amounts_do_not_overflow_totals() {
        let csv = "Departamento,Curso Escolar,Año,Importe\n\
                   A,2024-2025,2024,50000000000000000000000000000\n\
                   B,2024-2025,2024,50000000000000000000000000000\n";
        let loaded = normalize_csv(csv).unwrap();
        assert!(loaded.report().is_clean());
        let dataset = loaded.dataset();
        assert_eq!(dataset.total().value(), Decimal::MAX);
        assert_eq!(dataset.summary().total.value(), Decimal::MAX);
        assert_eq!(dataset.totals_by(&[Field::Anio])[0].total().value(), Decimal::MAX);
    }

    #[test]
    fn test_mixed_amount_conventions() {
        let csv = "Departamento,Curso Escolar,Año,Importe\n\
                   A,2024-2025,2024,\"10.000,00\"\n\
                   A,2024-2025,2024,\"10000,00\"\n\
                   A,2024-2025,2024,\"10,000.00\"\n\
                   A,2024-2025,2024,10000.00\n\
                   A,2024-2025,2024,\n\
                   A,2024-2025,2024,nan\n\
                   A,2024-2025,2024,abc\n\
                   A,2024-2025,2024,-5\n";
        let loaded = normalize_csv(csv).unwrap();
        let amounts: Vec<Decimal> = loaded
            .dataset()
            .iter()
            .map(|r| r.importe().value())
            .collect();
        assert_eq!(
            amounts,
            vec![
                dec("10000"),
                dec("10000"),
                dec("10000"),
                dec("10000"),
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
            ]
        );
        let report = loaded.report();
        assert_eq!(report.missing_amounts, 2);
        assert_eq!(report.unparseable_amounts, 1);
        assert_eq!(report.negative_amounts, 1);
        assert_eq!(report.amounts_zeroed(), 4);
        assert!(!loaded.dataset().has_months());
    }

    #[test]
    fn test_text_month_column() {
        let mut csv = String::from("Departamento,Curso Escolar,Mes,Año,Importe\n");
        for month in Month::ALL {
            csv.push_str(&format!("A,2024-2025,{month},2024,1\n"));
        }
        let loaded = normalize_csv(&csv).unwrap();
        for (ix, r) in loaded.dataset().iter().enumerate() {
            assert_eq!(r.mes_num(), Some(ix as i64 + 1));
            assert_eq!(r.mes(), Some(Month::ALL[ix]));
        }
    }

    #[test]
    fn test_numeric_month_column_is_used_directly() {
        let csv = "Departamento,Curso Escolar,Mes,Año,Importe\n\
                   A,2024-2025,3,2024,1\n\
                   A,2024-2025,12,2024,1\n\
                   A,2024-2025,13,2024,1\n";
        let loaded = normalize_csv(csv).unwrap();
        let nums: Vec<Option<i64>> = loaded.dataset().iter().map(Record::mes_num).collect();
        assert_eq!(nums, vec![Some(3), Some(12), Some(13)]);
        let months: Vec<Option<Month>> = loaded.dataset().iter().map(Record::mes).collect();
        assert_eq!(months, vec![Some(Month::Mar), Some(Month::Dic), None]);
    }

    #[test]
    fn test_blank_key_fields_keep_the_row() {
        let csv = "Concepto,Departamento,Curso Escolar,Año,Importe\n\
                   ,,,2024,40\n\
                   Papel,Primaria,2024-2025,2024,60\n";
        let loaded = normalize_csv(csv).unwrap();
        let dataset = loaded.dataset();
        assert_eq!(dataset.len(), 2);
        let r = &dataset.records()[0];
        assert_eq!(r.concepto(), "");
        assert_eq!(r.departamento(), "");
        assert_eq!(r.curso_escolar(), "");
        assert_eq!(dataset.total().value(), dec("100"));
        assert_eq!(dataset.departamentos(), vec!["", "Primaria"]);
    }

    #[test]
    fn test_fractional_numeric_month_is_unknown() {
        let csv = "Departamento,Curso Escolar,Mes,Año,Importe\n\
                   A,2024-2025,3,2024,1\n\
                   A,2024-2025,3.5,2024,1\n";
        let loaded = normalize_csv(csv).unwrap();
        let nums: Vec<Option<i64>> = loaded.dataset().iter().map(Record::mes_num).collect();
        assert_eq!(nums, vec![Some(3), None]);
        assert_eq!(loaded.dataset().records()[1].mes(), None);
        assert_eq!(loaded.report().unknown_months, 1);
    }

    #[test]
    fn test_unknown_month_label() {
        let csv = "Departamento,Curso Escolar,Mes,Año,Importe\n\
                   A,2024-2025,Enero,2024,1\n\
                   A,2024-2025,,2024,1\n";
        let loaded = normalize_csv(csv).unwrap();
        assert!(loaded.dataset().iter().all(|r| r.mes_num().is_none()));
        assert_eq!(loaded.report().unknown_months, 1);
        assert!(loaded.dataset().has_months());
    }

    #[test]
    fn test_bad_year_is_zero() {
        let csv = "Departamento,Curso Escolar,Año,Importe\n\
                   A,2024-2025,dos mil,1\n\
                   A,2024-2025,2024.0,1\n";
        let loaded = normalize_csv(csv).unwrap();
        let years: Vec<u32> = loaded.dataset().iter().map(Record::anio).collect();
        assert_eq!(years, vec![0, 2024]);
        assert_eq!(loaded.report().bad_years, 1);
    }

    #[test]
    fn test_missing_required_columns() {
        let err = normalize_csv("Concepto,Importe\nPapel,1\n").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Schema);
        assert!(err.to_string().contains("departamento"));
        assert!(err.to_string().contains("curso_escolar"));
    }

    #[test]
    fn test_duplicate_canonical_columns() {
        let csv = "Concepto,Concepto del Gasto,Departamento,Curso Escolar,Año,Importe\n";
        let err = normalize_csv(csv).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Schema);
    }

    #[test]
    fn test_invalid_bytes_are_format_errors() {
        let err = Normalizer::default()
            .normalize(&[0xff, 0xfe, 0x00])
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Format);

        let err = Normalizer::builder()
            .format(SourceFormat::Xlsx)
            .build()
            .unwrap()
            .normalize(b"Departamento\n")
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Format);
    }

    #[test]
    fn test_positional_columns() {
        let csv = "a,b,c,d,e,f,g,h\n\
                   Papel,Clases,Hojas,Primaria,2024-2025,Feb,2025,\"1.000,00\"\n";
        let normalizer = Normalizer::builder()
            .budget_workbook_columns()
            .build()
            .unwrap();
        let loaded = normalizer.normalize(csv.as_bytes()).unwrap();
        let r = &loaded.dataset().records()[0];
        assert_eq!(r.concepto(), "Papel");
        assert_eq!(r.proposito(), "Clases");
        assert_eq!(r.descripcion(), "Hojas");
        assert_eq!(r.departamento(), "Primaria");
        assert_eq!(r.mes_num(), Some(2));
        assert_eq!(r.importe().value(), dec("1000"));

        let err = normalizer.normalize(b"a,b,c\n1,2,3\n").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Schema);
    }

    #[test]
    fn test_extra_alias() {
        let csv = "Depto,Curso Escolar,Año,Monto\nA,2024-2025,2024,5\n";
        let normalizer = Normalizer::builder()
            .alias("Depto", "departamento")
            .alias("Monto", "importe")
            .build()
            .unwrap();
        let loaded = normalizer.normalize(csv.as_bytes()).unwrap();
        assert_eq!(loaded.dataset().records()[0].departamento(), "A");
        assert_eq!(loaded.dataset().total().value(), dec("5"));
    }

    #[test]
    fn test_chained_alias_is_config_error() {
        let err = Normalizer::builder()
            .alias("concepto", "x")
            .build()
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[test]
    fn test_xlsx_end_to_end() {
        let text = |s: &str| Cell::from_text(s);
        let bytes = crate::test::xlsx(
            DEFAULT_SHEET_NAME,
            &[
                vec![
                    text("Concepto del Gasto"),
                    text("Departamento"),
                    text("Curso Escolar"),
                    text("Mes"),
                    text("Año"),
                    text("Importe"),
                ],
                vec![
                    text("Útiles"),
                    text("Administración"),
                    text("2024-2025"),
                    text("Ene"),
                    Cell::Number(2024.0),
                    text("1.500,50"),
                ],
                vec![
                    text("Papel"),
                    text("Primaria"),
                    text("2024-2025"),
                    text("Feb"),
                    Cell::Number(2024.0),
                    Cell::Number(250.25),
                ],
            ],
        );
        let loaded = Normalizer::default().normalize(&bytes).unwrap();
        let records = loaded.dataset().records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].importe().value(), dec("1500.50"));
        assert_eq!(records[0].anio(), 2024);
        assert_eq!(records[1].mes_num(), Some(2));
        assert_eq!(records[1].importe().value(), dec("250.25"));
        assert!(loaded.report().is_clean());
    }

    #[test]
    fn test_xlsx_missing_sheet_is_format_error() {
        let bytes = crate::test::xlsx("Hoja1", &[vec![Cell::from_text("Departamento")]]);
        let err = Normalizer::default().normalize(&bytes).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Format);

        let loaded = Normalizer::builder()
            .sheet_name("Hoja1")
            .build()
            .unwrap()
            .normalize(&bytes);
        assert_eq!(loaded.unwrap_err().error_type(), ErrorType::Schema);
    }

    #[test]
    fn test_source_format_resolve() {
        assert_eq!(SourceFormat::Auto.resolve(b"PK\x03\x04rest"), SourceFormat::Xlsx);
        assert_eq!(SourceFormat::Auto.resolve(b"a,b\n"), SourceFormat::Csv);
        assert_eq!(SourceFormat::Csv.resolve(b"PK\x03\x04"), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_str("xlsx").unwrap(), SourceFormat::Xlsx);
    }

    #[test]
    fn test_sheet_name_default() {
        assert_eq!(Normalizer::default().sheet_name(), DEFAULT_SHEET_NAME);
        let n = Normalizer::builder().sheet_name("Hoja1").build().unwrap();
        assert_eq!(n.sheet_name(), "Hoja1");
    }
}
