//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::model::Cell;
use crate::Config;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::CompressionMethod;

/// A small budget export with every amount convention the normalizer accepts.
///
/// Totals: 2024 is $1,800.50 and 2025 is $6,300.00.
pub(crate) const BUDGET_CSV: &str = "\
Concepto del Gasto,Para que va a servir,Descripción del Gasto,Departamento,Curso Escolar,Mes,Año,Importe
Útiles,Clases,Cuadernos,Administración,2024-2025,Sep,2024,\"1.500,50\"
Papel,Impresión,Folios,Primaria,2024-2025,Oct,2024,300
Pizarra,Aula,Pizarra digital,Secundaria,2024-2025,Ene,2025,\"5,000.00\"
Libros,Biblioteca,Novelas,Primaria,2024-2025,Feb,2025,1000
Tizas,Clases,Tizas de colores,Primaria,2024-2025,Mar,2025,\"300,00\"
";

/// Test environment with a home directory whose config points at a local copy of `BUDGET_CSV`.
/// Holds TempDir to keep the directory alive for the duration of the test.
pub(crate) struct TestEnv {
    _temp_dir: TempDir,
    source_path: PathBuf,
    config: Config,
}

impl TestEnv {
    pub(crate) async fn new() -> Self {
        Self::with_csv(BUDGET_CSV).await
    }

    /// Creates a test environment whose source file holds `csv`.
    pub(crate) async fn with_csv(csv: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("presupuestos");
        let source_path = temp_dir.path().join("presupuesto.csv");
        std::fs::write(&source_path, csv).unwrap();

        let config = Config::create(&root, source_path.to_str().unwrap())
            .await
            .unwrap();

        Self {
            _temp_dir: temp_dir,
            source_path,
            config,
        }
    }

    /// Returns a clone of the Config.
    pub(crate) fn config(&self) -> Config {
        self.config.clone()
    }

    pub(crate) fn home(&self) -> &Path {
        self.config.root()
    }

    pub(crate) fn source_path(&self) -> &Path {
        &self.source_path
    }
}

/// Builds an XLSX workbook in memory holding a single worksheet named `sheet` with `rows`.
/// Text cells are written as inline strings, so no shared-strings part is needed.
pub(crate) fn xlsx(sheet: &str, rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut sheet_data = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_data.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, cell) in row.iter().enumerate() {
            let at = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => sheet_data.push_str(&format!(
                    "<c r=\"{at}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    escape(s)
                )),
                Cell::Number(n) => sheet_data.push_str(&format!("<c r=\"{at}\"><v>{n}</v></c>")),
            }
        }
        sheet_data.push_str("</row>");
    }

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#
                .to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
                escape(sheet)
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
            ),
        ),
    ];

    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn column_letter(ix: usize) -> char {
    (b'A' + u8::try_from(ix).unwrap()) as char
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
