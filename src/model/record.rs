use crate::model::{Amount, Month};
use serde::Serialize;

/// One normalized expense row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Record {
    pub(crate) concepto: String,
    pub(crate) proposito: String,
    pub(crate) descripcion: String,
    pub(crate) departamento: String,
    pub(crate) curso_escolar: String,
    pub(crate) mes: Option<Month>,
    pub(crate) mes_num: Option<i64>,
    #[serde(rename = "año")]
    pub(crate) anio: u32,
    pub(crate) importe: Amount,
}

impl Record {
    pub fn concepto(&self) -> &str {
        &self.concepto
    }

    pub fn proposito(&self) -> &str {
        &self.proposito
    }

    pub fn descripcion(&self) -> &str {
        &self.descripcion
    }

    pub fn departamento(&self) -> &str {
        &self.departamento
    }

    pub fn curso_escolar(&self) -> &str {
        &self.curso_escolar
    }

    pub fn mes(&self) -> Option<Month> {
        self.mes
    }

    /// Chronological sort index of `mes`. For sheets whose month column is numeric this is the raw
    /// cell value.
    pub fn mes_num(&self) -> Option<i64> {
        self.mes_num
    }

    /// The calendar year (`año`).
    pub fn anio(&self) -> u32 {
        self.anio
    }

    pub fn importe(&self) -> Amount {
        self.importe
    }
}
