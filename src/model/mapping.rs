//! Header canonicalization: source-specific column titles are lower-cased, trimmed and mapped onto
//! the canonical field names through an `AliasTable`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

pub const CONCEPTO: &str = "concepto";
pub const PROPOSITO: &str = "proposito";
pub const DESCRIPCION: &str = "descripcion";
pub const DEPARTAMENTO: &str = "departamento";
pub const CURSO_ESCOLAR: &str = "curso_escolar";
pub const MES: &str = "mes";
pub const ANIO: &str = "año";
pub const IMPORTE: &str = "importe";

/// Columns without which a dataset cannot be filtered or summed.
pub const REQUIRED: [&str; 4] = [DEPARTAMENTO, CURSO_ESCOLAR, ANIO, IMPORTE];

/// The column order of the budget workbook, used when headers are assigned by position.
pub const POSITIONAL: [&str; 8] = [
    CONCEPTO,
    PROPOSITO,
    DESCRIPCION,
    DEPARTAMENTO,
    CURSO_ESCOLAR,
    MES,
    ANIO,
    IMPORTE,
];

const DEFAULT_ALIASES: [(&str, &str); 4] = [
    ("concepto del gasto", CONCEPTO),
    ("descripción del gasto", DESCRIPCION),
    ("para que va a servir", PROPOSITO),
    ("curso escolar", CURSO_ESCOLAR),
];

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MappingError(String);

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl StdError for MappingError {}

/// Lower-cases and trims a header.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Maps normalized source headers onto canonical names.
///
/// No target may itself be an alias key, so applying the table twice gives the same result as
/// applying it once.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AliasTable {
    aliases: BTreeMap<String, String>,
}

impl AliasTable {
    /// Builds a table from `(source header, canonical name)` pairs. Both sides are normalized.
    pub fn new<I, K, V>(pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let aliases: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (normalize_header(k.as_ref()), normalize_header(v.as_ref())))
            .collect();
        Self::validate(&aliases)?;
        Ok(Self { aliases })
    }

    /// Returns a new table with `pairs` added on top of these aliases.
    pub fn extended<I, K, V>(&self, pairs: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut aliases = self.aliases.clone();
        aliases.extend(
            pairs
                .into_iter()
                .map(|(k, v)| (normalize_header(k.as_ref()), normalize_header(v.as_ref()))),
        );
        Self::validate(&aliases)?;
        Ok(Self { aliases })
    }

    fn validate(aliases: &BTreeMap<String, String>) -> Result<(), MappingError> {
        if let Some((key, target)) = aliases.iter().find(|(_, v)| aliases.contains_key(*v)) {
            return Err(MappingError(format!(
                "The alias '{key}' -> '{target}' points at another alias key"
            )));
        }
        if let Some(key) = aliases.keys().find(|k| k.is_empty()) {
            return Err(MappingError(format!("An alias key must not be empty: '{key}'")));
        }
        Ok(())
    }

    /// Normalizes `header` and replaces it with its canonical name when it is a known alias.
    pub fn canonicalize(&self, header: &str) -> String {
        let normalized = normalize_header(header);
        match self.aliases.get(&normalized) {
            Some(canonical) => canonical.clone(),
            None => normalized,
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            aliases: DEFAULT_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Serialize for AliasTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.aliases.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AliasTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs: BTreeMap<String, String> = BTreeMap::deserialize(deserializer)?;
        AliasTable::new(pairs).map_err(serde::de::Error::custom)
    }
}

/// The canonical column names of a raw table, in source order, with a lookup by name.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Mapping {
    columns: Vec<String>,
    column_map: HashMap<String, usize>,
}

impl Mapping {
    /// Canonicalizes `headers` through `aliases`. Two headers that end up with the same name are
    /// an error, since there would be no way to tell which one holds the field.
    pub fn new<S, I>(headers: I, aliases: &AliasTable) -> Result<Self, MappingError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        let columns: Vec<String> = headers
            .into_iter()
            .map(|h| aliases.canonicalize(h.as_ref()))
            .collect();

        let mut column_map = HashMap::with_capacity(columns.len());
        for (ix, column) in columns.iter().enumerate() {
            if column_map.insert(column.clone(), ix).is_some() {
                return Err(MappingError(format!(
                    "Encountered a duplicate column '{column}' \
                    (two or more headers resolve to the same canonical name)"
                )));
            }
        }

        Ok(Self {
            columns,
            column_map,
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self, column: &str) -> Option<usize> {
        self.column_map.get(column).copied()
    }

    /// The canonical columns from `REQUIRED` that this mapping lacks.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED
            .iter()
            .filter(|c| !self.column_map.contains_key(**c))
            .copied()
            .collect()
    }
}
