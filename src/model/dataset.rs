//! The normalized dataset and the queries the dashboard runs over it: distinct filter values,
//! filtering, group-and-sum, top-N and headline figures.

use crate::model::{Amount, Month, Record};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::{Display, Formatter};

/// Normalized records in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dataset {
    records: Vec<Record>,
    /// False when the source had no month column, in which case no record has a month.
    has_months: bool,
}

impl Dataset {
    pub(crate) fn new(records: Vec<Record>, has_months: bool) -> Self {
        Self {
            records,
            has_months,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_months(&self) -> bool {
        self.has_months
    }

    /// Distinct departments in order of first appearance.
    pub fn departamentos(&self) -> Vec<&str> {
        distinct(self.iter().map(Record::departamento))
    }

    /// Distinct school years in order of first appearance.
    pub fn cursos(&self) -> Vec<&str> {
        distinct(self.iter().map(Record::curso_escolar))
    }

    /// Distinct calendar years, ascending.
    pub fn anios(&self) -> Vec<u32> {
        self.iter()
            .map(Record::anio)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// All distinct filter values, ready for building filter controls.
    pub fn filter_values(&self) -> FilterValues {
        FilterValues {
            departamentos: self.departamentos().into_iter().map(String::from).collect(),
            cursos: self.cursos().into_iter().map(String::from).collect(),
            anios: self.anios(),
        }
    }

    /// The records matching `filter`, in their original order.
    pub fn filter(&self, filter: &Filter) -> Dataset {
        Dataset {
            records: self
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
            has_months: self.has_months,
        }
    }

    pub fn total(&self) -> Amount {
        self.iter().map(Record::importe).sum()
    }

    /// Sums `importe` for every distinct combination of `fields`. Groups are sorted by key, with
    /// months in calendar order. An empty `fields` gives a single group holding the grand total.
    pub fn totals_by(&self, fields: &[Field]) -> Vec<Group> {
        let mut groups: BTreeMap<Vec<Key>, (Amount, usize)> = BTreeMap::new();
        for record in self.iter() {
            let key: Vec<Key> = fields.iter().map(|f| f.key(record)).collect();
            let entry = groups.entry(key).or_insert((Amount::ZERO, 0));
            entry.0 = entry.0 + record.importe();
            entry.1 += 1;
        }
        groups
            .into_iter()
            .map(|(keys, (total, count))| Group { keys, total, count })
            .collect()
    }

    /// Totals per year and month in chronological order.
    pub fn monthly(&self) -> Vec<Group> {
        self.totals_by(&[Field::Anio, Field::Mes])
    }

    /// The `n` largest expenses, largest first. Equal amounts keep their source order.
    pub fn top(&self, n: usize) -> Vec<&Record> {
        let mut sorted: Vec<&Record> = self.iter().collect();
        sorted.sort_by(|a, b| b.importe().cmp(&a.importe()));
        sorted.truncate(n);
        sorted
    }

    /// Headline figures: total, mean, count and maximum.
    pub fn summary(&self) -> Summary {
        let total = self.total();
        let count = self.len();
        let mean = if count == 0 {
            Amount::ZERO
        } else {
            Amount::new(total.value() / Decimal::from(count))
        };
        let max = self
            .iter()
            .map(Record::importe)
            .max()
            .unwrap_or(Amount::ZERO);
        Summary {
            total,
            mean,
            count,
            max,
        }
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}

/// Distinct values of the three filter dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterValues {
    pub departamentos: Vec<String>,
    pub cursos: Vec<String>,
    #[serde(rename = "años")]
    pub anios: Vec<u32>,
}

/// Immutable filter criteria. Each dimension is either unconstrained (`None`) or restricted to a
/// set of accepted values; an empty set accepts nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    departamentos: Option<BTreeSet<String>>,
    cursos: Option<BTreeSet<String>>,
    anios: Option<BTreeSet<u32>>,
}

impl Filter {
    /// A filter that accepts every record.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn departamentos<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            departamentos: Some(values.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    pub fn cursos<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cursos: Some(values.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    pub fn anios<I>(self, values: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Self {
            anios: Some(values.into_iter().collect()),
            ..self
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.departamentos
            .as_ref()
            .map_or(true, |set| set.contains(record.departamento()))
            && self
                .cursos
                .as_ref()
                .map_or(true, |set| set.contains(record.curso_escolar()))
            && self
                .anios
                .as_ref()
                .map_or(true, |set| set.contains(&record.anio()))
    }

    /// True when some dimension has an empty selection, so nothing can match.
    pub fn selects_nothing(&self) -> bool {
        self.departamentos.as_ref().is_some_and(BTreeSet::is_empty)
            || self.cursos.as_ref().is_some_and(BTreeSet::is_empty)
            || self.anios.as_ref().is_some_and(BTreeSet::is_empty)
    }
}

/// A record field that can be used as a grouping key.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Concepto,
    Proposito,
    Descripcion,
    Departamento,
    CursoEscolar,
    Mes,
    Anio,
}

serde_plain::derive_display_from_serialize!(Field);
serde_plain::derive_fromstr_from_deserialize!(Field);

impl Field {
    fn key(&self, record: &Record) -> Key {
        match self {
            Field::Concepto => Key::Text(record.concepto().to_string()),
            Field::Proposito => Key::Text(record.proposito().to_string()),
            Field::Descripcion => Key::Text(record.descripcion().to_string()),
            Field::Departamento => Key::Text(record.departamento().to_string()),
            Field::CursoEscolar => Key::Text(record.curso_escolar().to_string()),
            Field::Mes => Key::Month(record.mes()),
            Field::Anio => Key::Year(record.anio()),
        }
    }
}

/// One component of a group key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Key {
    Text(String),
    /// Records without a recognized month group under `None`, which sorts first.
    Month(Option<Month>),
    Year(u32),
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Text(s) => write!(f, "{s}"),
            Key::Month(Some(m)) => write!(f, "{m}"),
            Key::Month(None) => write!(f, "-"),
            Key::Year(y) => write!(f, "{y}"),
        }
    }
}

/// The summed `importe` of the records sharing one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    keys: Vec<Key>,
    total: Amount,
    count: usize,
}

impl Group {
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Headline figures of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: Amount,
    pub mean: Amount,
    pub count: usize,
    pub max: Amount,
}
