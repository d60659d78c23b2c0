//! These structs provide the CLI interface for the presupuestos CLI.

use crate::model::{Field, Filter};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// presupuestos: budget figures from a school's published expense spreadsheet.
///
/// The spreadsheet is downloaded fresh on every run (a cache-defeating timestamp is added to the
/// URL), its headers are mapped onto canonical names and its amounts, which may be written in
/// European or US notation, are read into exact decimals. The commands then print the same
/// figures a budget dashboard shows: headline KPIs, totals per department, concept, year and
/// month, and the largest expenses.
///
/// Start with `presupuestos init --source-url <URL>`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and its config.json.
    ///
    /// Pass the address of the published spreadsheet as --source-url. It can be an http(s) URL
    /// (for example a "publish to the web" export link), a file:// URL or a local path. Everything
    /// else in config.json has a default and can be edited afterwards.
    Init,
    /// Print the headline figures and the totals per department, concept, year and month.
    Summary(FilterArgs),
    /// Print totals grouped by one or more fields.
    Totals(TotalsArgs),
    /// Print the largest expenses.
    Top(TopArgs),
    /// Print the distinct departments, school years and calendar years available for filtering.
    Filters,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate for the syntax.
    #[arg(long, global = true, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration is held. Defaults to ~/presupuestos
    #[arg(long, global = true, env = "PRESUPUESTOS_HOME", default_value_t = default_home())]
    home: DisplayPath,

    /// The spreadsheet to read. Required by `init`; for the other commands it overrides the URL
    /// saved in config.json.
    #[arg(long, global = true)]
    source_url: Option<String>,

    /// Print structured JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
            source_url: None,
            json: false,
        }
    }

    pub fn with_source_url(self, source_url: impl Into<String>) -> Self {
        Self {
            source_url: Some(source_url.into()),
            ..self
        }
    }

    pub fn with_json(self, json: bool) -> Self {
        Self { json, ..self }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn json(&self) -> bool {
        self.json
    }
}

/// Restricts the records a command looks at. Each option can be repeated; a record must match
/// one of the given values of every option that is present.
#[derive(Debug, Parser, Clone, Default)]
pub struct FilterArgs {
    /// Only include this department.
    #[arg(long)]
    departamento: Vec<String>,

    /// Only include this school year, e.g. 2024-2025.
    #[arg(long)]
    curso: Vec<String>,

    /// Only include this calendar year.
    #[arg(long = "anio", visible_aliases = ["año", "year"])]
    anio: Vec<u32>,
}

impl FilterArgs {
    pub fn new(departamento: Vec<String>, curso: Vec<String>, anio: Vec<u32>) -> Self {
        Self {
            departamento,
            curso,
            anio,
        }
    }

    /// Converts to a `Filter`. An option that was not given leaves its dimension unconstrained.
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        if !self.departamento.is_empty() {
            filter = filter.departamentos(self.departamento.iter().cloned());
        }
        if !self.curso.is_empty() {
            filter = filter.cursos(self.curso.iter().cloned());
        }
        if !self.anio.is_empty() {
            filter = filter.anios(self.anio.iter().copied());
        }
        filter
    }
}

/// Args for the `presupuestos totals` command.
#[derive(Debug, Parser, Clone)]
pub struct TotalsArgs {
    /// The fields to group by, comma-separated or repeated, e.g. --by departamento,curso-escolar
    #[arg(long, required = true, value_delimiter = ',')]
    by: Vec<Field>,

    #[clap(flatten)]
    filters: FilterArgs,
}

impl TotalsArgs {
    pub fn new(by: Vec<Field>, filters: FilterArgs) -> Self {
        Self { by, filters }
    }

    pub fn by(&self) -> &[Field] {
        &self.by
    }

    pub fn filters(&self) -> &FilterArgs {
        &self.filters
    }
}

/// Args for the `presupuestos top` command.
#[derive(Debug, Parser, Clone)]
pub struct TopArgs {
    /// How many expenses to print. Defaults to `top_n` from config.json.
    #[arg(short, long)]
    n: Option<usize>,

    #[clap(flatten)]
    filters: FilterArgs,
}

impl TopArgs {
    pub fn new(n: Option<usize>, filters: FilterArgs) -> Self {
        Self { n, filters }
    }

    pub fn n(&self) -> Option<usize> {
        self.n
    }

    pub fn filters(&self) -> &FilterArgs {
        &self.filters
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("presupuestos"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or PRESUPUESTOS_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("presupuestos")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
