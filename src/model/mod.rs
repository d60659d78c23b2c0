//! Types that represent the normalized budget data: cells, amounts, months, records and the
//! dataset with its queries.
mod amount;
mod cell;
mod dataset;
pub(crate) mod mapping;
mod month;
mod record;

pub use amount::{Amount, AmountShape, Coerced};
pub use cell::Cell;
pub use dataset::{Dataset, Field, Filter, FilterValues, Group, Key, Summary};
pub use mapping::{AliasTable, Mapping, MappingError};
pub use month::Month;
pub use record::Record;
