//! Fetches a school's published expense spreadsheet, normalizes its loosely formatted rows into
//! canonical records and answers the questions a budget dashboard asks of them.
//!
//! The pipeline is `api::Source::fetch` followed by `normalize::Normalizer::normalize`, joined by
//! `load`. The resulting `model::Dataset` provides filter values, filtering, grouped totals, the
//! top-N expenses and headline figures.

pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
mod load;
pub mod model;
pub mod normalize;
mod utils;

#[cfg(test)]
mod test;

pub use config::Config;
pub use error::{Error, ErrorType, Result};
pub use load::{load, load_url};
pub use normalize::{CoercionReport, Loaded, Normalizer};
