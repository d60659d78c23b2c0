//! The `importe` of an expense and the rules for reading it out of a loosely formatted cell.
//!
//! Amount cells arrive in three different conventions, sometimes mixed within one sheet:
//! numeric spreadsheet cells, European text (`10.000,00`) and US text (`10,000.00`). The
//! convention is guessed per cell from its punctuation; `AmountShape` names each guess so it can
//! be tested on its own. A cell that cannot be read becomes zero instead of failing the row.

use crate::model::Cell;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// A non-negative money amount.
///
/// # Examples
///
/// ```
/// # use presupuestos::model::{Amount, Cell};
/// let amount = Amount::coerce(&Cell::from_text("1.500,50")).amount();
/// assert_eq!(amount.to_string(), "$1,500.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates an `Amount`, clamping negative values to zero.
    pub fn new(value: Decimal) -> Self {
        if value.is_sign_negative() {
            Self::ZERO
        } else {
            Self(value)
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Reads an amount out of a cell. Never fails: anything unreadable is zero, and the returned
    /// `Coerced` says which rule was applied.
    pub fn coerce(cell: &Cell) -> Coerced {
        let shape = AmountShape::of(cell);
        let parsed = match (shape, cell) {
            (AmountShape::Numeric, Cell::Number(n)) => Some(saturating_from_f64(*n)),
            (AmountShape::EuropeanText, Cell::Text(s))
            | (AmountShape::SimpleDecimalText, Cell::Text(s))
            | (AmountShape::ThousandsCommaText, Cell::Text(s)) => {
                parse_decimal(&shape.substitute(s))
            }
            _ => None,
        };

        match parsed {
            None => Coerced {
                amount: Amount::ZERO,
                shape: match shape {
                    AmountShape::Missing => AmountShape::Missing,
                    _ => AmountShape::Unparseable,
                },
                clamped: false,
            },
            Some(value) => Coerced {
                amount: Amount::new(value),
                shape,
                clamped: value.is_sign_negative() && !value.is_zero(),
            },
        }
    }
}

/// The punctuation shape of an amount cell, which decides how its text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountShape {
    /// Already a number.
    Numeric,
    /// Empty, or the text `nan`.
    Missing,
    /// Both `,` and `.`, with the last `,` after the last `.`: `10.000,00`.
    EuropeanText,
    /// A `,` and no `.`: `10000,00`. The comma is the decimal point.
    SimpleDecimalText,
    /// Anything else: `10,000.00` or `10000.00`. Commas are thousands separators.
    ThousandsCommaText,
    /// Text that is still not a number after substitution.
    Unparseable,
}

impl AmountShape {
    /// Classifies a cell by its representation and punctuation. Text shapes are not checked for
    /// parseability here; `Amount::coerce` reports `Unparseable` when substitution does not help.
    pub fn of(cell: &Cell) -> Self {
        match cell {
            Cell::Empty => AmountShape::Missing,
            Cell::Number(n) if n.is_finite() => AmountShape::Numeric,
            Cell::Number(_) => AmountShape::Missing,
            Cell::Text(s) => Self::of_text(s.trim()),
        }
    }

    fn of_text(s: &str) -> Self {
        if s.is_empty() || s.eq_ignore_ascii_case("nan") {
            return AmountShape::Missing;
        }
        match (s.rfind(','), s.rfind('.')) {
            (Some(comma), Some(dot)) if comma > dot => AmountShape::EuropeanText,
            (Some(_), None) => AmountShape::SimpleDecimalText,
            _ => AmountShape::ThousandsCommaText,
        }
    }

    /// Rewrites `s` into plain `1234.56` notation according to this shape.
    pub fn substitute(&self, s: &str) -> String {
        let s = s.trim();
        match self {
            AmountShape::EuropeanText => s.replace('.', "").replace(',', "."),
            AmountShape::SimpleDecimalText => s.replace(',', "."),
            AmountShape::ThousandsCommaText => s.replace(',', ""),
            _ => s.to_string(),
        }
    }
}

/// The outcome of coercing one amount cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coerced {
    amount: Amount,
    shape: AmountShape,
    clamped: bool,
}

impl Coerced {
    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn shape(&self) -> AmountShape {
        self.shape
    }

    /// True when the cell held a negative number that was clamped to zero.
    pub fn clamped(&self) -> bool {
        self.clamped
    }
}

/// Numbers beyond `Decimal`'s range saturate to its bounds.
fn saturating_from_f64(n: f64) -> Decimal {
    Decimal::from_f64(n).unwrap_or(if n.abs() < 1.0 {
        Decimal::ZERO
    } else if n < 0.0 {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${}",
            format_num::format_num!(",.2", self.0.to_f64().unwrap_or_default())
        )
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.normalize().to_string())
    }
}

/// Saturates at `Decimal::MAX`. Both sides are non-negative, so overflow only happens upwards.
impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn coerce_text(s: &str) -> Coerced {
        Amount::coerce(&Cell::from_text(s))
    }

    #[test]
    fn test_european_text() {
        let c = coerce_text("10.000,00");
        assert_eq!(c.shape(), AmountShape::EuropeanText);
        assert_eq!(c.amount().value(), dec("10000.00"));
    }

    #[test]
    fn test_simple_decimal_text() {
        let c = coerce_text("10000,00");
        assert_eq!(c.shape(), AmountShape::SimpleDecimalText);
        assert_eq!(c.amount().value(), dec("10000.00"));
    }

    #[test]
    fn test_thousands_comma_text() {
        let c = coerce_text("10,000.00");
        assert_eq!(c.shape(), AmountShape::ThousandsCommaText);
        assert_eq!(c.amount().value(), dec("10000.00"));
    }

    #[test]
    fn test_plain_decimal_text() {
        let c = coerce_text("10000.00");
        assert_eq!(c.shape(), AmountShape::ThousandsCommaText);
        assert_eq!(c.amount().value(), dec("10000.00"));
    }

    #[test]
    fn test_missing_values_are_zero() {
        for cell in [Cell::Empty, Cell::from_text(""), Cell::from_text("nan")] {
            let c = Amount::coerce(&cell);
            assert_eq!(c.shape(), AmountShape::Missing);
            assert!(c.amount().is_zero());
        }
        assert_eq!(coerce_text("NaN").shape(), AmountShape::Missing);
    }

    #[test]
    fn test_garbage_is_zero() {
        let c = coerce_text("abc");
        assert_eq!(c.shape(), AmountShape::Unparseable);
        assert_eq!(c.amount(), Amount::ZERO);
    }

    #[test]
    fn test_numeric_passes_through() {
        let c = Amount::coerce(&Cell::Number(500.0));
        assert_eq!(c.shape(), AmountShape::Numeric);
        assert_eq!(c.amount().value(), dec("500"));
    }

    #[test]
    fn test_huge_numeric_saturates() {
        let c = Amount::coerce(&Cell::Number(1e30));
        assert_eq!(c.shape(), AmountShape::Numeric);
        assert_eq!(c.amount().value(), Decimal::MAX);
        assert!(!c.clamped());

        let c = Amount::coerce(&Cell::Number(-1e30));
        assert_eq!(c.shape(), AmountShape::Numeric);
        assert!(c.clamped());
        assert!(c.amount().is_zero());
    }

    #[test]
    fn test_ambiguous_comma_is_decimal_point() {
        // "1,234" has no dot, so the comma is read as a decimal point.
        assert_eq!(coerce_text("1,234").amount().value(), dec("1.234"));
    }

    #[test]
    fn test_european_with_many_groups() {
        assert_eq!(
            coerce_text("1.234.567,89").amount().value(),
            dec("1234567.89")
        );
    }

    #[test]
    fn test_multiple_commas_without_dot_is_unparseable() {
        let c = coerce_text("1,234,567");
        assert_eq!(c.shape(), AmountShape::Unparseable);
        assert!(c.amount().is_zero());
    }

    #[test]
    fn test_currency_symbol_is_unparseable() {
        assert_eq!(coerce_text("$1,500.00").shape(), AmountShape::Unparseable);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(coerce_text("  250,5 ").amount().value(), dec("250.5"));
    }

    #[test]
    fn test_negative_is_clamped() {
        let c = coerce_text("-40.00");
        assert!(c.clamped());
        assert_eq!(c.amount(), Amount::ZERO);

        let c = Amount::coerce(&Cell::Number(-3.0));
        assert!(c.clamped());
        assert!(c.amount().is_zero());
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(coerce_text("1e3").amount().value(), dec("1000"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::new(dec("1500.5")).to_string(), "$1,500.50");
        assert_eq!(Amount::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&Amount::new(dec("1500.50"))).unwrap();
        assert_eq!(json, "\"1500.5\"");
    }

    #[test]
    fn test_sum() {
        let amounts = [Amount::new(dec("1.10")), Amount::new(dec("2.20"))];
        let total: Amount = amounts.iter().sum();
        assert_eq!(total.value(), dec("3.30"));
    }

    #[test]
    fn test_sum_saturates_at_max() {
        let big = Amount::new(Decimal::MAX - Decimal::ONE);
        assert_eq!((big + big).value(), Decimal::MAX);
        let total: Amount = [big, big, Amount::new(dec("1"))].iter().sum();
        assert_eq!(total.value(), Decimal::MAX);
    }
}
