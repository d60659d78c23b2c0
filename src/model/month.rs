use serde::{Deserialize, Serialize};

/// A calendar month as written in the budget sheet: a three-letter Spanish abbreviation.
///
/// Variants are declared in calendar order, so the derived `Ord` is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    Ene,
    Feb,
    Mar,
    Abr,
    May,
    Jun,
    Jul,
    Ago,
    Sep,
    Oct,
    Nov,
    Dic,
}

serde_plain::derive_display_from_serialize!(Month);
serde_plain::derive_fromstr_from_deserialize!(Month);

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Ene,
        Month::Feb,
        Month::Mar,
        Month::Abr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Ago,
        Month::Sep,
        Month::Oct,
        Month::Nov,
        Month::Dic,
    ];

    /// The month index, 1 for `Ene` through 12 for `Dic`.
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    pub fn from_number(n: i64) -> Option<Month> {
        n.checked_sub(1)
            .and_then(|ix| usize::try_from(ix).ok())
            .and_then(|ix| Month::ALL.get(ix))
            .copied()
    }

    /// Looks up a label in the fixed abbreviation table. Surrounding whitespace is ignored, case
    /// is not.
    pub fn from_label(label: &str) -> Option<Month> {
        label.trim().parse().ok()
    }
}
