//! FILENAME: condition-list/src/value.rs
//! Observed values and date grouping levels.
//!
//! `DataValue` is what a grid cell, a chart point or a source row holds.
//! Values are designed to be:
//! - Hashable (floats hash by bit pattern, NaN values are treated as equal)
//! - Totally ordered, so selections can be sorted deterministically
//! - Stable when rendered into a drill path

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// DATA VALUE
// ============================================================================

/// A single observed value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    Boolean(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Default for DataValue {
    fn default() -> Self {
        DataValue::Null
    }
}

/// Folds -0.0 into 0.0 and every NaN into the canonical NaN.
fn normalize_float(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else if n.is_nan() {
        f64::NAN
    } else {
        n
    }
}

impl DataValue {
    pub fn text(s: impl Into<String>) -> Self {
        DataValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DataValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for numbers with a fractional part. Such values come out of
    /// aggregations and cannot be matched by exact equality.
    pub fn is_fractional(&self) -> bool {
        match self {
            DataValue::Number(n) => n.is_finite() && n.fract() != 0.0,
            _ => false,
        }
    }

    /// Groups a date to the given level. Values that are not dates pass
    /// through unchanged (they are assumed to be grouped already).
    pub fn group_to(&self, level: DateGroupLevel) -> DataValue {
        match self {
            DataValue::Date(d) => level.group(*d),
            other => other.clone(),
        }
    }

    /// Orders two values of the same kind. Values of different kinds are
    /// not comparable for range predicates.
    pub fn compare_same_kind(&self, other: &DataValue) -> Option<Ordering> {
        match (self, other) {
            (DataValue::Boolean(a), DataValue::Boolean(b)) => Some(a.cmp(b)),
            (DataValue::Number(a), DataValue::Number(b)) => {
                Some(normalize_float(*a).total_cmp(&normalize_float(*b)))
            }
            (DataValue::Date(a), DataValue::Date(b)) => Some(a.cmp(b)),
            (DataValue::Text(a), DataValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Adds `units` to a numeric value. Used for range upper bounds.
    pub fn offset(&self, units: f64) -> Option<DataValue> {
        match self {
            DataValue::Number(n) => Some(DataValue::Number(n + units)),
            DataValue::Date(d) => {
                let days = chrono::Days::new(units.max(0.0) as u64);
                d.checked_add_days(days).map(DataValue::Date)
            }
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            DataValue::Null => 0,
            DataValue::Boolean(_) => 1,
            DataValue::Number(_) => 2,
            DataValue::Date(_) => 3,
            DataValue::Text(_) => 4,
        }
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DataValue {}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.compare_same_kind(other) {
            Some(ordering) => ordering,
            None => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind_rank().hash(state);
        match self {
            DataValue::Null => {}
            DataValue::Boolean(b) => b.hash(state),
            DataValue::Number(n) => normalize_float(*n).to_bits().hash(state),
            DataValue::Date(d) => d.hash(state),
            DataValue::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => Ok(()),
            DataValue::Boolean(b) => write!(f, "{}", b),
            DataValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            DataValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        DataValue::Number(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        DataValue::Number(value as f64)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        DataValue::Number(value as f64)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        DataValue::Boolean(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        DataValue::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        DataValue::Text(value)
    }
}

impl From<NaiveDate> for DataValue {
    fn from(value: NaiveDate) -> Self {
        DataValue::Date(value)
    }
}

// ============================================================================
// DATE GROUPING
// ============================================================================

/// Levels for date grouping.
///
/// Year through Day form the date drill hierarchy in declaration order.
/// `DayOfWeek` is a custom date part and never takes part in drilling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DateGroupLevel {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    DayOfWeek,
}

impl DateGroupLevel {
    /// The drillable levels from coarsest to finest.
    pub const DRILL_ORDER: [DateGroupLevel; 5] = [
        DateGroupLevel::Year,
        DateGroupLevel::Quarter,
        DateGroupLevel::Month,
        DateGroupLevel::Week,
        DateGroupLevel::Day,
    ];

    pub fn is_drillable(self) -> bool {
        !matches!(self, DateGroupLevel::DayOfWeek)
    }

    /// Position in the drill hierarchy, or None for custom parts.
    pub fn drill_rank(self) -> Option<usize> {
        Self::DRILL_ORDER.iter().position(|l| *l == self)
    }

    /// The next finer drill level.
    pub fn next_level(self) -> Option<DateGroupLevel> {
        let rank = self.drill_rank()?;
        Self::DRILL_ORDER.get(rank + 1).copied()
    }

    /// The next coarser drill level.
    pub fn previous_level(self) -> Option<DateGroupLevel> {
        let rank = self.drill_rank()?;
        rank.checked_sub(1).map(|r| Self::DRILL_ORDER[r])
    }

    pub fn label(self) -> &'static str {
        match self {
            DateGroupLevel::Year => "Year",
            DateGroupLevel::Quarter => "Quarter",
            DateGroupLevel::Month => "Month",
            DateGroupLevel::Week => "Week",
            DateGroupLevel::Day => "Day",
            DateGroupLevel::DayOfWeek => "DayOfWeek",
        }
    }

    /// Converts a date to its grouped value at this level.
    /// Uses Number values so that grouped values sort naturally (Month 1 < 2 < ... < 12).
    pub fn group(self, date: NaiveDate) -> DataValue {
        let n = match self {
            DateGroupLevel::Year => date.year() as f64,
            DateGroupLevel::Quarter => ((date.month() - 1) / 3 + 1) as f64,
            DateGroupLevel::Month => date.month() as f64,
            DateGroupLevel::Week => date.iso_week().week() as f64,
            DateGroupLevel::Day => date.day() as f64,
            DateGroupLevel::DayOfWeek => date.weekday().number_from_monday() as f64,
        };
        DataValue::Number(n)
    }
}

/// Formats the display name of a column grouped to a date level.
pub fn format_date_level_name(column: &str, level: DateGroupLevel) -> String {
    format!("{} ({})", column, level.label())
}
