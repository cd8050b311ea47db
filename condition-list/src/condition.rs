//! FILENAME: condition-list/src/condition.rs
//! Condition items, junction operators and the flat condition list.
//!
//! A list alternates items and junctions: `item (junction item)*`.
//! Each junction carries a nesting level. The expression tree is recovered by
//! splitting at the junctions of the lowest level; within one level AND binds
//! tighter than OR. Item levels record the depth of the innermost group that
//! contains the item and do not affect evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::{format_date_level_name, DataValue, DateGroupLevel};

// ============================================================================
// FIELD
// ============================================================================

/// The column a predicate reads, optionally grouped to a date level first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConditionField {
    /// Source column name.
    pub column: String,

    /// Date level applied to the column before comparison.
    #[serde(default)]
    pub date_level: Option<DateGroupLevel>,
}

impl ConditionField {
    pub fn column(column: impl Into<String>) -> Self {
        ConditionField {
            column: column.into(),
            date_level: None,
        }
    }

    pub fn grouped(column: impl Into<String>, level: DateGroupLevel) -> Self {
        ConditionField {
            column: column.into(),
            date_level: Some(level),
        }
    }

    pub fn display_name(&self) -> String {
        match self.date_level {
            Some(level) => format_date_level_name(&self.column, level),
            None => self.column.clone(),
        }
    }
}

impl fmt::Display for ConditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

// ============================================================================
// ITEMS
// ============================================================================

/// Leaf predicate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// `values[0]`
    Equal,
    /// Inclusive `values[0]..=values[1]`.
    Between,
    /// Membership in `values`.
    OneOf,
    /// The value is null. Takes no operands.
    Null,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

/// One leaf predicate of a condition list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionItem {
    /// The field being tested.
    pub field: ConditionField,

    /// The comparison to apply.
    pub operation: Operation,

    /// Operands. Empty for `Null`, two for `Between`.
    pub values: Vec<DataValue>,

    /// Inverts the predicate (NOT-NULL, NOT-ONE-OF, ...).
    #[serde(default)]
    pub negated: bool,

    /// Nesting level of the innermost group containing this item.
    #[serde(default)]
    pub level: u32,
}

impl ConditionItem {
    fn new(field: ConditionField, operation: Operation, values: Vec<DataValue>) -> Self {
        ConditionItem {
            field,
            operation,
            values,
            negated: false,
            level: 0,
        }
    }

    /// Equality test. A null operand becomes a NULL test.
    pub fn equal(field: ConditionField, value: DataValue) -> Self {
        if value.is_null() {
            return Self::is_null(field);
        }
        Self::new(field, Operation::Equal, vec![value])
    }

    pub fn between(field: ConditionField, low: DataValue, high: DataValue) -> Self {
        Self::new(field, Operation::Between, vec![low, high])
    }

    /// Membership test. Operands are deduplicated in first-seen order and a
    /// single operand collapses into an equality test.
    pub fn one_of(field: ConditionField, values: Vec<DataValue>) -> Self {
        let mut unique: Vec<DataValue> = Vec::with_capacity(values.len());
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        if unique.len() == 1 {
            if let Some(value) = unique.pop() {
                return Self::equal(field, value);
            }
        }
        Self::new(field, Operation::OneOf, unique)
    }

    /// Negated membership test. Unlike `one_of(..).negate()` a single operand
    /// stays a ONE-OF, so a null row matches regardless of the operand count.
    pub fn not_one_of(field: ConditionField, values: Vec<DataValue>) -> Self {
        let mut unique: Vec<DataValue> = Vec::with_capacity(values.len());
        for value in values {
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        Self::new(field, Operation::OneOf, unique).negate()
    }

    pub fn is_null(field: ConditionField) -> Self {
        Self::new(field, Operation::Null, Vec::new())
    }

    pub fn not_null(field: ConditionField) -> Self {
        Self::is_null(field).negate()
    }

    pub fn greater_or_equal(field: ConditionField, value: DataValue) -> Self {
        Self::new(field, Operation::GreaterThanOrEqual, vec![value])
    }

    pub fn less_or_equal(field: ConditionField, value: DataValue) -> Self {
        Self::new(field, Operation::LessThanOrEqual, vec![value])
    }

    /// Returns the inverted predicate.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// True when the item can be folded into a ONE-OF over the same field.
    pub fn is_in_compatible(&self) -> bool {
        !self.negated && matches!(self.operation, Operation::Equal | Operation::OneOf)
    }
}

fn write_value_list(f: &mut fmt::Formatter<'_>, values: &[DataValue]) -> fmt::Result {
    f.write_str("{")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", value)?;
    }
    f.write_str("}")
}

impl fmt::Display for ConditionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.values.first().cloned().unwrap_or_default();
        let second = self.values.get(1).cloned().unwrap_or_default();
        match (self.operation, self.negated) {
            (Operation::Equal, false) => write!(f, "{}={}", self.field, first),
            (Operation::Equal, true) => write!(f, "{}!={}", self.field, first),
            (Operation::Between, false) => {
                write!(f, "{} BETWEEN {} AND {}", self.field, first, second)
            }
            (Operation::Between, true) => {
                write!(f, "{} NOT BETWEEN {} AND {}", self.field, first, second)
            }
            (Operation::OneOf, negated) => {
                let op = if negated { "NOT ONE-OF" } else { "ONE-OF" };
                write!(f, "{} {} ", self.field, op)?;
                write_value_list(f, &self.values)
            }
            (Operation::Null, false) => write!(f, "{} IS NULL", self.field),
            (Operation::Null, true) => write!(f, "{} IS NOT NULL", self.field),
            (Operation::GreaterThanOrEqual, false) => write!(f, "{}>={}", self.field, first),
            (Operation::GreaterThanOrEqual, true) => write!(f, "{}<{}", self.field, first),
            (Operation::LessThanOrEqual, false) => write!(f, "{}<={}", self.field, first),
            (Operation::LessThanOrEqual, true) => write!(f, "{}>{}", self.field, first),
        }
    }
}

// ============================================================================
// JUNCTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Junction {
    And,
    Or,
}

impl Junction {
    pub fn flip(self) -> Junction {
        match self {
            Junction::And => Junction::Or,
            Junction::Or => Junction::And,
        }
    }
}

impl fmt::Display for Junction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Junction::And => f.write_str("AND"),
            Junction::Or => f.write_str("OR"),
        }
    }
}

/// AND/OR marker between two items, with its nesting level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunctionOperator {
    pub junction: Junction,
    pub level: u32,
}

impl JunctionOperator {
    pub fn new(junction: Junction, level: u32) -> Self {
        JunctionOperator { junction, level }
    }
}

// ============================================================================
// LIST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionEntry {
    Item(ConditionItem),
    Junction(JunctionOperator),
}

/// Ordered sequence alternating items and junction operators.
///
/// Lists are built fresh by each synthesis call. Every transformation in
/// this crate returns a new list instead of editing one in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionList {
    entries: Vec<ConditionEntry>,
}

impl ConditionList {
    pub fn new() -> Self {
        ConditionList { entries: Vec::new() }
    }

    pub fn single(item: ConditionItem) -> Self {
        ConditionList {
            entries: vec![ConditionEntry::Item(item)],
        }
    }

    /// Builds a list from raw entries. Use `is_valid` to check the shape.
    pub fn from_entries(entries: Vec<ConditionEntry>) -> Self {
        ConditionList { entries }
    }

    /// Appends an item. The junction is ignored when the list is empty.
    pub fn append(&mut self, junction: JunctionOperator, item: ConditionItem) {
        if !self.entries.is_empty() {
            self.entries.push(ConditionEntry::Junction(junction));
        }
        self.entries.push(ConditionEntry::Item(item));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries, junctions included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ConditionEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ConditionEntry> {
        self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &ConditionItem> {
        self.entries.iter().filter_map(|e| match e {
            ConditionEntry::Item(item) => Some(item),
            ConditionEntry::Junction(_) => None,
        })
    }

    pub fn junctions(&self) -> impl Iterator<Item = &JunctionOperator> {
        self.entries.iter().filter_map(|e| match e {
            ConditionEntry::Junction(j) => Some(j),
            ConditionEntry::Item(_) => None,
        })
    }

    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    /// Distinct fields referenced by the list, in first-seen order.
    pub fn fields(&self) -> Vec<&ConditionField> {
        let mut fields: Vec<&ConditionField> = Vec::new();
        for item in self.items() {
            if !fields.contains(&&item.field) {
                fields.push(&item.field);
            }
        }
        fields
    }

    /// True when entries alternate item/junction and start and end with an item.
    /// The empty list is valid and means "no restriction".
    pub fn is_valid(&self) -> bool {
        if self.entries.is_empty() {
            return true;
        }
        if self.entries.len() % 2 == 0 {
            return false;
        }
        self.entries.iter().enumerate().all(|(i, entry)| match entry {
            ConditionEntry::Item(_) => i % 2 == 0,
            ConditionEntry::Junction(_) => i % 2 == 1,
        })
    }
}

impl fmt::Display for ConditionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_node() {
            Some(node) => write!(f, "{}", node),
            None if self.entries.is_empty() => Ok(()),
            None => f.write_str("<invalid condition list>"),
        }
    }
}
