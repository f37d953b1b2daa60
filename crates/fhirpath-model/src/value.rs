//! Boxed runtime values (spec.md §3.4) and the calendar-precision temporal
//! wrappers used by `Date`/`DateTime`/`Time` literals.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;
use crate::type_info::{TypeInfo, TypeName};

/// Precision a `@YYYY[-MM[-DD]]` literal was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionDate {
    pub date: NaiveDate,
    pub precision: DatePrecision,
}

/// Precision a `@…Thh[:mm[:ss[.fff]]]` literal was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePrecision {
    Hour,
    Minute,
    Second,
    Millisecond,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionTime {
    pub time: NaiveTime,
    pub precision: TimePrecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionDateTime {
    pub date: PrecisionDate,
    pub time: Option<PrecisionTime>,
    /// Minutes east of UTC, when a `Z`/`±hh:mm` offset was present.
    pub tz_offset_minutes: Option<i32>,
}

/// A single scalar FHIRPath value. Collections are `Vec<BoxedValue>`, never a
/// variant of this enum — spec.md §3.4 treats boxed *items* as the unit of
/// representation and collections as arrays of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FhirPathValue {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(Arc<str>),
    Date(PrecisionDate),
    DateTime(PrecisionDateTime),
    Time(PrecisionTime),
    Quantity(Quantity),
    /// A complex value (FHIR resource, backbone element, or any JSON object
    /// navigated into but not yet unboxed to a primitive).
    Object(serde_json::Value),
}

impl FhirPathValue {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::String(s.into())
    }

    pub fn type_name(&self) -> TypeName {
        match self {
            Self::Boolean(_) => TypeName::Boolean,
            Self::Integer(_) => TypeName::Integer,
            Self::Decimal(_) => TypeName::Decimal,
            Self::String(_) => TypeName::String,
            Self::Date(_) => TypeName::Date,
            Self::DateTime(_) => TypeName::DateTime,
            Self::Time(_) => TypeName::Time,
            Self::Quantity(_) => TypeName::Quantity,
            Self::Object(_) => TypeName::Any,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Integer(i) => Some(Decimal::from(*i)),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// `toString()` semantics (spec.md §4.1 built-ins).
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::String(s) => s.to_string(),
            Self::Date(d) => format_precision_date(d),
            Self::DateTime(dt) => format_precision_datetime(dt),
            Self::Time(t) => format_precision_time(t),
            Self::Quantity(q) => q.to_display_string(),
            Self::Object(v) => v.to_string(),
        }
    }
}

fn format_precision_date(d: &PrecisionDate) -> String {
    use chrono::Datelike;
    match d.precision {
        DatePrecision::Year => format!("{:04}", d.date.year()),
        DatePrecision::Month => format!("{:04}-{:02}", d.date.year(), d.date.month()),
        DatePrecision::Day => d.date.format("%Y-%m-%d").to_string(),
    }
}

fn format_precision_time(t: &PrecisionTime) -> String {
    match t.precision {
        TimePrecision::Hour => t.time.format("%H").to_string(),
        TimePrecision::Minute => t.time.format("%H:%M").to_string(),
        TimePrecision::Second => t.time.format("%H:%M:%S").to_string(),
        TimePrecision::Millisecond => t.time.format("%H:%M:%S%.3f").to_string(),
    }
}

fn format_precision_datetime(dt: &PrecisionDateTime) -> String {
    let mut s = format_precision_date(&dt.date);
    if let Some(t) = &dt.time {
        s.push('T');
        s.push_str(&format_precision_time(t));
        match dt.tz_offset_minutes {
            Some(0) => s.push('Z'),
            Some(off) => {
                let sign = if off < 0 { '-' } else { '+' };
                let off = off.abs();
                s.push_str(&format!("{sign}{:02}:{:02}", off / 60, off % 60));
            }
            None => {}
        }
    }
    s
}

/// A boxed runtime item: the raw `value`, its analyzed/inferred `TypeInfo`
/// when known, and the FHIR "primitive extension" sibling object
/// (`_field`) carried alongside a primitive value (spec.md §3.4, glossary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxedValue {
    pub value: FhirPathValue,
    pub type_info: Option<TypeInfo>,
    pub primitive_element: Option<serde_json::Value>,
}

impl BoxedValue {
    pub fn new(value: FhirPathValue) -> Self {
        Self {
            value,
            type_info: None,
            primitive_element: None,
        }
    }

    pub fn with_type_info(mut self, type_info: TypeInfo) -> Self {
        self.type_info = Some(type_info);
        self
    }

    pub fn with_primitive_element(mut self, element: serde_json::Value) -> Self {
        self.primitive_element = Some(element);
        self
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(FhirPathValue::Boolean(b))
    }

    pub fn integer(i: i64) -> Self {
        Self::new(FhirPathValue::Integer(i))
    }

    pub fn decimal(d: Decimal) -> Self {
        Self::new(FhirPathValue::Decimal(d))
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Self::new(FhirPathValue::String(s.into()))
    }
}

/// A FHIRPath collection: an ordered array of boxed items (spec.md §3.4).
/// Every expression evaluates to one of these, possibly empty (spec.md
/// §4.5).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Collection(pub Vec<BoxedValue>);

impl Collection {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn singleton(value: BoxedValue) -> Self {
        Self(vec![value])
    }

    pub fn from_vec(values: Vec<BoxedValue>) -> Self {
        Self(values)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BoxedValue> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<BoxedValue> {
        self.0
    }

    pub fn as_slice(&self) -> &[BoxedValue] {
        &self.0
    }

    /// The single item, if this collection has exactly one (spec.md §4.4.1
    /// singleton enforcement).
    pub fn as_singleton(&self) -> Option<&BoxedValue> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn push(&mut self, value: BoxedValue) {
        self.0.push(value);
    }

    pub fn extend(&mut self, other: Collection) {
        self.0.extend(other.0);
    }
}

impl FromIterator<BoxedValue> for Collection {
    fn from_iter<T: IntoIterator<Item = BoxedValue>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Collection {
    type Item = BoxedValue;
    type IntoIter = std::vec::IntoIter<BoxedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_detection() {
        let one = Collection::singleton(BoxedValue::integer(1));
        assert!(one.as_singleton().is_some());
        let many = Collection::from_vec(vec![BoxedValue::integer(1), BoxedValue::integer(2)]);
        assert!(many.as_singleton().is_none());
        assert!(Collection::empty().as_singleton().is_none());
    }

    #[test]
    fn to_display_string_integer() {
        assert_eq!(FhirPathValue::Integer(42).to_display_string(), "42");
    }
}
