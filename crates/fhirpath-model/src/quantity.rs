//! The quantity subsystem (spec.md §3.5, §4.6): unit-aware arithmetic and
//! comparison backed by `octofhir-ucum`, with calendar-unit aliasing and
//! lazy, cached UCUM materialization (spec.md §9 "Lazy UCUM materialization").

use std::sync::{Arc, OnceLock};

use octofhir_ucum::OwnedUnitExpr;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use octofhir_fhirpath_core::FhirPathError;

/// `Quantity = { value, unit, _ucumQuantity? }` (spec.md §3.5). The parsed
/// UCUM unit expression is materialized lazily on first unit-sensitive
/// operation, not at construction time, and cached thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Decimal,
    /// `None` for a unitless quantity (UCUM's dimensionless `1`).
    pub unit: Option<String>,
    #[serde(skip)]
    ucum_cache: Arc<OnceLock<Option<OwnedUnitExpr>>>,
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.unit == other.unit
    }
}

/// Calendar-unit words alias to UCUM codes at construction time (spec.md
/// §3.5, glossary "Calendar unit").
fn normalize_calendar_unit(unit: &str) -> String {
    match unit {
        "year" | "years" => "a",
        "month" | "months" => "mo",
        "week" | "weeks" => "wk",
        "day" | "days" => "d",
        "hour" | "hours" => "h",
        "minute" | "minutes" => "min",
        "second" | "seconds" => "s",
        "millisecond" | "milliseconds" => "ms",
        other => other,
    }
    .to_string()
}

impl Quantity {
    pub fn new(value: Decimal, unit: Option<String>) -> Self {
        let unit = unit.map(|u| normalize_calendar_unit(&u));
        Self {
            value,
            unit,
            ucum_cache: Arc::new(OnceLock::new()),
        }
    }

    pub fn unitless(value: Decimal) -> Self {
        Self {
            value,
            unit: None,
            ucum_cache: Arc::new(OnceLock::new()),
        }
    }

    /// Materializes (once) and returns the parsed UCUM unit expression.
    fn ucum_expr(&self) -> Option<&OwnedUnitExpr> {
        let unit = self.unit.as_ref()?;
        self.ucum_cache
            .get_or_init(|| octofhir_ucum::parse_expression(unit).ok())
            .as_ref()
    }

    /// `isValid` (spec.md §4.6): the unit string is empty/absent (unitless,
    /// always valid) or parses as a UCUM expression.
    pub fn is_valid(&self) -> bool {
        match &self.unit {
            None => true,
            Some(_) => self.ucum_expr().is_some(),
        }
    }

    pub fn has_compatible_dimensions(&self, other: &Quantity) -> bool {
        match (&self.unit, &other.unit) {
            (Some(u1), Some(u2)) => octofhir_ucum::is_comparable(u1, u2).unwrap_or(false),
            (None, None) => true,
            _ => false,
        }
    }

    fn convert_to_unit(&self, target_unit: &str) -> Result<Quantity, FhirPathError> {
        let from_unit = self
            .unit
            .as_deref()
            .ok_or_else(|| FhirPathError::incompatible_units("", target_unit))?;
        if from_unit == target_unit {
            return Ok(self.clone());
        }
        let (from, to) = (
            octofhir_ucum::analyse(from_unit),
            octofhir_ucum::analyse(target_unit),
        );
        match (from, to) {
            (Ok(from), Ok(to)) if from.dimension == to.dimension => {
                let factor = from.factor / to.factor;
                let offset = from.offset - to.offset;
                let value_f64 = self.value.to_f64().unwrap_or(0.0);
                let converted = value_f64 * factor + offset;
                let converted = Decimal::try_from(converted).unwrap_or(self.value);
                Ok(Quantity::new(converted, Some(target_unit.to_string())))
            }
            _ => Err(FhirPathError::incompatible_units(from_unit, target_unit)),
        }
    }

    /// `add` (spec.md §4.6): requires unit compatibility, result adopts the
    /// left operand's unit.
    pub fn add(&self, other: &Quantity) -> Result<Quantity, FhirPathError> {
        self.combine(other, |a, b| a + b)
    }

    /// `subtract` (spec.md §4.6).
    pub fn subtract(&self, other: &Quantity) -> Result<Quantity, FhirPathError> {
        self.combine(other, |a, b| a - b)
    }

    fn combine(
        &self,
        other: &Quantity,
        op: impl Fn(Decimal, Decimal) -> Decimal,
    ) -> Result<Quantity, FhirPathError> {
        match (&self.unit, &other.unit) {
            (Some(u1), Some(u2)) if u1 == u2 => Ok(Quantity::new(
                op(self.value, other.value),
                self.unit.clone(),
            )),
            (Some(u1), Some(_)) if self.has_compatible_dimensions(other) => {
                let converted = other.convert_to_unit(u1)?;
                Ok(Quantity::new(
                    op(self.value, converted.value),
                    self.unit.clone(),
                ))
            }
            (Some(u1), Some(u2)) => Err(FhirPathError::incompatible_units(u1, u2)),
            (None, None) => Ok(Quantity::new(op(self.value, other.value), None)),
            _ => Err(FhirPathError::incompatible_units(
                self.unit.as_deref().unwrap_or(""),
                other.unit.as_deref().unwrap_or(""),
            )),
        }
    }

    /// `multiply` (spec.md §4.6): units combine as `u1.u2`; identical units
    /// do not cancel under multiplication (only under division).
    pub fn multiply(&self, other: &Quantity) -> Quantity {
        let unit = match (&self.unit, &other.unit) {
            (Some(l), Some(r)) if l == "1" => Some(r.clone()),
            (Some(l), Some(r)) if r == "1" => Some(l.clone()),
            (Some(l), Some(r)) => Some(format!("{l}.{r}")),
            (Some(u), None) | (None, Some(u)) => Some(u.clone()),
            (None, None) => None,
        };
        Quantity::new(self.value * other.value, unit)
    }

    /// `divide` (spec.md §4.6): identical units cancel to the dimensionless
    /// unit `1`. Returns `None` on division by zero (the interpreter maps
    /// this to an empty collection, spec.md §4.6).
    pub fn divide(&self, other: &Quantity) -> Option<Quantity> {
        if other.value.is_zero() {
            return None;
        }
        let unit = match (&self.unit, &other.unit) {
            (Some(n), Some(d)) if n == d => Some("1".to_string()),
            (Some(n), Some(d)) => Some(format!("{n}/{d}")),
            (Some(n), None) => Some(n.clone()),
            (None, Some(d)) => Some(format!("1/{d}")),
            (None, None) => None,
        };
        Some(Quantity::new(self.value / other.value, unit))
    }

    /// `compare`/`equal` (spec.md §4.6): converts to a common unit first.
    /// Incompatible units compare as unequal / incomparable.
    pub fn equal(&self, other: &Quantity) -> bool {
        match (&self.unit, &other.unit) {
            (Some(u1), Some(u2)) if u1 == u2 => self.value == other.value,
            (Some(u1), Some(_)) if self.has_compatible_dimensions(other) => other
                .convert_to_unit(u1)
                .map(|c| self.value == c.value)
                .unwrap_or(false),
            (None, None) => self.value == other.value,
            _ => false,
        }
    }

    /// Returns `None` (incomparable) for incompatible units.
    pub fn compare(&self, other: &Quantity) -> Option<std::cmp::Ordering> {
        match (&self.unit, &other.unit) {
            (Some(u1), Some(u2)) if u1 == u2 => Some(self.value.cmp(&other.value)),
            (Some(u1), Some(_)) if self.has_compatible_dimensions(other) => other
                .convert_to_unit(u1)
                .ok()
                .map(|c| self.value.cmp(&c.value)),
            (None, None) => Some(self.value.cmp(&other.value)),
            _ => None,
        }
    }

    pub fn to_display_string(&self) -> String {
        match &self.unit {
            Some(unit) => format!("{} '{}'", self.value, unit),
            None => self.value.to_string(),
        }
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(value: i64, unit: &str) -> Quantity {
        Quantity::new(Decimal::from(value), Some(unit.to_string()))
    }

    #[test]
    fn calendar_units_normalize_to_ucum() {
        let quantity = q(1, "year");
        assert_eq!(quantity.unit.as_deref(), Some("a"));
        let quantity = q(6, "months");
        assert_eq!(quantity.unit.as_deref(), Some("mo"));
    }

    #[test]
    fn same_unit_addition_keeps_unit() {
        let sum = q(5, "mg").add(&q(3, "mg")).unwrap();
        assert_eq!(sum.value, Decimal::from(8));
        assert_eq!(sum.unit.as_deref(), Some("mg"));
    }

    #[test]
    fn division_by_same_unit_cancels_to_dimensionless() {
        let result = q(10, "m").divide(&q(2, "m")).unwrap();
        assert_eq!(result.unit.as_deref(), Some("1"));
    }

    #[test]
    fn division_by_zero_is_none() {
        assert!(q(10, "m").divide(&q(0, "m")).is_none());
    }

    #[test]
    fn incompatible_units_fail_to_combine() {
        let mg = q(5, "mg");
        let ml = q(3, "mL");
        assert!(mg.add(&ml).is_err());
    }

    #[test]
    fn ucum_cache_is_lazy() {
        let quantity = q(5, "mg");
        assert!(!quantity.ucum_cache.get().is_some());
        let _ = quantity.is_valid();
        assert!(quantity.ucum_cache.get().is_some());
    }
}
