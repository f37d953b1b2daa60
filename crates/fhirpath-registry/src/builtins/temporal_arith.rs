//! Calendar-aware `Date`/`DateTime`/`Time` ± `Quantity` arithmetic (spec.md
//! §4.4.1, §9 "Calendar-unit arithmetic" open question — resolved in
//! `DESIGN.md`: calendar units add/subtract via `chrono` directly rather
//! than going through a fixed UCUM ratio, since months/years aren't a fixed
//! multiple of days).

use chrono::{Duration, Months, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;

use octofhir_fhirpath_model::{DatePrecision, PrecisionDate, PrecisionDateTime, PrecisionTime, Quantity, TimePrecision};

/// `true` if `unit` (already normalized to its UCUM code by
/// `Quantity::new`) names a calendar duration this module knows how to
/// apply; anything else (e.g. `mg`, `kg/m2`) isn't temporal arithmetic.
fn calendar_amount(quantity: &Quantity) -> Option<i64> {
    let unit = quantity.unit.as_deref()?;
    if !matches!(unit, "a" | "mo" | "wk" | "d" | "h" | "min" | "s" | "ms") {
        return None;
    }
    quantity.value.to_i64()
}

fn apply_to_datetime(dt: NaiveDateTime, unit: &str, amount: i64) -> Option<NaiveDateTime> {
    match unit {
        "a" => {
            if amount >= 0 {
                dt.checked_add_months(Months::new((amount * 12) as u32))
            } else {
                dt.checked_sub_months(Months::new((-amount * 12) as u32))
            }
        }
        "mo" => {
            if amount >= 0 {
                dt.checked_add_months(Months::new(amount as u32))
            } else {
                dt.checked_sub_months(Months::new((-amount) as u32))
            }
        }
        "wk" => dt.checked_add_signed(Duration::weeks(amount)),
        "d" => dt.checked_add_signed(Duration::days(amount)),
        "h" => dt.checked_add_signed(Duration::hours(amount)),
        "min" => dt.checked_add_signed(Duration::minutes(amount)),
        "s" => dt.checked_add_signed(Duration::seconds(amount)),
        "ms" => dt.checked_add_signed(Duration::milliseconds(amount)),
        _ => None,
    }
}

/// `Date ± Quantity` (calendar unit). `h`/`min`/`s`/`ms` aren't meaningful
/// against a bare date and yield `None` (the interpreter maps this to an
/// empty collection, spec.md §4.4.1 "result type Date/DateTime/Time when
/// the quantity is a time unit").
pub fn add_to_date(date: &PrecisionDate, quantity: &Quantity, sign: i64) -> Option<PrecisionDate> {
    let unit = quantity.unit.as_deref()?;
    if matches!(unit, "h" | "min" | "s" | "ms") {
        return None;
    }
    let amount = calendar_amount(quantity)? * sign;
    let midnight = date.date.and_hms_opt(0, 0, 0)?;
    let result = apply_to_datetime(midnight, unit, amount)?;
    Some(PrecisionDate {
        date: result.date(),
        precision: date.precision,
    })
}

/// `DateTime ± Quantity`.
pub fn add_to_datetime(dt: &PrecisionDateTime, quantity: &Quantity, sign: i64) -> Option<PrecisionDateTime> {
    let unit = quantity.unit.as_deref()?;
    let amount = calendar_amount(quantity)? * sign;
    let time = dt.time.as_ref().map(|t| t.time).unwrap_or(NaiveTime::MIN);
    let naive = dt.date.date.and_time(time);
    let result = apply_to_datetime(naive, unit, amount)?;
    Some(PrecisionDateTime {
        date: PrecisionDate {
            date: result.date(),
            precision: dt.date.precision,
        },
        time: dt.time.as_ref().map(|t| PrecisionTime {
            time: result.time(),
            precision: t.precision,
        }),
        tz_offset_minutes: dt.tz_offset_minutes,
    })
}

/// `Time ± Quantity`. Only sub-day units apply; date rollover is dropped
/// (wraps within the day) since `Time` has no date component.
pub fn add_to_time(time: &PrecisionTime, quantity: &Quantity, sign: i64) -> Option<PrecisionTime> {
    let unit = quantity.unit.as_deref()?;
    if !matches!(unit, "h" | "min" | "s" | "ms") {
        return None;
    }
    let amount = calendar_amount(quantity)? * sign;
    let duration = match unit {
        "h" => Duration::hours(amount),
        "min" => Duration::minutes(amount),
        "s" => Duration::seconds(amount),
        "ms" => Duration::milliseconds(amount),
        _ => return None,
    };
    let (result, _) = time.time.overflowing_add_signed(duration);
    Some(PrecisionTime {
        time: result,
        precision: time.precision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn adding_one_year_moves_the_calendar_year() {
        let date = PrecisionDate {
            date: NaiveDate::from_ymd_opt(2020, 2, 29).unwrap(),
            precision: DatePrecision::Day,
        };
        let one_year = Quantity::new(Decimal::from(1), Some("year".to_string()));
        let result = add_to_date(&date, &one_year, 1).unwrap();
        assert_eq!(result.date.format("%Y-%m-%d").to_string(), "2021-03-01");
    }

    #[test]
    fn subtracting_six_months() {
        let date = PrecisionDate {
            date: NaiveDate::from_ymd_opt(2020, 6, 15).unwrap(),
            precision: DatePrecision::Day,
        };
        let six_months = Quantity::new(Decimal::from(6), Some("months".to_string()));
        let result = add_to_date(&date, &six_months, -1).unwrap();
        assert_eq!(result.date.format("%Y-%m-%d").to_string(), "2019-12-15");
    }
}
