//! # Cron schedule parsing and evaluation.
//!
//! [`CronSpec`] understands the classic 5-field expression:
//!
//! ```text
//! ┌───────── minute        (0-59)
//! │ ┌─────── hour          (0-23)
//! │ │ ┌───── day of month  (1-31)
//! │ │ │ ┌─── month         (1-12)
//! │ │ │ │ ┌─ day of week   (0-7, 0 and 7 are Sunday)
//! │ │ │ │ │
//! * * * * *
//! ```
//!
//! Each field is `*`, a single value, or a comma list of values and ranges
//! (`1,5`, `10-20`, `1,10-20`). Evaluation is minute-resolution.
//!
//! ## Rules
//! - When **both** day-of-month and day-of-week are restricted, a timestamp
//!   matches if **either** field matches (classic cron behavior).
//! - Parse failures are [`FlumeError::NonCritical`]: a bad expression rejects
//!   the supplier configuration before it starts, it never crashes a loop.

use chrono::{DateTime, Datelike, TimeZone, Timelike};

use crate::error::FlumeError;

/// One field of a cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CronField {
    /// `*`: any value.
    Any,
    /// Explicit sorted set of allowed values.
    Set(Vec<u32>),
}

impl CronField {
    fn contains(&self, v: u32) -> bool {
        match self {
            CronField::Any => true,
            CronField::Set(vals) => vals.binary_search(&v).is_ok(),
        }
    }

    fn is_restricted(&self) -> bool {
        matches!(self, CronField::Set(_))
    }
}

/// A parsed 5-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSpec {
    minute: CronField,
    hour: CronField,
    day_of_month: CronField,
    month: CronField,
    day_of_week: CronField,
}

impl CronSpec {
    /// Parses a 5-field cron expression.
    ///
    /// # Example
    /// ```
    /// use taskflume::CronSpec;
    ///
    /// let every_minute = CronSpec::parse("* * * * *").unwrap();
    /// let nightly = CronSpec::parse("30 2 * * 1-5").unwrap();
    /// assert!(CronSpec::parse("* * * *").is_err());
    /// ```
    pub fn parse(expr: &str) -> Result<Self, FlumeError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(FlumeError::non_critical(format!(
                "cron expression '{expr}' must have 5 fields, got {}",
                fields.len()
            )));
        }
        Ok(Self {
            minute: parse_field(fields[0], 0, 59)?,
            hour: parse_field(fields[1], 0, 23)?,
            day_of_month: parse_field(fields[2], 1, 31)?,
            month: parse_field(fields[3], 1, 12)?,
            day_of_week: parse_dow(fields[4])?,
        })
    }

    /// Returns `true` if the given timestamp (minute resolution) matches.
    pub fn matches<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        if !self.minute.contains(at.minute())
            || !self.hour.contains(at.hour())
            || !self.month.contains(at.month())
        {
            return false;
        }

        let dom_ok = self.day_of_month.contains(at.day());
        let dow_ok = self.day_of_week.contains(at.weekday().num_days_from_sunday());

        // Both restricted: either may match. Otherwise both must.
        if self.day_of_month.is_restricted() && self.day_of_week.is_restricted() {
            dom_ok || dow_ok
        } else {
            dom_ok && dow_ok
        }
    }

    /// Returns the first matching minute strictly after `at`.
    ///
    /// Returns `None` if nothing matches within roughly two years (an
    /// expression like `31 2` day-of-month/month can be unsatisfiable).
    pub fn next_after<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let mut t = at
            .clone()
            .with_second(0)?
            .with_nanosecond(0)?
            .checked_add_signed(chrono::Duration::minutes(1))?;

        // Minute stepping: at most ~1M iterations for a two-year horizon.
        const HORIZON_MINUTES: u32 = 2 * 366 * 24 * 60;
        for _ in 0..HORIZON_MINUTES {
            if self.matches(&t) {
                return Some(t);
            }
            t = t.checked_add_signed(chrono::Duration::minutes(1))?;
        }
        None
    }
}

fn parse_field(src: &str, min: u32, max: u32) -> Result<CronField, FlumeError> {
    if src == "*" {
        return Ok(CronField::Any);
    }
    let mut vals = Vec::new();
    for part in src.split(',') {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo = parse_value(lo, min, max)?;
                let hi = parse_value(hi, min, max)?;
                if lo > hi {
                    return Err(FlumeError::non_critical(format!(
                        "cron range '{part}' is inverted"
                    )));
                }
                vals.extend(lo..=hi);
            }
            None => vals.push(parse_value(part, min, max)?),
        }
    }
    vals.sort_unstable();
    vals.dedup();
    Ok(CronField::Set(vals))
}

/// Day-of-week accepts 0-7; 7 is folded into 0 (Sunday).
fn parse_dow(src: &str) -> Result<CronField, FlumeError> {
    match parse_field(src, 0, 7)? {
        CronField::Any => Ok(CronField::Any),
        CronField::Set(vals) => {
            let mut vals: Vec<u32> = vals.into_iter().map(|v| v % 7).collect();
            vals.sort_unstable();
            vals.dedup();
            Ok(CronField::Set(vals))
        }
    }
}

fn parse_value(src: &str, min: u32, max: u32) -> Result<u32, FlumeError> {
    let v: u32 = src
        .trim()
        .parse()
        .map_err(|_| FlumeError::non_critical(format!("cron field '{src}' is not a number")))?;
    if v < min || v > max {
        return Err(FlumeError::non_critical(format!(
            "cron value {v} out of range {min}-{max}"
        )));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let spec = CronSpec::parse("* * * * *").unwrap();
        assert!(spec.matches(&at(2026, 8, 25, 13, 37)));
        assert!(spec.matches(&at(2026, 1, 1, 0, 0)));
    }

    #[test]
    fn test_fixed_minute_and_hour() {
        let spec = CronSpec::parse("30 2 * * *").unwrap();
        assert!(spec.matches(&at(2026, 8, 25, 2, 30)));
        assert!(!spec.matches(&at(2026, 8, 25, 2, 31)));
        assert!(!spec.matches(&at(2026, 8, 25, 3, 30)));
    }

    #[test]
    fn test_lists_and_ranges() {
        let spec = CronSpec::parse("0,30 9-17 * * *").unwrap();
        assert!(spec.matches(&at(2026, 8, 25, 9, 0)));
        assert!(spec.matches(&at(2026, 8, 25, 17, 30)));
        assert!(!spec.matches(&at(2026, 8, 25, 18, 0)));
        assert!(!spec.matches(&at(2026, 8, 25, 9, 15)));
    }

    #[test]
    fn test_mixed_list_with_range() {
        let spec = CronSpec::parse("1,10-12 * * * *").unwrap();
        for m in [1, 10, 11, 12] {
            assert!(spec.matches(&at(2026, 8, 25, 0, m)), "minute {m}");
        }
        assert!(!spec.matches(&at(2026, 8, 25, 0, 2)));
    }

    #[test]
    fn test_day_of_week() {
        // 2026-08-25 is a Tuesday (dow 2).
        let spec = CronSpec::parse("* * * * 2").unwrap();
        assert!(spec.matches(&at(2026, 8, 25, 10, 0)));
        assert!(!spec.matches(&at(2026, 8, 26, 10, 0)));
    }

    #[test]
    fn test_sunday_as_seven() {
        // 2026-08-23 is a Sunday.
        let spec = CronSpec::parse("* * * * 7").unwrap();
        assert!(spec.matches(&at(2026, 8, 23, 10, 0)));
        let spec0 = CronSpec::parse("* * * * 0").unwrap();
        assert!(spec0.matches(&at(2026, 8, 23, 10, 0)));
    }

    #[test]
    fn test_dom_and_dow_either_matches_when_both_restricted() {
        // dom=1 OR dow=Tuesday.
        let spec = CronSpec::parse("* * 1 * 2").unwrap();
        assert!(spec.matches(&at(2026, 8, 25, 0, 0))); // Tuesday, day 25
        assert!(spec.matches(&at(2026, 8, 1, 0, 0))); // Saturday, day 1
        assert!(!spec.matches(&at(2026, 8, 26, 0, 0))); // Wednesday, day 26
    }

    #[test]
    fn test_next_after_simple() {
        let spec = CronSpec::parse("30 2 * * *").unwrap();
        let next = spec.next_after(&at(2026, 8, 25, 2, 30)).unwrap();
        assert_eq!(next, at(2026, 8, 26, 2, 30));

        let next = spec.next_after(&at(2026, 8, 25, 1, 0)).unwrap();
        assert_eq!(next, at(2026, 8, 25, 2, 30));
    }

    #[test]
    fn test_next_after_is_strictly_later() {
        let spec = CronSpec::parse("* * * * *").unwrap();
        let now = at(2026, 8, 25, 13, 37);
        assert_eq!(spec.next_after(&now).unwrap(), at(2026, 8, 25, 13, 38));
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        assert!(CronSpec::parse("* * * *").is_err());
        assert!(CronSpec::parse("* * * * * *").is_err());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(CronSpec::parse("a * * * *").is_err());
        assert!(CronSpec::parse("99 * * * *").is_err());
        assert!(CronSpec::parse("5-1 * * * *").is_err());
    }

    #[test]
    fn test_parse_error_is_non_critical() {
        let err = CronSpec::parse("bogus").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NonCritical);
    }
}
