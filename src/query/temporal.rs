//! Temporal literal resolution and calendar-period comparisons (§4.5).
//!
//! `chrono` backs everything here — parsing, offset arithmetic, and the
//! calendar-period comparisons used by `sameDay`/`sameWeek`/`sameMonth`/
//! `sameYear`. Calendar periods are evaluated in UTC: the specification
//! allows an "ambient timezone" but does not mandate one, and the core has
//! no host-supplied timezone input, so UTC is the documented choice (see
//! DESIGN.md's Open Questions).

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::error::QueryError;
use crate::path::{TemporalLiteral, TemporalUnit};

/// Resolve a [`TemporalLiteral`] to an absolute instant. `now` is resolved
/// once per query evaluation by the caller and threaded through here so
/// that `@now` is monotonic within a single query, per §9's open question.
pub fn resolve(lit: &TemporalLiteral, now: DateTime<Utc>) -> Result<DateTime<Utc>, QueryError> {
    match lit {
        TemporalLiteral::Now => Ok(now),
        TemporalLiteral::Today => Ok(start_of_day(now)),
        TemporalLiteral::Yesterday => Ok(start_of_day(now) - Duration::days(1)),
        TemporalLiteral::Tomorrow => Ok(start_of_day(now) + Duration::days(1)),
        TemporalLiteral::NowOffset { positive, amount, unit } => {
            let delta = unit_duration(*unit, *amount);
            Ok(if *positive { now + delta } else { now - delta })
        }
        TemporalLiteral::Absolute(text) => parse_absolute(text),
    }
}

fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(t)
}

fn unit_duration(unit: TemporalUnit, amount: i64) -> Duration {
    match unit {
        TemporalUnit::Year => Duration::days(amount * 365),
        TemporalUnit::Month => Duration::days(amount * 30),
        TemporalUnit::Week => Duration::weeks(amount),
        TemporalUnit::Day => Duration::days(amount),
        TemporalUnit::Hour => Duration::hours(amount),
        TemporalUnit::Minute => Duration::minutes(amount),
        TemporalUnit::Second => Duration::seconds(amount),
    }
}

fn parse_absolute(text: &str) -> Result<DateTime<Utc>, QueryError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(QueryError::FilterSyntax {
        expression: text.to_string(),
        reason: format!("'{text}' is not a recognized ISO-8601 instant"),
    })
}

/// Parse an arbitrary string operand (the left-hand side of a temporal
/// comparison is usually a field value, not a literal) to an instant.
pub fn parse_operand_instant(text: &str) -> Result<DateTime<Utc>, QueryError> {
    parse_absolute(text)
}

pub fn same_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.date_naive() == b.date_naive()
}

pub fn same_week(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    let (ay, aw) = iso_year_week(a);
    let (by, bw) = iso_year_week(b);
    ay == by && aw == bw
}

pub fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub fn same_year(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year()
}

/// `daysAgo N` (and the week/month/year variants): true when `instant` falls
/// within the last `amount` units counting back from `reference`.
pub fn within_last(instant: DateTime<Utc>, amount: i64, unit: TemporalUnit, reference: DateTime<Utc>) -> bool {
    let lower = reference - unit_duration(unit, amount);
    instant <= reference && instant >= lower
}

fn iso_year_week(t: DateTime<Utc>) -> (i32, u32) {
    let iso = t.iso_week();
    (iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_now_and_offsets() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        assert_eq!(resolve(&TemporalLiteral::Now, now).unwrap(), now);
        let three_days_ago = resolve(
            &TemporalLiteral::NowOffset {
                positive: false,
                amount: 3,
                unit: TemporalUnit::Day,
            },
            now,
        )
        .unwrap();
        assert_eq!(three_days_ago, now - Duration::days(3));
    }

    #[test]
    fn same_day_week_month_year_comparisons() {
        let a = Utc.with_ymd_and_hms(2026, 7, 28, 1, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 7, 28, 23, 0, 0).unwrap();
        assert!(same_day(a, b));
        assert!(same_month(a, b));
        assert!(same_year(a, b));
    }

    #[test]
    fn within_last_days_boundary() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap();
        let three_ago = now - Duration::days(3);
        assert!(within_last(three_ago, 3, TemporalUnit::Day, now));
        let four_ago = now - Duration::days(4);
        assert!(!within_last(four_ago, 3, TemporalUnit::Day, now));
    }

    #[test]
    fn parses_iso8601_absolute_literal() {
        let dt = parse_absolute("2024-01-15T00:00:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
    }
}
