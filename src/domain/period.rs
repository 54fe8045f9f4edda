//! Period type
//!
//! Domain primitive for the time windows used by deduplication and
//! windowed hit counts. A period is validated at construction time, so a
//! zero, negative or absurdly large window cannot reach the stores.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Longest accepted period (100 years)
const MAX_SECONDS: i64 = 100 * 365 * SECONDS_PER_DAY;

/// Unit suffixes in display order
const UNITS: [(char, i64); 5] = [
    ('w', SECONDS_PER_WEEK),
    ('d', SECONDS_PER_DAY),
    ('h', SECONDS_PER_HOUR),
    ('m', SECONDS_PER_MINUTE),
    ('s', 1),
];

/// Period represents a positive span of whole seconds.
///
/// # Invariants
/// - Always longer than zero seconds
/// - Never longer than 100 years
///
/// # Example
/// ```
/// use hitcount::domain::Period;
///
/// let week: Period = "1w".parse().unwrap();
/// assert_eq!(week, Period::days(7).unwrap());
/// assert_eq!(week.to_string(), "1w");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    seconds: i64,
}

/// Errors that can occur when creating a Period
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("Period must be positive (got {0} seconds)")]
    NotPositive(i64),

    #[error("Period exceeds the maximum of 100 years")]
    Overflow,

    #[error("Invalid period format: {0}")]
    ParseError(String),
}

impl Period {
    /// Seven days, the default active window
    pub const WEEK: Period = Period {
        seconds: SECONDS_PER_WEEK,
    };

    /// Create a period from a number of seconds.
    ///
    /// # Errors
    /// - `PeriodError::NotPositive` if `seconds <= 0`
    /// - `PeriodError::Overflow` if longer than 100 years
    pub fn from_seconds(seconds: i64) -> Result<Self, PeriodError> {
        if seconds <= 0 {
            return Err(PeriodError::NotPositive(seconds));
        }
        if seconds > MAX_SECONDS {
            return Err(PeriodError::Overflow);
        }
        Ok(Self { seconds })
    }

    /// Start composing a period from several units.
    pub fn builder() -> PeriodBuilder {
        PeriodBuilder::default()
    }

    pub fn weeks(weeks: i64) -> Result<Self, PeriodError> {
        Self::builder().weeks(weeks).build()
    }

    pub fn days(days: i64) -> Result<Self, PeriodError> {
        Self::builder().days(days).build()
    }

    pub fn hours(hours: i64) -> Result<Self, PeriodError> {
        Self::builder().hours(hours).build()
    }

    pub fn minutes(minutes: i64) -> Result<Self, PeriodError> {
        Self::builder().minutes(minutes).build()
    }

    /// Convert a chrono duration, dropping sub-second precision.
    pub fn from_duration(duration: Duration) -> Result<Self, PeriodError> {
        Self::from_seconds(duration.num_seconds())
    }

    /// Convert a std duration, dropping sub-second precision.
    pub fn from_std(duration: std::time::Duration) -> Result<Self, PeriodError> {
        let seconds = i64::try_from(duration.as_secs()).map_err(|_| PeriodError::Overflow)?;
        Self::from_seconds(seconds)
    }

    /// Length of the period in seconds.
    pub fn as_seconds(&self) -> i64 {
        self.seconds
    }

    /// Length of the period as a chrono duration.
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds)
    }

    /// The instant this period reaches back to from `now`.
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }
}

/// Builder composing a period out of weeks, days, hours, minutes and seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodBuilder {
    weeks: i64,
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
}

impl PeriodBuilder {
    pub fn weeks(mut self, weeks: i64) -> Self {
        self.weeks = weeks;
        self
    }

    pub fn days(mut self, days: i64) -> Self {
        self.days = days;
        self
    }

    pub fn hours(mut self, hours: i64) -> Self {
        self.hours = hours;
        self
    }

    pub fn minutes(mut self, minutes: i64) -> Self {
        self.minutes = minutes;
        self
    }

    pub fn seconds(mut self, seconds: i64) -> Self {
        self.seconds = seconds;
        self
    }

    /// Sum all components into a validated period.
    pub fn build(self) -> Result<Period, PeriodError> {
        let parts = [
            (self.weeks, SECONDS_PER_WEEK),
            (self.days, SECONDS_PER_DAY),
            (self.hours, SECONDS_PER_HOUR),
            (self.minutes, SECONDS_PER_MINUTE),
            (self.seconds, 1),
        ];

        let total = parts
            .iter()
            .try_fold(0i64, |acc, (count, unit)| {
                count.checked_mul(*unit).and_then(|s| acc.checked_add(s))
            })
            .ok_or(PeriodError::Overflow)?;

        Period::from_seconds(total)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut remaining = self.seconds;
        for (suffix, unit) in UNITS {
            let count = remaining / unit;
            if count > 0 {
                write!(f, "{}{}", count, suffix)?;
                remaining -= count * unit;
            }
        }
        Ok(())
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    /// Parse text such as `7d`, `1w2d`, `12h 30m` or `45s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(PeriodError::ParseError("empty period".to_string()));
        }

        let mut builder = PeriodBuilder::default();
        let mut digits = String::new();

        for c in compact.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }

            if digits.is_empty() {
                return Err(PeriodError::ParseError(format!(
                    "missing number before '{}' in '{}'",
                    c, s
                )));
            }
            let count: i64 = digits
                .parse()
                .map_err(|_| PeriodError::Overflow)?;
            digits.clear();

            builder = match c.to_ascii_lowercase() {
                'w' => builder.weeks(builder.weeks.saturating_add(count)),
                'd' => builder.days(builder.days.saturating_add(count)),
                'h' => builder.hours(builder.hours.saturating_add(count)),
                'm' => builder.minutes(builder.minutes.saturating_add(count)),
                's' => builder.seconds(builder.seconds.saturating_add(count)),
                other => {
                    return Err(PeriodError::ParseError(format!(
                        "unknown unit '{}' in '{}'",
                        other, s
                    )))
                }
            };
        }

        if !digits.is_empty() {
            return Err(PeriodError::ParseError(format!(
                "missing unit after '{}' in '{}'",
                digits, s
            )));
        }

        builder.build()
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::from_str(&value)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_period_days() {
        let period = Period::days(7).unwrap();
        assert_eq!(period, Period::WEEK);
        assert_eq!(period.as_seconds(), 7 * 86_400);
        assert_eq!(period.duration(), Duration::days(7));
    }

    #[test]
    fn test_period_zero_rejected() {
        assert!(matches!(Period::days(0), Err(PeriodError::NotPositive(0))));
        assert!(matches!(
            Period::from_std(std::time::Duration::from_millis(500)),
            Err(PeriodError::NotPositive(0))
        ));
    }

    #[test]
    fn test_period_negative_rejected() {
        assert!(matches!(Period::hours(-1), Err(PeriodError::NotPositive(-3600))));
    }

    #[test]
    fn test_period_overflow() {
        assert!(matches!(Period::weeks(i64::MAX), Err(PeriodError::Overflow)));
        assert!(matches!(Period::days(365 * 101), Err(PeriodError::Overflow)));
    }

    #[test]
    fn test_builder_combines_units() {
        let period = Period::builder()
            .weeks(1)
            .days(2)
            .hours(3)
            .minutes(4)
            .seconds(5)
            .build()
            .unwrap();

        let expected = SECONDS_PER_WEEK + 2 * SECONDS_PER_DAY + 3 * SECONDS_PER_HOUR + 4 * 60 + 5;
        assert_eq!(period.as_seconds(), expected);
        assert_eq!(period.to_string(), "1w2d3h4m5s");
    }

    #[test]
    fn test_builder_allows_offsetting_components() {
        // one day minus thirty minutes
        let period = Period::builder().days(1).minutes(-30).build().unwrap();
        assert_eq!(period.to_string(), "23h30m");
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("7d".parse::<Period>().unwrap(), Period::days(7).unwrap());
        assert_eq!("12h 30m".parse::<Period>().unwrap().as_seconds(), 45_000);
        assert_eq!("1W".parse::<Period>().unwrap(), Period::weeks(1).unwrap());
        // repeated units accumulate
        assert_eq!("1d1d".parse::<Period>().unwrap(), Period::days(2).unwrap());
    }

    #[test]
    fn test_period_from_str_rejects_garbage() {
        for input in ["", "  ", "7", "d", "7x", "1.5d", "-1d"] {
            let result = input.parse::<Period>();
            assert!(
                matches!(result, Err(PeriodError::ParseError(_))),
                "expected parse error for {:?}, got {:?}",
                input,
                result
            );
        }
        assert!(matches!("0s".parse::<Period>(), Err(PeriodError::NotPositive(0))));
    }

    #[test]
    fn test_period_since() {
        let now = Utc.with_ymd_and_hms(2026, 1, 8, 12, 0, 0).unwrap();
        let period = Period::days(7).unwrap();
        assert_eq!(
            period.since(now),
            Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_period_serde_as_text() {
        let period: Period = serde_json::from_str("\"1w2d\"").unwrap();
        assert_eq!(period, Period::days(9).unwrap());
        assert_eq!(serde_json::to_string(&period).unwrap(), "\"1w2d\"");

        let invalid: Result<Period, _> = serde_json::from_str("\"soon\"");
        assert!(invalid.is_err());
    }
}
