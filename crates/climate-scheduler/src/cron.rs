use std::fmt;

use chrono::{DateTime, Utc};
use croner::Cron;

use crate::error::{Result, SchedulerError};

/// A parsed cron expression, evaluated in UTC.
///
/// Accepts standard 5-field syntax (`min hour dom month dow`) and an
/// optional leading seconds field.
pub struct CronSchedule {
    expression: String,
    cron: Cron,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let expression = expression.trim();
        let cron = Cron::new(expression)
            .with_seconds_optional()
            .parse()
            .map_err(|e| SchedulerError::InvalidSchedule {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            expression: expression.to_string(),
            cron,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First matching instant strictly after `from`.
    ///
    /// `None` when the expression has no future occurrence (e.g. `0 0 30 2 *`).
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron.find_next_occurrence(&from, false).ok()
    }
}

impl fmt::Debug for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CronSchedule").field(&self.expression).finish()
    }
}

/// Check `expression` without keeping the parsed form.
pub fn validate(expression: &str) -> Result<()> {
    CronSchedule::parse(expression).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn every_thirty_minutes() {
        let cron = CronSchedule::parse("*/30 * * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 10, 7, 12).unwrap();
        assert_eq!(
            cron.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn next_is_strictly_after() {
        let cron = CronSchedule::parse("*/30 * * * *").unwrap();
        let on_the_dot = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        assert_eq!(
            cron.next_after(on_the_dot),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap())
        );
    }

    #[test]
    fn optional_seconds_field() {
        let cron = CronSchedule::parse("*/10 * * * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 3).unwrap();
        assert_eq!(
            cron.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 10).unwrap())
        );
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "not a cron", "61 * * * *", "* * *"] {
            assert!(
                matches!(
                    CronSchedule::parse(bad),
                    Err(SchedulerError::InvalidSchedule { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate("0 6 * * MON-FRI").is_ok());
    }
}
