//! Minimal cron schedule for the maintenance jobs.
//!
//! Accepts the 5-field `MIN HOUR DOM MON DOW` form evaluated in UTC.
//! Minute and hour support `*`, `*/N`, `N` and `a,b,c`; the three date
//! fields must be `*`.

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, Timelike, Utc};
use std::fmt;
use std::str::FromStr;

/// Daily at 02:00 UTC
pub const DEFAULT_CLEANUP_SCHEDULE: &str = "0 2 * * *";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    expression: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
}

impl Schedule {
    /// First matching minute strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        let start = after
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(after)
            + Duration::minutes(1);

        // Every expression matches at least once a day, so two days of
        // minutes always contain a match.
        let mut candidate = start;
        for _ in 0..(48 * 60) {
            if self.minutes.contains(&candidate.minute()) && self.hours.contains(&candidate.hour()) {
                return candidate;
            }
            candidate += Duration::minutes(1);
        }
        start
    }

    /// Time left until the next run
    pub fn until_next(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

impl FromStr for Schedule {
    type Err = anyhow::Error;

    fn from_str(expression: &str) -> Result<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = parts.as_slice() else {
            bail!(
                "Invalid cron expression '{}' (need 5 fields: MIN HOUR DOM MON DOW)",
                expression
            );
        };
        for (name, field) in [("day of month", dom), ("month", month), ("day of week", dow)] {
            if *field != "*" {
                bail!("Unsupported {} field '{}' in '{}'", name, field, expression);
            }
        }

        Ok(Self {
            expression: expression.to_string(),
            minutes: parse_field(minute, 0, 59)
                .ok_or_else(|| anyhow!("Invalid minute field '{}'", minute))?,
            hours: parse_field(hour, 0, 23)
                .ok_or_else(|| anyhow!("Invalid hour field '{}'", hour))?,
        })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            expression: DEFAULT_CLEANUP_SCHEDULE.to_string(),
            minutes: vec![0],
            hours: vec![2],
        }
    }
}

/// Parse one cron field into the values it matches
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    if let Some(step) = field.strip_prefix("*/") {
        let n: usize = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n).collect());
    }

    let mut values = Vec::new();
    for part in field.split(',') {
        let n: u32 = part.trim().parse().ok()?;
        if n < min || n > max {
            return None;
        }
        values.push(n);
    }
    values.sort_unstable();
    values.dedup();
    Some(values)
}
