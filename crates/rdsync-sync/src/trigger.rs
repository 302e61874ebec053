//! Job triggers
//!
//! A [`Trigger`] maps the previous fire time to the next one. The scheduler
//! asks again after every firing, so triggers hold no mutable state.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use rdsync_core::config::ScheduleConfig;

use crate::SyncError;

/// Computes when a job fires next
pub trait Trigger: Send + Sync + fmt::Debug {
    /// Next fire time
    ///
    /// # Arguments
    /// * `previous` - The last scheduled fire time, `None` before the first firing
    /// * `now` - Current time
    ///
    /// # Returns
    /// `None` when the trigger will never fire again
    fn next_fire(
        &self,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// Builds the trigger for a configured schedule
pub fn from_schedule(schedule: &ScheduleConfig) -> Result<Box<dyn Trigger>, SyncError> {
    match schedule {
        ScheduleConfig::Interval(secs) => Ok(Box::new(IntervalTrigger::new(
            Duration::from_secs(*secs),
        )?)),
        ScheduleConfig::Cron(expr) => Ok(Box::new(CronTrigger::parse(expr)?)),
    }
}

// ============================================================================
// IntervalTrigger
// ============================================================================

/// Fires immediately, then every `period`
///
/// Missed firings (e.g. after the host was suspended) collapse into a single
/// firing at the current time.
#[derive(Debug, Clone)]
pub struct IntervalTrigger {
    period: chrono::Duration,
}

impl IntervalTrigger {
    /// Creates an interval trigger; a zero period is rejected
    pub fn new(period: Duration) -> Result<Self, SyncError> {
        if period.is_zero() {
            return Err(SyncError::InvalidSchedule(
                "interval must be greater than 0".into(),
            ));
        }
        let period = chrono::Duration::from_std(period)
            .map_err(|e| SyncError::InvalidSchedule(format!("interval out of range: {e}")))?;
        Ok(Self { period })
    }

    /// Interval length
    pub fn period(&self) -> Duration {
        self.period.to_std().unwrap_or_default()
    }
}

impl Trigger for IntervalTrigger {
    fn next_fire(
        &self,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match previous {
            None => Some(now),
            Some(prev) => Some((prev + self.period).max(now)),
        }
    }

    fn describe(&self) -> String {
        format!("every {}s", self.period.num_seconds())
    }
}

// ============================================================================
// CronTrigger
// ============================================================================

/// Time zone a cron expression is evaluated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CronZone {
    /// The host's local time zone
    #[default]
    Local,
    /// UTC
    Utc,
}

/// Names the `cron` crate accepts for days of the week, Sunday first
const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Rewrites a crontab day-of-week field with day names
///
/// Crontab numbers days 0-7 with both 0 and 7 meaning Sunday, while the
/// `cron` crate numbers them 1-7 from Sunday. Numeric items, ranges and
/// steps are expanded to names; `*`, `?` and named items pass through.
fn crontab_day_of_week(field: &str) -> Result<String, SyncError> {
    let invalid =
        |reason: &str| SyncError::InvalidSchedule(format!("day-of-week '{field}': {reason}"));
    let number = |text: &str| -> Result<u32, SyncError> {
        text.parse::<u32>()
            .map_err(|_| invalid(&format!("'{text}' is not a number")))
    };

    let mut names: Vec<&str> = Vec::new();
    let mut passthrough: Vec<&str> = Vec::new();

    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => (base, Some(number(step)?)),
            None => (item, None),
        };
        if step == Some(0) {
            return Err(invalid("step must be greater than 0"));
        }

        let (start, end) = if base == "*" {
            if step.is_none() {
                return Ok("*".to_string());
            }
            (0, 6)
        } else if base.chars().all(|c| c.is_ascii_digit() || c == '-') && !base.is_empty() {
            match base.split_once('-') {
                Some((a, b)) => (number(a)?, number(b)?),
                None => {
                    let day = number(base)?;
                    // A stepped single day runs to the end of the week
                    (day, if step.is_some() { 7 } else { day })
                }
            }
        } else {
            passthrough.push(item);
            continue;
        };

        if start > 7 || end > 7 {
            return Err(invalid("days must be between 0 and 7"));
        }
        if start > end {
            return Err(invalid("range start is after its end"));
        }

        let step = step.unwrap_or(1) as usize;
        for day in (start..=end).step_by(step) {
            let name = DAY_NAMES[(day % 7) as usize];
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    names.extend(passthrough);
    Ok(names.join(","))
}

/// Fires at the times matched by a cron expression, never immediately
///
/// Accepts standard 5-field crontab lines (`min hour dom month dow`) with
/// crontab day-of-week numbering (0 or 7 = Sunday); a seconds field of `0`
/// is prepended. 6- or 7-field expressions (seconds, optional year) are
/// passed to the `cron` crate as-is, where numeric days count from
/// Sunday = 1. Expressions are evaluated in the host's local time unless
/// parsed with [`parse_utc`](Self::parse_utc).
#[derive(Clone)]
pub struct CronTrigger {
    expression: String,
    schedule: cron::Schedule,
    zone: CronZone,
}

impl CronTrigger {
    /// Parses a cron expression evaluated in local time
    pub fn parse(expression: &str) -> Result<Self, SyncError> {
        Self::parse_in(expression, CronZone::Local)
    }

    /// Parses a cron expression evaluated in UTC
    pub fn parse_utc(expression: &str) -> Result<Self, SyncError> {
        Self::parse_in(expression, CronZone::Utc)
    }

    /// Parses a cron expression evaluated in `zone`
    pub fn parse_in(expression: &str, zone: CronZone) -> Result<Self, SyncError> {
        let expression = expression.trim();
        let fields: Vec<&str> = expression.split_whitespace().collect();
        let normalized = match fields.len() {
            5 => format!(
                "0 {} {} {} {} {}",
                fields[0],
                fields[1],
                fields[2],
                fields[3],
                crontab_day_of_week(fields[4])?
            ),
            6 | 7 => expression.to_string(),
            n => {
                return Err(SyncError::InvalidSchedule(format!(
                    "cron expression '{expression}' has {n} fields, expected 5, 6 or 7"
                )))
            }
        };

        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| {
            SyncError::InvalidSchedule(format!("invalid cron expression '{expression}': {e}"))
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
            zone,
        })
    }

    /// The expression as configured
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Time zone the expression is evaluated in
    pub fn zone(&self) -> CronZone {
        self.zone
    }
}

impl fmt::Debug for CronTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronTrigger")
            .field("expression", &self.expression)
            .field("zone", &self.zone)
            .finish()
    }
}

impl Trigger for CronTrigger {
    fn next_fire(
        &self,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let after = previous.map_or(now, |prev| prev.max(now));
        match self.zone {
            CronZone::Local => self
                .schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|at| at.with_timezone(&Utc)),
            CronZone::Utc => self.schedule.after(&after).next(),
        }
    }

    fn describe(&self) -> String {
        match self.zone {
            CronZone::Local => format!("cron '{}'", self.expression),
            CronZone::Utc => format!("cron '{}' (UTC)", self.expression),
        }
    }
}
