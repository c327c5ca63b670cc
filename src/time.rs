//! Device clock collaborator
//!
//! Secure sockets need a correct device date before the TLS engine checks
//! certificate validity windows. The socket layer reads wall-clock seconds from
//! a [`Clock`] and hands the stack a [`DeviceDateTime`].

use std::time::{SystemTime, UNIX_EPOCH};

/// Dates before this year mean the clock was never synchronized
pub const MIN_PLAUSIBLE_YEAR: u32 = 2019;

/// Source of wall-clock time
pub trait Clock {
    /// Seconds since 1970-01-01T00:00:00Z
    fn now_unix_seconds(&self) -> i64;
}

/// Host system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_seconds(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix_seconds(&self) -> i64 {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_unix_seconds(&self) -> i64 {
        (**self).now_unix_seconds()
    }
}

/// Calendar date-time in the layout the stack expects (UTC)
///
/// Years are full years and months are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDateTime {
    /// Full year, e.g. 2024
    pub year: u32,
    /// Month, 1-12
    pub month: u32,
    /// Day of month, 1-31
    pub day: u32,
    /// Hour, 0-23
    pub hour: u32,
    /// Minute, 0-59
    pub minute: u32,
    /// Second, 0-59
    pub second: u32,
}

impl DeviceDateTime {
    /// Convert seconds since the Unix epoch. Negative inputs clamp to the epoch.
    pub fn from_unix_seconds(secs: i64) -> Self {
        let secs = secs.max(0);
        let days = secs.div_euclid(86_400);
        let rem = secs.rem_euclid(86_400) as u32;
        let (year, month, day) = civil_from_days(days);

        Self {
            year: year as u32,
            month,
            day,
            hour: rem / 3600,
            minute: (rem % 3600) / 60,
            second: rem % 60,
        }
    }

    /// Read the current time from `clock`
    pub fn now(clock: &impl Clock) -> Self {
        Self::from_unix_seconds(clock.now_unix_seconds())
    }

    /// Whether the date looks like a synchronized clock
    pub fn is_plausible(&self) -> bool {
        self.year >= MIN_PLAUSIBLE_YEAR
    }
}

impl std::fmt::Display for DeviceDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
