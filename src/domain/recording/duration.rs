//! Duration value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Hard ceiling for one recording attempt (30 seconds).
/// Recordings are force-stopped at this point, never rejected.
pub const RECORDING_CEILING_SECS: u64 = 30;

/// Interval at which accumulated capture bytes are flushed into a chunk
pub const CHUNK_FLUSH_INTERVAL_MS: u64 = 1000;

/// Value object representing a time duration.
/// Immutable and validated on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    /// Create a Duration from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a Duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    /// The recording ceiling (30 seconds)
    pub const fn recording_ceiling() -> Self {
        Self::from_secs(RECORDING_CEILING_SECS)
    }

    /// Get duration in seconds
    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    /// Get duration in milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }

    /// Clamp this duration to the recording ceiling.
    /// Requested durations above the ceiling are shortened, not rejected.
    pub fn clamped_to_ceiling(self) -> Self {
        if self.milliseconds > RECORDING_CEILING_SECS * 1000 {
            Self::recording_ceiling()
        } else {
            self
        }
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse a duration string into a Duration value object.
    /// Supported formats: "30s", "1m", "1m30s"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        let err = || DurationParseError {
            input: s.to_string(),
        };

        let parse_num = |part: &str| part.parse::<u64>().map_err(|_| err());

        let (minutes, seconds) = if let Some((min_part, rest)) = input.split_once('m') {
            let minutes = parse_num(min_part)?;
            let seconds = match rest {
                "" => 0,
                r => parse_num(r.strip_suffix('s').ok_or_else(err)?)?,
            };
            (minutes, seconds)
        } else {
            let secs_part = input.strip_suffix('s').ok_or_else(err)?;
            (0, parse_num(secs_part)?)
        };

        let total_ms = minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .and_then(|s| s.checked_mul(1000))
            .ok_or_else(err)?;
        if total_ms == 0 {
            return Err(err());
        }

        Ok(Self {
            milliseconds: total_ms,
        })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.as_secs();
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;

        if minutes == 0 {
            write!(f, "{}s", seconds)
        } else if seconds == 0 {
            write!(f, "{}m", minutes)
        } else {
            write!(f, "{}m{}s", minutes, seconds)
        }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::recording_ceiling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seconds_only() {
        let d: Duration = "15s".parse().unwrap();
        assert_eq!(d.as_secs(), 15);
        assert_eq!(d.as_millis(), 15000);
    }

    #[test]
    fn parse_minutes_only() {
        let d: Duration = "1m".parse().unwrap();
        assert_eq!(d.as_secs(), 60);
    }

    #[test]
    fn parse_minutes_and_seconds() {
        let d: Duration = "1m30s".parse().unwrap();
        assert_eq!(d.as_secs(), 90);
    }

    #[test]
    fn parse_case_insensitive_and_trimmed() {
        let d: Duration = "  30S  ".parse().unwrap();
        assert_eq!(d.as_secs(), 30);
    }

    #[test]
    fn parse_invalid() {
        assert!("".parse::<Duration>().is_err());
        assert!("30".parse::<Duration>().is_err());
        assert!("abc".parse::<Duration>().is_err());
        assert!("30x".parse::<Duration>().is_err());
        assert!("0s".parse::<Duration>().is_err());
        assert!("m5s".parse::<Duration>().is_err());
    }

    #[test]
    fn parse_rejects_values_that_overflow_milliseconds() {
        // Parseable as u64 seconds or minutes but not representable in ms
        assert!("18446744073709552s".parse::<Duration>().is_err());
        assert!("18446744073709551615s".parse::<Duration>().is_err());
        assert!("307445734561825860m".parse::<Duration>().is_err());
    }

    #[test]
    fn display_round_trip() {
        assert_eq!(Duration::from_secs(30).to_string(), "30s");
        assert_eq!(Duration::from_secs(60).to_string(), "1m");
        assert_eq!(Duration::from_secs(90).to_string(), "1m30s");
    }

    #[test]
    fn clamped_to_ceiling() {
        assert_eq!(Duration::from_secs(45).clamped_to_ceiling().as_secs(), 30);
        assert_eq!(Duration::from_secs(10).clamped_to_ceiling().as_secs(), 10);
        assert_eq!(Duration::from_secs(30).clamped_to_ceiling().as_secs(), 30);
    }

    #[test]
    fn default_is_ceiling() {
        assert_eq!(Duration::default().as_secs(), RECORDING_CEILING_SECS);
    }
}
