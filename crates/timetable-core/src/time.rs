//! Time-of-day helpers.
//!
//! Every time in the timetable is an integer number of minutes since
//! midnight. These functions convert to and from the `HH:mm` text form and
//! provide the snapping/clamping used by the scheduling engine.

use crate::error::SchedulingError;

/// Minutes in one day.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Parse a strict 24-hour `HH:mm` string into minutes since midnight.
///
/// Both fields must be two digits: `"08:05"` is accepted, `"8:05"` and
/// `"24:00"` are not.
///
/// # Errors
/// Returns [`SchedulingError::Format`] on malformed input.
pub fn to_minutes(time: &str) -> Result<i32, SchedulingError> {
    let bytes = time.as_bytes();
    let malformed = || SchedulingError::Format(time.to_string());

    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(malformed());
    }
    let digit = |b: u8| -> Result<i32, SchedulingError> {
        if b.is_ascii_digit() {
            Ok(i32::from(b - b'0'))
        } else {
            Err(malformed())
        }
    };

    let hours = digit(bytes[0])? * 10 + digit(bytes[1])?;
    let minutes = digit(bytes[3])? * 10 + digit(bytes[4])?;
    if hours > 23 || minutes > 59 {
        return Err(malformed());
    }
    Ok(hours * 60 + minutes)
}

/// Format minutes since midnight as `HH:mm`.
///
/// # Errors
/// Returns [`SchedulingError::Range`] unless `minutes` is in `[0, 1440)`.
pub fn to_time(minutes: i32) -> Result<String, SchedulingError> {
    if !(0..MINUTES_PER_DAY).contains(&minutes) {
        return Err(SchedulingError::Range(minutes));
    }
    Ok(format!("{:02}:{:02}", minutes / 60, minutes % 60))
}

/// Lossy variant of [`to_time`] for messages and logs.
pub(crate) fn label(minutes: i32) -> String {
    to_time(minutes).unwrap_or_else(|_| format!("{minutes}min"))
}

/// Round to the nearest multiple of `step`; halves round up.
///
/// A non-positive `step` leaves the value unchanged. Results beyond the
/// `i32` range saturate.
pub fn snap(minutes: i32, step: i32) -> i32 {
    if step <= 0 {
        return minutes;
    }
    let (m, s) = (i64::from(minutes), i64::from(step));
    let snapped = (2 * m + s).div_euclid(2 * s) * s;
    snapped.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Clamp `v` into `[lo, hi]`.
///
/// `lo <= hi` is a precondition; if it does not hold the lower bound wins
/// instead of panicking like [`Ord::clamp`].
pub fn clamp(v: i32, lo: i32, hi: i32) -> i32 {
    v.min(hi).max(lo)
}

/// Signed minutes from `a` to `b`.
///
/// # Errors
/// Returns [`SchedulingError::Format`] if either string is malformed.
pub fn minutes_between(a: &str, b: &str) -> Result<i32, SchedulingError> {
    Ok(to_minutes(b)? - to_minutes(a)?)
}

/// Serde adapter storing a minute count as an `HH:mm` string.
pub mod hhmm {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(minutes: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        let text = super::to_time(*minutes).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::to_minutes(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_times() {
        assert_eq!(to_minutes("00:00"), Ok(0));
        assert_eq!(to_minutes("08:05"), Ok(485));
        assert_eq!(to_minutes("23:59"), Ok(1439));
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["8:00", "24:00", "12:60", "12-30", "1230", "ab:cd", "", "12:3", " 12:30"] {
            assert_eq!(
                to_minutes(bad),
                Err(SchedulingError::Format(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn formats_minutes() {
        assert_eq!(to_time(0).unwrap(), "00:00");
        assert_eq!(to_time(605).unwrap(), "10:05");
        assert_eq!(to_time(1439).unwrap(), "23:59");
        assert_eq!(to_time(1440), Err(SchedulingError::Range(1440)));
        assert_eq!(to_time(-1), Err(SchedulingError::Range(-1)));
    }

    #[test]
    fn snap_rounds_half_up() {
        assert_eq!(snap(482, 5), 480);
        assert_eq!(snap(483, 5), 485);
        assert_eq!(snap(5, 10), 10);
        assert_eq!(snap(15, 10), 20);
        assert_eq!(snap(-5, 10), 0);
        assert_eq!(snap(-6, 10), -10);
        assert_eq!(snap(42, 0), 42);
    }

    #[test]
    fn snap_handles_extreme_values() {
        assert_eq!(snap(i32::MAX, 5), i32::MAX - 2);
        assert_eq!(snap(i32::MIN, 5), i32::MIN);
        assert_eq!(snap(i32::MAX - 1, i32::MAX), i32::MAX);
        assert_eq!(snap(i32::MIN, i32::MAX), -i32::MAX);
    }

    #[test]
    fn clamp_prefers_lower_bound_on_inverted_range() {
        assert_eq!(clamp(5, 0, 10), 5);
        assert_eq!(clamp(-3, 0, 10), 0);
        assert_eq!(clamp(30, 0, 10), 10);
        assert_eq!(clamp(7, 10, 4), 10);
    }

    #[test]
    fn minutes_between_is_signed() {
        assert_eq!(minutes_between("09:00", "10:30"), Ok(90));
        assert_eq!(minutes_between("10:30", "09:00"), Ok(-90));
    }

    #[test]
    fn hhmm_adapter_round_trips_through_json() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct At {
            #[serde(with = "hhmm")]
            at: i32,
        }

        let json = serde_json::to_string(&At { at: 545 }).unwrap();
        assert_eq!(json, r#"{"at":"09:05"}"#);
        let parsed: At = serde_json::from_str(r#"{"at":"17:45"}"#).unwrap();
        assert_eq!(parsed.at, 1065);
        assert!(serde_json::from_str::<At>(r#"{"at":"7:45"}"#).is_err());
    }
}
