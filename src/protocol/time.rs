//! Timestamp encodings used by time-bearing messages
//!
//! Two on-wire forms exist:
//!
//! - **absolute**: milliseconds since the Unix epoch, `u64` little-endian (8 bytes)
//! - **time of day**: milliseconds since local midnight, `u32` **big-endian** (4 bytes)
//!
//! The byte orders differ. Both are what the field endpoints expect and must not be
//! harmonised independently of the firmware.
//!
//! Time-of-day values carry no date. Decoding pins them to the reference clock's date and
//! steps back one day when that lands in the future, so only values younger than 24 hours
//! decode to the instant they were taken at.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};

use super::{Error, Result};

/// Size of the absolute timestamp encoding in bytes
pub const ABSOLUTE_TIMESTAMP_SIZE: usize = 8;

/// Size of the time-of-day encoding in bytes
pub const TIME_OF_DAY_SIZE: usize = 4;

/// Milliseconds in a day; time-of-day values are normally below this
pub const MILLIS_PER_DAY: u32 = 86_400_000;

/// Encode an instant as milliseconds since the epoch (little-endian).
///
/// Sub-millisecond precision is dropped. Instants before the epoch cannot be represented.
pub fn encode_absolute<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> Result<[u8; ABSOLUTE_TIMESTAMP_SIZE]> {
    let millis = timestamp.timestamp_millis();
    let millis = u64::try_from(millis).map_err(|_| Error::TimestampOutOfRange {
        millis: i128::from(millis),
    })?;
    Ok(millis.to_le_bytes())
}

/// Decode milliseconds since the epoch (little-endian) into a UTC instant.
pub fn decode_absolute(bytes: [u8; ABSOLUTE_TIMESTAMP_SIZE]) -> Result<DateTime<Utc>> {
    let raw = u64::from_le_bytes(bytes);
    i64::try_from(raw)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(Error::TimestampOutOfRange {
            millis: i128::from(raw),
        })
}

/// Milliseconds elapsed since local midnight on the timestamp's own date.
#[must_use]
pub fn millis_since_midnight<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> u32 {
    let time = timestamp.naive_local().time();
    // Leap seconds report nanoseconds >= 1e9 and spill into the next second's millis.
    time.num_seconds_from_midnight() * 1000 + time.nanosecond() / 1_000_000
}

/// Encode the wall-clock time of day as big-endian milliseconds since midnight.
#[must_use]
pub fn encode_time_of_day<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> [u8; TIME_OF_DAY_SIZE] {
    millis_since_midnight(timestamp).to_be_bytes()
}

/// Rebuild an instant from a time-of-day encoding relative to `reference_now`.
///
/// The result is placed on `reference_now`'s calendar date in its time zone; if that is
/// strictly later than `reference_now` it is moved back one day.
pub fn decode_time_of_day<Tz: TimeZone>(
    bytes: [u8; TIME_OF_DAY_SIZE],
    reference_now: &DateTime<Tz>,
) -> Result<DateTime<Tz>> {
    let millis = u32::from_be_bytes(bytes);
    let tz = reference_now.timezone();
    let midnight = reference_now.date_naive().and_time(NaiveTime::MIN);
    let candidate = midnight
        .checked_add_signed(TimeDelta::milliseconds(i64::from(millis)))
        .ok_or(Error::TimestampOutOfRange {
            millis: i128::from(millis),
        })?;

    let resolved = localize(&tz, candidate, millis)?;
    if resolved <= *reference_now {
        return Ok(resolved);
    }

    let previous = candidate
        .checked_sub_signed(TimeDelta::days(1))
        .ok_or(Error::TimestampOutOfRange {
            millis: i128::from(millis),
        })?;
    localize(&tz, previous, millis)
}

/// Decode a time-of-day encoding against the host's local clock.
pub fn decode_time_of_day_now(bytes: [u8; TIME_OF_DAY_SIZE]) -> Result<DateTime<FixedOffset>> {
    decode_time_of_day(bytes, &Local::now().fixed_offset())
}

fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, millis: u32) -> Result<DateTime<Tz>> {
    // Wall-clock times skipped by a DST jump have no instant; ambiguous ones take the earlier.
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or(Error::TimestampOutOfRange {
            millis: i128::from(millis),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, SubsecRound};

    fn at(offset_hours: i32, y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32, ms: u32) -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_milli_opt(hh, mm, ss, ms)
            .unwrap();
        tz.from_local_datetime(&naive).unwrap()
    }

    #[test]
    fn absolute_is_little_endian_millis() {
        let ts = DateTime::from_timestamp_millis(1000).unwrap();
        assert_eq!(encode_absolute(&ts).unwrap(), [0xE8, 0x03, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn absolute_roundtrip_drops_sub_millisecond() {
        let ts = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let decoded = decode_absolute(encode_absolute(&ts).unwrap()).unwrap();
        assert_eq!(decoded, ts.trunc_subsecs(3));
    }

    #[test]
    fn absolute_rejects_pre_epoch() {
        let ts = DateTime::from_timestamp_millis(-1).unwrap();
        assert!(matches!(
            encode_absolute(&ts),
            Err(Error::TimestampOutOfRange { millis: -1 })
        ));
    }

    #[test]
    fn absolute_rejects_unrepresentable_millis() {
        assert!(matches!(
            decode_absolute([0xFF; 8]),
            Err(Error::TimestampOutOfRange { .. })
        ));
    }

    #[test]
    fn time_of_day_is_big_endian_local_millis() {
        let ts = at(2, 2024, 6, 1, 13, 45, 30, 250);
        let expected: u32 = ((13 * 60 + 45) * 60 + 30) * 1000 + 250;
        assert_eq!(millis_since_midnight(&ts), expected);
        assert_eq!(encode_time_of_day(&ts), expected.to_be_bytes());
    }

    #[test]
    fn time_of_day_bounds() {
        assert_eq!(millis_since_midnight(&at(0, 2024, 1, 1, 0, 0, 0, 0)), 0);
        assert_eq!(
            millis_since_midnight(&at(0, 2024, 1, 1, 23, 59, 59, 999)),
            MILLIS_PER_DAY - 1
        );
    }

    #[test]
    fn decode_same_day_when_in_the_past() {
        let now = at(2, 2024, 6, 1, 14, 0, 0, 0);
        let taken = at(2, 2024, 6, 1, 13, 45, 30, 250);
        let decoded = decode_time_of_day(encode_time_of_day(&taken), &now).unwrap();
        assert_eq!(decoded, taken);
    }

    #[test]
    fn decode_steps_back_a_day_when_in_the_future() {
        let now = at(2, 2024, 6, 1, 0, 10, 0, 0);
        let taken = at(2, 2024, 5, 31, 23, 50, 0, 0);
        let decoded = decode_time_of_day(encode_time_of_day(&taken), &now).unwrap();
        assert_eq!(decoded, taken);
    }

    #[test]
    fn decode_equal_to_now_stays_on_today() {
        let now = at(-5, 2024, 6, 1, 9, 0, 0, 0);
        let decoded = decode_time_of_day(encode_time_of_day(&now), &now).unwrap();
        assert_eq!(decoded, now);
    }

    #[test]
    fn decode_older_than_a_day_is_misdated() {
        let now = at(0, 2024, 6, 3, 12, 0, 0, 0);
        let taken = at(0, 2024, 6, 1, 11, 0, 0, 0);
        let decoded = decode_time_of_day(encode_time_of_day(&taken), &now).unwrap();
        assert_eq!(decoded, at(0, 2024, 6, 3, 11, 0, 0, 0));
    }
}
