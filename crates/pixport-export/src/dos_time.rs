//! MS-DOS date/time packing used by ZIP headers.
//!
//! ```text
//! time = hour << 11 | minute << 5 | second / 2
//! date = (year - 1980) << 9 | month << 5 | day
//! ```
//!
//! The format covers 1980-01-01 through 2107-12-31 with two-second
//! resolution.  Instants outside that window clamp to the nearest end.

use time::OffsetDateTime;

/// A packed DOS timestamp, as written into local and central headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosDateTime {
    /// Packed time of day.
    pub time: u16,
    /// Packed calendar date.
    pub date: u16,
}

impl DosDateTime {
    /// Earliest representable instant: 1980-01-01 00:00:00.
    pub const MIN: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Latest representable instant: 2107-12-31 23:59:58.
    pub const MAX: Self = Self {
        time: (23 << 11) | (59 << 5) | (58 / 2),
        date: (127 << 9) | (12 << 5) | 31,
    };

    /// Pack calendar fields.
    ///
    /// `month` is 1-based.  Odd seconds round down.  Years before 1980
    /// yield [`MIN`](Self::MIN) and years after 2107 yield
    /// [`MAX`](Self::MAX).
    #[must_use]
    pub fn from_parts(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let Ok(years) = u16::try_from(year - 1980) else {
            return Self::MIN;
        };
        if years > 127 {
            return Self::MAX;
        }
        Self {
            time: (u16::from(hour) << 11) | (u16::from(minute) << 5) | u16::from(second / 2),
            date: (years << 9) | (u16::from(month) << 5) | u16::from(day),
        }
    }
}

impl From<OffsetDateTime> for DosDateTime {
    fn from(instant: OffsetDateTime) -> Self {
        Self::from_parts(
            instant.year(),
            u8::from(instant.month()),
            instant.day(),
            instant.hour(),
            instant.minute(),
            instant.second(),
        )
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        Self::MIN
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn packs_known_instant() {
        let packed = DosDateTime::from(datetime!(2024-03-15 13:45:31 UTC));
        assert_eq!(packed.time, (13 << 11) | (45 << 5) | 15);
        assert_eq!(packed.date, (44 << 9) | (3 << 5) | 15);
    }

    #[test]
    fn epoch_start_equals_min() {
        assert_eq!(
            DosDateTime::from(datetime!(1980-01-01 00:00:00 UTC)),
            DosDateTime::MIN
        );
    }

    #[test]
    fn before_epoch_clamps_to_min() {
        assert_eq!(
            DosDateTime::from(datetime!(1970-06-01 12:00:00 UTC)),
            DosDateTime::MIN
        );
    }

    #[test]
    fn after_range_clamps_to_max() {
        assert_eq!(
            DosDateTime::from(datetime!(2200-01-01 00:00:00 UTC)),
            DosDateTime::MAX
        );
    }

    #[test]
    fn last_representable_day_is_max() {
        assert_eq!(
            DosDateTime::from(datetime!(2107-12-31 23:59:59 UTC)),
            DosDateTime::MAX
        );
    }

    #[test]
    fn odd_seconds_round_down() {
        let even = DosDateTime::from_parts(2000, 1, 1, 0, 0, 10);
        let odd = DosDateTime::from_parts(2000, 1, 1, 0, 0, 11);
        assert_eq!(even, odd);
    }
}
