//! The Oracle DATE: year, month, day, hour, minute and second, without a time zone.
//!
//! Fields map directly to the calendar fields of the value. Epoch conversions interpret
//! the date in the local time zone of the process.
//!
//! Oracle counts years BC as negative numbers without a year 0, while chrono numbers them
//! astronomically: chrono's year 0 is Oracle's year -1.

use crate::{Result, Error, oci::OCIDate};
use chrono::{Datelike, Timelike, NaiveDate, NaiveDateTime, Local, TimeZone};

const MIN_YEAR : i32 = -4712;
const MAX_YEAR : i32 = 9999;

fn oracle_year(year: i32) -> i32 {
    if year <= 0 { year - 1 } else { year }
}

fn astronomical_year(year: i32) -> i32 {
    if year < 0 { year + 1 } else { year }
}

/// Returns `OCIDate` for the given calendar date and time.
pub fn from_datetime(dt: &NaiveDateTime) -> Result<OCIDate> {
    let year = oracle_year(dt.year());
    if year < MIN_YEAR || MAX_YEAR < year {
        return Err( Error::msg(format!("year {} is out of DATE range", year)) );
    }
    Ok( OCIDate {
        year:  year as i16,
        month: dt.month() as u8,
        day:   dt.day() as u8,
        hour:  dt.hour() as u8,
        min:   dt.minute() as u8,
        sec:   dt.second() as u8,
    } )
}

/// Returns the calendar date and time stored in `OCIDate`.
pub fn to_datetime(date: &OCIDate) -> Result<NaiveDateTime> {
    if date.year == 0 {
        return Err( Error::msg(format!("invalid DATE {:?}", date)) );
    }
    NaiveDate::from_ymd_opt(astronomical_year(date.year as i32), date.month as u32, date.day as u32)
        .and_then(|d| d.and_hms_opt(date.hour as u32, date.min as u32, date.sec as u32))
        .ok_or_else(|| Error::msg(format!("invalid DATE {:?}", date)))
}

/// Converts seconds since the Unix epoch into a local `OCIDate`. Fractions of a second are dropped.
pub fn from_epoch(secs: f64) -> Result<OCIDate> {
    if !secs.is_finite() {
        return Err( Error::new("epoch seconds must be finite") );
    }
    let local = Local.timestamp_opt(secs.floor() as i64, 0)
        .single()
        .ok_or_else(|| Error::msg(format!("{} seconds since the epoch is out of range", secs)))?;
    from_datetime(&local.naive_local())
}

/// Converts a local `OCIDate` into seconds since the Unix epoch.
pub fn to_epoch(date: &OCIDate) -> Result<f64> {
    let dt = to_datetime(date)?;
    let local = Local.from_local_datetime(&dt)
        .single()
        .ok_or_else(|| Error::msg(format!("{} does not map to a single local time", dt)))?;
    Ok( local.timestamp() as f64 )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, m: u32, d: u32, hh: u32, mi: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).and_then(|d| d.and_hms_opt(hh, mi, ss)).expect("valid date")
    }

    #[test]
    fn fields_are_mapped_directly() -> Result<()> {
        let date = from_datetime(&datetime(1969, 7, 24, 16, 50, 35))?;
        assert_eq!(date, OCIDate { year: 1969, month: 7, day: 24, hour: 16, min: 50, sec: 35 });
        assert_eq!(to_datetime(&date)?, datetime(1969, 7, 24, 16, 50, 35));
        Ok(())
    }

    #[test]
    fn midnight_and_last_second() -> Result<()> {
        for dt in &[datetime(2000, 1, 1, 0, 0, 0), datetime(1999, 12, 31, 23, 59, 59)] {
            assert_eq!(to_datetime(&from_datetime(dt)?)?, *dt);
        }
        Ok(())
    }

    #[test]
    fn years_outside_date_range_are_rejected() {
        assert!(from_datetime(&datetime(10000, 1, 1, 0, 0, 0)).is_err());
        // chrono -4712 is 4713 BC
        assert!(from_datetime(&datetime(-4712, 1, 1, 0, 0, 0)).is_err());
        assert!(from_datetime(&datetime(-4711, 1, 1, 0, 0, 0)).is_ok());
    }

    #[test]
    fn years_bc_skip_year_zero() -> Result<()> {
        let date = from_datetime(&datetime(0, 3, 1, 0, 0, 0))?;
        assert_eq!(date.year, -1);
        assert_eq!(to_datetime(&date)?, datetime(0, 3, 1, 0, 0, 0));

        let date = from_datetime(&datetime(-4711, 1, 1, 0, 0, 0))?;
        assert_eq!(date.year, -4712);
        assert_eq!(to_datetime(&date)?.year(), -4711);

        assert_eq!(from_datetime(&datetime(1, 1, 1, 0, 0, 0))?.year, 1);

        let year0 = OCIDate { year: 0, month: 1, day: 1, hour: 0, min: 0, sec: 0 };
        assert_eq!(to_datetime(&year0).map_err(|err| err.code()), Err(-1));
        Ok(())
    }

    #[test]
    fn invalid_dates_are_rejected() {
        let feb30 = OCIDate { year: 2021, month: 2, day: 30, hour: 0, min: 0, sec: 0 };
        assert_eq!(to_datetime(&feb30).map_err(|err| err.code()), Err(-1));
        let hour24 = OCIDate { year: 2021, month: 2, day: 1, hour: 24, min: 0, sec: 0 };
        assert!(to_datetime(&hour24).is_err());
    }

    #[test]
    fn epoch_round_trip() -> Result<()> {
        // noon avoids daylight saving transitions in any zone
        let noon = Local.from_local_datetime(&datetime(2021, 3, 15, 12, 0, 0)).single().expect("local noon");
        let secs = noon.timestamp() as f64;
        let date = from_epoch(secs)?;
        assert_eq!(date, OCIDate { year: 2021, month: 3, day: 15, hour: 12, min: 0, sec: 0 });
        assert_eq!(to_epoch(&date)?, secs);
        Ok(())
    }

    #[test]
    fn fractions_of_a_second_are_dropped() -> Result<()> {
        let noon = Local.from_local_datetime(&datetime(2021, 3, 15, 12, 0, 7)).single().expect("local noon");
        let date = from_epoch(noon.timestamp() as f64 + 0.75)?;
        assert_eq!(date.sec, 7);
        assert!(from_epoch(f64::NAN).is_err());
        Ok(())
    }
}
