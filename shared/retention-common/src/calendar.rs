use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::model::weekday_index;

pub const DEFAULT_REFERENCE_TIMEZONE: &str = "America/Sao_Paulo";

/// Step used to walk past a DST gap at local midnight.
const GAP_STEP_MINUTES: i64 = 15;
const MAX_GAP_STEPS: i64 = 4 * 24;

/// Calendar date of `instant` in the reference timezone.
pub fn local_date(instant: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Sunday-based weekday index of `instant` in the reference timezone.
pub fn local_weekday_index(instant: DateTime<Utc>, tz: &Tz) -> u8 {
    weekday_index(instant.with_timezone(tz).weekday())
}

/// First instant of `date` in `tz`, as UTC.
///
/// Zones that jump over midnight for DST start the day at the first valid local time;
/// an ambiguous midnight starts at the earlier of the two instants.
pub fn start_of_local_day(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    for step in 0..=MAX_GAP_STEPS {
        let candidate = midnight + Duration::minutes(step * GAP_STEP_MINUTES);
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => continue,
        }
    }
    Utc.from_utc_datetime(&midnight)
}

/// Half-open UTC window `[start, end)` covering `date` in `tz`.
pub fn local_day_bounds(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
    (start_of_local_day(date, tz), start_of_local_day(next, tz))
}
