use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// A stay date interpreted as an instant: local midnight at the start of
/// that day. Lead-time rules compare against this.
pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
