use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of wall-clock time. The energy budget resets on the local calendar
/// day, so everything date-sensitive reads time through this trait.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Today's date in the device's local time zone.
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
