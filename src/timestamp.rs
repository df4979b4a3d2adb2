use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

const WALL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Instant(DateTime<FixedOffset>),
    /// Wall-clock time, read in whatever zone the caller is in.
    Wall(NaiveDateTime),
    Day(NaiveDate),
}

impl Timestamp {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
            return Some(Timestamp::Instant(instant));
        }
        for format in WALL_FORMATS {
            if let Ok(wall) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Timestamp::Wall(wall));
            }
        }
        NaiveDate::parse_from_str(raw, DAY_FORMAT)
            .ok()
            .map(Timestamp::Day)
    }

    pub fn parse_opt(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::parse)
    }

    pub fn local_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            Timestamp::Instant(instant) => instant.with_timezone(tz).date_naive(),
            Timestamp::Wall(wall) => wall.date(),
            Timestamp::Day(day) => *day,
        }
    }

    /// `None` when the wall-clock time falls in a DST gap of `tz`.
    pub fn earliest_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        match self {
            Timestamp::Instant(instant) => Some(instant.with_timezone(tz)),
            Timestamp::Wall(wall) => tz.from_local_datetime(wall).earliest(),
            Timestamp::Day(day) => tz
                .from_local_datetime(&day.and_time(NaiveTime::MIN))
                .earliest(),
        }
    }

    /// A `Day` covers up to the nanosecond before the following midnight.
    pub fn latest_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        match self {
            Timestamp::Instant(_) | Timestamp::Wall(_) => self.earliest_in(tz),
            Timestamp::Day(day) => {
                let next = day.succ_opt()?;
                let midnight = tz
                    .from_local_datetime(&next.and_time(NaiveTime::MIN))
                    .earliest()?;
                Some(midnight - Duration::nanoseconds(1))
            }
        }
    }
}
