//! Date/time presentation pinned to the user's reference timezone.
//!
//! Every handler that shows or interprets calendar times goes through this
//! module, so the rendering of dates is identical no matter which tool
//! produced the reply.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Formats and interprets timestamps in a fixed reference timezone.
#[derive(Debug, Clone, Copy)]
pub struct TimeFormatter {
    tz: Tz,
}

impl TimeFormatter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Parse an IANA timezone name such as "Australia/Sydney".
    pub fn from_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| anyhow!("Unknown timezone '{}'", name))?;
        Ok(Self { tz })
    }

    pub fn timezone_name(&self) -> &'static str {
        self.tz.name()
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    pub fn to_zoned(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    /// "Sat 22 Nov 2025"
    pub fn format_date_only(&self, instant: DateTime<Utc>) -> String {
        self.to_zoned(instant).format("%a %-d %b %Y").to_string()
    }

    /// "Sat 22 Nov 2025, 2:00 PM - 4:00 PM", or the long form when the
    /// range crosses midnight.
    pub fn format_time_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        let start = self.to_zoned(start);
        let end = self.to_zoned(end);
        if start.date_naive() == end.date_naive() {
            format!(
                "{}, {} - {}",
                start.format("%a %-d %b %Y"),
                start.format("%-I:%M %p"),
                end.format("%-I:%M %p")
            )
        } else {
            format!(
                "{} - {}",
                start.format("%a %-d %b %Y %-I:%M %p"),
                end.format("%a %-d %b %Y %-I:%M %p")
            )
        }
    }

    /// Parse an RFC3339 timestamp, or a bare date treated as local midnight.
    pub fn parse_point(&self, text: &str) -> Result<DateTime<Utc>> {
        let trimmed = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
            return self.localize(naive);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            let naive = date
                .and_hms_opt(0, 0, 0)
                .context("invalid midnight for date")?;
            return self.localize(naive);
        }
        Err(anyhow!("Unrecognized date/time '{}'", text))
    }

    /// Window covering the local day `days_ahead` days from today.
    pub fn day_window(&self, days_ahead: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        self.day_window_at(self.now(), days_ahead)
    }

    /// Window covering the local ISO week (Monday start) `weeks_ahead`
    /// weeks from the current one.
    pub fn week_window(&self, weeks_ahead: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        self.week_window_at(self.now(), weeks_ahead)
    }

    fn day_window_at(&self, base: DateTime<Tz>, days_ahead: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let day = base.date_naive() + Duration::days(days_ahead);
        let start = self.start_of_day(day);
        (start, start + Duration::days(1))
    }

    fn week_window_at(
        &self,
        base: DateTime<Tz>,
        weeks_ahead: i64,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = base.date_naive();
        let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64)
            + Duration::weeks(weeks_ahead);
        let start = self.start_of_day(monday);
        (start, start + Duration::weeks(1))
    }

    fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        // DST transitions can make local midnight ambiguous or skipped;
        // take the earliest valid instant of the day.
        let naive = day.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| self.tz.from_utc_datetime(&naive))
            .with_timezone(&Utc)
    }

    fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| anyhow!("Time does not exist in timezone {}", self.tz.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn sydney() -> TimeFormatter {
        TimeFormatter::from_name("Australia/Sydney").unwrap()
    }

    #[test]
    fn test_from_name_rejects_unknown() {
        assert!(TimeFormatter::from_name("Atlantis/Lost").is_err());
    }

    #[test]
    fn test_format_date_only() {
        let fmt = sydney();
        // 2025-11-22 03:00 UTC is 2025-11-22 14:00 in Sydney (AEDT, +11)
        let instant = Utc.with_ymd_and_hms(2025, 11, 22, 3, 0, 0).unwrap();
        assert_eq!(fmt.format_date_only(instant), "Sat 22 Nov 2025");
    }

    #[test]
    fn test_format_time_range_same_day() {
        let fmt = sydney();
        let start = Utc.with_ymd_and_hms(2025, 11, 22, 3, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 11, 22, 5, 0, 0).unwrap();
        assert_eq!(
            fmt.format_time_range(start, end),
            "Sat 22 Nov 2025, 2:00 PM - 4:00 PM"
        );
    }

    #[test]
    fn test_format_time_range_crosses_midnight() {
        let fmt = sydney();
        let start = Utc.with_ymd_and_hms(2025, 11, 22, 11, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 11, 22, 23, 0, 0).unwrap();
        let rendered = fmt.format_time_range(start, end);
        assert!(rendered.contains("Sat 22 Nov 2025"), "got: {}", rendered);
        assert!(rendered.contains("Sun 23 Nov 2025"), "got: {}", rendered);
    }

    #[test]
    fn test_parse_point_rfc3339() {
        let fmt = sydney();
        let parsed = fmt.parse_point("2025-11-22T14:00:00+11:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 11, 22, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_point_bare_date_is_local_midnight() {
        let fmt = sydney();
        let parsed = fmt.parse_point("2025-11-22").unwrap();
        // Sydney midnight in November is 13:00 UTC the previous day
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 11, 21, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_point_rejects_garbage() {
        assert!(sydney().parse_point("next thursday-ish").is_err());
    }

    #[test]
    fn test_day_window_covers_one_day() {
        let fmt = sydney();
        let base = fmt.to_zoned(Utc.with_ymd_and_hms(2025, 11, 22, 3, 0, 0).unwrap());
        let (start, end) = fmt.day_window_at(base, 0);
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(fmt.to_zoned(start).date_naive().day(), 22);

        let (tomorrow_start, _) = fmt.day_window_at(base, 1);
        assert_eq!(tomorrow_start, end);
    }

    #[test]
    fn test_week_window_starts_monday() {
        let fmt = sydney();
        let base = fmt.to_zoned(Utc.with_ymd_and_hms(2025, 11, 22, 3, 0, 0).unwrap());
        let (start, end) = fmt.week_window_at(base, 0);
        assert_eq!(fmt.to_zoned(start).weekday(), Weekday::Mon);
        assert_eq!(end - start, Duration::weeks(1));

        let (next_start, _) = fmt.week_window_at(base, 1);
        assert_eq!(next_start, end);
    }
}
