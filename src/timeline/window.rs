use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Controls how much calendar time one window spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineScale {
    Day,
    #[default]
    Week,
    Month,
}

impl TimelineScale {
    pub const ALL: [TimelineScale; 3] = [TimelineScale::Day, TimelineScale::Week, TimelineScale::Month];

    pub fn label(self) -> &'static str {
        match self {
            TimelineScale::Day => "Day",
            TimelineScale::Week => "Week",
            TimelineScale::Month => "Month",
        }
    }
}

/// An inclusive range of local calendar days, from 00:00:00.000 on the first
/// day to 23:59:59.999 on the last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub days: Vec<NaiveDate>,
}

impl DateWindow {
    /// Milliseconds between `start` and `end`.
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Fractional position (0-100) of `instant`, or `None` outside the window.
    pub fn position_of(&self, instant: NaiveDateTime) -> Option<f64> {
        if !self.contains(instant) {
            return None;
        }
        let span = self.duration_ms() as f64;
        Some((instant - self.start).num_milliseconds() as f64 / span * 100.0)
    }
}

/// Resolve the window of `scale` that contains `reference`.
pub fn resolve(reference: NaiveDateTime, scale: TimelineScale) -> DateWindow {
    let day = reference.date();
    let (first, last) = match scale {
        TimelineScale::Day => (day, day),
        TimelineScale::Week => {
            let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
            (monday, monday + Duration::days(6))
        }
        TimelineScale::Month => month_bounds(day),
    };

    let days = first.iter_days().take_while(|d| *d <= last).collect();
    DateWindow {
        start: first.and_time(NaiveTime::MIN),
        end: end_of_day(last),
        days,
    }
}

fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = NaiveDate::from_ymd_opt(day.year(), day.month(), 1).unwrap_or(day);
    let (y, m) = if day.month() == 12 {
        (day.year() + 1, 1)
    } else {
        (day.year(), day.month() + 1)
    };
    // Day zero of the following month.
    let last = NaiveDate::from_ymd_opt(y, m, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(day);
    (first, last)
}

fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    (day + Duration::days(1)).and_time(NaiveTime::MIN) - Duration::milliseconds(1)
}

/// The navigable reference point of the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineViewport {
    /// Any instant inside the window currently shown.
    pub reference: NaiveDateTime,
    pub scale: TimelineScale,
}

impl TimelineViewport {
    pub fn new(reference: NaiveDateTime, scale: TimelineScale) -> Self {
        Self { reference, scale }
    }

    pub fn window(&self) -> DateWindow {
        resolve(self.reference, self.scale)
    }

    /// Move forward one day/week/month.
    pub fn next(&mut self) {
        self.reference = self.shifted(1);
    }

    /// Move back one day/week/month.
    pub fn prev(&mut self) {
        self.reference = self.shifted(-1);
    }

    /// Jump back to the current moment.
    pub fn today(&mut self) {
        self.today_at(Local::now().naive_local());
    }

    pub fn today_at(&mut self, now: NaiveDateTime) {
        self.reference = now;
    }

    pub fn set_scale(&mut self, scale: TimelineScale) {
        self.scale = scale;
    }

    fn shifted(&self, steps: i32) -> NaiveDateTime {
        let r = self.reference;
        match self.scale {
            TimelineScale::Day => r + Duration::days(i64::from(steps)),
            TimelineScale::Week => r + Duration::days(7 * i64::from(steps)),
            TimelineScale::Month => {
                let months = Months::new(steps.unsigned_abs());
                let moved = if steps >= 0 {
                    r.checked_add_months(months)
                } else {
                    r.checked_sub_months(months)
                };
                moved.unwrap_or(r)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn day_window_is_the_reference_day() {
        let w = resolve(noon(2024, 6, 10), TimelineScale::Day);
        assert_eq!(w.start, date(2024, 6, 10).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(w.end, date(2024, 6, 10).and_hms_milli_opt(23, 59, 59, 999).unwrap());
        assert_eq!(w.days, vec![date(2024, 6, 10)]);
    }

    #[test]
    fn leap_february_month_window() {
        let w = resolve(noon(2024, 2, 15), TimelineScale::Month);
        assert_eq!(w.start, date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(w.end, date(2024, 2, 29).and_hms_milli_opt(23, 59, 59, 999).unwrap());
        assert_eq!(w.days.len(), 29);
    }

    #[test]
    fn december_month_window_rolls_year() {
        let w = resolve(noon(2023, 12, 31), TimelineScale::Month);
        assert_eq!(w.days.first(), Some(&date(2023, 12, 1)));
        assert_eq!(w.days.last(), Some(&date(2023, 12, 31)));
    }

    #[test]
    fn week_window_crosses_month_boundary() {
        // Wednesday 2024-05-01
        let w = resolve(noon(2024, 5, 1), TimelineScale::Week);
        assert_eq!(w.days.first(), Some(&date(2024, 4, 29)));
        assert_eq!(w.days.last(), Some(&date(2024, 5, 5)));
        assert_eq!(w.days.len(), 7);
    }

    #[test]
    fn sunday_belongs_to_the_preceding_monday() {
        // Sunday 2024-06-16
        let w = resolve(noon(2024, 6, 16), TimelineScale::Week);
        assert_eq!(w.days.first(), Some(&date(2024, 6, 10)));
        assert_eq!(w.days.last(), Some(&date(2024, 6, 16)));
    }

    #[test]
    fn resolving_from_window_start_is_stable() {
        for scale in TimelineScale::ALL {
            let w = resolve(noon(2024, 2, 15), scale);
            assert_eq!(resolve(w.start, scale), w);
        }
    }

    #[test]
    fn navigation_moves_by_scale() {
        let mut vp = TimelineViewport::new(noon(2024, 1, 31), TimelineScale::Month);
        vp.next();
        assert_eq!(vp.window().days.first(), Some(&date(2024, 2, 1)));
        vp.prev();
        vp.prev();
        assert_eq!(vp.window().days.first(), Some(&date(2023, 12, 1)));

        vp.set_scale(TimelineScale::Week);
        vp.today_at(noon(2024, 6, 12));
        vp.next();
        assert_eq!(vp.window().days.first(), Some(&date(2024, 6, 17)));

        vp.set_scale(TimelineScale::Day);
        vp.prev();
        assert_eq!(vp.window().days, vec![date(2024, 6, 18)]);
    }

    #[test]
    fn position_of_maps_into_percent() {
        let w = resolve(noon(2024, 6, 10), TimelineScale::Day);
        let mid = w.position_of(noon(2024, 6, 10)).unwrap();
        assert!((mid - 50.0).abs() < 0.001);
        assert_eq!(w.position_of(noon(2024, 6, 11)), None);
    }
}
