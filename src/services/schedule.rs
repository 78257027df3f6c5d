//! Course tutoring hours and staff lookup.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};

use crate::config::{parse_clock, Shift, WeekSchedule};
use crate::core::CourseCode;

const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

#[derive(Debug, Clone)]
struct Slot {
    tutor: String,
    location: String,
    start: NaiveTime,
    end: NaiveTime,
}

/// Weekly schedule of one course.
#[derive(Debug, Clone)]
pub struct Schedule {
    course: CourseCode,
    week: Vec<(Weekday, Vec<Slot>)>,
}

impl Schedule {
    /// Build from config. Shifts with unparsable times are skipped; settings
    /// validation rejects them before this point.
    pub fn new(course: CourseCode, week: &WeekSchedule) -> Self {
        let mut days: Vec<(Weekday, Vec<Slot>)> = week
            .iter()
            .filter_map(|(day, shifts)| {
                let weekday = day.parse::<Weekday>().ok()?;
                let mut slots: Vec<Slot> = shifts.iter().filter_map(to_slot).collect();
                slots.sort_by_key(|s| s.start);
                Some((weekday, slots))
            })
            .collect();
        days.sort_by_key(|(d, _)| d.num_days_from_monday());
        Self { course, week: days }
    }

    pub fn course(&self) -> &CourseCode {
        &self.course
    }

    fn day(&self, weekday: Weekday) -> &[Slot] {
        self.week
            .iter()
            .find(|(d, _)| *d == weekday)
            .map(|(_, slots)| slots.as_slice())
            .unwrap_or(&[])
    }

    /// Tutor on shift at `at`, else the next tutor starting later that day.
    pub fn tutor_name(&self, at: NaiveDateTime) -> Option<String> {
        let now = at.time();
        let slots = self.day(at.weekday());

        if let Some(slot) = slots.iter().find(|s| s.start < now && now < s.end) {
            return Some(slot.tutor.clone());
        }
        slots
            .iter()
            .find(|s| now < s.start)
            .map(|s| s.tutor.clone())
    }

    /// "start end" in 12-hour format for a tutor on a day, or "N/A N/A".
    pub fn tutor_time(&self, tutor: &str, weekday: Weekday) -> String {
        match self.day(weekday).iter().find(|s| s.tutor == tutor) {
            Some(slot) => format!("{} {}", clock(slot.start), clock(slot.end)),
            None => "N/A N/A".to_string(),
        }
    }

    /// Render weekday hours, weekends omitted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for weekday in WEEKDAYS {
            let slots = self.day(weekday);
            if slots.is_empty() {
                continue;
            }
            out.push_str(&format!("\n__**{}**__\n", weekday_name(weekday)));
            for slot in slots {
                out.push_str(&format!(
                    "**{} - {}** [{}] - *{}*\n",
                    clock(slot.start),
                    clock(slot.end),
                    slot.location,
                    slot.tutor
                ));
            }
        }
        if out.is_empty() {
            return "*tutoring hours not available.*".to_string();
        }
        out
    }

    pub fn title(&self) -> String {
        format!("🕘 {} Tutoring Hours", self.course)
    }
}

fn to_slot(shift: &Shift) -> Option<Slot> {
    Some(Slot {
        tutor: shift.tutor.clone(),
        location: shift.location.clone(),
        start: parse_clock(&shift.start).ok()?,
        end: parse_clock(&shift.end).ok()?,
    })
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// 12-hour clock without a leading zero, e.g. "2:05pm".
fn clock(time: NaiveTime) -> String {
    time.format("%-I:%M%P").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn schedule() -> Schedule {
        let week: WeekSchedule = serde_json::from_str(
            r#"{
                "Monday": [
                    { "tutor": "Grace", "location": "Lab", "start": "13:00", "end": "15:00" },
                    { "tutor": "Ada", "location": "Library", "start": "09:00", "end": "11:30" }
                ],
                "Saturday": [
                    { "tutor": "Linus", "location": "Home", "start": "10:00", "end": "11:00" }
                ]
            }"#,
        )
        .unwrap();
        Schedule::new(CourseCode::new("EGR222"), &week)
    }

    fn monday(h: u32, m: u32) -> NaiveDateTime {
        // 2024-01-01 is a Monday.
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_tutor_on_shift() {
        assert_eq!(schedule().tutor_name(monday(10, 0)), Some("Ada".to_string()));
        assert_eq!(schedule().tutor_name(monday(14, 0)), Some("Grace".to_string()));
    }

    #[test]
    fn test_next_tutor_when_early() {
        assert_eq!(schedule().tutor_name(monday(8, 0)), Some("Ada".to_string()));
        assert_eq!(schedule().tutor_name(monday(12, 0)), Some("Grace".to_string()));
        assert_eq!(schedule().tutor_name(monday(16, 0)), None);
    }

    #[test]
    fn test_tutor_time() {
        let s = schedule();
        assert_eq!(s.tutor_time("Ada", Weekday::Mon), "9:00am 11:30am");
        assert_eq!(s.tutor_time("Ada", Weekday::Tue), "N/A N/A");
    }

    #[test]
    fn test_render_skips_weekends() {
        let text = schedule().render();
        assert!(text.contains("__**Monday**__"));
        assert!(text.contains("**9:00am - 11:30am** [Library] - *Ada*"));
        assert!(!text.contains("Saturday"));
        assert!(text.find("Ada").unwrap() < text.find("Grace").unwrap());
    }

    #[test]
    fn test_empty_schedule() {
        let s = Schedule::new(CourseCode::new("CSC312"), &WeekSchedule::new());
        assert_eq!(s.render(), "*tutoring hours not available.*");
        assert_eq!(s.tutor_name(monday(10, 0)), None);
    }
}
