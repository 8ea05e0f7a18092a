use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};

use crate::model::task::{Priority, Task};
use crate::model::view::{DueLabel, DueStyle, PriorityClass};
use crate::ops::dates::days_between;

/// Human label and style class for a task's due date, relative to `now` in
/// `tz`. Tasks without a due date get no label.
pub fn due_label<Tz: TimeZone>(task: &Task, now: DateTime<Utc>, tz: &Tz, twelve_hour: bool) -> Option<DueLabel> {
    if !task.has_due() {
        return None;
    }
    let due = task.due.at.with_timezone(tz).naive_local();
    let today = now.with_timezone(tz).naive_local();

    let diff_days = days_between(today.date(), due.date());
    let diff_months = (due.year() * 12 + due.month0() as i32) - (today.year() * 12 + today.month0() as i32);

    let (mut text, style) = match diff_days {
        d if d < -1 => (month_day(&due), DueStyle::Overdue),
        -1 => ("Yesterday".to_string(), DueStyle::Overdue),
        0 => {
            let style = if task.due.all_day || task.due.at >= now {
                DueStyle::Today
            } else {
                DueStyle::Overdue
            };
            ("Today".to_string(), style)
        }
        1 => ("Tomorrow".to_string(), DueStyle::Tomorrow),
        d if d < 7 => (due.format("%a").to_string(), DueStyle::Normal),
        _ if diff_months < 7 || due.year() == today.year() => (month_day(&due), DueStyle::Normal),
        _ => (format!("{} {}", month_day(&due), due.year()), DueStyle::Normal),
    };

    if !task.due.all_day {
        text.push(' ');
        text.push_str(&clock_time(due.time(), twelve_hour));
    }
    Some(DueLabel { text, style })
}

fn month_day(at: &NaiveDateTime) -> String {
    at.format("%b %-d").to_string()
}

/// `9:05` or `9:05 AM`
pub fn clock_time(time: NaiveTime, twelve_hour: bool) -> String {
    if twelve_hour {
        let (pm, hour) = time.hour12();
        format!("{}:{:02} {}", hour, time.minute(), if pm { "PM" } else { "AM" })
    } else {
        format!("{}:{:02}", time.hour(), time.minute())
    }
}

/// Marker class for a priority; normal priority gets none
pub fn priority_class(priority: Priority) -> Option<PriorityClass> {
    match priority.level() {
        4 => Some(PriorityClass::P1),
        3 => Some(PriorityClass::P2),
        2 => Some(PriorityClass::P3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Due;

    fn now() -> DateTime<Utc> {
        // Wednesday
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap()
    }

    fn due_on(y: i32, m: u32, d: u32, time: Option<(u32, u32)>) -> Task {
        let mut t = Task::new(1, 1, "t");
        let (h, min) = time.unwrap_or((0, 0));
        t.due = Due {
            at: Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap(),
            all_day: time.is_none(),
            is_set: true,
        };
        t
    }

    fn label(task: &Task) -> (String, DueStyle) {
        let l = due_label(task, now(), &Utc, false).unwrap();
        (l.text, l.style)
    }

    #[test]
    fn relative_days() {
        assert_eq!(label(&due_on(2024, 5, 10, None)), ("May 10".into(), DueStyle::Overdue));
        assert_eq!(label(&due_on(2024, 5, 14, None)), ("Yesterday".into(), DueStyle::Overdue));
        assert_eq!(label(&due_on(2024, 5, 15, None)), ("Today".into(), DueStyle::Today));
        assert_eq!(label(&due_on(2024, 5, 16, None)), ("Tomorrow".into(), DueStyle::Tomorrow));
        assert_eq!(label(&due_on(2024, 5, 18, None)), ("Sat".into(), DueStyle::Normal));
        assert_eq!(label(&due_on(2024, 7, 4, None)), ("Jul 4".into(), DueStyle::Normal));
        assert_eq!(label(&due_on(2025, 3, 1, None)), ("Mar 1".into(), DueStyle::Normal));
        assert_eq!(label(&due_on(2026, 3, 1, None)), ("Mar 1 2026".into(), DueStyle::Normal));
    }

    #[test]
    fn today_with_time_passed_is_overdue() {
        assert_eq!(
            label(&due_on(2024, 5, 15, Some((9, 5)))),
            ("Today 9:05".into(), DueStyle::Overdue)
        );
        assert_eq!(
            label(&due_on(2024, 5, 15, Some((18, 30)))),
            ("Today 18:30".into(), DueStyle::Today)
        );
    }

    #[test]
    fn twelve_hour_clock() {
        let task = due_on(2024, 5, 16, Some((18, 30)));
        let l = due_label(&task, now(), &Utc, true).unwrap();
        assert_eq!(l.text, "Tomorrow 6:30 PM");
    }

    #[test]
    fn undated_has_no_label() {
        assert!(due_label(&Task::new(1, 1, "t"), now(), &Utc, false).is_none());
    }

    #[test]
    fn priority_classes() {
        assert_eq!(priority_class(Priority::new(4)), Some(PriorityClass::P1));
        assert_eq!(priority_class(Priority::new(3)), Some(PriorityClass::P2));
        assert_eq!(priority_class(Priority::new(2)), Some(PriorityClass::P3));
        assert_eq!(priority_class(Priority::new(1)), None);
    }
}
