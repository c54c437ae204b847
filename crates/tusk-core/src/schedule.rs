//! Calendar-date range queries over tasks
//!
//! Due dates are compared as calendar dates: the year/month/day of the
//! stored stamp in its own offset, never the instant. All functions here are
//! pure; the command layer supplies the anchor date and renders the result.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate};

use crate::model::Task;

/// Calendar date of a stamp, read in the stamp's own offset
pub fn date_only(ts: &DateTime<FixedOffset>) -> NaiveDate {
    ts.date_naive()
}

/// Monday on or before the given date (ISO week; Sunday counts as day 7)
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// True when the task is open and due strictly before `today`
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    match task.due_date {
        Some(due) if !task.done => date_only(&due) < today,
        _ => false,
    }
}

/// Result of a date-range query: `overdue` holds open tasks due before the
/// range start (only when requested) and is listed ahead of `due`.
#[derive(Debug, Default)]
pub struct RangeView {
    pub overdue: Vec<Task>,
    pub due: Vec<Task>,
}

impl RangeView {
    pub fn is_empty(&self) -> bool {
        self.overdue.is_empty() && self.due.is_empty()
    }

    /// Overdue first, then in-range, as the schedule listings print them
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.overdue.iter().chain(self.due.iter())
    }
}

/// Select open tasks whose due date falls in `[start, end)`. Done tasks and
/// tasks without a due date never match. With `include_overdue`, open tasks
/// due before `start` are collected separately.
pub fn tasks_in_range(
    tasks: &[Task],
    start: NaiveDate,
    end: NaiveDate,
    include_overdue: bool,
) -> RangeView {
    let mut view = RangeView::default();
    for task in tasks {
        if task.done {
            continue;
        }
        let Some(due) = task.due_date else { continue };
        let due = date_only(&due);
        if due >= start && due < end {
            view.due.push(task.clone());
        } else if include_overdue && due < start {
            view.overdue.push(task.clone());
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn task(name: &str, due: Option<&str>, done: bool) -> Task {
        Task {
            id: format!("id-{name}"),
            project_id: "p".into(),
            name: name.into(),
            done,
            created_at: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
            due_date: due.map(|d| {
                DateTime::parse_from_rfc3339(&format!("{d}T00:00:00+00:00")).unwrap()
            }),
            duration: None,
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn today_query_includes_overdue_and_excludes_done() {
        let tasks = vec![
            task("due-today", Some("2025-01-01"), false),
            task("done-tomorrow", Some("2025-01-02"), true),
            task("overdue", Some("2024-12-31"), false),
        ];

        let view = tasks_in_range(&tasks, date("2025-01-01"), date("2025-01-02"), true);

        assert_eq!(view.overdue.len(), 1);
        assert_eq!(view.overdue[0].name, "overdue");
        assert_eq!(view.due.len(), 1);
        assert_eq!(view.due[0].name, "due-today");
        assert!(view.iter().all(|t| t.name != "done-tomorrow"));
    }

    #[test]
    fn range_end_is_exclusive() {
        let tasks = vec![task("boundary", Some("2025-01-02"), false)];
        let view = tasks_in_range(&tasks, date("2025-01-01"), date("2025-01-02"), true);
        assert!(view.is_empty());
    }

    #[test]
    fn tasks_without_due_date_never_match() {
        let tasks = vec![task("floating", None, false)];
        let view = tasks_in_range(&tasks, date("2025-01-01"), date("2025-01-08"), true);
        assert!(view.is_empty());
    }

    #[test]
    fn overdue_excluded_unless_requested() {
        let tasks = vec![task("late", Some("2024-12-30"), false)];
        let view = tasks_in_range(&tasks, date("2025-01-01"), date("2025-01-02"), false);
        assert!(view.is_empty());
    }

    #[test]
    fn due_date_read_in_its_own_offset() {
        // 23:30 on Jan 1st in +02:00 is Dec 31st 21:30 UTC; the calendar
        // date must still be Jan 1st.
        let stamp = DateTime::parse_from_rfc3339("2025-01-01T23:30:00+02:00").unwrap();
        assert_eq!(date_only(&stamp), date("2025-01-01"));
    }

    #[test]
    fn week_starts_on_monday() {
        // 2025-01-06 is a Monday
        assert_eq!(start_of_week(date("2025-01-06")), date("2025-01-06"));
        assert_eq!(start_of_week(date("2025-01-08")), date("2025-01-06"));
        assert_eq!(start_of_week(date("2025-01-11")), date("2025-01-06"));
        // Sunday belongs to the week that started six days earlier
        assert_eq!(start_of_week(date("2025-01-12")), date("2025-01-06"));
    }

    #[test]
    fn overdue_predicate() {
        let today = date("2025-01-01");
        assert!(is_overdue(&task("late", Some("2024-12-31"), false), today));
        assert!(!is_overdue(&task("today", Some("2025-01-01"), false), today));
        assert!(!is_overdue(&task("done", Some("2024-12-31"), true), today));
        assert!(!is_overdue(&task("no-due", None, false), today));
    }
}
