//! Core entities for Tusk
//!
//! Projects contain tasks. Both carry opaque UUID-class ids that never
//! change once assigned; projects additionally carry a short human-friendly
//! shortcut. Optional fields are omitted from the persisted document when
//! absent so older files keep parsing.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parent container for tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Unique alias among live projects; defaults to the first 8 chars of `id`
    #[serde(default)]
    pub shortcut: String,
    pub created_at: DateTime<Utc>,
}

/// A child item within a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub done: bool,
    pub created_at: DateTime<Utc>,
    /// Calendar-date deadline; the stored offset is kept so the date reads
    /// the same as when it was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationClass>,
}

/// Fixed estimation scale for tasks. Absent means "unestimated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationClass {
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
}

impl DurationClass {
    /// All valid values, in ascending order
    pub const ALL: [DurationClass; 5] = [
        DurationClass::M15,
        DurationClass::M30,
        DurationClass::H1,
        DurationClass::H2,
        DurationClass::H4,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            DurationClass::M15 => 15,
            DurationClass::M30 => 30,
            DurationClass::H1 => 60,
            DurationClass::H2 => 120,
            DurationClass::H4 => 240,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DurationClass::M15 => "15m",
            DurationClass::M30 => "30m",
            DurationClass::H1 => "1h",
            DurationClass::H2 => "2h",
            DurationClass::H4 => "4h",
        }
    }
}

impl fmt::Display for DurationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationClass {
    type Err = InvalidDuration;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "15m" => Ok(DurationClass::M15),
            "30m" => Ok(DurationClass::M30),
            "1h" => Ok(DurationClass::H1),
            "2h" => Ok(DurationClass::H2),
            "4h" => Ok(DurationClass::H4),
            _ => Err(InvalidDuration),
        }
    }
}

/// Rejected duration string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDuration;

impl fmt::Display for InvalidDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid duration: use 15m, 30m, 1h, 2h, or 4h")
    }
}

impl std::error::Error for InvalidDuration {}

/// Sum of estimated minutes over the given tasks (unestimated count as zero)
pub fn total_minutes(tasks: &[Task]) -> u32 {
    tasks
        .iter()
        .filter_map(|t| t.duration)
        .map(DurationClass::minutes)
        .sum()
}

/// Render minutes as `"<H>h <M>m"`, omitting a zero component
pub fn format_minutes(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn duration_minutes_mapping() {
        let expected = [15, 30, 60, 120, 240];
        for (dur, mins) in DurationClass::ALL.iter().zip(expected) {
            assert_eq!(dur.minutes(), mins);
        }
    }

    #[test]
    fn duration_parse_round_trip() {
        for dur in DurationClass::ALL {
            assert_eq!(dur.as_str().parse::<DurationClass>().unwrap(), dur);
        }
        assert!("45m".parse::<DurationClass>().is_err());
        assert!("".parse::<DurationClass>().is_err());
    }

    #[test]
    fn format_minutes_omits_zero_component() {
        assert_eq!(format_minutes(15), "15m");
        assert_eq!(format_minutes(60), "1h");
        assert_eq!(format_minutes(135), "2h 15m");
        assert_eq!(format_minutes(0), "0m");
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let task = Task {
            id: "t1".into(),
            project_id: "p1".into(),
            name: "write report".into(),
            done: false,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
            due_date: None,
            duration: None,
        };
        let json = serde_json::to_string(&task).unwrap();
        assert!(!json.contains("due_date"));
        assert!(!json.contains("duration"));
    }

    #[test]
    fn duration_serializes_as_label() {
        let json = serde_json::to_string(&DurationClass::H2).unwrap();
        assert_eq!(json, "\"2h\"");
        let back: DurationClass = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(back, DurationClass::M15);
    }
}
