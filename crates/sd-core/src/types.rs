//! Diary record types shared by every format.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid status value.
    #[error("invalid status: {value}")]
    InvalidStatus { value: String },
}

/// What the diarist was doing during a record.
///
/// Ordering follows declaration order and is used as the final tie-breaker
/// when sorting records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "awake")]
    Awake,
    #[serde(rename = "asleep")]
    Asleep,
    #[serde(rename = "in bed")]
    InBed,
    #[serde(rename = "lights off")]
    LightsOff,
    #[serde(rename = "lights on")]
    LightsOn,
    #[serde(rename = "sleep aid")]
    SleepAid,
    #[serde(rename = "meal")]
    Meal,
    #[serde(rename = "exercise")]
    Exercise,
    #[serde(rename = "medication")]
    Medication,
    #[serde(rename = "caffeinated drink")]
    CaffeinatedDrink,
    #[serde(rename = "alcoholic drink")]
    AlcoholicDrink,
}

impl Status {
    /// Every status, in declaration order.
    pub const ALL: &'static [Self] = &[
        Self::Awake,
        Self::Asleep,
        Self::InBed,
        Self::LightsOff,
        Self::LightsOn,
        Self::SleepAid,
        Self::Meal,
        Self::Exercise,
        Self::Medication,
        Self::CaffeinatedDrink,
        Self::AlcoholicDrink,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Awake => "awake",
            Self::Asleep => "asleep",
            Self::InBed => "in bed",
            Self::LightsOff => "lights off",
            Self::LightsOn => "lights on",
            Self::SleepAid => "sleep aid",
            Self::Meal => "meal",
            Self::Exercise => "exercise",
            Self::Medication => "medication",
            Self::CaffeinatedDrink => "caffeinated drink",
            Self::AlcoholicDrink => "alcoholic drink",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// A free-text note attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Comment {
    Text(String),
    Timed {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        time: DateTime<Utc>,
        text: String,
    },
}

impl Comment {
    /// The comment text, dropping any timestamp.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::Timed { text, .. } => text,
        }
    }
}

/// Fields the pivot format derives from the record sequence.
///
/// These are carried through conversions untouched. Only `duration` is ever
/// filled in locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_of_new_day: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary_sleep: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_record_after: Option<bool>,
}

/// One diary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub status: Status,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    #[serde(flatten)]
    pub derived: DerivedFields,
}

impl Record {
    /// Creates a record with no tags, comments or derived fields.
    #[must_use]
    pub fn new(status: Status, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            status,
            start,
            end,
            tags: BTreeSet::new(),
            comments: Vec::new(),
            derived: DerivedFields::default(),
        }
    }

    /// Key used to recognise the same record in two diaries.
    #[must_use]
    pub fn dedup_key(&self) -> (DateTime<Utc>, DateTime<Utc>, Status) {
        (self.start, self.end, self.status)
    }

    /// Length of the record in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// A raw interval of continuous presence.
///
/// Point events have `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Activity {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
}

impl Activity {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn point(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }
}

/// A pivot record field that a format may be unable to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    /// Records whose status the format does not list are dropped.
    Status,
    Tags,
    Comments,
    /// Timed comments keep their text but lose their timestamp.
    CommentTimes,
    /// Opaque derived fields other than `duration`.
    Derived,
}

impl RecordField {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Tags => "tags",
            Self::Comments => "comments",
            Self::CommentTimes => "comment_times",
            Self::Derived => "derived",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn status_from_str_roundtrip() {
        for status in Status::ALL {
            let parsed: Status = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
        }
        assert!("napping".parse::<Status>().is_err());
    }

    #[test]
    fn status_serde_uses_spaced_names() {
        let json = serde_json::to_string(&Status::LightsOff).unwrap();
        assert_eq!(json, "\"lights off\"");
        let parsed: Status = serde_json::from_str("\"in bed\"").unwrap();
        assert_eq!(parsed, Status::InBed);
    }

    #[test]
    fn record_serializes_compactly() {
        let record = Record::new(Status::Asleep, at(1000), at(5000));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"status":"asleep","start":1000,"end":5000}"#);
    }

    #[test]
    fn record_carries_derived_fields_flat() {
        let json = r#"{"status":"awake","start":0,"end":10,"day_number":3,"is_primary_sleep":false}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.derived.day_number, Some(3));
        assert_eq!(record.derived.is_primary_sleep, Some(false));
        assert_eq!(record.derived.start_of_new_day, None);
        assert_eq!(serde_json::to_string(&record).unwrap(), json);
    }

    #[test]
    fn comments_accept_text_and_timed_forms() {
        let json = r#"["plain",{"time":60000,"text":"woke briefly"}]"#;
        let comments: Vec<Comment> = serde_json::from_str(json).unwrap();
        assert_eq!(comments[0], Comment::Text("plain".into()));
        assert_eq!(
            comments[1],
            Comment::Timed {
                time: at(60_000),
                text: "woke briefly".into()
            }
        );
        assert_eq!(comments[1].text(), "woke briefly");
    }

    #[test]
    fn activity_point_has_zero_length() {
        let activity = Activity::point(at(42));
        assert_eq!(activity.start, activity.end);
    }
}
