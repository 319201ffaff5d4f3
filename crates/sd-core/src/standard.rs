//! The pivot format every other format converts through.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::{Diary, Format, FormatDescriptor, Source, same_format};
use crate::error::ParseError;
use crate::types::{Comment, DerivedFields, Record, RecordField, Status};

pub const STANDARD_NAME: &str = "Standard";

pub static STANDARD_DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: STANDARD_NAME,
    title: "Standard Format",
    url: "https://sleepdiary.github.io/core/docs/formats/standard",
    extension: "json",
    statuses: Status::ALL,
    lossy_fields: &[],
};

/// The pivot diary: a sorted record list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardDiary {
    pub records: Vec<Record>,
}

impl StandardDiary {
    /// Builds a diary, sorting records and filling in missing durations.
    #[must_use]
    pub fn new(records: Vec<Record>) -> Self {
        let mut diary = Self { records };
        diary.normalise();
        diary
    }

    fn normalise(&mut self) {
        for record in &mut self.records {
            if record.derived.duration.is_none() {
                record.derived.duration = Some(record.duration_ms());
            }
        }
        self.records.sort_by_key(Record::dedup_key);
    }

    /// The subset of this diary that `descriptor`'s format can represent.
    ///
    /// Converting into that format and back is expected to give exactly this.
    #[must_use]
    pub fn representable_in(&self, descriptor: &FormatDescriptor) -> Self {
        let records = self
            .records
            .iter()
            .filter(|r| !descriptor.loses(RecordField::Status) || descriptor.allows(r.status))
            .map(|record| {
                let mut record = record.clone();
                if descriptor.loses(RecordField::Tags) {
                    record.tags.clear();
                }
                if descriptor.loses(RecordField::Comments) {
                    record.comments.clear();
                } else if descriptor.loses(RecordField::CommentTimes) {
                    for comment in &mut record.comments {
                        if let Comment::Timed { text, .. } = comment {
                            *comment = Comment::Text(std::mem::take(text));
                        }
                    }
                }
                if descriptor.loses(RecordField::Derived) {
                    record.derived = DerivedFields {
                        duration: record.derived.duration,
                        ..DerivedFields::default()
                    };
                }
                record
            })
            .collect();
        Self::new(records)
    }
}

/// Registry entry for the pivot format.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFormat;

impl Format for StandardFormat {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &STANDARD_DESCRIPTOR
    }

    fn try_parse(&self, source: &Source) -> Result<Box<dyn Diary>, ParseError> {
        let diary: StandardDiary = source.parse_envelope(STANDARD_NAME)?;
        for record in &diary.records {
            ParseError::ensure_ordered(STANDARD_NAME, record.start, record.end)?;
        }
        Ok(Box::new(StandardDiary::new(diary.records)))
    }

    fn from_standard(&self, standard: &StandardDiary) -> Box<dyn Diary> {
        Box::new(standard.clone())
    }
}

impl Diary for StandardDiary {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &STANDARD_DESCRIPTOR
    }

    fn to_standard(&self) -> StandardDiary {
        self.clone()
    }

    fn contents(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn merge(&mut self, other: &dyn Diary) {
        let other = same_format(other, Clone::clone);
        let mut records = std::mem::take(&mut self.records);
        records.extend(other.records.iter().cloned());
        let mut merged = Self::new(records);
        merged.records.dedup_by_key(|r| r.dedup_key());
        *self = merged;
    }

    fn clone_diary(&self) -> Box<dyn Diary> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn diary() -> StandardDiary {
        StandardDiary::new(vec![
            Record::new(Status::Awake, at(5000), at(9000)),
            Record::new(Status::Asleep, at(1000), at(5000)),
        ])
    }

    #[test]
    fn new_sorts_and_fills_duration() {
        let diary = diary();
        assert_eq!(diary.records[0].status, Status::Asleep);
        assert_eq!(diary.records[0].derived.duration, Some(4000));
        assert_eq!(diary.records[1].derived.duration, Some(4000));
    }

    #[test]
    fn parses_only_its_own_envelope() {
        let own = Source::Json(json!({
            "file_format": "Standard",
            "contents": {"records": [{"status": "asleep", "start": 0, "end": 60000}]}
        }));
        let parsed = StandardFormat.try_parse(&own).unwrap();
        assert_eq!(parsed.to_standard().records.len(), 1);

        let other = Source::Json(json!({"file_format": "ActivityLog", "contents": {}}));
        assert_eq!(
            StandardFormat.try_parse(&other).unwrap_err(),
            ParseError::Recoverable
        );
        let text = Source::Text("status,start,end".into());
        assert_eq!(
            StandardFormat.try_parse(&text).unwrap_err(),
            ParseError::Recoverable
        );
    }

    #[test]
    fn bad_contents_are_corrupt() {
        let source = Source::Json(json!({
            "file_format": "Standard",
            "contents": {"records": [{"status": "dreaming", "start": 0, "end": 1}]}
        }));
        assert!(matches!(
            StandardFormat.try_parse(&source),
            Err(ParseError::Corrupt { format: "Standard", .. })
        ));
    }

    #[test]
    fn inverted_record_is_corrupt() {
        let source = Source::Json(json!({
            "file_format": "Standard",
            "contents": {"records": [{"status": "asleep", "start": 100_000, "end": 0}]}
        }));
        assert!(matches!(
            StandardFormat.try_parse(&source),
            Err(ParseError::Corrupt { format: "Standard", .. })
        ));
    }

    #[test]
    fn merge_with_itself_is_idempotent() {
        let mut merged = diary();
        merged.merge(&diary());
        assert_eq!(merged, diary());
    }

    #[test]
    fn merge_combines_distinct_records() {
        let mut merged = diary();
        let extra = StandardDiary::new(vec![Record::new(Status::Meal, at(6000), at(6000))]);
        merged.merge(&extra);
        assert_eq!(merged.records.len(), 3);
        assert_eq!(merged.records[1].status, Status::Awake);
        assert_eq!(merged.records[2].status, Status::Meal);
    }

    #[test]
    fn json_envelope() {
        let value = diary().to_json().unwrap();
        assert_eq!(value["file_format"], "Standard");
        assert_eq!(value["contents"]["records"][0]["duration"], 4000);
    }

    #[test]
    fn representable_in_strips_declared_fields() {
        static LOSSY: FormatDescriptor = FormatDescriptor {
            name: "Lossy",
            title: "Lossy",
            url: "",
            extension: "txt",
            statuses: &[Status::Asleep],
            lossy_fields: &[RecordField::Status, RecordField::Tags, RecordField::CommentTimes],
        };
        let mut record = Record::new(Status::Asleep, at(0), at(10));
        record.tags.insert("nap".into());
        record.comments.push(Comment::Timed {
            time: at(5),
            text: "dream".into(),
        });
        let diary = StandardDiary::new(vec![record, Record::new(Status::Awake, at(10), at(20))]);

        let projected = diary.representable_in(&LOSSY);

        assert_eq!(projected.records.len(), 1);
        assert!(projected.records[0].tags.is_empty());
        assert_eq!(projected.records[0].comments, vec![Comment::Text("dream".into())]);
    }
}
