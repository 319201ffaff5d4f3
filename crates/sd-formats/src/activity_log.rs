//! Raw activity streams (browser visits, calendar entries, ...).
//!
//! The log only knows when the diarist was active. Sleep is inferred by the
//! segmenter whenever the log is converted to the pivot.

use std::any::Any;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sd_core::codec::{CellContext, CellKind, CellRule, SheetRule, SpreadsheetCodec, State};
use sd_core::segmenter::{DEFAULT_MAXIMUM_DAY_LENGTH_MS, SegmenterConfig, segment};
use sd_core::time_cell::{decode_time, encode_time};
use sd_core::{
    Activity, CellValue, Diary, Format, FormatDescriptor, ParseError, RecordField, Source,
    Spreadsheet, StandardDiary, Status, same_format,
};

use crate::workbook;

pub const ACTIVITY_LOG_NAME: &str = "ActivityLog";

/// Setting read by the segmenter.
pub const MAXIMUM_DAY_LENGTH_SETTING: &str = "maximum_day_length_ms";

pub static ACTIVITY_LOG_DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: ACTIVITY_LOG_NAME,
    title: "Activity Log",
    url: "",
    extension: "csv",
    statuses: &[Status::Awake],
    lossy_fields: &[
        RecordField::Status,
        RecordField::Tags,
        RecordField::Comments,
        RecordField::Derived,
    ],
};

static CODEC: LazyLock<SpreadsheetCodec> = LazyLock::new(|| {
    SpreadsheetCodec::new(vec![
        SheetRule::list(
            "Activities",
            "records",
            vec![CellRule::custom(&["start", "end"], encode_span, decode_span)],
        ),
        SheetRule::dictionary(
            "Settings",
            "settings",
            vec![
                CellRule::value("Setting", CellKind::Text),
                CellRule::value("Value", CellKind::Number),
            ],
        )
        .optional(),
    ])
});

fn encode_span(object: &State, ctx: &CellContext) -> Option<Vec<CellValue>> {
    let start = object.get("start")?.as_i64()?;
    let end = object.get("end").and_then(Value::as_i64).unwrap_or(start);
    Some(vec![
        encode_time(start, ctx.epoch)?,
        encode_time(end, ctx.epoch)?,
    ])
}

/// A blank end cell is a point event.
fn decode_span(cells: &[CellValue], object: &mut State, ctx: &CellContext) -> bool {
    let Some(start) = decode_time(&cells[0], ctx.epoch) else {
        return false;
    };
    let end = if cells[1].is_blank() {
        Some(start)
    } else {
        decode_time(&cells[1], ctx.epoch)
    };
    let Some(end) = end else {
        return false;
    };
    object.insert("start".into(), Value::from(start));
    object.insert("end".into(), Value::from(end));
    true
}

/// Serialized state of an activity log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogState {
    pub records: Vec<Activity>,
    /// Named numeric settings. Unknown names are kept but ignored.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub settings: Map<String, Value>,
}

/// A diary of raw activity intervals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityLog {
    state: ActivityLogState,
    workbook: Option<Spreadsheet>,
}

impl ActivityLog {
    /// Builds a log from activities, sorted by start.
    #[must_use]
    pub fn new(records: Vec<Activity>) -> Self {
        Self::from_state(ActivityLogState {
            records,
            settings: Map::new(),
        })
    }

    fn from_state(mut state: ActivityLogState) -> Self {
        state.records.sort_by_key(|a| (a.start, a.end));
        Self {
            state,
            workbook: None,
        }
    }

    fn from_pivot(standard: &StandardDiary) -> Self {
        Self::new(
            standard
                .records
                .iter()
                .filter(|record| record.status == Status::Awake)
                .map(|record| Activity::new(record.start, record.end))
                .collect(),
        )
    }

    #[must_use]
    pub fn activities(&self) -> &[Activity] {
        &self.state.records
    }

    #[must_use]
    pub fn settings(&self) -> &Map<String, Value> {
        &self.state.settings
    }

    /// Longest day the segmenter will consider. Default: 32 h.
    #[must_use]
    pub fn maximum_day_length_ms(&self) -> i64 {
        self.state
            .settings
            .get(MAXIMUM_DAY_LENGTH_SETTING)
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_MAXIMUM_DAY_LENGTH_MS)
    }

    pub fn set_maximum_day_length_ms(&mut self, ms: i64) {
        self.state
            .settings
            .insert(MAXIMUM_DAY_LENGTH_SETTING.to_string(), Value::from(ms));
    }
}

/// Registry entry for [`ActivityLog`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityLogFormat;

impl Format for ActivityLogFormat {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &ACTIVITY_LOG_DESCRIPTOR
    }

    fn try_parse(&self, source: &Source) -> Result<Box<dyn Diary>, ParseError> {
        let (state, workbook): (ActivityLogState, _) =
            workbook::parse_source(source, ACTIVITY_LOG_NAME, &CODEC)?;
        for activity in &state.records {
            ParseError::ensure_ordered(ACTIVITY_LOG_NAME, activity.start, activity.end)?;
        }
        let mut log = ActivityLog::from_state(state);
        log.workbook = workbook;
        Ok(Box::new(log))
    }

    fn from_standard(&self, standard: &StandardDiary) -> Box<dyn Diary> {
        Box::new(ActivityLog::from_pivot(standard))
    }
}

impl Diary for ActivityLog {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &ACTIVITY_LOG_DESCRIPTOR
    }

    fn to_standard(&self) -> StandardDiary {
        let config = SegmenterConfig::with_maximum_day_length_ms(self.maximum_day_length_ms());
        StandardDiary::new(segment(&self.state.records, &config))
    }

    fn contents(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.state)
    }

    /// Unions activities on `(start, end)`. Settings already present here win.
    fn merge(&mut self, other: &dyn Diary) {
        let other = same_format(other, Self::from_pivot);
        self.state
            .records
            .extend(other.state.records.iter().copied());
        self.state.records.sort_by_key(|a| (a.start, a.end));
        self.state.records.dedup();
        for (name, value) in &other.state.settings {
            self.state
                .settings
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
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

    fn to_spreadsheet(&self) -> Option<Spreadsheet> {
        workbook::synchronise(&CODEC, &self.state, self.workbook.as_ref())
    }
}
