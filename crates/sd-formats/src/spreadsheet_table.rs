//! A plain one-record-per-row table, as kept by people who track sleep in a
//! spreadsheet of their own.

use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use sd_core::codec::{CellContext, CellKind, CellRule, SheetRule, SpreadsheetCodec, State};
use sd_core::{
    CellValue, Comment, Diary, Format, FormatDescriptor, ParseError, Record, RecordField, Source,
    Spreadsheet, StandardDiary, Status, same_format,
};

use crate::workbook;

pub const SPREADSHEET_TABLE_NAME: &str = "SpreadsheetTable";

pub static SPREADSHEET_TABLE_DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: SPREADSHEET_TABLE_NAME,
    title: "Spreadsheet Table",
    url: "",
    extension: "csv",
    statuses: Status::ALL,
    lossy_fields: &[RecordField::CommentTimes, RecordField::Derived],
};

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<String> = Status::ALL
        .iter()
        .map(|status| regex::escape(status.as_str()))
        .collect();
    Regex::new(&format!("^(?:{})$", names.join("|"))).unwrap()
});

static CODEC: LazyLock<SpreadsheetCodec> = LazyLock::new(|| {
    SpreadsheetCodec::new(vec![SheetRule::list(
        "Records",
        "records",
        vec![
            CellRule::value("status", CellKind::Text).pattern(STATUS_RE.clone()),
            CellRule::value("start", CellKind::Time),
            CellRule::value("end", CellKind::Time),
            CellRule::custom(
                &["tags"],
                |object: &State, _: &CellContext| join_cell(object, "tags", ','),
                |cells: &[CellValue], object: &mut State, _: &CellContext| {
                    split_cell(&cells[0], object, "tags", ',')
                },
            ),
            CellRule::custom(
                &["comments"],
                |object: &State, _: &CellContext| join_cell(object, "comments", '\n'),
                |cells: &[CellValue], object: &mut State, _: &CellContext| {
                    split_cell(&cells[0], object, "comments", '\n')
                },
            ),
        ],
    )])
});

/// Joins a string list into one cell. Missing or empty lists give a blank cell.
fn join_cell(object: &State, member: &str, separator: char) -> Option<Vec<CellValue>> {
    let items = match object.get(member) {
        None | Some(Value::Null) => return Some(vec![CellValue::Null]),
        Some(Value::Array(items)) => items,
        Some(_) => return None,
    };
    if items.is_empty() {
        return Some(vec![CellValue::Null]);
    }
    let parts = items
        .iter()
        .map(|item| item.as_str().map(|item| quote_item(item, separator)))
        .collect::<Option<Vec<_>>>()?;
    let glue = if separator == ',' { ", ".to_string() } else { separator.to_string() };
    Some(vec![CellValue::text(parts.join(&glue))])
}

fn split_cell(cell: &CellValue, object: &mut State, member: &str, separator: char) -> bool {
    let items: Vec<Value> = match cell {
        CellValue::Null => Vec::new(),
        CellValue::Text(text) => split_items(text, separator)
            .into_iter()
            .map(Value::from)
            .collect(),
        other => vec![Value::String(other.display())],
    };
    if !items.is_empty() {
        object.insert(member.to_string(), Value::Array(items));
    }
    true
}

/// Quotes an item that would not split back out unchanged, doubling any `"`.
fn quote_item(item: &str, separator: char) -> Cow<'_, str> {
    if item.is_empty() || item.trim() != item || item.contains([separator, '"']) {
        Cow::Owned(format!("\"{}\"", item.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(item)
    }
}

/// Splits a joined cell. Unquoted items are trimmed and dropped when blank.
/// Quoted items are taken verbatim.
fn split_items(text: &str, separator: char) -> Vec<String> {
    let mut items = Vec::new();
    let mut chars = text.chars().peekable();
    while chars.peek().is_some() {
        while chars
            .next_if(|c| *c != separator && c.is_whitespace())
            .is_some()
        {}
        if chars.next_if_eq(&'"').is_some() {
            let mut item = String::new();
            while let Some(c) = chars.next() {
                if c != '"' {
                    item.push(c);
                } else if chars.next_if_eq(&'"').is_some() {
                    item.push('"');
                } else {
                    break;
                }
            }
            // Anything between the closing quote and the separator is ignored.
            for c in chars.by_ref() {
                if c == separator {
                    break;
                }
            }
            items.push(item);
        } else {
            let mut item = String::new();
            for c in chars.by_ref() {
                if c == separator {
                    break;
                }
                item.push(c);
            }
            let item = item.trim();
            if !item.is_empty() {
                items.push(item.to_string());
            }
        }
    }
    items
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub status: Status,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
}

impl TableRow {
    fn key(&self) -> (DateTime<Utc>, DateTime<Utc>, Status) {
        (self.start, self.end, self.status)
    }
}

impl From<&Record> for TableRow {
    fn from(record: &Record) -> Self {
        Self {
            status: record.status,
            start: record.start,
            end: record.end,
            tags: record.tags.clone(),
            comments: record
                .comments
                .iter()
                .map(|comment| comment.text().to_string())
                .collect(),
        }
    }
}

impl From<&TableRow> for Record {
    fn from(row: &TableRow) -> Self {
        let mut record = Self::new(row.status, row.start, row.end);
        record.tags.clone_from(&row.tags);
        record.comments = row.comments.iter().cloned().map(Comment::Text).collect();
        record
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TableState {
    records: Vec<TableRow>,
}

/// A diary held as one spreadsheet row per record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpreadsheetTable {
    state: TableState,
    workbook: Option<Spreadsheet>,
}

impl SpreadsheetTable {
    #[must_use]
    pub fn new(rows: Vec<TableRow>) -> Self {
        let mut table = Self {
            state: TableState { records: rows },
            workbook: None,
        };
        table.normalise();
        table
    }

    fn from_pivot(standard: &StandardDiary) -> Self {
        Self::new(standard.records.iter().map(TableRow::from).collect())
    }

    fn normalise(&mut self) {
        self.state.records.sort_by_key(TableRow::key);
        self.state.records.dedup_by_key(|row| row.key());
    }

    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.state.records
    }
}

/// Registry entry for [`SpreadsheetTable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetTableFormat;

impl Format for SpreadsheetTableFormat {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &SPREADSHEET_TABLE_DESCRIPTOR
    }

    fn try_parse(&self, source: &Source) -> Result<Box<dyn Diary>, ParseError> {
        let (state, workbook): (TableState, _) =
            workbook::parse_source(source, SPREADSHEET_TABLE_NAME, &CODEC)?;
        for row in &state.records {
            ParseError::ensure_ordered(SPREADSHEET_TABLE_NAME, row.start, row.end)?;
        }
        let mut table = SpreadsheetTable::new(state.records);
        table.workbook = workbook;
        Ok(Box::new(table))
    }

    fn from_standard(&self, standard: &StandardDiary) -> Box<dyn Diary> {
        Box::new(SpreadsheetTable::from_pivot(standard))
    }
}

impl Diary for SpreadsheetTable {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &SPREADSHEET_TABLE_DESCRIPTOR
    }

    fn to_standard(&self) -> StandardDiary {
        StandardDiary::new(self.state.records.iter().map(Record::from).collect())
    }

    fn contents(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.state)
    }

    fn merge(&mut self, other: &dyn Diary) {
        let other = same_format(other, Self::from_pivot);
        self.state
            .records
            .extend(other.state.records.iter().cloned());
        self.normalise();
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

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use sd_core::delimited::sheet_to_csv;
    use sd_core::{Epoch, Sheet};

    const CSV: &str = "status,start,end,tags,comments\n\
        asleep,2024-01-01T23:00:00Z,2024-01-02T07:00:00Z,\"home, quiet\",\n\
        in bed,2024-01-01T22:30:00Z,2024-01-02T07:15:00Z,,\"read a book\nwoke once\"\n";

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn parse(source: Source) -> Result<Box<dyn Diary>, ParseError> {
        SpreadsheetTableFormat.try_parse(&source)
    }

    fn table(diary: &dyn Diary) -> &SpreadsheetTable {
        diary.as_any().downcast_ref().unwrap()
    }

    #[test]
    fn test_parses_csv_rows() {
        let diary = parse(Source::Text(CSV.into())).unwrap();
        let rows = table(diary.as_ref()).rows();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, Status::InBed);
        assert_eq!(rows[0].comments, vec!["read a book", "woke once"]);
        assert_eq!(rows[1].status, Status::Asleep);
        assert_eq!(
            rows[1].tags,
            BTreeSet::from(["home".to_string(), "quiet".to_string()])
        );
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let csv = "status,start,end,tags,comments\ndozing,0,1,,\n";
        assert!(matches!(
            parse(Source::Text(csv.into())),
            Err(ParseError::Corrupt {
                format: SPREADSHEET_TABLE_NAME,
                ..
            })
        ));
    }

    #[test]
    fn test_row_ending_before_it_starts_is_corrupt() {
        let csv = "status,start,end,tags,comments\n\
            asleep,2024-01-02T07:00:00Z,2024-01-01T23:00:00Z,,\n";
        assert!(matches!(
            parse(Source::Text(csv.into())),
            Err(ParseError::Corrupt {
                format: SPREADSHEET_TABLE_NAME,
                ..
            })
        ));
    }

    #[test]
    fn test_renamed_headers_are_not_this_format() {
        let csv = "SleepStart,SleepEnd,sTaTe,comments,NOTES\n1,2,asleep,,\n";
        assert_eq!(
            parse(Source::Text(csv.into())).unwrap_err(),
            ParseError::Recoverable
        );
    }

    #[test]
    fn test_reads_workbook_in_1904_epoch() {
        // Serial day 43830 counted from 1904-01-01 is 2024-01-01.
        let mut workbook = Spreadsheet::new(vec![Sheet::from_values(
            "Sleep log",
            vec![
                ["status", "start", "end", "tags", "comments"]
                    .map(CellValue::text)
                    .to_vec(),
                vec![
                    CellValue::text("asleep"),
                    CellValue::Number(43830.0),
                    CellValue::Number(43830.25),
                    CellValue::Null,
                    CellValue::Null,
                ],
            ],
        )]);
        workbook.epoch = Epoch::Excel1904;

        let diary = parse(Source::Spreadsheet(workbook)).unwrap();
        let row = &table(diary.as_ref()).rows()[0];
        assert_eq!(row.start, at(1_704_067_200_000));
        assert_eq!(row.end, at(1_704_067_200_000 + 6 * 3_600_000));
    }

    #[test]
    fn test_pivot_flattens_timed_comments() {
        let mut record = Record::new(Status::Asleep, at(0), at(1000));
        record.comments.push(Comment::Timed {
            time: at(500),
            text: "snoring".into(),
        });
        let standard = StandardDiary::new(vec![record]);

        let table = SpreadsheetTableFormat.from_standard(&standard);
        let back = table.to_standard();

        assert_eq!(back.records[0].comments, vec![Comment::Text("snoring".into())]);
        assert_eq!(back, standard.representable_in(&SPREADSHEET_TABLE_DESCRIPTOR));
    }

    #[test]
    fn test_merge_uses_status_start_end() {
        let rows = vec![
            TableRow::from(&Record::new(Status::Asleep, at(0), at(10))),
            TableRow::from(&Record::new(Status::InBed, at(0), at(10))),
        ];
        let mut merged = SpreadsheetTable::new(rows.clone());
        merged.merge(&SpreadsheetTable::new(rows));
        assert_eq!(merged.rows().len(), 2);
    }

    #[test]
    fn test_split_items_honours_quotes() {
        assert_eq!(split_items("home, quiet", ','), vec!["home", "quiet"]);
        assert_eq!(
            split_items(r#""home, quiet", "say ""hi""",,  garden "#, ','),
            vec!["home, quiet", r#"say "hi""#, "garden"]
        );
        assert_eq!(split_items(r#""""#, ','), vec![""]);
        assert!(split_items("", ',').is_empty());
    }

    #[test]
    fn test_spreadsheet_keeps_items_holding_the_separator() {
        let mut record = Record::new(Status::Asleep, at(0), at(1000));
        record.tags = BTreeSet::from(["home, quiet".to_string(), "garden".to_string()]);
        record.comments = vec![
            Comment::Text("woke up\nthen slept".into()),
            Comment::Text(" padded ".into()),
        ];
        let table = SpreadsheetTableFormat.from_standard(&StandardDiary::new(vec![record]));

        let workbook = table.to_spreadsheet().unwrap();
        let back = parse(Source::Spreadsheet(workbook)).unwrap();

        assert_eq!(back.to_standard(), table.to_standard());
    }

    #[test]
    fn test_csv_output() {
        let diary = parse(Source::Text(CSV.into())).unwrap();
        let workbook = diary.to_spreadsheet().unwrap();
        insta::assert_snapshot!(sheet_to_csv(&workbook.sheets[0]).unwrap(), @r#"
        status,start,end,tags,comments
        in bed,2024-01-01T22:30:00.000Z,2024-01-02T07:15:00.000Z,,"read a book
        woke once"
        asleep,2024-01-01T23:00:00.000Z,2024-01-02T07:00:00.000Z,"home, quiet",
        "#);
    }
}
