//! Declarative mapping between plugin state and spreadsheet sheets.
//!
//! A plugin describes its state as a list of [`SheetRule`]s. Each rule binds
//! one member of the state object to one sheet: a *list* rule maps an array of
//! objects to one row per element, a *dictionary* rule maps a flat object to
//! one key/value row per entry.
//!
//! Sheets are located by their header row, never by name or position.
//! High-level cell rules are compiled into the same encode/decode shape as
//! low-level rules, so loading and synchronising only ever deal with one
//! representation.

use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::grid::{Cell, CellValue, Epoch, Sheet, Spreadsheet};
use crate::time_cell::{decode_duration, decode_time, encode_time};

/// Plugin state as seen by the codec.
pub type State = Map<String, Value>;

/// Workbook facts the cell functions need.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellContext {
    pub epoch: Epoch,
}

/// Turns one row object into cells. `None` signals failure.
pub type EncodeFn = Box<dyn Fn(&State, &CellContext) -> Option<Vec<CellValue>> + Send + Sync>;

/// Reads cells into one row object. `false` signals failure.
pub type DecodeFn = Box<dyn Fn(&[CellValue], &mut State, &CellContext) -> bool + Send + Sync>;

/// Type of a high-level cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Number,
    /// Unix milliseconds in state, an instant in the sheet.
    Time,
    /// Milliseconds in state and sheet.
    Duration,
    Text,
    Boolean,
}

impl CellKind {
    const fn number_format(self) -> &'static str {
        match self {
            Self::Number => "General",
            Self::Time => "yyyy-mm-dd hh:mm:ss",
            Self::Duration | Self::Boolean => "0",
            Self::Text => "@",
        }
    }
}

/// How one or more state members map to cells.
pub enum CellRule {
    /// One member, one typed cell.
    Value {
        member: String,
        kind: CellKind,
        pattern: Option<Regex>,
        optional: bool,
    },
    /// N members, N cells, with caller-supplied functions.
    Custom {
        members: Vec<String>,
        encode: EncodeFn,
        decode: DecodeFn,
    },
}

impl CellRule {
    /// A required high-level cell.
    #[must_use]
    pub fn value(member: impl Into<String>, kind: CellKind) -> Self {
        Self::Value {
            member: member.into(),
            kind,
            pattern: None,
            optional: false,
        }
    }

    /// A low-level rule covering `members`.
    #[must_use]
    pub fn custom<E, D>(members: &[&str], encode: E, decode: D) -> Self
    where
        E: Fn(&State, &CellContext) -> Option<Vec<CellValue>> + Send + Sync + 'static,
        D: Fn(&[CellValue], &mut State, &CellContext) -> bool + Send + Sync + 'static,
    {
        Self::Custom {
            members: members.iter().map(|m| (*m).to_string()).collect(),
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }

    /// Marks a high-level cell as allowed to be empty.
    #[must_use]
    pub fn optional(mut self) -> Self {
        if let Self::Value { optional, .. } = &mut self {
            *optional = true;
        }
        self
    }

    /// Constrains a high-level text cell to match `regex`.
    #[must_use]
    pub fn pattern(mut self, regex: Regex) -> Self {
        if let Self::Value { pattern, .. } = &mut self {
            *pattern = Some(regex);
        }
        self
    }
}

/// Whether a sheet holds a sequence or a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    List,
    Dictionary,
}

/// Binds one state member to one sheet.
pub struct SheetRule {
    pub sheet: String,
    pub member: String,
    pub kind: SheetKind,
    pub cells: Vec<CellRule>,
    pub required: bool,
}

impl SheetRule {
    #[must_use]
    pub fn list(sheet: impl Into<String>, member: impl Into<String>, cells: Vec<CellRule>) -> Self {
        Self {
            sheet: sheet.into(),
            member: member.into(),
            kind: SheetKind::List,
            cells,
            required: true,
        }
    }

    /// A dictionary sheet. The first cell member holds the key, the rest the value.
    #[must_use]
    pub fn dictionary(
        sheet: impl Into<String>,
        member: impl Into<String>,
        cells: Vec<CellRule>,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            member: member.into(),
            kind: SheetKind::Dictionary,
            cells,
            required: true,
        }
    }

    /// Lets `load` succeed when no sheet matches this rule.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

struct CompiledCell {
    width: usize,
    formats: Vec<String>,
    encode: EncodeFn,
    decode: DecodeFn,
}

struct CompiledSheet {
    sheet: String,
    member: String,
    kind: SheetKind,
    required: bool,
    headers: Vec<String>,
    cells: Vec<CompiledCell>,
}

/// Loads and synchronises plugin state against workbooks.
pub struct SpreadsheetCodec {
    sheets: Vec<CompiledSheet>,
}

impl std::fmt::Debug for SpreadsheetCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sheets.iter().map(|s| (&s.sheet, &s.headers)))
            .finish()
    }
}

impl SpreadsheetCodec {
    /// Compiles a rule list.
    #[must_use]
    pub fn new(rules: Vec<SheetRule>) -> Self {
        let sheets = rules
            .into_iter()
            .map(|rule| {
                let mut headers = Vec::new();
                let cells = rule
                    .cells
                    .into_iter()
                    .map(|cell| compile_cell(cell, &mut headers))
                    .collect();
                CompiledSheet {
                    sheet: rule.sheet,
                    member: rule.member,
                    kind: rule.kind,
                    required: rule.required,
                    headers,
                    cells,
                }
            })
            .collect();
        Self { sheets }
    }

    /// True when some required rule's header row appears in `workbook`.
    #[must_use]
    pub fn recognises(&self, workbook: &Spreadsheet) -> bool {
        self.sheets
            .iter()
            .filter(|rule| rule.required)
            .any(|rule| find_sheet(workbook, &rule.headers).is_some())
    }

    /// Reads every rule's sheet from `workbook` into `state`.
    ///
    /// Each member is only written once its whole sheet decoded, so a failure
    /// leaves members bound by later rules untouched.
    pub fn load(&self, workbook: &Spreadsheet, state: &mut State) -> bool {
        let ctx = CellContext {
            epoch: workbook.epoch,
        };
        for rule in &self.sheets {
            let Some(sheet) = find_sheet(workbook, &rule.headers) else {
                if rule.required {
                    tracing::debug!(sheet = %rule.sheet, headers = ?rule.headers, "no sheet with matching header");
                    return false;
                }
                continue;
            };
            let Some(value) = rule.decode_sheet(sheet, &ctx) else {
                tracing::debug!(sheet = %sheet.name, "sheet failed to decode");
                return false;
            };
            state.insert(rule.member.clone(), value);
        }
        true
    }

    /// Writes every rule's member from `state` into `workbook`.
    ///
    /// A sheet whose header already matches is rewritten in place, keeping its
    /// name, its header row and any cell styles still in range. Otherwise a new
    /// sheet is appended. Unrelated sheets are left alone.
    pub fn synchronise(&self, state: &State, workbook: &mut Spreadsheet) -> bool {
        let ctx = CellContext {
            epoch: workbook.epoch,
        };
        for rule in &self.sheets {
            let member = state.get(&rule.member);
            if member.is_none() && !rule.required {
                continue;
            }
            let Some(rows) = rule.encode_sheet(member, &ctx) else {
                tracing::debug!(sheet = %rule.sheet, "sheet failed to encode");
                return false;
            };

            let existing = workbook
                .sheets
                .iter()
                .position(|sheet| sheet.header_matches(&rule.headers));
            match existing {
                Some(index) => restyle_rows(&mut workbook.sheets[index], rows),
                None => {
                    let name = workbook.unused_name(&rule.sheet);
                    let mut cells = vec![
                        rule.headers
                            .iter()
                            .map(|header| Cell::new(CellValue::text(header.as_str())))
                            .collect::<Vec<_>>(),
                    ];
                    cells.extend(
                        rows.into_iter()
                            .map(|row| row.into_iter().map(Cell::new).collect()),
                    );
                    workbook.sheets.push(Sheet {
                        name,
                        cells,
                        number_formats: rule.number_formats(),
                    });
                }
            }
        }
        true
    }
}

impl CompiledSheet {
    fn number_formats(&self) -> Vec<String> {
        self.cells
            .iter()
            .flat_map(|cell| cell.formats.iter().cloned())
            .collect()
    }

    fn decode_row(&self, row: &[Cell], ctx: &CellContext) -> Option<State> {
        let mut object = State::new();
        let mut offset = 0;
        for cell in &self.cells {
            let values: Vec<CellValue> = (offset..offset + cell.width)
                .map(|i| row.get(i).map(|c| c.value.clone()).unwrap_or_default())
                .collect();
            if !(cell.decode)(&values, &mut object, ctx) {
                return None;
            }
            offset += cell.width;
        }
        Some(object)
    }

    fn encode_row(&self, object: &State, ctx: &CellContext) -> Option<Vec<CellValue>> {
        let mut row = Vec::with_capacity(self.headers.len());
        for cell in &self.cells {
            let values = (cell.encode)(object, ctx)?;
            if values.len() != cell.width {
                return None;
            }
            row.extend(values);
        }
        Some(row)
    }

    fn decode_sheet(&self, sheet: &Sheet, ctx: &CellContext) -> Option<Value> {
        let rows = sheet
            .data_rows()
            .filter(|row| !row.iter().all(|cell| cell.value.is_blank()));
        match self.kind {
            SheetKind::List => {
                let mut items = Vec::new();
                for row in rows {
                    items.push(Value::Object(self.decode_row(row, ctx)?));
                }
                Some(Value::Array(items))
            }
            SheetKind::Dictionary => {
                let key_header = self.headers.first()?;
                let mut mapping = State::new();
                for row in rows {
                    let mut object = self.decode_row(row, ctx)?;
                    let key = match object.remove(key_header)? {
                        Value::String(key) => key,
                        _ => return None,
                    };
                    let value = if self.headers.len() == 2 {
                        object.remove(&self.headers[1]).unwrap_or(Value::Null)
                    } else {
                        Value::Object(object)
                    };
                    mapping.insert(key, value);
                }
                Some(Value::Object(mapping))
            }
        }
    }

    fn encode_sheet(&self, member: Option<&Value>, ctx: &CellContext) -> Option<Vec<Vec<CellValue>>> {
        match (self.kind, member) {
            (SheetKind::List, None | Some(Value::Null)) => Some(Vec::new()),
            (SheetKind::List, Some(Value::Array(items))) => items
                .iter()
                .map(|item| self.encode_row(item.as_object()?, ctx))
                .collect(),
            (SheetKind::Dictionary, None | Some(Value::Null)) => Some(Vec::new()),
            (SheetKind::Dictionary, Some(Value::Object(mapping))) => {
                let key_header = self.headers.first()?;
                mapping
                    .iter()
                    .map(|(key, value)| {
                        let mut object = State::new();
                        object.insert(key_header.clone(), Value::String(key.clone()));
                        if self.headers.len() == 2 {
                            object.insert(self.headers[1].clone(), value.clone());
                        } else if let Value::Object(fields) = value {
                            object.extend(fields.clone());
                        }
                        self.encode_row(&object, ctx)
                    })
                    .collect()
            }
            _ => None,
        }
    }
}

fn find_sheet<'a>(workbook: &'a Spreadsheet, headers: &[String]) -> Option<&'a Sheet> {
    workbook
        .sheets
        .iter()
        .find(|sheet| sheet.header_matches(headers))
}

/// Replaces the data rows of `sheet`, keeping styles where positions survive.
fn restyle_rows(sheet: &mut Sheet, rows: Vec<Vec<CellValue>>) {
    let old_rows = sheet.cells.split_off(1.min(sheet.cells.len()));
    for (r, row) in rows.into_iter().enumerate() {
        let cells = row
            .into_iter()
            .enumerate()
            .map(|(c, value)| Cell {
                value,
                style: old_rows
                    .get(r)
                    .and_then(|old| old.get(c))
                    .map(|old| old.style.clone())
                    .unwrap_or_default(),
            })
            .collect();
        sheet.cells.push(cells);
    }
}

fn compile_cell(rule: CellRule, headers: &mut Vec<String>) -> CompiledCell {
    match rule {
        CellRule::Custom {
            members,
            encode,
            decode,
        } => {
            let width = members.len();
            headers.extend(members);
            CompiledCell {
                width,
                formats: vec!["General".to_string(); width],
                encode,
                decode,
            }
        }
        CellRule::Value {
            member,
            kind,
            pattern,
            optional,
        } => {
            headers.push(member.clone());
            let encode_member = member.clone();
            let encode_pattern = pattern.clone();
            CompiledCell {
                width: 1,
                formats: vec![kind.number_format().to_string()],
                encode: Box::new(move |object: &State, ctx: &CellContext| {
                    match object.get(&encode_member) {
                        None | Some(Value::Null) => optional.then(|| vec![CellValue::Null]),
                        Some(value) => {
                            encode_value(value, kind, encode_pattern.as_ref(), ctx).map(|cell| vec![cell])
                        }
                    }
                }),
                decode: Box::new(move |cells: &[CellValue], object: &mut State, ctx: &CellContext| {
                    let cell = &cells[0];
                    if cell.is_blank() {
                        return optional;
                    }
                    match decode_value(cell, kind, pattern.as_ref(), ctx) {
                        Some(value) => {
                            object.insert(member.clone(), value);
                            true
                        }
                        None => false,
                    }
                }),
            }
        }
    }
}

fn encode_value(
    value: &Value,
    kind: CellKind,
    pattern: Option<&Regex>,
    ctx: &CellContext,
) -> Option<CellValue> {
    match kind {
        CellKind::Number => value.as_f64().map(CellValue::Number),
        CellKind::Time => encode_time(value.as_i64()?, ctx.epoch),
        #[allow(clippy::cast_precision_loss)]
        CellKind::Duration => value.as_i64().map(|ms| CellValue::Number(ms as f64)),
        CellKind::Text => {
            let text = value.as_str()?;
            if pattern.is_some_and(|re| !re.is_match(text)) {
                return None;
            }
            Some(CellValue::text(text))
        }
        CellKind::Boolean => value
            .as_bool()
            .map(|b| CellValue::Number(if b { 1.0 } else { 0.0 })),
    }
}

fn decode_value(
    cell: &CellValue,
    kind: CellKind,
    pattern: Option<&Regex>,
    ctx: &CellContext,
) -> Option<Value> {
    match kind {
        CellKind::Number => {
            let n = match cell {
                CellValue::Number(n) => *n,
                CellValue::Text(text) => text.trim().parse().ok()?,
                CellValue::Null | CellValue::Instant { .. } => return None,
            };
            number_value(n)
        }
        CellKind::Time => decode_time(cell, ctx.epoch).map(Value::from),
        CellKind::Duration => decode_duration(cell).map(Value::from),
        CellKind::Text => {
            let text = match cell {
                CellValue::Text(text) => text.clone(),
                other => other.display(),
            };
            if pattern.is_some_and(|re| !re.is_match(&text)) {
                return None;
            }
            Some(Value::String(text))
        }
        CellKind::Boolean => match cell {
            CellValue::Number(n) if *n == 0.0 => Some(Value::Bool(false)),
            CellValue::Number(n) if *n == 1.0 => Some(Value::Bool(true)),
            CellValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
    }
}

/// Integral numbers stay integers so they deserialize into integer fields.
#[allow(clippy::cast_possible_truncation)]
fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Some(Value::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number)
    }
}
