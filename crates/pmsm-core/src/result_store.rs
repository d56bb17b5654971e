use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RunError;
use crate::value::{Params, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub usize);

/// Flat result table. The header is fixed by the first row pushed; later rows
/// may omit columns, and keys outside the header are not written out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Params>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Params>) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.push(row);
        }
        table
    }

    pub fn push(&mut self, row: Params) {
        if self.rows.is_empty() && self.columns.is_empty() {
            self.columns = row.keys().map(str::to_string).collect();
        }
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Numeric view of one column; missing or non-numeric cells are `None`.
    pub fn column_f64(&self, name: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|row| row.get_f64(name)).collect()
    }

    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = self.columns.iter().map(|c| csv_field(c)).collect();
        out.push_str(&header.join(","));
        out.push('\n');
        for row in &self.rows {
            let fields: Vec<String> = self
                .columns
                .iter()
                .map(|c| row.get(c).map(|v| csv_field(&v.to_string())).unwrap_or_default())
                .collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_csv_string())
    }

    /// Parses a table written by [`ResultTable::to_csv_string`]. Cells are
    /// read back as numbers when they parse, then as booleans, then as text.
    /// Empty cells are left out of the row. Quoted cells may span lines.
    pub fn from_csv_str(raw: &str) -> Result<Self, RunError> {
        let mut records = split_csv_records(raw)?.into_iter();
        let Some((_, columns)) = records.next() else {
            return Ok(Self::new());
        };

        let mut rows = Vec::new();
        for (line, fields) in records {
            if fields.len() != columns.len() {
                return Err(RunError::Csv {
                    line,
                    message: format!("expected {} fields, got {}", columns.len(), fields.len()),
                });
            }
            let mut row = Params::new();
            for (column, field) in columns.iter().zip(fields) {
                if !field.is_empty() {
                    row.insert(column, parse_cell(&field));
                }
            }
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn read_csv(path: &Path) -> Result<Self, RunError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_csv_str(&raw)
    }
}

fn parse_cell(field: &str) -> Value {
    if let Ok(v) = field.parse::<f64>() {
        return Value::Float(v);
    }
    match field {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        _ => Value::Text(field.to_string()),
    }
}

fn csv_field(raw: &str) -> String {
    if raw.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

/// Splits CSV text into records tagged with the 1-based line each starts on.
/// Newlines inside quotes belong to the field. Blank lines are skipped.
fn split_csv_records(raw: &str) -> Result<Vec<(usize, Vec<String>)>, RunError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut start = 1;
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match (ch, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => {
                in_quotes = true;
                quoted = true;
            }
            (',', false) => fields.push(std::mem::take(&mut current)),
            ('\r', false) if chars.peek() == Some(&'\n') => {}
            ('\n', false) => {
                fields.push(std::mem::take(&mut current));
                end_record(&mut records, start, std::mem::take(&mut fields), quoted);
                line += 1;
                start = line;
                quoted = false;
            }
            ('\n', true) => {
                current.push(ch);
                line += 1;
            }
            _ => current.push(ch),
        }
    }
    if in_quotes {
        return Err(RunError::Csv {
            line: start,
            message: "unterminated quoted field".to_string(),
        });
    }
    fields.push(current);
    end_record(&mut records, start, fields, quoted);
    Ok(records)
}

fn end_record(records: &mut Vec<(usize, Vec<String>)>, start: usize, fields: Vec<String>, quoted: bool) {
    let blank = !quoted && fields.len() == 1 && fields[0].trim().is_empty();
    if !blank {
        records.push((start, fields));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRecord {
    pub id: RunId,
    pub name: String,
    pub status: SweepStatus,
    pub completed: usize,
    pub dropped: usize,
    pub total: usize,
    pub table: Option<ResultTable>,
    pub message: Option<String>,
}

impl SweepRecord {
    pub fn running(name: &str) -> Self {
        Self {
            id: RunId(0),
            name: name.to_string(),
            status: SweepStatus::Running,
            completed: 0,
            dropped: 0,
            total: 0,
            table: None,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SweepStore {
    pub runs: Vec<SweepRecord>,
}

impl SweepStore {
    pub fn new() -> Self {
        Self { runs: Vec::new() }
    }

    pub fn add_run(&mut self, mut run: SweepRecord) -> RunId {
        let id = RunId(self.runs.len());
        run.id = id;
        self.runs.push(run);
        id
    }

    pub fn get(&self, id: RunId) -> Option<&SweepRecord> {
        self.runs.get(id.0)
    }

    pub fn get_mut(&mut self, id: RunId) -> Option<&mut SweepRecord> {
        self.runs.get_mut(id.0)
    }
}

pub fn debug_dump_result_table(table: &ResultTable) {
    println!(
        "result_table: columns={} rows={}",
        table.columns.len(),
        table.rows.len()
    );
}

pub fn debug_dump_sweep_store(store: &SweepStore) {
    println!("sweep_store: runs={}", store.runs.len());
}
