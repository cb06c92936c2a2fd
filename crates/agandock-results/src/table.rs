//! Result tables parsed from the CSV files the docking pipeline writes.
//!
//! One parsing policy is used for every variant: header-driven RFC 4180 CSV
//! (quoted fields may contain commas, quotes and newlines, which PLIP tables
//! use for serialized lists). Blank lines are skipped, short records are
//! padded with empty strings and fields beyond the header are dropped.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Columns assumed when a table has no header line at all.
pub const DEFAULT_COLUMNS: [&str; 4] = [
    "Name",
    "SMILES",
    "Docking score (kcal/mol)",
    "Ligand efficiency",
];

/// Header-only CSV text with the default columns.
pub fn default_header_line() -> String {
    format!("{}\n", DEFAULT_COLUMNS.join(","))
}

/// One row of a result table: one value per header column, positionally.
///
/// Header names may repeat, so values are kept by position and lookups by
/// name see the first matching column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl ResultRow {
    /// Pads or truncates `values` to the column count.
    pub fn new(columns: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(columns.len(), String::new());
        Self { columns, values }
    }

    fn from_record(columns: &Arc<[String]>, record: &csv::StringRecord) -> Self {
        let values = record.iter().take(columns.len()).map(str::to_string).collect();
        Self::new(Arc::clone(columns), values)
    }

    /// Value of the first column named `column`, or `""` when there is none.
    pub fn get(&self, column: &str) -> &str {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Values in header order, duplicates included.
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// JSON object keyed by column name; a repeated name keeps its first value.
impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seen = HashSet::new();
        let entries: Vec<(&String, &String)> = self
            .columns
            .iter()
            .zip(&self.values)
            .filter(|(column, _)| seen.insert(column.as_str()))
            .collect();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (column, value) in entries {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Ordered columns plus ordered rows, both taken from one text blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    columns: Arc<[String]>,
    rows: Vec<ResultRow>,
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl ResultTable {
    /// Zero rows with the default columns.
    pub fn empty() -> Self {
        Self {
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Parse CSV text. Never fails: unreadable input degrades to fewer rows
    /// or to [`ResultTable::empty`].
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if text.trim().is_empty() {
            return Self::empty();
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns: Arc<[String]> = match reader.headers() {
            Ok(headers) => headers.iter().map(|s| s.to_string()).collect(),
            Err(e) => {
                warn!("Unreadable header line, falling back to default columns: {}", e);
                return Self::empty();
            }
        };

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            match result {
                Ok(record) => {
                    if record.iter().all(|field| field.trim().is_empty()) {
                        continue;
                    }
                    rows.push(ResultRow::from_record(&columns, &record));
                }
                Err(e) => debug!("Skipping unreadable record {}: {}", index + 1, e),
            }
        }

        Self { columns, rows }
    }

    /// Build a table from positional value lists, one per row.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows = rows
            .into_iter()
            .map(|values| ResultRow::new(Arc::clone(&columns), values))
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The rows satisfying `keep`, in source order, under the same columns.
    pub fn select<F>(&self, keep: F) -> ResultTable
    where
        F: Fn(&ResultRow) -> bool,
    {
        Self {
            columns: Arc::clone(&self.columns),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
        }
    }

    /// Rows reordered by `compare`. Stable: ties keep source order.
    pub fn sorted_by<F>(&self, mut compare: F) -> ResultTable
    where
        F: FnMut(&ResultRow, &ResultRow) -> std::cmp::Ordering,
    {
        let mut rows = self.rows.clone();
        rows.sort_by(&mut compare);
        Self {
            columns: Arc::clone(&self.columns),
            rows,
        }
    }

    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows.iter().map(move |row| row.get(column))
    }
}
