//! Row ordering for result views.
//!
//! Tables keep source order; a view sorts what it displays. Cells compare
//! numerically when they parse as finite numbers and lexically otherwise.
//! Numbers come before text, and blank cells sink to the bottom in either
//! direction.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use agandock_common::AgandockError;

use crate::score::parse_score;
use crate::table::{ResultRow, ResultTable};
use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

impl FromStr for SortOrder {
    type Err = AgandockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(AgandockError::InvalidInput(format!(
                "Unknown sort order '{other}', expected asc or desc"
            ))),
        }
    }
}

/// Column plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

enum Cell<'a> {
    Number(f64),
    Text(&'a str),
    Blank,
}

impl<'a> Cell<'a> {
    fn of(value: &'a str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Cell::Blank
        } else if let Some(number) = parse_score(trimmed) {
            Cell::Number(number)
        } else {
            Cell::Text(trimmed)
        }
    }
}

impl SortKey {
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Best docking scores first: most negative at the top.
    pub fn ascending(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    pub fn compare(&self, a: &ResultRow, b: &ResultRow) -> Ordering {
        match (Cell::of(a.get(&self.column)), Cell::of(b.get(&self.column))) {
            (Cell::Blank, Cell::Blank) => Ordering::Equal,
            (Cell::Blank, _) => Ordering::Greater,
            (_, Cell::Blank) => Ordering::Less,
            (Cell::Number(x), Cell::Number(y)) => self.order.apply(x.total_cmp(&y)),
            (Cell::Number(_), Cell::Text(_)) => Ordering::Less,
            (Cell::Text(_), Cell::Number(_)) => Ordering::Greater,
            (Cell::Text(x), Cell::Text(y)) => self.order.apply(x.cmp(y)),
        }
    }

    pub fn apply(&self, table: &ResultTable) -> ResultTable {
        table.sorted_by(|a, b| self.compare(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCORE: &str = "Docking score (kcal/mol)";

    fn names(table: &ResultTable) -> Vec<&str> {
        table.column_values("Name").collect()
    }

    fn table() -> ResultTable {
        ResultTable::parse(
            "Name,Docking score (kcal/mol)\nB,-3.0\nX,notanumber\nA,-9.5\nE,\nC,-7.25\nD,-3.0\n",
        )
    }

    #[test]
    fn test_score_ascending_puts_best_first() {
        let sorted = SortKey::ascending(SCORE).apply(&table());
        assert_eq!(names(&sorted), vec!["A", "C", "B", "D", "X", "E"]);
    }

    #[test]
    fn test_descending_keeps_unscored_rows_last() {
        let sorted = SortKey::new(SCORE, SortOrder::Desc).apply(&table());
        assert_eq!(names(&sorted), vec!["B", "D", "C", "A", "X", "E"]);
    }

    #[test]
    fn test_text_columns_sort_lexically() {
        let sorted = SortKey::new("Name", SortOrder::Desc).apply(&table());
        assert_eq!(names(&sorted), vec!["X", "E", "D", "C", "B", "A"]);
    }

    #[test]
    fn test_sorting_leaves_source_untouched() {
        let source = table();
        let _ = SortKey::ascending(SCORE).apply(&source);
        assert_eq!(names(&source), vec!["B", "X", "A", "E", "C", "D"]);
    }

    #[test]
    fn test_order_parsing() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!(" asc ".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }
}
