//! Per-variant view state: unfiltered or filtered to a committed score range.

use serde::Serialize;
use std::sync::Arc;

use agandock_common::AgandockError;

use crate::score::{HistogramBin, ScoreAggregator, ScoreRange, ScoreSummary};
use crate::sort::SortKey;
use crate::table::{ResultRow, ResultTable};
use crate::variant::ResultVariant;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState {
    /// Every row of the source table
    Unfiltered,
    /// Rows whose score lies in `range`
    RangeFiltered { range: ScoreRange },
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Unfiltered => "unfiltered",
            ViewState::RangeFiltered { .. } => "range_filtered",
        }
    }
}

/// The displayed state of one result variant.
///
/// The source table is shared and never modified; filtering produces a new
/// row subsequence. Resetting recomputes bounds from the variant currently
/// displayed, not from whichever variant was shown before. Displayed rows are
/// sorted by score, best first, unless another order is chosen.
#[derive(Debug, Clone)]
pub struct VariantView {
    variant: ResultVariant,
    table: Arc<ResultTable>,
    bounds: ScoreRange,
    state: ViewState,
    sort: SortKey,
}

impl VariantView {
    pub fn new(variant: ResultVariant, table: Arc<ResultTable>, aggregator: &ScoreAggregator) -> Self {
        let bounds = aggregator.bounds(&table);
        Self {
            variant,
            table,
            bounds,
            state: ViewState::Unfiltered,
            sort: SortKey::ascending(aggregator.score_column()),
        }
    }

    pub fn variant(&self) -> &ResultVariant {
        &self.variant
    }

    pub fn table(&self) -> &ResultTable {
        &self.table
    }

    pub fn bounds(&self) -> ScoreRange {
        self.bounds
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn sort(&self) -> &SortKey {
        &self.sort
    }

    /// Order displayed rows by `key`. The column must exist in this table,
    /// except for the score column, which is always accepted.
    pub fn sort_by(&mut self, key: SortKey, aggregator: &ScoreAggregator) -> Result<()> {
        if key.column != aggregator.score_column() && !self.table.columns().contains(&key.column) {
            return Err(AgandockError::InvalidInput(format!(
                "Cannot sort by unknown column '{}'",
                key.column
            )));
        }
        self.sort = key;
        Ok(())
    }

    /// The range the view is filtered to; the full bounds when unfiltered.
    pub fn active_range(&self) -> ScoreRange {
        match self.state {
            ViewState::Unfiltered => self.bounds,
            ViewState::RangeFiltered { range } => range,
        }
    }

    /// Commit a user-chosen range, clamped into the source bounds.
    pub fn commit(&mut self, range: ScoreRange) -> ScoreRange {
        let range = range.clamp_to(&self.bounds);
        self.state = ViewState::RangeFiltered { range };
        range
    }

    /// Back to unfiltered, with bounds recomputed from this variant's table.
    pub fn reset(&mut self, aggregator: &ScoreAggregator) {
        self.bounds = aggregator.bounds(&self.table);
        self.state = ViewState::Unfiltered;
    }

    /// Display a different variant. Any committed range and chosen sort
    /// order are dropped.
    pub fn switch_to(&mut self, variant: ResultVariant, table: Arc<ResultTable>, aggregator: &ScoreAggregator) {
        self.variant = variant;
        self.table = table;
        self.sort = SortKey::ascending(aggregator.score_column());
        self.reset(aggregator);
    }

    /// Rows in range (all of them when unfiltered), in sort order.
    pub fn displayed(&self, aggregator: &ScoreAggregator) -> ResultTable {
        match self.state {
            ViewState::Unfiltered => self.sort.apply(&self.table),
            ViewState::RangeFiltered { range } => self.sort.apply(&aggregator.filter(&self.table, &range)),
        }
    }

    pub fn snapshot(&self, aggregator: &ScoreAggregator) -> ViewSnapshot {
        let displayed = self.displayed(aggregator);
        let summary = aggregator.summary(&displayed);
        let histogram = aggregator.histogram(&displayed, &self.bounds);
        let show_histogram = aggregator.show_histogram(&displayed);
        ViewSnapshot {
            variant: self.variant.clone(),
            label: self.variant.label(),
            columns: displayed.columns().to_vec(),
            rows: displayed.rows().to_vec(),
            state: self.state.name(),
            sort: self.sort.clone(),
            bounds: self.bounds,
            range: self.active_range(),
            summary,
            histogram,
            show_histogram,
        }
    }
}

/// Serializable picture of a view, as returned by the results API.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub variant: ResultVariant,
    pub label: String,
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
    /// `unfiltered` or `range_filtered`
    pub state: &'static str,
    pub sort: SortKey,
    pub bounds: ScoreRange,
    pub range: ScoreRange,
    pub summary: ScoreSummary,
    pub histogram: Vec<HistogramBin>,
    pub show_histogram: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortOrder;

    fn view(text: &str) -> (VariantView, ScoreAggregator) {
        let agg = ScoreAggregator::default();
        let table = Arc::new(ResultTable::parse(text));
        (VariantView::new(ResultVariant::Raw, table, &agg), agg)
    }

    const TABLE: &str = "Name,Docking score (kcal/mol)\nA,-9.5\nB,-3.0\nC,oops\n";

    #[test]
    fn test_unfiltered_shows_every_row() {
        let (view, agg) = view(TABLE);
        assert_eq!(view.state(), ViewState::Unfiltered);
        assert_eq!(view.displayed(&agg).len(), 3);
        assert_eq!(view.active_range(), view.bounds());
    }

    #[test]
    fn test_commit_filters_and_clamps() {
        let (mut view, agg) = view(TABLE);
        let committed = view.commit(ScoreRange::new(-50.0, -5.0).unwrap());
        assert_eq!(committed, ScoreRange::new(-10.0, -5.0).unwrap());
        assert_eq!(view.state(), ViewState::RangeFiltered { range: committed });

        let shown = view.displayed(&agg);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown.rows()[0].get("Name"), "A");
        assert_eq!(view.table().len(), 3);
    }

    #[test]
    fn test_reset_restores_bounds() {
        let (mut view, agg) = view(TABLE);
        view.commit(ScoreRange::new(-4.0, -2.0).unwrap());
        view.reset(&agg);
        assert_eq!(view.state(), ViewState::Unfiltered);
        assert_eq!(view.active_range(), ScoreRange::new(-10.0, 0.0).unwrap());
    }

    #[test]
    fn test_switch_uses_new_variant_bounds() {
        let (mut view, agg) = view(TABLE);
        view.commit(ScoreRange::new(-9.0, -1.0).unwrap());

        let passed = Arc::new(ResultTable::parse("Name,Docking score (kcal/mol)\nD,-14.2\n"));
        view.switch_to(ResultVariant::ValidityPassed, passed, &agg);

        assert_eq!(view.variant(), &ResultVariant::ValidityPassed);
        assert_eq!(view.state(), ViewState::Unfiltered);
        assert_eq!(view.bounds(), ScoreRange::new(-15.0, 0.0).unwrap());
    }

    #[test]
    fn test_displayed_rows_are_best_first() {
        let (mut view, agg) = view("Name,Docking score (kcal/mol)\nB,-3.0\nC,oops\nA,-9.5\n");
        let names = |t: &ResultTable| t.column_values("Name").map(String::from).collect::<Vec<_>>();
        assert_eq!(names(&view.displayed(&agg)), vec!["A", "B", "C"]);

        view.sort_by(SortKey::new("Name", SortOrder::Desc), &agg).unwrap();
        assert_eq!(names(&view.displayed(&agg)), vec!["C", "B", "A"]);

        view.commit(ScoreRange::new(-10.0, 0.0).unwrap());
        assert_eq!(names(&view.displayed(&agg)), vec!["B", "A"]);
    }

    #[test]
    fn test_sort_by_unknown_column_is_rejected() {
        let (mut view, agg) = view(TABLE);
        assert!(view.sort_by(SortKey::ascending("Nope"), &agg).is_err());
        assert_eq!(view.sort(), &SortKey::ascending(agg.score_column()));
    }

    #[test]
    fn test_snapshot_summarises_displayed_rows() {
        let (mut view, agg) = view(TABLE);
        view.commit(ScoreRange::new(-10.0, -5.0).unwrap());
        let snap = view.snapshot(&agg);
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.summary.min, Some(-9.5));
        assert!(!snap.show_histogram);
        assert_eq!(snap.histogram.iter().map(|b| b.count).sum::<usize>(), 1);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "range_filtered");
        assert_eq!(json["range"]["upper"], -5.0);
        assert_eq!(json["variant"]["kind"], "raw");
        assert_eq!(json["sort"]["column"], "Docking score (kcal/mol)");
        assert_eq!(json["sort"]["order"], "asc");
    }
}
