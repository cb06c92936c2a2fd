//! Score bounds, range filtering, histograms and summary statistics.
//!
//! Everything here is a pure function of a [`ResultTable`] and, where
//! relevant, a [`ScoreRange`]. A row's score is its designated score column
//! parsed as a finite `f64`; rows without one are left out of every numeric
//! operation.

use serde::Serialize;
use tracing::warn;

use agandock_common::{AgandockError, ResultsConfig};

use crate::table::{ResultRow, ResultTable};
use crate::Result;

/// Upper limit on histogram bins for pathological score spans.
const MAX_BINS: usize = 10_000;

/// Parse a score cell. Only finite numbers count.
pub fn parse_score(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|score| score.is_finite())
}

// -0.0 would render as "-0" in bin labels
fn normalize_zero(value: f64) -> f64 {
    value + 0.0
}

/// Inclusive score interval with `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRange {
    lower: f64,
    upper: f64,
}

impl ScoreRange {
    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(AgandockError::InvalidInput(format!(
                "Score range bounds must be finite numbers, got {lower} to {upper}"
            )));
        }
        if lower > upper {
            return Err(AgandockError::InvalidInput(format!(
                "Lower score bound {lower} exceeds upper bound {upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn contains(&self, score: f64) -> bool {
        self.lower <= score && score <= self.upper
    }

    /// Clamp both ends into `bounds`. Ordering is preserved.
    pub fn clamp_to(&self, bounds: &ScoreRange) -> ScoreRange {
        ScoreRange {
            lower: self.lower.clamp(bounds.lower, bounds.upper),
            upper: self.upper.clamp(bounds.lower, bounds.upper),
        }
    }
}

/// One histogram bucket `[start, end)`; the final bucket also holds `end`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub range_label: String,
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Summary of the scored rows in a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    /// All rows in the view
    pub rows: usize,
    /// Rows with a parseable score
    pub scored: usize,
    /// `None` when no row has a parseable score
    pub min: Option<f64>,
    pub mean: Option<f64>,
}

impl ScoreSummary {
    pub fn min_label(&self) -> String {
        self.min.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "N/A".to_string())
    }

    pub fn mean_label(&self) -> String {
        self.mean.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "N/A".to_string())
    }
}

/// Score-column aggregation shared by every result variant.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    score_column: String,
    bin_width: f64,
    default_lower: f64,
    default_upper: f64,
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(&ResultsConfig::default())
    }
}

impl ScoreAggregator {
    pub fn new(config: &ResultsConfig) -> Self {
        Self {
            score_column: config.score_column.clone(),
            bin_width: config.bin_width,
            default_lower: config.default_lower,
            default_upper: config.default_upper,
        }
    }

    pub fn score_column(&self) -> &str {
        &self.score_column
    }

    pub fn score_of(&self, row: &ResultRow) -> Option<f64> {
        parse_score(row.get(&self.score_column))
    }

    pub fn scores(&self, table: &ResultTable) -> Vec<f64> {
        table.column_values(&self.score_column).filter_map(parse_score).collect()
    }

    /// `floor(min(scores ∪ {default_lower}))` to `ceil(max(scores ∪ {default_upper}))`.
    pub fn bounds(&self, table: &ResultTable) -> ScoreRange {
        let (min, max) = self
            .scores(table)
            .into_iter()
            .fold((self.default_lower, self.default_upper), |(lo, hi), s| (lo.min(s), hi.max(s)));
        ScoreRange {
            lower: normalize_zero(min.floor()),
            upper: normalize_zero(max.ceil()),
        }
    }

    /// Rows whose score parses and lies within `range`, in source order.
    pub fn filter(&self, table: &ResultTable, range: &ScoreRange) -> ResultTable {
        table.select(|row| self.score_of(row).is_some_and(|score| range.contains(score)))
    }

    /// Fixed-width bins from `bounds.lower` up to `bounds.upper`; the last
    /// bin is clamped to `bounds.upper` and includes it.
    pub fn histogram(&self, table: &ResultTable, bounds: &ScoreRange) -> Vec<HistogramBin> {
        let scores = self.scores(table);
        let mut bins = Vec::new();

        for index in 0.. {
            let start = normalize_zero(bounds.lower + index as f64 * self.bin_width);
            if start >= bounds.upper {
                break;
            }
            if index >= MAX_BINS {
                warn!(
                    "Histogram over {} to {} truncated at {} bins",
                    bounds.lower, bounds.upper, MAX_BINS
                );
                break;
            }

            let end = normalize_zero((start + self.bin_width).min(bounds.upper));
            let last = end >= bounds.upper;
            let count = scores
                .iter()
                .filter(|&&s| s >= start && (s < end || (last && s == end)))
                .count();

            bins.push(HistogramBin {
                range_label: format!("{} to {}", start, end),
                start,
                end,
                count,
            });
        }

        bins
    }

    pub fn summary(&self, table: &ResultTable) -> ScoreSummary {
        let scores = self.scores(table);
        let min = scores.iter().copied().reduce(f64::min);
        let mean = (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64);
        ScoreSummary {
            rows: table.len(),
            scored: scores.len(),
            min,
            mean,
        }
    }

    /// A distribution chart is only meaningful with more than one row.
    pub fn show_histogram(&self, table: &ResultTable) -> bool {
        table.len() > 1
    }
}
