//! AGanDock results - the tabular model behind every results view.
//!
//! Every pipeline stage of the external `agandock` tool leaves a CSV table in
//! the experiment folder:
//! 1. Docking writes the raw table (`output.csv`)
//! 2. PoseBusters splits it into validity-passed / validity-failed tables
//! 3. PLIP writes interaction-annotated tables under `output_plip_files/`
//!
//! This crate parses those tables, derives score bounds, summaries and
//! histograms, applies score-range filters, orders rows and exports filtered
//! subsets. All of it is shared across variants; only the [`ResultVariant`]
//! selector changes.

pub mod table;
pub mod score;
pub mod variant;
pub mod sort;
pub mod view;
pub mod source;
pub mod cache;
pub mod export;

pub use table::{ResultRow, ResultTable, DEFAULT_COLUMNS};
pub use score::{HistogramBin, ScoreAggregator, ScoreRange, ScoreSummary};
pub use variant::ResultVariant;
pub use sort::{SortKey, SortOrder};
pub use view::{VariantView, ViewSnapshot, ViewState};
pub use source::{read_text_lossy, FsResultSource, ResultSource};
pub use cache::{CacheKey, ResultCache};

pub type Result<T> = agandock_common::Result<T>;
