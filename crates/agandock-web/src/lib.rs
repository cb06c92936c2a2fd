//! agandock-web - browser dashboard for the AGanDock pipeline.
//! Provides:
//!   - Experiment overview and docking submission form
//!   - Results explorer with score filtering, histogram and CSV export
//!   - JSON API for the PoseBusters and PLIP stages
//!   - Live pipeline events over SSE

pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;
