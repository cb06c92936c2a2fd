//! Shared application state for the web server.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use agandock_common::DashboardConfig;
use agandock_pipeline::DockingPipeline;
use agandock_results::{FsResultSource, ResultCache, ScoreAggregator};

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A pipeline stage started or failed
    PipelineStatus { stage: String, experiment: String, message: String },
    /// Docking finished and `output.csv` is ready
    DockingComplete { run_id: Uuid, experiment: String, ligands: usize },
    /// PoseBusters filtering finished
    FilterComplete { run_id: Uuid, experiment: String, passed: usize, failed: usize },
    /// PLIP analysis finished
    PlipComplete { run_id: Uuid, experiment: String, tables: usize },
    /// General notification
    Notification { level: String, message: String },
}

impl AppEvent {
    /// The experiment an event is about; `None` for general notifications.
    pub fn experiment(&self) -> Option<&str> {
        match self {
            AppEvent::PipelineStatus { experiment, .. }
            | AppEvent::DockingComplete { experiment, .. }
            | AppEvent::FilterComplete { experiment, .. }
            | AppEvent::PlipComplete { experiment, .. } => Some(experiment.as_str()),
            AppEvent::Notification { .. } => None,
        }
    }

    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            AppEvent::DockingComplete { run_id, .. }
            | AppEvent::FilterComplete { run_id, .. }
            | AppEvent::PlipComplete { run_id, .. } => Some(*run_id),
            _ => None,
        }
    }

    /// Whether a subscriber watching `experiment` should see this event.
    pub fn concerns(&self, experiment: &str) -> bool {
        self.experiment().map_or(true, |name| name == experiment)
    }
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: DashboardConfig,
    pub aggregator: ScoreAggregator,
    pub source: FsResultSource,
    pub cache: ResultCache,
    pub pipeline: DockingPipeline,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            aggregator: ScoreAggregator::new(&config.results),
            source: FsResultSource::new(&config.pipeline.workspace_root),
            cache: ResultCache::new(),
            pipeline: DockingPipeline::from_config(&config.pipeline),
            config,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Send to whoever is listening; no subscribers is fine.
    pub fn emit(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn status(&self, stage: &str, experiment: &str, message: impl Into<String>) {
        self.emit(AppEvent::PipelineStatus {
            stage: stage.to_string(),
            experiment: experiment.to_string(),
            message: message.into(),
        });
    }
}

pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_scope() {
        let run_id = Uuid::new_v4();
        let done = AppEvent::FilterComplete { run_id, experiment: "egfr".into(), passed: 4, failed: 1 };
        assert_eq!(done.experiment(), Some("egfr"));
        assert_eq!(done.run_id(), Some(run_id));
        assert!(done.concerns("egfr"));
        assert!(!done.concerns("kras"));

        let note = AppEvent::Notification { level: "info".into(), message: "hi".into() };
        assert_eq!(note.run_id(), None);
        assert!(note.concerns("kras"));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(AppEvent::PlipComplete {
            run_id: Uuid::nil(),
            experiment: "egfr".into(),
            tables: 2,
        })
        .unwrap();
        assert_eq!(json["type"], "plip_complete");
        assert_eq!(json["tables"], 2);
    }
}
