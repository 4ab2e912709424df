use std::sync::Arc;

use crate::invoker::{InProcessInvoker, ProcessInvoker, QueryInvoker, Timed};
use crate::models::{ConnectionConfig, GatewaySettings, RunnerMode};
use crate::source::{FallbackSource, LiveSource, TableSource};

/// Shared by every gateway request; holds no per-request state.
pub struct AppState {
    /// Hands raw SQL to the query runner
    pub invoker: Arc<dyn QueryInvoker>,

    /// Typed table access with mock fallback
    pub tables: FallbackSource<Arc<dyn TableSource>>,
}

impl AppState {
    pub fn new(invoker: Arc<dyn QueryInvoker>, tables: Arc<dyn TableSource>) -> Self {
        Self {
            invoker,
            tables: FallbackSource::with_mock(tables),
        }
    }

    /// Wire up the runner and table source described by the settings.
    pub fn from_settings(settings: &GatewaySettings, config: ConnectionConfig) -> Self {
        let invoker: Arc<dyn QueryInvoker> = match &settings.runner {
            RunnerMode::Process { program } => {
                log::info!("Query runner: {}", program.display());
                Arc::new(ProcessInvoker::new(program.clone(), settings.runner_timeout()))
            }
            RunnerMode::InProcess => {
                log::info!("Query runner: in-process");
                Arc::new(Timed::new(
                    InProcessInvoker::new(config.clone()),
                    settings.runner_timeout(),
                ))
            }
        };

        Self::new(invoker, Arc::new(LiveSource::new(config)))
    }
}
