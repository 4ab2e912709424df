use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:3001";
pub const DEFAULT_RUNNER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ROW_LIMIT: u32 = 100;
pub const MAX_ROW_LIMIT: u32 = 100;

/// How the gateway reaches the query runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RunnerMode {
    /// Spawn the runner binary once per request
    Process { program: PathBuf },
    /// Call the runner library directly
    InProcess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    pub bind: SocketAddr,
    pub runner: RunnerMode,
    pub runner_timeout_secs: u64,
}

impl GatewaySettings {
    pub fn runner_timeout(&self) -> Duration {
        Duration::from_secs(self.runner_timeout_secs)
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            bind: SocketAddr::from(([127, 0, 0, 1], 3001)),
            runner: RunnerMode::Process {
                program: default_runner_program(),
            },
            runner_timeout_secs: DEFAULT_RUNNER_TIMEOUT_SECS,
        }
    }
}

/// The runner binary installed next to the current executable, or the bare
/// name for a `PATH` lookup.
pub fn default_runner_program() -> PathBuf {
    let name = format!("pgbrowse-query{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .filter(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Clamp a requested row limit into `1..=MAX_ROW_LIMIT`.
pub fn clamp_row_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_ROW_LIMIT).clamp(1, MAX_ROW_LIMIT)
}
