//! How the gateway hands a SQL string to the query runner.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::models::ConnectionConfig;
use crate::runner;

/// Runs one SQL string and returns the runner's JSON document verbatim.
#[async_trait]
pub trait QueryInvoker: Send + Sync {
    async fn invoke(&self, sql: &str) -> Result<String>;
}

/// Spawns the runner binary once per call.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: PathBuf,
    timeout: Duration,
    envs: Vec<(String, String)>,
}

impl ProcessInvoker {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        ProcessInvoker {
            program: program.into(),
            timeout,
            envs: Vec::new(),
        }
    }

    /// Extra environment for the child process
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl QueryInvoker for ProcessInvoker {
    async fn invoke(&self, sql: &str) -> Result<String> {
        log::debug!("Spawning runner {}", self.program.display());

        let child = Command::new(&self.program)
            .arg(sql)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::RunnerFailed(format!("Failed to spawn query runner: {}", e)))?;

        // On timeout the child is dropped with the future, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                log::error!("Query runner exceeded {}s, killed", self.timeout.as_secs());
                return Err(Error::RunnerTimeout(self.timeout.as_secs()));
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            log::debug!("runner: {}", line);
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let details = if stderr.trim().is_empty() {
                stdout
            } else {
                stderr.trim().to_string()
            };
            return Err(Error::RunnerFailed(details));
        }

        ensure_json(stdout)
    }
}

/// Calls the runner library directly; same contract without the spawn.
#[derive(Debug, Clone)]
pub struct InProcessInvoker {
    config: ConnectionConfig,
}

impl InProcessInvoker {
    pub fn new(config: ConnectionConfig) -> Self {
        InProcessInvoker { config }
    }
}

#[async_trait]
impl QueryInvoker for InProcessInvoker {
    async fn invoke(&self, sql: &str) -> Result<String> {
        let invocation = runner::invoke(&self.config, Some(sql)).await;
        if !invocation.is_success() {
            return Err(Error::RunnerFailed(invocation.stdout));
        }
        ensure_json(invocation.stdout)
    }
}

/// Bound any invoker with a timeout.
pub struct Timed<I> {
    inner: I,
    timeout: Duration,
}

impl<I: QueryInvoker> Timed<I> {
    pub fn new(inner: I, timeout: Duration) -> Self {
        Timed { inner, timeout }
    }
}

#[async_trait]
impl<I: QueryInvoker> QueryInvoker for Timed<I> {
    async fn invoke(&self, sql: &str) -> Result<String> {
        tokio::time::timeout(self.timeout, self.inner.invoke(sql))
            .await
            .map_err(|_| Error::RunnerTimeout(self.timeout.as_secs()))?
    }
}

fn ensure_json(stdout: String) -> Result<String> {
    serde_json::from_str::<serde_json::Value>(&stdout)
        .map_err(|e| Error::InvalidOutput(e.to_string()))?;
    Ok(stdout)
}
