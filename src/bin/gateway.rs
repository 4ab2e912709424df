use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use pgbrowse::models::{
    default_runner_program, ConnectionConfig, GatewaySettings, RunnerMode, DEFAULT_BIND,
    DEFAULT_RUNNER_TIMEOUT_SECS,
};

/// HTTP gateway that runs browser queries through the query runner.
#[derive(Parser, Debug)]
#[command(name = "pgbrowse-gateway", version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "PGBROWSE_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Query runner executable (defaults to the one installed alongside)
    #[arg(long, env = "PGBROWSE_RUNNER")]
    runner: Option<PathBuf>,

    /// Run queries in this process instead of spawning the runner
    #[arg(long, conflicts_with = "runner")]
    in_process: bool,

    /// Seconds before a query runner is killed
    #[arg(long, env = "PGBROWSE_RUNNER_TIMEOUT", default_value_t = DEFAULT_RUNNER_TIMEOUT_SECS)]
    timeout_secs: u64,
}

impl From<Cli> for GatewaySettings {
    fn from(cli: Cli) -> Self {
        let runner = if cli.in_process {
            RunnerMode::InProcess
        } else {
            RunnerMode::Process {
                program: cli.runner.unwrap_or_else(default_runner_program),
            }
        };

        GatewaySettings {
            bind: cli.bind,
            runner,
            runner_timeout_secs: cli.timeout_secs,
        }
    }
}

#[tokio::main]
async fn main() {
    pgbrowse::init_logging();
    let settings = GatewaySettings::from(Cli::parse());
    let config = ConnectionConfig::from_env();

    if let Err(e) = pgbrowse::run_gateway(settings, config).await {
        log::error!("Gateway failed: {}", e);
        std::process::exit(1);
    }
}
