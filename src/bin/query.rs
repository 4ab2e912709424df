use clap::Parser;

use pgbrowse::models::ConnectionConfig;
use pgbrowse::runner;

/// Run one SQL statement against PostgreSQL and print the result as JSON.
///
/// Falls back to canned rows when the database is unreachable or the
/// statement fails. Diagnostics go to stderr.
#[derive(Parser, Debug)]
#[command(name = "pgbrowse-query", version, about, long_about = None)]
struct Cli {
    /// SQL statement to execute
    sql: Option<String>,
}

#[tokio::main]
async fn main() {
    pgbrowse::init_logging();
    let cli = Cli::parse();
    let config = ConnectionConfig::from_env();

    let invocation = match tokio::spawn(async move {
        runner::invoke(&config, cli.sql.as_deref()).await
    })
    .await
    {
        Ok(invocation) => invocation,
        Err(e) => runner::unexpected(&e.to_string()),
    };

    println!("{}", invocation.stdout);
    std::process::exit(invocation.exit_code);
}
