use clap::Parser;

use pgbrowse::browser::{render_table, HttpTransport, TableBrowser};

/// List tables through the gateway and optionally show one of them.
#[derive(Parser, Debug)]
#[command(name = "pgbrowse-browse", version, about, long_about = None)]
struct Cli {
    /// Gateway base URL
    #[arg(short = 'u', long, env = "PGBROWSE_URL", default_value = "http://127.0.0.1:3001")]
    url: String,

    /// Table to display (up to 100 rows)
    table: Option<String>,
}

#[tokio::main]
async fn main() {
    pgbrowse::init_logging();
    let cli = Cli::parse();
    let mut browser = TableBrowser::new(HttpTransport::new(&cli.url));

    browser.refresh_tables().await;
    if let Some(warning) = browser.warning() {
        eprintln!("warning: {}", warning);
    }
    println!("Tables:");
    for table in browser.tables() {
        println!("  {}", table.table_name);
    }

    if let Some(table) = cli.table {
        browser.select(&table).await;
        if let Some(warning) = browser.warning() {
            eprintln!("warning: {}", warning);
        }
        if let Some(view) = browser.view() {
            println!();
            print!("{}", render_table(view));
        }
    }
}
