//! apicase - interactive runner for chained HTTP API test cases
//!
//! Runs ordered suites of dependent requests against an API, threading
//! values from one response into the next request and validating each
//! response against declarative assertions.

use apicase::commands::{Commands, ConnectionArgs};
use apicase::{cli, common};
use clap::Parser;

#[derive(Parser)]
#[command(name = "apicase", about = "Interactive runner for chained HTTP API test cases")]
#[command(version, long_about = None)]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    common::logging::init_cli(cli.conn.verbose);

    if let Err(e) = cli::dispatch(cli.command, cli.conn).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
