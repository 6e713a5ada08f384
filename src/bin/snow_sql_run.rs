//! snow-sql-run: execute numbered SQL files (NNN-name.sql) in prefix order.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use snowflake_admin::logging;
use snowflake_admin::snow::{DEFAULT_PROGRAM, ProcessRunner, SnowCli};
use snowflake_admin::sql_runner;

/// Sort and execute SQL files with numeric prefixes (e.g. 001-schema.sql)
/// through a single Snowflake CLI call.
#[derive(Parser, Debug)]
#[command(
    name = "snow-sql-run",
    version,
    after_help = "Example:\n  snow-sql-run ./sql my_snowflake_connection"
)]
struct Cli {
    /// Directory containing the SQL files
    directory: PathBuf,

    /// Snowflake CLI connection name
    connection: String,

    /// Print the command without running it
    #[arg(long)]
    dry_run: bool,

    /// Path to the snow executable
    #[arg(long, env = "SNOW_CLI", default_value = DEFAULT_PROGRAM)]
    snow: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    println!("Scanning directory: {}", cli.directory.display());
    let files = match sql_runner::sorted_sql_files(&cli.directory) {
        Ok(files) => files,
        Err(error) => {
            eprintln!("\nERROR: {error}");
            return ExitCode::FAILURE;
        }
    };

    sql_runner::warn_non_matching(&files.non_matching);
    if files.matching.is_empty() {
        println!(
            "\nNo SQL files with numeric prefix (NNN-*.sql) found in: {}",
            cli.directory.display()
        );
        return ExitCode::SUCCESS;
    }
    sql_runner::print_plan(&files.matching);

    println!("\nUsing Snowflake connection: {}", cli.connection);
    let snow = SnowCli::new(
        cli.connection.as_str(),
        ProcessRunner::new(&cli.snow).dry_run(cli.dry_run),
    );
    match sql_runner::execute(&snow, &files.matching).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
