//! snow-put: upload every file in a directory to a Snowflake internal stage.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use snowflake_admin::logging;
use snowflake_admin::snow::{DEFAULT_PROGRAM, ProcessRunner, PutOptions, SnowCli, stage_ref};
use snowflake_admin::upload;

/// Upload files to a Snowflake internal stage using PUT through the Snowflake CLI.
#[derive(Parser, Debug)]
#[command(
    name = "snow-put",
    version,
    after_help = "Example:\n  snow-put ./upload my_connection loss_evidence\n  snow-put ./data demo_connection @loss_evidence"
)]
struct Cli {
    /// Directory containing files to upload
    directory: PathBuf,

    /// Snowflake CLI connection name
    connection: String,

    /// Internal stage name (with or without @ prefix)
    stage: String,

    /// Print the PUT commands without running them
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

    if cli.connection.trim().is_empty() {
        eprintln!("Error: Connection name cannot be empty");
        return ExitCode::FAILURE;
    }
    if cli.stage.trim().is_empty() {
        eprintln!("Error: Stage name cannot be empty");
        return ExitCode::FAILURE;
    }

    println!("Scanning directory: {}", cli.directory.display());
    let snow = SnowCli::new(
        cli.connection.as_str(),
        ProcessRunner::new(&cli.snow).dry_run(cli.dry_run),
    );
    let summary =
        match upload::upload_directory(&snow, &cli.directory, &cli.stage, PutOptions::default())
            .await
        {
            Ok(summary) => summary,
            Err(error) => {
                eprintln!("\nERROR: {error}");
                return ExitCode::FAILURE;
            }
        };

    if summary.failed > 0 {
        eprintln!("\n⚠️  {} file(s) failed to upload:", summary.failed);
        for message in &summary.errors {
            eprintln!("  - {message}");
        }
        return ExitCode::from(summary.exit_code());
    }
    if summary.successful == 0 {
        println!("\n⚠️  No files were uploaded.");
        return ExitCode::SUCCESS;
    }
    println!(
        "\n✓ Successfully uploaded {} file(s) to {}",
        summary.successful,
        stage_ref(&cli.stage)
    );
    ExitCode::SUCCESS
}
