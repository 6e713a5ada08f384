//! gen-agent-sql: generate `CREATE OR REPLACE AGENT` SQL from agent descriptions.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use snowflake_admin::agent_sql::{self, Output};
use snowflake_admin::describe::{self, RecordReport};
use snowflake_admin::logging;
use snowflake_admin::snow::{DEFAULT_PROGRAM, ProcessRunner, SnowCli};

/// Generate CREATE OR REPLACE AGENT statements from a DESCRIBE AGENT export,
/// or from agents described live through the Snowflake CLI.
#[derive(Parser, Debug)]
#[command(name = "gen-agent-sql", version)]
struct Cli {
    /// JSON array of agent records (DESCRIBE AGENT rows)
    #[arg(short, long, default_value = "describe_agent_output.json", conflicts_with = "agents")]
    input: PathBuf,

    /// JSON array of agent names to DESCRIBE live instead of reading --input
    #[arg(short, long, requires = "connection")]
    agents: Option<PathBuf>,

    /// Snowflake CLI connection name used with --agents
    #[arg(short, long, env = "SNOWFLAKE_CONNECTION")]
    connection: Option<String>,

    /// Save the described records as JSON (same shape as --input)
    #[arg(long, requires = "agents")]
    dump: Option<PathBuf>,

    /// Write every statement into this single file instead of one file per agent
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for the per-agent files
    #[arg(long, default_value = "agent-sql")]
    output_dir: PathBuf,

    /// Also generate a statement adding each agent to this Snowflake Intelligence object
    #[arg(long)]
    si_object: Option<String>,

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

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let report = match (&cli.agents, &cli.connection) {
        (Some(names_path), Some(connection)) => {
            let names = describe::load_agent_names(names_path)?;
            println!(
                "Describing {} agent(s) with connection: {connection}",
                names.len()
            );
            let snow = SnowCli::new(connection.as_str(), ProcessRunner::new(&cli.snow));
            let report = describe::fetch_descriptions(&snow, &names).await;
            if let Some(dump) = &cli.dump {
                describe::save_records(dump, &report.records)?;
                println!("Saved {} record(s) to {}", report.records.len(), dump.display());
            }
            report
        }
        _ => load_input(&cli)?,
    };
    let records = report.records;
    let failed = report.failures.len();

    let output = match cli.output {
        Some(path) => Output::Combined(path),
        None => Output::PerRecord(cli.output_dir),
    };
    let generated = agent_sql::generate(&records, &output, cli.si_object.as_deref())?;
    match &output {
        Output::Combined(path) => println!(
            "Generated {} statement(s) in {}",
            generated.statements,
            path.display()
        ),
        Output::PerRecord(dir) => println!(
            "Generated {} statement(s) in {} file(s) under {}",
            generated.statements,
            generated.files.len(),
            dir.display()
        ),
    }

    if failed > 0 {
        eprintln!("\n⚠️  {failed} agent record(s) were skipped");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn load_input(cli: &Cli) -> anyhow::Result<RecordReport> {
    let report = describe::load_records(&cli.input)
        .with_context(|| format!("loading agent records from {}", cli.input.display()))?;
    println!(
        "Loaded {} agent record(s) from {}",
        report.records.len(),
        cli.input.display()
    );
    for (_, error) in &report.failures {
        eprintln!("  ✗ Skipping {error}");
    }
    Ok(report)
}
