//! create-agent: create or replace Snowflake agents from JSON configuration files.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, bail};
use clap::Parser;
use snowflake_admin::agent_create::{self, Overrides, Source};
use snowflake_admin::logging;
use snowflake_admin::snowflake_rest::{AgentsConnector, AuthToken};

const EXAMPLES: &str = "\
Examples:
  # Process all JSON files in the json/ directory
  create-agent --token <token>

  # Process a specific JSON file
  create-agent -t <token> -j claims-audit-agent.json

  # Override base URL, database and schema for all files
  create-agent -t <token> --base-url myorg-myaccount.snowflakecomputing.com --database my_db --schema my_schema

  # Authenticate with a key pair instead of a token
  create-agent --private-key rsa_key.p8 --public-key rsa_key.pub --account MYORG-MYACCOUNT --user ADMIN

JSON File Structure:
  Each JSON file should contain:
  - base_url: Snowflake instance URL
  - database: Target database name
  - schema: Target schema name
  - agent_create_post_body: Agent configuration object";

/// Create or replace Snowflake agent(s) via the REST API. Configuration is read from JSON files.
#[derive(Parser, Debug)]
#[command(name = "create-agent", version, after_help = EXAMPLES)]
struct Cli {
    /// Bearer token for authorization (programmatic access or OAuth token)
    #[arg(short, long, env = "SNOWFLAKE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// RSA private key (PEM) used to sign a key-pair JWT instead of --token
    #[arg(long, env = "SNOWFLAKE_PRIVATE_KEY_PATH")]
    private_key: Option<PathBuf>,

    /// RSA public key (PEM) matching --private-key
    #[arg(long, env = "SNOWFLAKE_PUBLIC_KEY_PATH")]
    public_key: Option<PathBuf>,

    /// Account identifier for key-pair authentication
    #[arg(long, env = "SNOWFLAKE_ACCOUNT")]
    account: Option<String>,

    /// User name for key-pair authentication
    #[arg(long, env = "SNOWFLAKE_USER")]
    user: Option<String>,

    /// Path to a specific JSON file. If not provided, every JSON file in --json-dir is processed
    #[arg(short, long)]
    json: Option<PathBuf>,

    /// Directory containing JSON files. Only used if --json is not specified
    #[arg(short = 'd', long, default_value = "json")]
    json_dir: PathBuf,

    /// Override the base_url from JSON files (e.g., myinstance.snowflakecomputing.com)
    #[arg(long)]
    base_url: Option<String>,

    /// Override the database from JSON files
    #[arg(long)]
    database: Option<String>,

    /// Override the schema from JSON files
    #[arg(long)]
    schema: Option<String>,

    /// Override the agent name inside agent_create_post_body
    #[arg(long)]
    name: Option<String>,

    /// Print detailed response information
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn auth_token(&self) -> anyhow::Result<AuthToken> {
        if let Some(token) = self.token.as_deref().filter(|token| !token.is_empty()) {
            return Ok(AuthToken::Bearer(token.to_owned()));
        }
        let Some(private_key) = &self.private_key else {
            bail!("either --token (SNOWFLAKE_TOKEN) or --private-key (SNOWFLAKE_PRIVATE_KEY_PATH) is required");
        };
        let public_key = self
            .public_key
            .as_ref()
            .context("--public-key is required with --private-key")?;
        let account = self
            .account
            .as_deref()
            .context("--account is required with --private-key")?;
        let user = self
            .user
            .as_deref()
            .context("--user is required with --private-key")?;
        AuthToken::from_key_files(public_key, private_key, account, user)
            .context("generating key-pair JWT")
    }
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
    let connector = AgentsConnector::try_new(&cli.auth_token()?)?;
    let source = match &cli.json {
        Some(path) => Source::File(path.clone()),
        None => Source::Directory(cli.json_dir.clone()),
    };
    let overrides = Overrides {
        base_url: cli.base_url,
        database: cli.database,
        schema: cli.schema,
        name: cli.name,
    };

    let summary = agent_create::run(&connector, &source, &overrides, cli.verbose).await?;
    Ok(ExitCode::from(summary.exit_code()))
}
