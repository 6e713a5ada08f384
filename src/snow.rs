//! Wrapper around the Snowflake CLI (`snow`).
//!
//! Every command goes through a [SnowRunner] so the process boundary can be
//! swapped out.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

pub const DEFAULT_PROGRAM: &str = "snow";
pub const INSTALL_HINT: &str = "pip install snowflake-cli";

/// Captured output of a successful `snow` invocation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SnowOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(thiserror::Error, Debug)]
pub enum SnowError {
    #[error("'{program}' command not found. Please ensure Snowflake CLI is installed (pip install snowflake-cli)")]
    NotInstalled { program: String },
    #[error("failed to start snow—{0}")]
    Spawn(std::io::Error),
    #[error("snow exited with {}", exit_label(.code))]
    Failed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "no exit code (terminated by signal)".into(),
    }
}

#[async_trait]
pub trait SnowRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<SnowOutput, SnowError>;
}

/// Runs the real binary as a child process and waits for it.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    dry_run: bool,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ProcessRunner {
            program: program.into(),
            dry_run: false,
        }
    }
    /// Log commands instead of running them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        ProcessRunner::new(DEFAULT_PROGRAM)
    }
}

#[async_trait]
impl SnowRunner for ProcessRunner {
    async fn run(&self, args: &[String]) -> Result<SnowOutput, SnowError> {
        let program = self.program.display().to_string();
        if self.dry_run {
            tracing::info!("[DRY RUN] {program} {}", args.join(" "));
            return Ok(SnowOutput::default());
        }
        tracing::debug!("running {program} {}", args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|error| match error.kind() {
                std::io::ErrorKind::NotFound => SnowError::NotInstalled {
                    program: program.clone(),
                },
                _ => SnowError::Spawn(error),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(SnowError::Failed {
                code: output.status.code(),
                stdout,
                stderr,
            });
        }
        Ok(SnowOutput { stdout, stderr })
    }
}

/// `PUT` flags.
#[derive(Debug, Clone, Copy)]
pub struct PutOptions {
    pub auto_compress: bool,
    pub overwrite: bool,
}

impl Default for PutOptions {
    fn default() -> Self {
        PutOptions {
            auto_compress: true,
            overwrite: true,
        }
    }
}

/// Ensures the stage reference carries its `@`.
pub fn stage_ref(stage: &str) -> String {
    if stage.starts_with('@') {
        stage.to_owned()
    } else {
        format!("@{stage}")
    }
}

pub fn put_query(path: &Path, stage: &str, options: PutOptions) -> String {
    format!(
        "PUT 'file://{}' {} AUTO_COMPRESS={} OVERWRITE={}",
        path.display(),
        stage_ref(stage),
        sql_bool(options.auto_compress),
        sql_bool(options.overwrite),
    )
}

fn sql_bool(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

/// A named `snow` connection plus the runner that executes its commands.
#[derive(Debug, Clone)]
pub struct SnowCli<R = ProcessRunner> {
    connection: String,
    runner: R,
}

impl<R: SnowRunner> SnowCli<R> {
    pub fn new(connection: impl Into<String>, runner: R) -> Self {
        SnowCli {
            connection: connection.into(),
            runner,
        }
    }
    pub fn connection(&self) -> &str {
        &self.connection
    }
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn sql_args(&self) -> Vec<String> {
        vec!["sql".into(), "-c".into(), self.connection.clone()]
    }

    /// `snow sql -c <conn> --query "DESCRIBE AGENT <name>" --format JSON_EXT`
    pub fn describe_agent_args(&self, name: &str) -> Vec<String> {
        let mut args = self.sql_args();
        args.extend([
            "--query".into(),
            format!("DESCRIBE AGENT {name}"),
            "--format".into(),
            "JSON_EXT".into(),
        ]);
        args
    }
    pub async fn describe_agent(&self, name: &str) -> Result<SnowOutput, SnowError> {
        self.runner.run(&self.describe_agent_args(name)).await
    }

    /// `snow sql -c <conn> -q "PUT 'file://<path>' @<stage> ..."`
    pub fn put_args(&self, path: &Path, stage: &str, options: PutOptions) -> Vec<String> {
        let mut args = self.sql_args();
        args.extend(["-q".into(), put_query(path, stage, options)]);
        args
    }
    /// Relative paths are made absolute before they go into the `file://` URL.
    pub async fn put_file(
        &self,
        path: &Path,
        stage: &str,
        options: PutOptions,
    ) -> Result<SnowOutput, SnowError> {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        self.runner
            .run(&self.put_args(&absolute, stage, options))
            .await
    }

    /// `snow sql -c <conn> -f <file1> -f <file2> ...`
    pub fn run_files_args(&self, files: &[PathBuf]) -> Vec<String> {
        let mut args = self.sql_args();
        for file in files {
            args.push("-f".into());
            args.push(file.display().to_string());
        }
        args
    }
    pub async fn run_files(&self, files: &[PathBuf]) -> Result<SnowOutput, SnowError> {
        self.runner.run(&self.run_files_args(files)).await
    }
}
