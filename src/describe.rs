//! Agent description records, from a JSON export or a live `DESCRIBE AGENT`.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::snow::{SnowCli, SnowError, SnowRunner};

/// One row of `DESCRIBE AGENT`. Columns not listed here are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescription {
    pub database_name: String,
    pub schema_name: String,
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// JSON text.
    #[serde(default, deserialize_with = "json_text")]
    pub profile: Option<String>,
    /// JSON text.
    #[serde(default, deserialize_with = "json_text")]
    pub agent_spec: Option<String>,
}

/// Accepts either a JSON string or an already-parsed JSON value and keeps
/// it as text.
fn json_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

#[derive(thiserror::Error, Debug)]
pub enum DescribeError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}—{error}", .path.display())]
    Read {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("Invalid JSON in {source_name}: {error}")]
    InvalidJson {
        source_name: String,
        error: serde_json::Error,
    },
    #[error("{source_name}: '{field}' is missing or empty")]
    MissingField {
        source_name: String,
        field: &'static str,
    },
    #[error("DESCRIBE AGENT {0} returned no rows")]
    NoRows(String),
    #[error(transparent)]
    Snow(#[from] SnowError),
    #[error("failed to write {}—{error}", .path.display())]
    Write {
        path: PathBuf,
        error: std::io::Error,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, DescribeError> {
    let content = std::fs::read_to_string(path).map_err(|error| match error.kind() {
        std::io::ErrorKind::NotFound => DescribeError::NotFound(path.to_path_buf()),
        _ => DescribeError::Read {
            path: path.to_path_buf(),
            error,
        },
    })?;
    serde_json::from_str(&content).map_err(|error| DescribeError::InvalidJson {
        source_name: path.display().to_string(),
        error,
    })
}

/// Converts one exported row. The identifier columns must be present and
/// non-blank.
fn record_from_row(source_name: String, row: Value) -> Result<AgentDescription, DescribeError> {
    let record: AgentDescription =
        serde_json::from_value(row).map_err(|error| DescribeError::InvalidJson {
            source_name: source_name.clone(),
            error,
        })?;
    let blank = [
        ("database_name", &record.database_name),
        ("schema_name", &record.schema_name),
        ("name", &record.name),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field);
    match blank {
        Some(field) => Err(DescribeError::MissingField { source_name, field }),
        None => Ok(record),
    }
}

/// Reads a JSON array of agent records, as written by [save_records].
///
/// The file itself must be a JSON array. Rows that do not describe an agent
/// land in [RecordReport::failures], labelled `row N` (1-based), and the
/// rest are still returned.
pub fn load_records(path: &Path) -> Result<RecordReport, DescribeError> {
    let rows: Vec<Value> = read_json(path)?;
    let mut report = RecordReport::default();
    for (index, row) in rows.into_iter().enumerate() {
        let label = format!("row {}", index + 1);
        match record_from_row(format!("{} {label}", path.display()), row) {
            Ok(record) => report.records.push(record),
            Err(error) => {
                tracing::warn!(file = %path.display(), %label, %error, "skipping agent record");
                report.failures.push((label, error));
            }
        }
    }
    Ok(report)
}

/// Reads a JSON array of agent names (optionally `DB.SCHEMA.NAME`).
pub fn load_agent_names(path: &Path) -> Result<Vec<String>, DescribeError> {
    read_json(path)
}

pub fn save_records(path: &Path, records: &[AgentDescription]) -> Result<(), DescribeError> {
    let write_error = |error| DescribeError::Write {
        path: path.to_path_buf(),
        error,
    };
    let mut content = serde_json::to_string_pretty(records).map_err(|error| {
        DescribeError::InvalidJson {
            source_name: path.display().to_string(),
            error,
        }
    })?;
    content.push('\n');
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, content).map_err(write_error)
}

/// Parses the `JSON_EXT` stdout of `DESCRIBE AGENT` and keeps the first row.
pub fn parse_describe_output(name: &str, stdout: &str) -> Result<AgentDescription, DescribeError> {
    let rows: Vec<AgentDescription> =
        serde_json::from_str(stdout).map_err(|error| DescribeError::InvalidJson {
            source_name: format!("DESCRIBE AGENT {name} output"),
            error,
        })?;
    rows.into_iter()
        .next()
        .ok_or_else(|| DescribeError::NoRows(name.to_owned()))
}

pub async fn describe_agent<R: SnowRunner>(
    cli: &SnowCli<R>,
    name: &str,
) -> Result<AgentDescription, DescribeError> {
    let output = cli.describe_agent(name).await?;
    parse_describe_output(name, &output.stdout)
}

/// Records that were read plus the ones that could not be, each failure
/// keyed by agent name or export row.
#[derive(Debug, Default)]
pub struct RecordReport {
    pub records: Vec<AgentDescription>,
    pub failures: Vec<(String, DescribeError)>,
}

/// Describes every agent in turn; a failing name is recorded and skipped.
pub async fn fetch_descriptions<R: SnowRunner>(cli: &SnowCli<R>, names: &[String]) -> RecordReport {
    let mut report = RecordReport::default();
    for name in names {
        print!("  Describing {name}... ");
        let _ = std::io::stdout().flush();
        match describe_agent(cli, name).await {
            Ok(record) => {
                println!("✓");
                report.records.push(record);
            }
            Err(error) => {
                println!("✗");
                eprintln!("    Error: {error}");
                if let DescribeError::Snow(SnowError::Failed { stderr, .. }) = &error {
                    if !stderr.trim().is_empty() {
                        eprintln!("    Details: {}", stderr.trim());
                    }
                }
                report.failures.push((name.clone(), error));
            }
        }
    }
    report
}
