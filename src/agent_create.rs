//! Create or replace agents from JSON configuration files.
//!
//! Each file carries `base_url`, `database`, `schema` and
//! `agent_create_post_body`; the first three can be overridden for the
//! whole batch. Files are processed one by one and a failure never stops
//! the batch.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use snowflake_rest::{AgentResponse, AgentTarget, AgentsConnector};

use crate::report::{BatchSummary, ERROR_PREVIEW_CHARS, ItemResult, RULE_WIDTH, rule, truncate};

/// Command-line values that win over the file's own.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    /// Replaces `name` inside the post body.
    pub name: Option<String>,
}

impl Overrides {
    fn applied(&self) -> Vec<String> {
        [
            ("Base URL", &self.base_url),
            ("Database", &self.database),
            ("Schema", &self.schema),
            ("Agent name", &self.name),
        ]
        .into_iter()
        .filter_map(|(label, value)| non_empty(value.as_deref()).map(|v| format!("{label}: {v}")))
        .collect()
    }
    /// Any of base URL, database or schema set.
    pub fn redirects(&self) -> bool {
        [&self.base_url, &self.database, &self.schema]
            .into_iter()
            .any(|value| non_empty(value.as_deref()).is_some())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Raw contents of an agent configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentFileConfig {
    pub base_url: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub agent_create_post_body: Option<Value>,
}

/// Configuration with every required key present.
#[derive(Debug, Clone)]
pub struct ResolvedAgentConfig {
    pub target: AgentTarget,
    pub body: Value,
}

impl ResolvedAgentConfig {
    pub fn agent_name(&self) -> Option<&str> {
        self.body.get("name").and_then(Value::as_str)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("JSON file not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}—{error}", .path.display())]
    Read {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("Invalid JSON in file {}: {error}", .path.display())]
    InvalidJson {
        path: PathBuf,
        error: serde_json::Error,
    },
    #[error("Missing '{key}' in {}", .path.display())]
    MissingKey { key: &'static str, path: PathBuf },
}

pub fn load_config(path: &Path) -> Result<AgentFileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|error| match error.kind() {
        std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Read {
            path: path.to_path_buf(),
            error,
        },
    })?;
    serde_json::from_str(&content).map_err(|error| ConfigError::InvalidJson {
        path: path.to_path_buf(),
        error,
    })
}

impl AgentFileConfig {
    /// Applies `overrides` and checks required keys in file order:
    /// `base_url`, `database`, `schema`, `agent_create_post_body`.
    pub fn resolve(
        self,
        path: &Path,
        overrides: &Overrides,
    ) -> Result<ResolvedAgentConfig, ConfigError> {
        let missing = |key| ConfigError::MissingKey {
            key,
            path: path.to_path_buf(),
        };
        let pick = |over: &Option<String>, own: Option<String>| {
            non_empty(over.as_deref())
                .map(str::to_owned)
                .or_else(|| own.filter(|value| !value.is_empty()))
        };

        let base_url = pick(&overrides.base_url, self.base_url).ok_or_else(|| missing("base_url"))?;
        let database = pick(&overrides.database, self.database).ok_or_else(|| missing("database"))?;
        let schema = pick(&overrides.schema, self.schema).ok_or_else(|| missing("schema"))?;
        let mut body = self
            .agent_create_post_body
            .filter(is_present)
            .ok_or_else(|| missing("agent_create_post_body"))?;

        if let (Some(name), Some(fields)) = (non_empty(overrides.name.as_deref()), body.as_object_mut()) {
            fields.insert("name".into(), Value::String(name.to_owned()));
        }

        Ok(ResolvedAgentConfig {
            target: AgentTarget::new(base_url, database, schema),
            body,
        })
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(fields) => !fields.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(text) => !text.is_empty(),
        _ => true,
    }
}

/// Sorted `*.json` files directly inside `dir`; empty when `dir` is missing
/// or not a directory.
pub fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// Which files to process.
#[derive(Debug, Clone)]
pub enum Source {
    File(PathBuf),
    Directory(PathBuf),
}

#[derive(thiserror::Error, Debug)]
pub enum CreateAgentError {
    #[error("JSON file not found at {}", .0.display())]
    JsonNotFound(PathBuf),
    #[error("No JSON files found in {}\nHint: Create the directory or specify a file with --json", .0.display())]
    NoJsonFiles(PathBuf),
}

impl Source {
    pub fn files(&self) -> Result<Vec<PathBuf>, CreateAgentError> {
        match self {
            Source::File(path) if path.exists() => Ok(vec![path.clone()]),
            Source::File(path) => Err(CreateAgentError::JsonNotFound(path.clone())),
            Source::Directory(dir) => {
                let files = find_json_files(dir);
                if files.is_empty() {
                    return Err(CreateAgentError::NoJsonFiles(dir.clone()));
                }
                Ok(files)
            }
        }
    }
}

/// Full outcome of one file, including the response when there was one.
#[derive(Debug)]
pub struct FileOutcome {
    pub success: bool,
    pub result: ItemResult,
    pub response: Option<AgentResponse>,
}

/// Loads, resolves and sends one configuration file.
pub async fn process_file(
    connector: &AgentsConnector,
    path: &Path,
    overrides: &Overrides,
) -> FileOutcome {
    let mut result = ItemResult::new(path);

    let resolved = match load_config(path).and_then(|config| config.resolve(path, overrides)) {
        Ok(resolved) => resolved,
        Err(error) => {
            tracing::debug!(file = %path.display(), "configuration rejected: {error}");
            result.error = Some(error.to_string());
            return FileOutcome {
                success: false,
                result,
                response: None,
            };
        }
    };
    result.agent_name = Some(resolved.agent_name().unwrap_or("Unknown").to_owned());
    result.url = Some(connector.url(&resolved.target));

    match connector
        .create_or_replace(&resolved.target, &resolved.body)
        .await
    {
        Ok(response) => {
            let success = response.is_success();
            result.status = Some(response.status.as_u16());
            if !success {
                result.error = Some(response.body.clone());
            }
            FileOutcome {
                success,
                result,
                response: Some(response),
            }
        }
        Err(error) => {
            result.error = Some(error.to_string());
            FileOutcome {
                success: false,
                result,
                response: None,
            }
        }
    }
}

/// Processes every file from `source` in order and prints progress plus the
/// final summary.
pub async fn run(
    connector: &AgentsConnector,
    source: &Source,
    overrides: &Overrides,
    verbose: bool,
) -> Result<BatchSummary, CreateAgentError> {
    let files = source.files()?;
    match source {
        Source::File(path) => println!("Processing single file: {}", path.display()),
        Source::Directory(dir) => {
            println!("Found {} JSON file(s) in {}", files.len(), dir.display())
        }
    }
    let applied = overrides.applied();
    if !applied.is_empty() {
        println!("Overrides applied: {}", applied.join(", "));
    }
    println!("{}", rule('=', RULE_WIDTH));

    let mut summary = BatchSummary::default();
    for path in &files {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        println!("\nProcessing: {name}");
        println!("{}", rule('-', RULE_WIDTH));

        let outcome = process_file(connector, path, overrides).await;
        print_outcome(&outcome, verbose || overrides.redirects(), verbose);
        summary.record(outcome.success, outcome.result);
    }

    summary.print();
    Ok(summary)
}

fn print_outcome(outcome: &FileOutcome, show_url: bool, verbose: bool) {
    let result = &outcome.result;
    if outcome.success {
        println!(
            "✓ SUCCESS - Agent '{}' created/updated (Status: {})",
            result.agent_label(),
            result.status_label()
        );
        if show_url {
            if let Some(url) = &result.url {
                println!("  URL: {url}");
            }
        }
    } else {
        println!("✗ FAILED - Status: {}", result.status_label());
        if let Some(error) = result.error.as_deref().filter(|error| !error.is_empty()) {
            println!("  Error: {}", truncate(error, ERROR_PREVIEW_CHARS));
        }
    }

    if let (true, Some(response)) = (verbose, &outcome.response) {
        println!("\nResponse Headers:");
        for (name, value) in &response.headers {
            println!("  {name}: {}", value.to_str().unwrap_or("<binary>"));
        }
        println!("\nDetailed Response:");
        match response.json().and_then(|body| serde_json::to_string_pretty(&body).ok()) {
            Some(pretty) => println!("{pretty}"),
            None => println!("{}", response.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(value: Value) -> AgentFileConfig {
        serde_json::from_value(value).unwrap()
    }

    fn full() -> Value {
        json!({
            "base_url": "https://acme.snowflakecomputing.com",
            "database": "INS_CO",
            "schema": "LOSS_CLAIMS",
            "agent_create_post_body": { "name": "CLAIMS_AUDIT_AGENT", "comment": "audits" }
        })
    }

    #[test]
    fn resolve_uses_file_values() {
        let resolved = config(full())
            .resolve(Path::new("claims.json"), &Overrides::default())
            .unwrap();
        assert_eq!(resolved.target.database, "INS_CO");
        assert_eq!(resolved.target.schema, "LOSS_CLAIMS");
        assert_eq!(resolved.agent_name(), Some("CLAIMS_AUDIT_AGENT"));
    }

    #[test]
    fn overrides_win() {
        let overrides = Overrides {
            base_url: Some("other.snowflakecomputing.com".into()),
            database: Some("DEV_DB".into()),
            schema: None,
            name: Some("RENAMED".into()),
        };
        let resolved = config(full())
            .resolve(Path::new("claims.json"), &overrides)
            .unwrap();
        assert_eq!(resolved.target.base_url, "other.snowflakecomputing.com");
        assert_eq!(resolved.target.database, "DEV_DB");
        assert_eq!(resolved.target.schema, "LOSS_CLAIMS");
        assert_eq!(resolved.agent_name(), Some("RENAMED"));
    }

    #[test]
    fn override_fills_missing_key() {
        let mut value = full();
        value.as_object_mut().unwrap().remove("schema");
        let overrides = Overrides {
            schema: Some("PUBLIC".into()),
            ..Default::default()
        };
        let resolved = config(value)
            .resolve(Path::new("claims.json"), &overrides)
            .unwrap();
        assert_eq!(resolved.target.schema, "PUBLIC");
    }

    #[test]
    fn missing_keys_are_reported_in_order() {
        let error = config(json!({ "schema": "S" }))
            .resolve(Path::new("json/a.json"), &Overrides::default())
            .unwrap_err();
        assert_eq!(error.to_string(), "Missing 'base_url' in json/a.json");

        let error = config(json!({ "base_url": "h", "database": "", "schema": "S" }))
            .resolve(Path::new("a.json"), &Overrides::default())
            .unwrap_err();
        assert!(matches!(error, ConfigError::MissingKey { key: "database", .. }));

        let error = config(json!({
            "base_url": "h", "database": "D", "schema": "S", "agent_create_post_body": {}
        }))
        .resolve(Path::new("a.json"), &Overrides::default())
        .unwrap_err();
        assert!(matches!(
            error,
            ConfigError::MissingKey { key: "agent_create_post_body", .. }
        ));
    }

    #[test]
    fn load_config_distinguishes_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(load_config(&missing), Err(ConfigError::NotFound(_))));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let error = load_config(&broken).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidJson { .. }));
        assert!(error.to_string().starts_with("Invalid JSON in file"));
    }

    #[test]
    fn find_json_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = find_json_files(dir.path());
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.json", "b.json"]);
        assert!(find_json_files(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn empty_directory_is_an_error_with_hint() {
        let dir = TempDir::new().unwrap();
        let error = Source::Directory(dir.path().to_path_buf())
            .files()
            .unwrap_err();
        assert!(matches!(error, CreateAgentError::NoJsonFiles(_)));
        assert!(error.to_string().contains("Hint: Create the directory"));
    }

    #[test]
    fn overrides_summary() {
        let overrides = Overrides {
            database: Some("DB".into()),
            schema: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(overrides.applied(), ["Database: DB"]);
        assert!(overrides.redirects());
        assert!(!Overrides::default().redirects());
    }
}
