//! Runs numbered SQL files (`NNN-name.sql`) through a single `snow sql`
//! invocation, in prefix order.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::report::rule;
use crate::snow::{INSTALL_HINT, SnowCli, SnowError, SnowOutput, SnowRunner};

// ASCII digits only; `\d` would also accept other Unicode digits.
static NUMBERED_SQL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+-.*\.sql$").expect("numbered file pattern"));
static NUMERIC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)-").expect("numeric prefix pattern"));

/// Digits of the numeric prefix without leading zeros, so prefixes of any
/// length compare by value: `001-schema.sql` -> `Some("1")`,
/// `000-init.sql` -> `Some("0")`.
pub fn numeric_prefix(file_name: &str) -> Option<&str> {
    let digits = NUMERIC_PREFIX.captures(file_name)?.get(1)?.as_str();
    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

/// Orders zero-trimmed digit strings numerically.
fn prefix_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[derive(thiserror::Error, Debug)]
pub enum SqlRunError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to list {}—{error}", .path.display())]
    List {
        path: PathBuf,
        error: std::io::Error,
    },
}

/// `.sql` files of a directory, split by naming convention.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SqlFiles {
    /// Ascending by numeric prefix; equal prefixes keep directory order.
    pub matching: Vec<PathBuf>,
    pub non_matching: Vec<PathBuf>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn sorted_sql_files(dir: &Path) -> Result<SqlFiles, SqlRunError> {
    if !dir.exists() {
        return Err(SqlRunError::DirectoryNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(SqlRunError::NotADirectory(dir.to_path_buf()));
    }
    let list_error = |error| SqlRunError::List {
        path: dir.to_path_buf(),
        error,
    };

    let mut numbered: Vec<(String, PathBuf)> = Vec::new();
    let mut files = SqlFiles::default();
    for entry in std::fs::read_dir(dir).map_err(list_error)? {
        let path = entry.map_err(list_error)?.path();
        let is_sql = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
        if !path.is_file() || !is_sql {
            continue;
        }
        let name = file_name(&path);
        match numeric_prefix(&name).filter(|_| NUMBERED_SQL.is_match(&name)) {
            Some(prefix) => numbered.push((prefix.to_owned(), path)),
            None => files.non_matching.push(path),
        }
    }

    numbered.sort_by(|(a, _), (b, _)| prefix_order(a, b));
    files.matching = numbered.into_iter().map(|(_, path)| path).collect();
    Ok(files)
}

/// Prints the files that were skipped for not matching `NNN-*.sql`.
pub fn warn_non_matching(files: &[PathBuf]) {
    if files.is_empty() {
        return;
    }
    println!(
        "\n⚠️  WARNING: Found {} SQL file(s) that don't match naming convention (NNN-*.sql):",
        files.len()
    );
    for path in files {
        println!("     - {} (not processed)", file_name(path));
    }
}

pub fn print_plan(files: &[PathBuf]) {
    println!("\nFound {} SQL file(s) with numeric prefix:", files.len());
    for (i, path) in files.iter().enumerate() {
        let name = file_name(path);
        let prefix = numeric_prefix(&name).unwrap_or("0");
        println!("  {}. [{prefix:0>3}] {name}", i + 1);
    }
}

/// Runs all `files` in one `snow sql` call. A failure anywhere fails the
/// whole batch.
pub async fn execute<R: SnowRunner>(
    cli: &SnowCli<R>,
    files: &[PathBuf],
) -> Result<SnowOutput, SnowError> {
    if files.is_empty() {
        println!("No SQL files to execute.");
        return Ok(SnowOutput::default());
    }

    println!("\n{}", rule('=', 60));
    println!("Executing {} SQL file(s) in order:", files.len());
    for (i, path) in files.iter().enumerate() {
        println!("  {}. {}", i + 1, file_name(path));
    }
    println!("{}", rule('=', 60));
    println!("Running command:");
    println!("  snow sql -c {} \\", cli.connection());
    for path in files {
        println!("    -f {} \\", path.display());
    }
    println!();

    match cli.run_files(files).await {
        Ok(output) => {
            if !output.stdout.is_empty() {
                println!("{}", output.stdout);
            }
            if !output.stderr.is_empty() {
                eprintln!("{}", output.stderr);
            }
            println!("\n{}", rule('=', 60));
            println!("✓ Successfully executed all {} SQL file(s)", files.len());
            println!("{}", rule('=', 60));
            Ok(output)
        }
        Err(error) => {
            report_failure(&error);
            Err(error)
        }
    }
}

fn report_failure(error: &SnowError) {
    let banner = rule('=', 60);
    match error {
        SnowError::Failed {
            code,
            stdout,
            stderr,
        } => {
            eprintln!("\n{banner}\n✗ Failed to execute SQL files\n{banner}");
            match code {
                Some(code) => eprintln!("Error code: {code}"),
                None => eprintln!("Error code: none (terminated by signal)"),
            }
            if !stdout.is_empty() {
                eprintln!("\nSTDOUT:\n{stdout}");
            }
            if !stderr.is_empty() {
                eprintln!("\nSTDERR:\n{stderr}");
            }
        }
        SnowError::NotInstalled { program } => {
            eprintln!("\n{banner}");
            eprintln!("ERROR: '{program}' command not found.");
            eprintln!("Please ensure Snowflake CLI is installed.");
            eprintln!("\nInstall with: {INSTALL_HINT}");
            eprintln!("{banner}");
        }
        SnowError::Spawn(error) => {
            eprintln!("\n{banner}\n✗ Failed to start snow: {error}\n{banner}");
        }
    }
}
