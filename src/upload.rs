//! Uploads every file of a directory to an internal stage with `PUT`.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::report::rule;
use crate::snow::{PutOptions, SnowCli, SnowError, SnowRunner, stage_ref};

#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("Upload directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to list {}—{error}", .path.display())]
    List {
        path: PathBuf,
        error: std::io::Error,
    },
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_upload_files(dir: &Path) -> Result<Vec<PathBuf>, UploadError> {
    if !dir.exists() {
        return Err(UploadError::DirectoryNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(UploadError::NotADirectory(dir.to_path_buf()));
    }
    let list_error = |error| UploadError::List {
        path: dir.to_path_buf(),
        error,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_error)? {
        let path = entry.map_err(list_error)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    if files.is_empty() {
        tracing::warn!("No files found in {}", dir.display());
    }
    Ok(files)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl UploadSummary {
    pub fn total(&self) -> usize {
        self.successful + self.failed
    }
    pub fn exit_code(&self) -> u8 {
        u8::from(self.failed > 0)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One `PUT`; failure comes back as the message for the summary.
pub async fn upload_file<R: SnowRunner>(
    cli: &SnowCli<R>,
    path: &Path,
    stage: &str,
    options: PutOptions,
) -> Result<(), String> {
    let name = file_name(path);
    print!("  Uploading: {name}... ");
    let _ = std::io::stdout().flush();

    match cli.put_file(path, stage, options).await {
        Ok(output) => {
            println!("✓");
            tracing::debug!(file = %name, "{}", output.stdout.trim());
            Ok(())
        }
        Err(error) => {
            println!("✗");
            let message = format!("Failed to upload {name}");
            eprintln!("    Error: {message}");
            match &error {
                SnowError::Failed { stderr, .. } if !stderr.trim().is_empty() => {
                    eprintln!("    Details: {}", stderr.trim())
                }
                SnowError::Failed { .. } => {}
                other => eprintln!("    Details: {other}"),
            }
            Err(message)
        }
    }
}

/// Uploads each file in name order; a failed file does not stop the rest.
pub async fn upload_directory<R: SnowRunner>(
    cli: &SnowCli<R>,
    dir: &Path,
    stage: &str,
    options: PutOptions,
) -> Result<UploadSummary, UploadError> {
    let files = list_upload_files(dir)?;
    let mut summary = UploadSummary::default();
    if files.is_empty() {
        return Ok(summary);
    }

    println!("\n{}", rule('=', 60));
    println!("Uploading {} file(s) to stage: {}", files.len(), stage_ref(stage));
    println!("Connection: {}", cli.connection());
    println!("Source directory: {}", dir.display());
    println!("{}\n", rule('=', 60));

    for path in &files {
        match upload_file(cli, path, stage, options).await {
            Ok(()) => summary.successful += 1,
            Err(message) => {
                summary.failed += 1;
                summary.errors.push(message);
            }
        }
    }

    let total = summary.total();
    println!("\n{}", rule('=', 60));
    println!("Upload Summary:");
    println!("  Successful: {}/{total}", summary.successful);
    println!("  Failed:     {}/{total}", summary.failed);
    println!("{}", rule('=', 60));
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lists_regular_files_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["c.jpg", "a.pdf", "b.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/inner.txt"), b"x").unwrap();

        let files = list_upload_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|path| file_name(path)).collect();
        assert_eq!(names, ["a.pdf", "b.txt", "c.jpg"]);
    }

    #[test]
    fn missing_and_non_directory_paths() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(matches!(
            list_upload_files(&dir.path().join("absent")),
            Err(UploadError::DirectoryNotFound(_))
        ));
        assert!(matches!(
            list_upload_files(&file),
            Err(UploadError::NotADirectory(_))
        ));
    }

    #[test]
    fn empty_directory_is_empty_list() {
        let dir = TempDir::new().unwrap();
        assert!(list_upload_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn summary_exit_code() {
        let summary = UploadSummary {
            successful: 2,
            failed: 1,
            errors: vec!["Failed to upload b.txt".into()],
        };
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(UploadSummary::default().exit_code(), 0);
    }
}
