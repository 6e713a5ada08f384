//! Per-item results and batch summaries.

use std::path::PathBuf;

pub const RULE_WIDTH: usize = 80;
/// Error bodies longer than this are cut when printed.
pub const ERROR_PREVIEW_CHARS: usize = 200;

pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat_n(ch, width).collect()
}

/// Keeps the first `limit` characters and marks the cut with `...`.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

/// Outcome of one input file.
#[derive(Debug, Clone, Default)]
pub struct ItemResult {
    pub file: String,
    pub path: PathBuf,
    /// HTTP status, absent when the request never went out.
    pub status: Option<u16>,
    pub agent_name: Option<String>,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl ItemResult {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        ItemResult {
            file: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path,
            ..Default::default()
        }
    }
    pub fn agent_label(&self) -> &str {
        self.agent_name.as_deref().unwrap_or("Unknown")
    }
    pub fn status_label(&self) -> String {
        self.status
            .map(|status| status.to_string())
            .unwrap_or_else(|| "N/A".into())
    }
    /// Line for the failed-agents list, if this item belongs there.
    pub fn failure_line(&self) -> Option<String> {
        match self.status {
            Some(200 | 201) => None,
            Some(_) => Some(format!("  - {} (Agent: {})", self.file, self.agent_label())),
            None if self.error.is_some() => {
                Some(format!("  - {} (Error: Configuration issue)", self.file))
            }
            None => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ItemResult>,
}

impl BatchSummary {
    pub fn record(&mut self, success: bool, result: ItemResult) {
        if success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }
    pub fn total(&self) -> usize {
        self.results.len()
    }
    pub fn exit_code(&self) -> u8 {
        u8::from(self.failed > 0)
    }
    pub fn print(&self) {
        println!("\n{}", rule('=', RULE_WIDTH));
        println!("SUMMARY");
        println!("{}", rule('=', RULE_WIDTH));
        println!("Total files processed: {}", self.total());
        println!("Successful: {}", self.successful);
        println!("Failed: {}", self.failed);

        if self.failed > 0 {
            println!("\nFailed agents:");
            for line in self.results.iter().filter_map(ItemResult::failure_line) {
                println!("{line}");
            }
        }
    }
}
