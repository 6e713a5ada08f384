//! Renders `CREATE OR REPLACE AGENT` DDL from agent description records.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::describe::AgentDescription;

/// Doubles single quotes for a SQL string literal.
pub fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

pub fn qualified_name(record: &AgentDescription) -> String {
    format!(
        "{}.{}.{}",
        record.database_name.trim(),
        record.schema_name.trim(),
        record.name.trim()
    )
}

/// Spec JSON pretty-printed with two-space indentation; text that is not
/// JSON is kept verbatim.
fn spec_block(spec: Option<&str>) -> String {
    match spec.filter(|spec| !spec.is_empty()) {
        Some(spec) => serde_json::from_str::<Value>(spec)
            .ok()
            .and_then(|value| serde_json::to_string_pretty(&value).ok())
            .unwrap_or_else(|| spec.to_owned()),
        None => String::new(),
    }
}

/// Profile JSON compacted and quote-escaped.
fn profile_literal(profile: &str) -> String {
    let compact = serde_json::from_str::<Value>(profile)
        .map(|value| value.to_string())
        .unwrap_or_else(|_| profile.to_owned());
    escape_literal(&compact)
}

pub fn render_agent_statement(record: &AgentDescription) -> String {
    let mut lines = vec![format!("CREATE OR REPLACE AGENT {}", qualified_name(record))];
    if let Some(comment) = record.comment.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("  COMMENT = '{}'", escape_literal(comment)));
    }
    if let Some(profile) = record.profile.as_deref().filter(|p| !p.is_empty()) {
        lines.push(format!("  PROFILE = '{}'", profile_literal(profile)));
    }
    lines.push("  FROM SPECIFICATION".into());
    lines.push("  $$".into());
    lines.push(spec_block(record.agent_spec.as_deref()));
    lines.push("  $$;".into());
    lines.join("\n")
}

/// Adds the agent to a Snowflake Intelligence object. Safe to re-run: the
/// error raised for an agent that is already registered is swallowed.
pub fn render_registration_statement(record: &AgentDescription, si_object: &str) -> String {
    format!(
        "EXECUTE IMMEDIATE $$\n\
         BEGIN\n\
         \x20 ALTER SNOWFLAKE INTELLIGENCE {si_object} ADD AGENT {agent};\n\
         \x20 RETURN 'added {agent}';\n\
         EXCEPTION\n\
         \x20 WHEN OTHER THEN\n\
         \x20   RETURN 'skipped {agent}: ' || SQLERRM;\n\
         END;\n\
         $$;",
        agent = qualified_name(record),
    )
}

/// File stem for a record: `DB.SCHEMA.NAME` with anything outside
/// `[A-Za-z0-9_.-]` replaced by `_`.
pub fn file_stem(record: &AgentDescription) -> String {
    qualified_name(record)
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// Hands out file stems so that no two records of a run share a file.
///
/// A repeated stem gets `-2`, `-3`, ... appended. Names are compared
/// case-insensitively, and a stem is only taken when its `-si.sql`
/// companion is also free.
#[derive(Debug, Default)]
struct StemAllocator {
    taken: HashSet<String>,
}

impl StemAllocator {
    fn claim(&mut self, base: &str, with_registration: bool) -> String {
        let mut stem = base.to_owned();
        let mut suffix = 2;
        loop {
            let mut names = vec![format!("{stem}.sql").to_lowercase()];
            if with_registration {
                names.push(format!("{stem}-si.sql").to_lowercase());
            }
            if names.iter().all(|name| !self.taken.contains(name)) {
                self.taken.extend(names);
                return stem;
            }
            stem = format!("{base}-{suffix}");
            suffix += 1;
        }
    }
}

/// Where generated statements go.
#[derive(Debug, Clone)]
pub enum Output {
    /// `<stem>.sql` per record, plus `<stem>-si.sql` when registering.
    PerRecord(PathBuf),
    /// Every statement in one file, separated by a blank line.
    Combined(PathBuf),
}

#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error("failed to write {}—{error}", .path.display())]
    Write {
        path: PathBuf,
        error: std::io::Error,
    },
}

fn write_file(path: &Path, content: &str) -> Result<(), GenerateError> {
    let write_error = |error| GenerateError::Write {
        path: path.to_path_buf(),
        error,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, content).map_err(write_error)
}

/// Files written and how many statements they hold.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Generated {
    pub files: Vec<PathBuf>,
    pub statements: usize,
}

/// Writes the agent statement, and the registration statement when
/// `si_object` is set, for every record. The two files of a record are
/// written independently. Records whose [file_stem] collides with an
/// earlier one get a numbered stem instead of overwriting it.
pub fn write_per_record(
    records: &[AgentDescription],
    out_dir: &Path,
    si_object: Option<&str>,
) -> Result<Generated, GenerateError> {
    let mut generated = Generated::default();
    let mut stems = StemAllocator::default();
    for record in records {
        let base = file_stem(record);
        let stem = stems.claim(&base, si_object.is_some());
        if stem != base {
            tracing::warn!(agent = %qualified_name(record), file = %stem, "file name already used, renamed");
        }
        let path = out_dir.join(format!("{stem}.sql"));
        write_file(&path, &format!("{}\n", render_agent_statement(record)))?;
        tracing::debug!(agent = %qualified_name(record), file = %path.display(), "wrote agent statement");
        generated.files.push(path);
        generated.statements += 1;

        if let Some(si_object) = si_object {
            let path = out_dir.join(format!("{stem}-si.sql"));
            write_file(
                &path,
                &format!("{}\n", render_registration_statement(record, si_object)),
            )?;
            generated.files.push(path);
            generated.statements += 1;
        }
    }
    Ok(generated)
}

pub fn write_combined(
    records: &[AgentDescription],
    path: &Path,
    si_object: Option<&str>,
) -> Result<Generated, GenerateError> {
    let mut statements: Vec<String> = records.iter().map(render_agent_statement).collect();
    if let Some(si_object) = si_object {
        statements.extend(
            records
                .iter()
                .map(|record| render_registration_statement(record, si_object)),
        );
    }
    write_file(path, &format!("{}\n", statements.join("\n\n")))?;
    Ok(Generated {
        files: vec![path.to_path_buf()],
        statements: statements.len(),
    })
}

pub fn generate(
    records: &[AgentDescription],
    output: &Output,
    si_object: Option<&str>,
) -> Result<Generated, GenerateError> {
    match output {
        Output::PerRecord(dir) => write_per_record(records, dir, si_object),
        Output::Combined(path) => write_combined(records, path, si_object),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> AgentDescription {
        AgentDescription {
            database_name: "DB".into(),
            schema_name: "PUBLIC".into(),
            name: "A".into(),
            comment: Some("it's ok".into()),
            profile: None,
            agent_spec: Some("{\"x\":1}".into()),
        }
    }

    #[test]
    fn renders_create_statement() {
        let statement = render_agent_statement(&record());
        assert_eq!(
            statement,
            "CREATE OR REPLACE AGENT DB.PUBLIC.A\n  COMMENT = 'it''s ok'\n  FROM SPECIFICATION\n  $$\n{\n  \"x\": 1\n}\n  $$;"
        );
    }

    #[test]
    fn profile_is_compacted_and_escaped() {
        let mut record = record();
        record.profile = Some("{ \"display_name\": \"Claims' Auditor\", \"color\": \"blue\" }".into());
        let statement = render_agent_statement(&record);
        assert!(statement.contains(
            "  PROFILE = '{\"display_name\":\"Claims'' Auditor\",\"color\":\"blue\"}'"
        ));
    }

    #[test]
    fn spec_keeps_key_order_and_unicode() {
        let mut record = record();
        record.agent_spec = Some("{\"zeta\":\"é\",\"alpha\":[1,2]}".into());
        let statement = render_agent_statement(&record);
        assert!(statement.contains("{\n  \"zeta\": \"é\",\n  \"alpha\": [\n    1,\n    2\n  ]\n}"));
    }

    #[test]
    fn invalid_json_is_kept_verbatim() {
        let mut record = record();
        record.profile = Some("not 'json'".into());
        record.agent_spec = Some("models: auto".into());
        let statement = render_agent_statement(&record);
        assert!(statement.contains("  PROFILE = 'not ''json'''"));
        assert!(statement.contains("  $$\nmodels: auto\n  $$;"));
    }

    #[test]
    fn empty_comment_and_missing_spec() {
        let mut record = record();
        record.comment = Some(String::new());
        record.agent_spec = None;
        assert_eq!(
            render_agent_statement(&record),
            "CREATE OR REPLACE AGENT DB.PUBLIC.A\n  FROM SPECIFICATION\n  $$\n\n  $$;"
        );
    }

    #[test]
    fn identifiers_are_trimmed() {
        let mut record = record();
        record.database_name = " DB ".into();
        record.name = "A\n".into();
        assert_eq!(qualified_name(&record), "DB.PUBLIC.A");
    }

    #[test]
    fn registration_swallows_errors() {
        let statement = render_registration_statement(&record(), "SNOWFLAKE_INTELLIGENCE_OBJECT_DEFAULT");
        assert!(statement.starts_with("EXECUTE IMMEDIATE $$\nBEGIN\n"));
        assert!(statement.contains(
            "  ALTER SNOWFLAKE INTELLIGENCE SNOWFLAKE_INTELLIGENCE_OBJECT_DEFAULT ADD AGENT DB.PUBLIC.A;\n"
        ));
        assert!(statement.contains("EXCEPTION\n  WHEN OTHER THEN\n"));
        assert!(statement.ends_with("END;\n$$;"));
    }

    #[test]
    fn file_stem_is_filesystem_safe() {
        let mut record = record();
        record.name = "\"My Agent/2\"".into();
        assert_eq!(file_stem(&record), "DB.PUBLIC._My_Agent_2_");
    }

    #[test]
    fn per_record_writes_one_or_two_files() {
        let dir = TempDir::new().unwrap();
        let generated = write_per_record(&[record()], dir.path(), None).unwrap();
        assert_eq!(generated.files, [dir.path().join("DB.PUBLIC.A.sql")]);

        let generated = write_per_record(&[record()], dir.path(), Some("SI")).unwrap();
        assert_eq!(generated.statements, 2);
        let registration = std::fs::read_to_string(dir.path().join("DB.PUBLIC.A-si.sql")).unwrap();
        assert!(registration.contains("ADD AGENT DB.PUBLIC.A;"));
        let create = std::fs::read_to_string(dir.path().join("DB.PUBLIC.A.sql")).unwrap();
        assert!(create.starts_with("CREATE OR REPLACE AGENT DB.PUBLIC.A\n"));
        assert!(create.ends_with("  $$;\n"));
    }

    #[test]
    fn colliding_stems_get_numbered_files() {
        let dir = TempDir::new().unwrap();
        let named = |name: &str| {
            let mut record = record();
            record.name = name.into();
            record
        };
        let records = [named("My Agent"), named("My_Agent"), named("my_agent")];

        let generated = write_per_record(&records, dir.path(), Some("SI")).unwrap();
        let files: Vec<_> = generated
            .files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            files,
            [
                "DB.PUBLIC.My_Agent.sql",
                "DB.PUBLIC.My_Agent-si.sql",
                "DB.PUBLIC.My_Agent-2.sql",
                "DB.PUBLIC.My_Agent-2-si.sql",
                "DB.PUBLIC.my_agent-3.sql",
                "DB.PUBLIC.my_agent-3-si.sql",
            ]
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 6);
        let first = std::fs::read_to_string(dir.path().join("DB.PUBLIC.My_Agent.sql")).unwrap();
        assert!(first.starts_with("CREATE OR REPLACE AGENT DB.PUBLIC.My Agent\n"));
        let second = std::fs::read_to_string(dir.path().join("DB.PUBLIC.My_Agent-2.sql")).unwrap();
        assert!(second.starts_with("CREATE OR REPLACE AGENT DB.PUBLIC.My_Agent\n"));
    }

    #[test]
    fn stem_is_not_reused_by_a_registration_file() {
        let mut stems = StemAllocator::default();
        assert_eq!(stems.claim("DB.S.X", true), "DB.S.X");
        // `DB.S.X-si.sql` already holds the registration of `X`.
        assert_eq!(stems.claim("DB.S.X-si", false), "DB.S.X-si-2");
        assert_eq!(stems.claim("DB.S.Y", false), "DB.S.Y");
    }

    #[test]
    fn large_numbers_are_rendered_exactly() {
        let mut record = record();
        record.agent_spec = Some("{\"budget\":123456789012345678901234,\"ratio\":0.1}".into());
        record.profile = Some("{\"id\": 98765432109876543210987}".into());
        let statement = render_agent_statement(&record);
        assert!(statement.contains("  \"budget\": 123456789012345678901234,\n"));
        assert!(statement.contains("  \"ratio\": 0.1\n"));
        assert!(statement.contains("  PROFILE = '{\"id\":98765432109876543210987}'"));
    }

    #[test]
    fn combined_joins_with_blank_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agents.sql");
        let mut second = record();
        second.name = "B".into();
        let generated = write_combined(&[record(), second], &path, None).unwrap();
        assert_eq!(generated.statements, 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("  $$;\n\nCREATE OR REPLACE AGENT DB.PUBLIC.B\n"));
        assert!(content.ends_with("  $$;\n"));
    }
}
