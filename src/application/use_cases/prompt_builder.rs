use crate::domain::error::Result;
use crate::infrastructure::storage::read_optional_text;
use std::path::{Path, PathBuf};

pub const SQL_SYSTEM_PROMPT: &str =
    "You are an SQL expert. Generate SQL queries based on user instructions.";

/// Builds the text-to-SQL prompt from a schema file, an examples file and the question.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    schema_file: PathBuf,
    examples_file: PathBuf,
}

impl PromptBuilder {
    pub fn new(schema_file: impl Into<PathBuf>, examples_file: impl Into<PathBuf>) -> Self {
        Self {
            schema_file: schema_file.into(),
            examples_file: examples_file.into(),
        }
    }

    pub fn schema_file(&self) -> &Path {
        &self.schema_file
    }

    /// Missing files contribute empty sections rather than failing.
    pub fn build(&self, question: &str) -> Result<String> {
        let schema = read_optional_text(&self.schema_file)?;
        let examples = read_optional_text(&self.examples_file)?;
        Ok(compose(question, &schema, &examples))
    }
}

pub fn compose(question: &str, schema: &str, examples: &str) -> String {
    format!(
        "Database Schema:\n{}\n\n\
         Example Queries:\n{}\n\n\
         User Request: {}\n\n\
         Generate a SQL query to fulfill the user's request. \
         Only the sql query is needed, nothing else is required. \
         Do not insert any format specifiers or backticks.",
        schema.trim(),
        examples.trim(),
        question.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_orders_sections() {
        let prompt = compose(
            "how many voters?",
            "CREATE TABLE voters (id INT);",
            "SELECT COUNT(*) FROM voters;",
        );

        let schema_at = prompt.find("Database Schema:").unwrap();
        let examples_at = prompt.find("Example Queries:").unwrap();
        let request_at = prompt.find("User Request: how many voters?").unwrap();
        assert!(schema_at < examples_at && examples_at < request_at);
        assert!(prompt.contains("CREATE TABLE voters (id INT);"));
        assert!(prompt.ends_with("Do not insert any format specifiers or backticks."));
    }

    #[test]
    fn test_missing_files_give_empty_sections() {
        let dir = tempfile::tempdir().unwrap();
        let builder = PromptBuilder::new(dir.path().join("nope.sql"), dir.path().join("nada.sql"));

        let prompt = builder.build("list tables").unwrap();
        assert!(prompt.starts_with("Database Schema:\n\n\nExample Queries:\n\n\n"));
        assert!(prompt.contains("User Request: list tables"));
    }

    #[test]
    fn test_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.sql");
        let examples = dir.path().join("examples.sql");
        std::fs::write(&schema, "CREATE TABLE t (a INT);\n").unwrap();
        std::fs::write(&examples, "SELECT a FROM t;\n").unwrap();

        let prompt = PromptBuilder::new(&schema, &examples).build("q").unwrap();
        assert!(prompt.contains("Database Schema:\nCREATE TABLE t (a INT);\n\n"));
        assert!(prompt.contains("Example Queries:\nSELECT a FROM t;\n\n"));
    }
}
