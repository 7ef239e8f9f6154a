//! Command line surface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Ask questions about your tables in plain language and get SQL back
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "sqlchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: sqlchat.toml)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(short = 'p', long)]
        port: Option<u16>,
    },

    /// Generate and run SQL for one question
    Ask {
        question: String,
        /// Only print the generated SQL
        #[arg(long = "sql-only")]
        sql_only: bool,
    },

    /// Load a CSV or XLSX file into a new table
    Upload(UploadArgs),

    /// Infer a schema and write its DDL without touching the database
    Ddl(UploadArgs),

    /// Manage secrets stored in the OS keychain
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct UploadArgs {
    pub file: PathBuf,

    /// Column to mark as PRIMARY KEY
    #[arg(short = 'k', long = "primary-key")]
    pub primary_key: Option<String>,

    /// Table name (default: derived from the file name)
    #[arg(short = 't', long = "table")]
    pub table: Option<String>,

    /// Text column to create as TEXT instead of VARCHAR (repeatable)
    #[arg(long = "unbounded-text")]
    pub unbounded_text: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SecretAction {
    /// Store a secret read from stdin
    Set { name: String },
    /// Remove a stored secret
    Delete { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload_with_options() {
        let cli = Cli::try_parse_from([
            "sqlchat",
            "upload",
            "people.csv",
            "--primary-key",
            "id",
            "--unbounded-text",
            "bio",
            "--unbounded-text",
            "notes",
        ])
        .unwrap();

        match cli.command {
            Command::Upload(args) => {
                assert_eq!(args.file, PathBuf::from("people.csv"));
                assert_eq!(args.primary_key.as_deref(), Some("id"));
                assert_eq!(args.table, None);
                assert_eq!(args.unbounded_text, vec!["bio", "notes"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["sqlchat", "ask", "how many rows?", "-c", "custom.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(
            cli.command,
            Command::Ask {
                question: "how many rows?".to_string(),
                sql_only: false
            }
        );
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["sqlchat", "serve", "--port", "8080"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Serve {
                host: None,
                port: Some(8080)
            }
        );
    }

    #[test]
    fn test_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["sqlchat"]).is_err());
    }
}
