use std::io::{self, BufRead, Write};
use std::path::Path;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::application::use_cases::dataset_upload::UploadOptions;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::bootstrap::{build_services, Services};
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::interfaces::cli::{Cli, Command, SecretAction, UploadArgs};
use crate::interfaces::http::{start_server, HttpState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if let Command::Secret { action } = &cli.command {
        return run_secret(action);
    }

    let config = AppConfig::load(cli.config.as_deref())?;
    let services = build_services(config)?;

    match cli.command {
        Command::Serve { host, port } => serve(services, host, port).await,
        Command::Ask { question, sql_only } => ask(&services, &question, sql_only).await,
        Command::Upload(args) => upload(&services, &args).await,
        Command::Ddl(args) => ddl(&services, &args),
        Command::Secret { .. } => Ok(()),
    }
}

async fn serve(services: Services, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| services.config.server.host.clone());
    let port = port.unwrap_or(services.config.server.port);

    if let Err(e) = services.connector.health_check().await {
        warn!(error = %e, "Database is not reachable yet; serving anyway");
    }

    let state = HttpState::new(
        services.text_to_sql.clone(),
        services.dataset_upload.clone(),
        services.connector.clone(),
    );
    start_server(state, &host, port)
        .map_err(|e| AppError::IoError(format!("Failed to bind {}:{}: {}", host, port, e)))?
        .await
        .map_err(AppError::from)
}

async fn ask(services: &Services, question: &str, sql_only: bool) -> Result<()> {
    if sql_only {
        let sql = services.text_to_sql.generate_sql(question).await?;
        println!("{}", sql);
        return Ok(());
    }

    let (sql, result) = services.text_to_sql.execute(question).await?;
    println!("{}\n", sql);
    print_json(&result)
}

fn upload_options(args: &UploadArgs) -> UploadOptions {
    UploadOptions {
        table_name: args.table.clone(),
        primary_key: args.primary_key.clone(),
        unbounded_text: args.unbounded_text.clone(),
    }
}

async fn upload(services: &Services, args: &UploadArgs) -> Result<()> {
    let report = services
        .dataset_upload
        .upload_path(&args.file, &upload_options(args))
        .await?;
    for warning in &report.warnings {
        warn!(table = %report.table_name, "{}", warning);
    }
    print_json(&report)
}

fn ddl(services: &Services, args: &UploadArgs) -> Result<()> {
    let file_name = file_name_of(&args.file)?;
    let prepared = services
        .dataset_upload
        .prepare(&file_name, &args.file, &upload_options(args))?;
    for warning in &prepared.warnings {
        warn!(table = %prepared.schema.table_name, "{}", warning);
    }
    info!(path = %prepared.ddl_path.display(), "DDL written");
    println!("{}", prepared.ddl);
    Ok(())
}

fn run_secret(action: &SecretAction) -> Result<()> {
    let service = ConfigService::new();
    match action {
        SecretAction::Set { name } => {
            eprint!("Secret value for {}: ", name);
            io::stderr().flush()?;
            let mut value = String::new();
            io::stdin().lock().read_line(&mut value)?;
            let value = value.trim_end_matches(&['\r', '\n'][..]);
            if value.is_empty() {
                return Err(AppError::InputError("Secret value is empty".to_string()));
            }
            service.save_secret(name, value)?;
            eprintln!("Stored. Reference it as keychain:{}", name);
        }
        SecretAction::Delete { name } => service.delete_secret(name)?,
    }
    Ok(())
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::InputError(format!("Not a file path: {}", path.display())))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Internal(format!("Failed to render output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
