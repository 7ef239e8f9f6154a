use std::sync::Arc;

use tracing::info;

use crate::application::use_cases::dataset_upload::DatasetUploadUseCase;
use crate::application::use_cases::prompt_builder::PromptBuilder;
use crate::application::use_cases::text_to_sql::TextToSqlUseCase;
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::{DbConnector, QueryExecutor};
use crate::infrastructure::llm_clients::{LLMClient, OpenAICompatibleClient};
use crate::infrastructure::storage::DatasetStore;

/// Use cases wired from one loaded configuration.
pub struct Services {
    pub config: AppConfig,
    pub connector: DbConnector,
    pub text_to_sql: Arc<TextToSqlUseCase>,
    pub dataset_upload: Arc<DatasetUploadUseCase>,
}

pub fn build_services(config: AppConfig) -> Result<Services> {
    let connector = DbConnector::new(config.database.connection_url()?)?;

    let store = DatasetStore::new(
        config.storage.upload_dir.clone(),
        config.storage.ddl_dir.clone(),
    );
    store.ensure()?;

    let llm_client: Arc<dyn LLMClient + Send + Sync> = Arc::new(OpenAICompatibleClient::new());
    let text_to_sql = TextToSqlUseCase::new(
        llm_client,
        config.llm.clone(),
        PromptBuilder::new(
            config.storage.schema_file.clone(),
            config.storage.examples_file.clone(),
        ),
        QueryExecutor::new(connector.clone(), config.chat.read_only),
    );
    let dataset_upload =
        DatasetUploadUseCase::new(store, connector.clone(), config.ingest.clone());

    info!(
        database = %connector.redacted_url(),
        read_only = config.chat.read_only,
        "Services ready"
    );

    Ok(Services {
        config,
        connector,
        text_to_sql: Arc::new(text_to_sql),
        dataset_upload: Arc::new(dataset_upload),
    })
}
