pub mod chat;
pub mod error;
pub mod llm_config;
pub mod load;
pub mod query;
pub mod schema;
pub mod tabular;
