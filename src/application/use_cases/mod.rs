pub mod dataset_upload;
pub mod ddl_emitter;
pub mod prompt_builder;
pub mod schema_inference;
pub mod table_loader;
pub mod text_to_sql;
