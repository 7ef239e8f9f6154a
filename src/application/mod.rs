pub mod use_cases;

pub use use_cases::dataset_upload::DatasetUploadUseCase;
pub use use_cases::text_to_sql::TextToSqlUseCase;
