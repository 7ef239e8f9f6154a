use crate::application::use_cases::dataset_upload::{DatasetUploadUseCase, UploadOptions};
use crate::application::use_cases::text_to_sql::{with_session, ChatSession, TextToSqlUseCase};
use crate::domain::chat::ChatRequest;
use crate::domain::error::AppError;
use crate::infrastructure::db::DbConnector;
use actix_cors::Cors;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use validator::Validate;

/// Largest accepted dataset body.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub struct HttpState {
    pub text_to_sql: Arc<TextToSqlUseCase>,
    pub dataset_upload: Arc<DatasetUploadUseCase>,
    pub connector: DbConnector,
    pub session: Mutex<ChatSession>,
}

impl HttpState {
    pub fn new(
        text_to_sql: Arc<TextToSqlUseCase>,
        dataset_upload: Arc<DatasetUploadUseCase>,
        connector: DbConnector,
    ) -> Self {
        Self {
            text_to_sql,
            dataset_upload,
            connector,
            session: Mutex::new(ChatSession::new()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub table_name: Option<String>,
    /// Comma separated column names to create as `TEXT`
    #[serde(default)]
    pub unbounded_text: Option<String>,
}

impl UploadQuery {
    fn options(&self) -> UploadOptions {
        UploadOptions {
            table_name: self.table_name.clone(),
            primary_key: self.primary_key.clone().filter(|k| !k.trim().is_empty()),
            unbounded_text: self
                .unbounded_text
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    database: String,
}

fn error_response(e: &AppError) -> HttpResponse {
    let body = ErrorBody {
        error: e.to_string(),
    };
    match e {
        AppError::NotFound(_) => HttpResponse::NotFound().json(body),
        e if e.is_client_error() => HttpResponse::BadRequest().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

#[post("/chat")]
async fn chat(data: web::Data<HttpState>, req: web::Json<ChatRequest>) -> impl Responder {
    if let Err(e) = req.validate() {
        return error_response(&AppError::InputError(e.to_string()));
    }
    info!(question_len = req.question.len(), "Chat question received");

    match data.text_to_sql.ask(&data.session, &req.question).await {
        Ok(message) => HttpResponse::Ok().json(message),
        Err(e) => {
            warn!(error = %e, "Chat question failed");
            error_response(&e)
        }
    }
}

#[get("/messages")]
async fn messages(data: web::Data<HttpState>) -> impl Responder {
    match with_session(&data.session, |s| s.messages().to_vec()) {
        Ok(history) => HttpResponse::Ok().json(history),
        Err(e) => error_response(&e),
    }
}

#[post("/datasets")]
async fn upload_dataset(
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    info!(
        file = %query.file_name,
        size_bytes = body.len(),
        "Dataset upload received"
    );
    if body.is_empty() {
        return error_response(&AppError::InputError("Upload body is empty".to_string()));
    }

    match data
        .dataset_upload
        .upload(&query.file_name, &body, &query.options())
        .await
    {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!(file = %query.file_name, error = %e, "Dataset upload failed");
            error_response(&e)
        }
    }
}

#[get("/datasets")]
async fn list_datasets(data: web::Data<HttpState>) -> impl Responder {
    match data.dataset_upload.store().list_uploads() {
        Ok(datasets) => HttpResponse::Ok().json(datasets),
        Err(e) => error_response(&e),
    }
}

fn dataset_content_type(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".xlsx") {
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    } else if lower.ends_with(".csv") {
        "text/csv; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

#[get("/datasets/{file_name}")]
async fn download_dataset(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let file_name = path.into_inner();
    match data.dataset_upload.store().read_upload(&file_name) {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(dataset_content_type(&file_name))
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(file_name)],
            })
            .body(bytes),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    #[serde(default = "default_preview_limit")]
    pub limit: usize,
}

fn default_preview_limit() -> usize {
    20
}

#[get("/datasets/{file_name}/preview")]
async fn preview_dataset(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<PreviewQuery>,
) -> impl Responder {
    match data.dataset_upload.preview(&path, query.limit) {
        Ok(preview) => HttpResponse::Ok().json(preview),
        Err(e) => error_response(&e),
    }
}

#[get("/health")]
async fn health(data: web::Data<HttpState>) -> impl Responder {
    match data.connector.health_check().await {
        Ok(()) => HttpResponse::Ok().json(HealthBody {
            status: "ok",
            database: "ok".to_string(),
        }),
        Err(e) => HttpResponse::ServiceUnavailable().json(HealthBody {
            status: "degraded",
            database: e.to_string(),
        }),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
            .service(chat)
            .service(messages)
            .service(upload_dataset)
            .service(list_datasets)
            .service(download_dataset)
            .service(preview_dataset)
            .service(health),
    );
}

pub fn start_server(state: HttpState, host: &str, port: u16) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // local tool, any origin

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    info!(host, port, "HTTP server listening");
    Ok(server)
}
