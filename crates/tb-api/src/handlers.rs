//! # tb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core services.
//! Bodies are accepted as JSON or as urlencoded forms; absent fields arrive in
//! the core as empty strings so the poster gets the core's own message.

use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{web, Either, HttpResponse, ResponseError};
use secrecy::SecretString;
use serde::Deserialize;
use tb_core::{AppError, ReplyEngine, SecretHasher, ThreadRepo, ThreadStore};

/// State shared across all actix-web workers.
pub struct AppState {
    pub threads: ThreadStore,
    pub replies: ReplyEngine,
}

impl AppState {
    pub fn new(repo: Arc<dyn ThreadRepo>, hasher: Arc<dyn SecretHasher>) -> Self {
        let threads = ThreadStore::new(repo, hasher);
        let replies = ReplyEngine::new(threads.clone());
        Self { threads, replies }
    }
}

/// Core failures as HTTP responses: the poster's mistakes are a 400 carrying
/// the core message, store trouble is an opaque 500.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub AppError);

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            AppError::Internal(e) => {
                tracing::error!("request failed: {e:#}");
                HttpResponse::InternalServerError().body("internal server error")
            }
            other => HttpResponse::BadRequest()
                .content_type("text/plain; charset=utf-8")
                .body(other.to_string()),
        }
    }
}

type Payload<T> = Either<web::Json<T>, web::Form<T>>;

fn body<T>(payload: Payload<T>) -> T {
    match payload {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    }
}

fn secret(raw: String) -> SecretString {
    SecretString::from(raw)
}

#[derive(Debug, Deserialize)]
pub struct NewThread {
    /// Overrides the board in the path when present.
    #[serde(default)]
    pub board: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub delete_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportThread {
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Older board pages send the id under this name; used when `thread_id`
    /// is missing or blank.
    #[serde(default)]
    pub report_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteThread {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub delete_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    #[serde(default)]
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NewReply {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub delete_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportReply {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub reply_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteReply {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub reply_id: String,
    #[serde(default)]
    pub delete_password: String,
}

/// GET /api/threads/{board}
pub async fn list_threads(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let board = path.into_inner();
    let threads = data.threads.list_recent(&board).await?;
    Ok(HttpResponse::Ok().json(threads))
}

/// POST /api/threads/{board}, then back to the board page.
pub async fn create_thread(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Payload<NewThread>,
) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    let board = form
        .board
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| path.into_inner());

    data.threads
        .create(&board, &form.text, &secret(form.delete_password))
        .await?;

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, format!("/b/{board}/")))
        .finish())
}

/// PUT /api/threads/{board}
pub async fn report_thread(
    data: web::Data<AppState>,
    payload: Payload<ReportThread>,
) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    let thread_id = form
        .thread_id
        .filter(|id| !id.is_empty())
        .or(form.report_id)
        .unwrap_or_default();
    let marker = data.threads.report(&thread_id).await?;
    Ok(HttpResponse::Ok().json(marker))
}

/// DELETE /api/threads/{board}
pub async fn delete_thread(
    data: web::Data<AppState>,
    payload: Payload<DeleteThread>,
) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    let marker = data
        .threads
        .delete(&form.thread_id, &secret(form.delete_password))
        .await?;
    Ok(HttpResponse::Ok().json(marker))
}

/// GET /api/replies/{board}?thread_id=...
pub async fn get_thread(
    data: web::Data<AppState>,
    query: web::Query<ThreadQuery>,
) -> Result<HttpResponse, ApiError> {
    let thread = data.replies.get_with_replies(&query.thread_id).await?;
    Ok(HttpResponse::Ok().json(thread))
}

/// POST /api/replies/{board}, then on to the thread page.
pub async fn create_reply(
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: Payload<NewReply>,
) -> Result<HttpResponse, ApiError> {
    let board = path.into_inner();
    let form = body(payload);

    data.replies
        .create_reply(&form.thread_id, &form.text, &secret(form.delete_password))
        .await?;

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, format!("/b/{board}/{}", form.thread_id)))
        .finish())
}

/// PUT /api/replies/{board}
pub async fn report_reply(
    data: web::Data<AppState>,
    payload: Payload<ReportReply>,
) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    let marker = data
        .replies
        .report_reply(&form.thread_id, &form.reply_id)
        .await?;
    Ok(HttpResponse::Ok().json(marker))
}

/// DELETE /api/replies/{board}
pub async fn delete_reply(
    data: web::Data<AppState>,
    payload: Payload<DeleteReply>,
) -> Result<HttpResponse, ApiError> {
    let form = body(payload);
    let marker = data
        .replies
        .delete_reply(
            &form.thread_id,
            &form.reply_id,
            &secret(form.delete_password),
        )
        .await?;
    Ok(HttpResponse::Ok().json(marker))
}
