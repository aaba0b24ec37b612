use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use include_dir::{include_dir, Dir};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    download::{content_disposition, pdf_download, text_download, StoryDownload},
    error::{ApiError, StoryError},
    intake::{IntakeForm, EXAMPLE_PROMPTS},
    photo::{decode_upload, UploadError, MAX_PHOTO_BYTES},
    pipeline::{self, StoryModel},
    screen::{StoryView, Visits},
};

static ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Room for a maximum-size photo once base64 inflates it inside a JSON body.
const BODY_LIMIT: usize = MAX_PHOTO_BYTES * 3 / 2 + 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub visits: Visits,
    /// `None` when no API key is configured.
    pub model: Option<Arc<dyn StoryModel>>,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(intake_page))
        .route("/story", get(|| async { Redirect::to("/") }))
        .route("/story/:id", get(story_page))
        .route("/assets/*path", get(asset))
        .route("/api/prompts", get(example_prompts))
        .route("/api/photo", post(upload_photo))
        .route("/api/story", post(submit_story))
        .route("/api/story/:id", get(story_status))
        .route("/api/story/:id/download", get(download_text))
        .route("/api/story/:id/pdf", get(download_pdf))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

fn page(name: &str) -> Result<Html<&'static str>, ApiError> {
    ASSETS
        .get_file(name)
        .and_then(|f| f.contents_utf8())
        .map(Html)
        .ok_or_else(|| ApiError::Internal(format!("missing embedded page {name}")))
}

pub async fn intake_page() -> Result<Html<&'static str>, ApiError> {
    page("index.html")
}

pub async fn asset(Path(path): Path<String>) -> Result<Response, ApiError> {
    let file = ASSETS.get_file(&path).ok_or(ApiError::NotFound)?;
    let content_type = match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("html") => "text/html; charset=utf-8",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], file.contents()).into_response())
}

pub async fn example_prompts() -> Json<&'static [&'static str]> {
    Json(EXAMPLE_PROMPTS)
}

/// Decodes the `photo` field into a data URL. Non-image files get `204` and no preview.
pub async fn upload_photo(mut multipart: Multipart) -> Result<Response, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("photo") {
            continue;
        }
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(upload_error)?;
        return match decode_upload(bytes, declared.as_deref()).await {
            Ok(Some(data_url)) => Ok(Json(json!({ "dataUrl": data_url })).into_response()),
            Ok(None) => Ok(StatusCode::NO_CONTENT.into_response()),
            Err(UploadError::TooLarge(_)) => Err(ApiError::PhotoTooLarge(MAX_PHOTO_BYTES)),
        };
    }
    Err(ApiError::BadUpload("no `photo` field".into()))
}

fn upload_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PhotoTooLarge(MAX_PHOTO_BYTES)
    } else {
        ApiError::BadUpload(e.body_text())
    }
}

/// Hands the intake form to the story screen. Incomplete forms go back to intake.
pub async fn submit_story(State(state): State<AppState>, Json(form): Json<IntakeForm>) -> Response {
    let Some(request) = form.submit() else {
        info!("↩️ Incomplete intake form, missing {:?}", form.missing_fields());
        return Redirect::to("/").into_response();
    };
    let id = state.visits.create(request);
    info!("🎯 Created story visit {}", id);
    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "location": format!("/story/{id}") })),
    )
        .into_response()
}

/// Entering the story screen starts generation, once per visit.
pub async fn story_page(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(id) = Uuid::parse_str(&id).ok().filter(|id| state.visits.contains(id)) else {
        return Redirect::to("/").into_response();
    };
    start_generation(&state, id);
    match page("story.html") {
        Ok(html) => html.into_response(),
        Err(e) => e.into_response(),
    }
}

fn start_generation(state: &AppState, id: Uuid) {
    let Some(request) = state.visits.begin(&id) else {
        return;
    };
    let visits = state.visits.clone();
    let model = state.model.clone();
    tokio::spawn(async move {
        // A panic inside the pipeline must still settle the visit.
        let run = tokio::spawn(async move { pipeline::generate(model.as_deref(), &request).await });
        let outcome = match run.await {
            Ok(outcome) => outcome,
            Err(e) => Err(StoryError::Transport(format!("generation task failed: {e}"))),
        };
        if let Err(e) = &outcome {
            error!("❌ Story generation for visit {} failed: {}", id, e);
        }
        if !visits.finish(&id, outcome) {
            info!("Visit {} is gone, dropping its result", id);
        }
    });
}

pub async fn story_status(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<StoryView>, ApiError> {
    state.visits.view(&id).map(Json).ok_or(ApiError::NotFound)
}

pub async fn download_text(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let (name, result) = state.visits.finished(&id).ok_or(ApiError::NotFound)?.ok_or(ApiError::NotReady)?;
    Ok(attachment(text_download(&name, &result)))
}

pub async fn download_pdf(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let (name, result) = state.visits.finished(&id).ok_or(ApiError::NotFound)?.ok_or(ApiError::NotReady)?;
    let download = tokio::task::spawn_blocking(move || pdf_download(&name, &result))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::Internal)?;
    Ok(attachment(download))
}

fn attachment(download: StoryDownload) -> Response {
    let disposition = HeaderValue::from_str(&content_disposition(&download.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(download.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.body,
    )
        .into_response()
}
