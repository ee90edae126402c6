//! Topic endpoints: upload and process materials, schedule, grading

use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde_json::Value;
use study_core::{build_schedule, grade_quiz, reshape};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::routes::files::{sanitize_filename, topic_file};
use crate::services::automator::{PipelineInput, FLASHCARDS_FILE};
use crate::AppState;

/// Form fields of a topic upload
#[derive(Debug, Default)]
pub struct TopicUpload {
    pub topic_name: String,
    pub topic_description: String,
    pub video_url: String,
    /// Original file name and bytes.
    pub pdf: Option<(String, Vec<u8>)>,
}

impl TopicUpload {
    /// Check required fields and source formats.
    pub fn validate(&self) -> Result<()> {
        if self.topic_name.is_empty() {
            return Err(ApiError::BadRequest("Topic name is required".to_string()));
        }
        if self.pdf.is_none() && self.video_url.is_empty() {
            return Err(ApiError::BadRequest(
                "Please provide either a PDF file or a video URL".to_string(),
            ));
        }
        if !self.video_url.is_empty() && !is_http_url(&self.video_url) {
            return Err(ApiError::BadRequest(
                "Invalid video URL. Only HTTP/HTTPS URLs are allowed.".to_string(),
            ));
        }
        if let Some((name, _)) = &self.pdf {
            if !is_pdf_name(name) {
                return Err(ApiError::BadRequest("Only PDF files are allowed".to_string()));
            }
        }
        Ok(())
    }
}

pub fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
}

pub fn is_pdf_name(name: &str) -> bool {
    FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Reduce an uploaded file name to safe characters, dropping any directory part.
pub fn secure_upload_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

async fn read_upload(mut multipart: Multipart, max_bytes: usize) -> Result<TopicUpload> {
    let mut upload = TopicUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().unwrap_or_default() {
            "topic_name" => upload.topic_name = field.text().await.map_err(multipart_error)?.trim().to_string(),
            "topic_description" => {
                upload.topic_description = field.text().await.map_err(multipart_error)?.trim().to_string()
            }
            "video_url" => upload.video_url = field.text().await.map_err(multipart_error)?.trim().to_string(),
            "pdf_file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > max_bytes {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "PDF exceeds the {max_bytes} byte upload limit"
                    )));
                }
                if !file_name.is_empty() && !bytes.is_empty() {
                    upload.pdf = Some((file_name, bytes.to_vec()));
                }
            }
            other => tracing::debug!("Ignoring unknown form field {}", other),
        }
    }

    Ok(upload)
}

/// GET /api/topics
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<TopicResponse>>> {
    let topics = state.db.list_topics(auth.user_id).await?;
    Ok(Json(topics.iter().map(DbTopic::to_api).collect()))
}

/// POST /api/topics
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreateTopicResponse>)> {
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    upload.validate()?;

    let upload_folder = &state.config.upload_folder;
    tokio::fs::create_dir_all(upload_folder).await?;

    let run_id = new_run_id();
    let output_dir: PathBuf = upload_folder.join(format!("user_{}_topic_{}", auth.user_id, run_id));

    let mut pdf_filename = None;
    let mut pdf_path = None;
    if let Some((name, bytes)) = &upload.pdf {
        let safe_name = secure_upload_name(name);
        let path = saved_pdf_path(upload_folder, auth.user_id, &run_id, &safe_name);
        tokio::fs::write(&path, bytes).await?;
        pdf_filename = Some(safe_name);
        pdf_path = Some(path);
    }

    let video_url = (!upload.video_url.is_empty()).then(|| upload.video_url.clone());
    let input = PipelineInput::new(pdf_path, video_url.clone());

    tracing::info!("Processing topic '{}' for user {}", upload.topic_name, auth.user_id);
    let results = match state
        .automator
        .process_materials(&input, Some(output_dir.as_path()))
        .await
    {
        Ok(results) => results,
        Err(e) => {
            discard_run(input.pdf_path.as_deref(), &output_dir).await;
            return Err(e.into());
        }
    };
    let summary = results.summary;

    let new_topic = NewTopic {
        name: upload.topic_name.clone(),
        description: (!upload.topic_description.is_empty()).then(|| upload.topic_description.clone()),
        pdf_filename,
        video_url,
        output_directory: output_dir.to_string_lossy().into_owned(),
        num_modules: count(summary.modules.len()),
        num_diagrams: count(summary.diagrams.len()),
        num_flashcards: count(results.num_flashcards),
        num_quizzes: count(summary.quizzes.len()),
        topics_covered: summary.analysis.main_topics.clone(),
    };
    let topic = match state.db.create_topic(auth.user_id, &new_topic).await {
        Ok(topic) => topic,
        Err(e) => {
            discard_run(input.pdf_path.as_deref(), &output_dir).await;
            return Err(e.into());
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateTopicResponse {
            topic: topic.to_api(),
            files: TopicFiles::from(&summary),
            summary,
        }),
    ))
}

/// 16 hex characters naming one processing run.
fn new_run_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(16).collect()
}

/// Where an uploaded PDF is stored for one run.
pub fn saved_pdf_path(upload_folder: &FsPath, user_id: Uuid, run_id: &str, safe_name: &str) -> PathBuf {
    upload_folder.join(format!("{user_id}_{run_id}_{safe_name}"))
}

/// Remove what a failed run left behind.
async fn discard_run(pdf_path: Option<&FsPath>, output_dir: &FsPath) {
    if let Some(path) = pdf_path {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Could not remove upload {}: {}", path.display(), e);
        }
    }
    if let Err(e) = tokio::fs::remove_dir_all(output_dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove {}: {}", output_dir.display(), e);
        }
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// GET /api/topics/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(topic_id): Path<Uuid>,
) -> Result<Json<TopicResponse>> {
    let topic = state
        .db
        .get_topic(auth.user_id, topic_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Topic not found".to_string()))?;

    Ok(Json(topic.to_api()))
}

/// GET /api/topics/:id/schedule
pub async fn schedule(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(topic_id): Path<Uuid>,
) -> Result<Json<ScheduleResponse>> {
    let topic = state
        .db
        .get_topic(auth.user_id, topic_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Topic not found".to_string()))?;

    let path = PathBuf::from(&topic.output_directory).join(format!("{FLASHCARDS_FILE}.json"));
    let cards = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => reshape::flashcards_from_value(&serde_json::from_str::<Value>(&raw).map_err(
            |e| ApiError::Internal(format!("Stored flashcards are unreadable: {e}")),
        )?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let schedule = build_schedule(&cards);
    Ok(Json(ScheduleResponse {
        topic_id,
        total_reviews: schedule.total_reviews(),
        reviews: schedule.with_due_dates(Utc::now().date_naive()),
    }))
}

/// Stored quiz JSON for a quiz name such as `module_1_quiz` or `comprehensive_quiz.txt`
pub fn quiz_json_name(quiz: &str) -> Option<String> {
    let name = sanitize_filename(quiz)?;
    let stem = name
        .strip_suffix(".json")
        .or_else(|| name.strip_suffix(".txt"))
        .unwrap_or(name);
    (!stem.is_empty()).then(|| format!("{stem}.json"))
}

/// POST /api/topics/:id/quizzes/:quiz/grade
pub async fn grade(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((topic_id, quiz)): Path<(Uuid, String)>,
    Json(req): Json<GradeRequest>,
) -> Result<Json<GradeResponse>> {
    let file_name =
        quiz_json_name(&quiz).ok_or_else(|| ApiError::BadRequest("Invalid quiz name".to_string()))?;
    let (_, path) = topic_file(&state, auth.user_id, topic_id, &file_name).await?;

    let raw = tokio::fs::read_to_string(&path).await?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| ApiError::Internal(format!("Stored quiz is unreadable: {e}")))?;
    let quiz = reshape::quiz_from_value(&value);

    Ok(Json(grade_quiz(&quiz, &req.numbered_answers())))
}
