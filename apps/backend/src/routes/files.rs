//! Generated-file endpoints

use std::path::{Path as FsPath, PathBuf};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// Accept a bare file name only. Separators, `..` and hidden names are
/// rejected rather than rewritten.
pub fn sanitize_filename(name: &str) -> Option<&str> {
    let name = name.trim();
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0']);
    valid.then_some(name)
}

pub fn content_type_for(name: &str) -> &'static str {
    let ext = FsPath::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("svg") => "image/svg+xml",
        Some("json") => "application/json",
        Some("csv") => "text/csv; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn is_svg(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".svg")
}

/// Resolve a file inside the output directory of a topic the user owns
pub(crate) async fn topic_file(
    state: &AppState,
    user_id: Uuid,
    topic_id: Uuid,
    filename: &str,
) -> Result<(String, PathBuf)> {
    let topic = state
        .db
        .get_topic(user_id, topic_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Topic not found".to_string()))?;

    let name = sanitize_filename(filename)
        .ok_or_else(|| ApiError::BadRequest("Invalid filename".to_string()))?;

    let path = PathBuf::from(&topic.output_directory).join(name);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ApiError::NotFound("File not found".to_string()));
    }
    Ok((name.to_string(), path))
}

/// GET /api/files/:topic_id/:filename
pub async fn view(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((topic_id, filename)): Path<(Uuid, String)>,
) -> Result<Response> {
    let (name, path) = topic_file(&state, auth.user_id, topic_id, &filename).await?;

    if is_svg(&name) {
        let bytes = tokio::fs::read(&path).await?;
        return Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes).into_response());
    }

    let content = tokio::fs::read_to_string(&path).await?;
    Ok(Json(FileContentResponse {
        content,
        filename: name,
    })
    .into_response())
}

/// GET /api/files/:topic_id/:filename/download
pub async fn download(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((topic_id, filename)): Path<(Uuid, String)>,
) -> Result<Response> {
    let (name, path) = topic_file(&state, auth.user_id, topic_id, &filename).await?;
    let bytes = tokio::fs::read(&path).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&name))
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_accepts_plain_names() {
        assert_eq!(sanitize_filename("module_1.txt"), Some("module_1.txt"));
        assert_eq!(sanitize_filename(" diagram_Cells.svg "), Some("diagram_Cells.svg"));
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert_eq!(sanitize_filename("../secret.txt"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("a/b.txt"), None);
        assert_eq!(sanitize_filename("a\\b.txt"), None);
        assert_eq!(sanitize_filename("module..json"), None);
        assert_eq!(sanitize_filename(".env"), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("diagram_A.SVG"), "image/svg+xml");
        assert_eq!(content_type_for("flashcards.csv"), "text/csv; charset=utf-8");
        assert_eq!(content_type_for("summary.json"), "application/json");
        assert_eq!(content_type_for("notes"), "application/octet-stream");
    }
}
