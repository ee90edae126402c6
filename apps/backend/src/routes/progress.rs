//! Progress tracking endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

async fn find_progress(state: &AppState, user_id: Uuid, topic_id: Uuid) -> Result<DbProgress> {
    state
        .db
        .get_progress(user_id, topic_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Progress not found".to_string()))
}

/// GET /api/progress/:topic_id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(topic_id): Path<Uuid>,
) -> Result<Json<ProgressResponse>> {
    let progress = find_progress(&state, auth.user_id, topic_id).await?;
    let attempts = state.db.get_quiz_attempts(progress.id).await?;
    Ok(Json(progress.to_api(&attempts)))
}

/// POST /api/progress/:topic_id/module
pub async fn complete_module(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(topic_id): Path<Uuid>,
    Json(req): Json<ModuleCompleteRequest>,
) -> Result<Json<ProgressResponse>> {
    let module_id = req
        .module_id()
        .ok_or_else(|| ApiError::BadRequest("Module ID is required".to_string()))?;

    let topic = state
        .db
        .get_topic(auth.user_id, topic_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Topic not found".to_string()))?;
    let progress = find_progress(&state, auth.user_id, topic_id).await?;

    let progress = state
        .db
        .mark_module_complete(progress.id, &module_id, topic.num_modules)
        .await?;
    let attempts = state.db.get_quiz_attempts(progress.id).await?;
    Ok(Json(progress.to_api(&attempts)))
}

/// POST /api/progress/:topic_id/quiz
pub async fn record_quiz(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(topic_id): Path<Uuid>,
    Json(req): Json<QuizScoreRequest>,
) -> Result<Json<ProgressResponse>> {
    let (quiz_id, score) = req
        .quiz_id()
        .zip(req.score)
        .ok_or_else(|| ApiError::BadRequest("Quiz ID and score are required".to_string()))?;
    if !score.is_finite() {
        return Err(ApiError::BadRequest("Score must be a number".to_string()));
    }

    let progress = find_progress(&state, auth.user_id, topic_id).await?;
    let (progress, attempts) = state.db.record_quiz_score(progress.id, &quiz_id, score).await?;
    Ok(Json(progress.to_api(&attempts)))
}

/// POST /api/progress/:topic_id/flashcards
pub async fn review_flashcards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(topic_id): Path<Uuid>,
    Json(req): Json<FlashcardReviewRequest>,
) -> Result<Json<ProgressResponse>> {
    if req.count < 0 {
        return Err(ApiError::BadRequest("Count cannot be negative".to_string()));
    }

    let progress = find_progress(&state, auth.user_id, topic_id).await?;
    let progress = state.db.add_flashcards_reviewed(progress.id, req.count).await?;
    let attempts = state.db.get_quiz_attempts(progress.id).await?;
    Ok(Json(progress.to_api(&attempts)))
}

/// POST /api/progress/:topic_id/session
pub async fn create_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(topic_id): Path<Uuid>,
    Json(req): Json<StudySessionRequest>,
) -> Result<(StatusCode, Json<StudySessionResponse>)> {
    if req.duration_minutes < 0 || req.items_completed < 0 {
        return Err(ApiError::BadRequest(
            "Duration and items completed cannot be negative".to_string(),
        ));
    }

    state
        .db
        .get_topic(auth.user_id, topic_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Topic not found".to_string()))?;

    let session = state
        .db
        .create_study_session(auth.user_id, topic_id, &req)
        .await?;

    Ok((StatusCode::CREATED, Json(session.to_api())))
}
