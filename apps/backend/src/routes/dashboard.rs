//! Dashboard endpoint

use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// Roll per-topic progress up into dashboard totals. Topics without a
/// progress row still count towards the average's denominator.
pub fn summarize(
    topics: &[DbTopic],
    progress: &[DbProgress],
    attempts: &HashMap<Uuid, Vec<DbQuizAttempt>>,
) -> DashboardResponse {
    let by_topic: HashMap<Uuid, &DbProgress> = progress.iter().map(|p| (p.topic_id, p)).collect();

    let mut total_study_time = 0i64;
    let mut total_completion = 0.0;
    let mut rows = Vec::new();

    for topic in topics {
        if let Some(progress) = by_topic.get(&topic.id) {
            let topic_attempts = attempts.get(&progress.id).map(Vec::as_slice).unwrap_or_default();
            total_study_time += i64::from(progress.total_study_time);
            total_completion += progress.completion_percentage;
            rows.push(TopicProgress {
                topic: topic.to_api(),
                progress: progress.to_api(topic_attempts),
            });
        }
    }

    let average_completion = if topics.is_empty() {
        0.0
    } else {
        round2(total_completion / topics.len() as f64)
    };

    DashboardResponse {
        total_topics: topics.len(),
        total_study_time,
        average_completion,
        topics: rows,
    }
}

/// GET /api/dashboard
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<DashboardResponse>> {
    let topics = state.db.list_topics(auth.user_id).await?;
    let progress = state.db.list_progress(auth.user_id).await?;
    let attempts = state.db.get_quiz_attempts_for_user(auth.user_id).await?;

    Ok(Json(summarize(&topics, &progress, &attempts)))
}
