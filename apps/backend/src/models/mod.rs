//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use study_core::{GradingResult, ScheduledReview};

use crate::services::automator::PipelineSummary;

/// Round to two decimal places for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of modules completed, in percent. Zero when the topic has no modules.
pub fn completion_percentage(modules_completed: usize, num_modules: i32) -> f64 {
    if num_modules <= 0 {
        return 0.0;
    }
    modules_completed as f64 / f64::from(num_modules) * 100.0
}

/// Mean quiz score, or zero with no attempts.
pub fn average_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

// === Database Entity Types ===

/// Registered account
#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl DbUser {
    pub fn to_api(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            last_login: self.last_login_at,
        }
    }
}

/// Login session holding one access/refresh token pair
#[derive(Debug, Clone, FromRow)]
pub struct DbAuthSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Session joined with its user, resolved from a bearer token
#[derive(Debug, Clone, FromRow)]
pub struct SessionUser {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
}

/// One processed upload
#[derive(Debug, Clone, FromRow)]
pub struct DbTopic {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub pdf_filename: Option<String>,
    pub video_url: Option<String>,
    pub output_directory: String,
    pub num_modules: i32,
    pub num_diagrams: i32,
    pub num_flashcards: i32,
    pub num_quizzes: i32,
    pub topics_covered: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbTopic {
    /// Convert to API topic type. The output directory stays server-side.
    pub fn to_api(&self) -> TopicResponse {
        TopicResponse {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            pdf_filename: self.pdf_filename.clone(),
            video_url: self.video_url.clone(),
            num_modules: self.num_modules,
            num_diagrams: self.num_diagrams,
            num_flashcards: self.num_flashcards,
            num_quizzes: self.num_quizzes,
            topics_covered: self.topics_covered.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields for inserting a topic
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub name: String,
    pub description: Option<String>,
    pub pdf_filename: Option<String>,
    pub video_url: Option<String>,
    pub output_directory: String,
    pub num_modules: i32,
    pub num_diagrams: i32,
    pub num_flashcards: i32,
    pub num_quizzes: i32,
    pub topics_covered: Vec<String>,
}

/// Per-user, per-topic progress row
#[derive(Debug, Clone, FromRow)]
pub struct DbProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic_id: Uuid,
    pub modules_completed: Vec<String>,
    pub flashcards_reviewed: i32,
    pub completion_percentage: f64,
    pub total_study_time: i32,
    pub average_score: f64,
    pub last_studied: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl DbProgress {
    pub fn to_api(&self, attempts: &[DbQuizAttempt]) -> ProgressResponse {
        ProgressResponse {
            id: self.id,
            topic_id: self.topic_id,
            modules_completed: self.modules_completed.clone(),
            quizzes_taken: attempts.iter().map(DbQuizAttempt::to_api).collect(),
            flashcards_reviewed: self.flashcards_reviewed,
            completion_percentage: round2(self.completion_percentage),
            total_study_time: self.total_study_time,
            quiz_scores: attempts.iter().map(|a| a.score).collect(),
            average_score: round2(self.average_score),
            last_studied: self.last_studied,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbQuizAttempt {
    pub id: Uuid,
    pub progress_id: Uuid,
    pub quiz_id: String,
    pub score: f64,
    pub taken_at: DateTime<Utc>,
}

impl DbQuizAttempt {
    pub fn to_api(&self) -> QuizAttemptResponse {
        QuizAttemptResponse {
            quiz_id: self.quiz_id.clone(),
            score: self.score,
            timestamp: self.taken_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbStudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic_id: Uuid,
    pub session_type: String,
    pub content_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub score: Option<f64>,
    pub items_completed: i32,
    pub notes: Option<String>,
}

impl DbStudySession {
    pub fn to_api(&self) -> StudySessionResponse {
        StudySessionResponse {
            id: self.id,
            topic_id: self.topic_id,
            session_type: self.session_type.clone(),
            content_id: self.content_id.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            score: self.score,
            items_completed: self.items_completed,
            notes: self.notes.clone(),
        }
    }
}

// === API Request/Response Types ===

/// Register request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Refresh request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Issued token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Register/login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub pdf_filename: Option<String>,
    pub video_url: Option<String>,
    pub num_modules: i32,
    pub num_diagrams: i32,
    pub num_flashcards: i32,
    pub num_quizzes: i32,
    pub topics_covered: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generated file names grouped by kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicFiles {
    pub modules: Vec<String>,
    pub diagrams: Vec<String>,
    pub flashcards: Vec<String>,
    pub quizzes: Vec<String>,
}

impl From<&PipelineSummary> for TopicFiles {
    fn from(summary: &PipelineSummary) -> Self {
        Self {
            modules: summary.modules.clone(),
            diagrams: summary.diagrams.clone(),
            flashcards: summary.flashcards.clone(),
            quizzes: summary.quizzes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTopicResponse {
    pub topic: TopicResponse,
    pub summary: PipelineSummary,
    pub files: TopicFiles,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleResponse {
    pub topic_id: Uuid,
    pub total_reviews: usize,
    pub reviews: Vec<ScheduledReview>,
}

/// Quiz answers keyed by 1-based question number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    #[serde(default)]
    pub answers: HashMap<String, String>,
}

impl GradeRequest {
    /// Answers keyed by question number. Keys that are not numbers are dropped.
    pub fn numbered_answers(&self) -> HashMap<usize, String> {
        self.answers
            .iter()
            .filter_map(|(k, v)| k.trim().parse().ok().map(|n| (n, v.clone())))
            .collect()
    }
}

pub type GradeResponse = GradingResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttemptResponse {
    pub quiz_id: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub modules_completed: Vec<String>,
    pub quizzes_taken: Vec<QuizAttemptResponse>,
    pub flashcards_reviewed: i32,
    pub completion_percentage: f64,
    pub total_study_time: i32,
    pub quiz_scores: Vec<f64>,
    pub average_score: f64,
    pub last_studied: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Identifier sent as either a string or a number.
fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCompleteRequest {
    #[serde(default)]
    pub module_id: Value,
}

impl ModuleCompleteRequest {
    pub fn module_id(&self) -> Option<String> {
        id_to_string(&self.module_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizScoreRequest {
    #[serde(default)]
    pub quiz_id: Value,
    pub score: Option<f64>,
}

impl QuizScoreRequest {
    pub fn quiz_id(&self) -> Option<String> {
        id_to_string(&self.quiz_id)
    }
}

fn default_count() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardReviewRequest {
    #[serde(default = "default_count")]
    pub count: i32,
}

fn default_session_type() -> String {
    "module".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySessionRequest {
    #[serde(default = "default_session_type")]
    pub session_type: String,
    pub content_id: Option<String>,
    #[serde(default)]
    pub duration_minutes: i32,
    pub score: Option<f64>,
    #[serde(default)]
    pub items_completed: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySessionResponse {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub session_type: String,
    pub content_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub score: Option<f64>,
    pub items_completed: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicProgress {
    pub topic: TopicResponse,
    pub progress: ProgressResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub total_topics: usize,
    pub total_study_time: i64,
    pub average_completion: f64,
    pub topics: Vec<TopicProgress>,
}

/// Generated text file returned inline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContentResponse {
    pub content: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(1, 4), 25.0);
        assert_eq!(completion_percentage(3, 3), 100.0);
        assert_eq!(completion_percentage(2, 0), 0.0);
    }

    #[test]
    fn test_average_score() {
        assert_eq!(average_score(&[]), 0.0);
        assert_eq!(average_score(&[80.0, 90.0, 100.0]), 90.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(33.333), 33.33);
    }

    #[test]
    fn test_numbered_answers_skip_bad_keys() {
        let req: GradeRequest =
            serde_json::from_value(json!({"answers": {"1": "paris", "two": "x", " 2 ": "false"}})).unwrap();
        let answers = req.numbered_answers();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[&1], "paris");
        assert_eq!(answers[&2], "false");
    }

    #[test]
    fn test_ids_accept_strings_and_numbers() {
        let by_number: QuizScoreRequest = serde_json::from_value(json!({"quiz_id": 3, "score": 80})).unwrap();
        assert_eq!(by_number.quiz_id().as_deref(), Some("3"));
        assert_eq!(by_number.score, Some(80.0));

        let by_name: ModuleCompleteRequest =
            serde_json::from_value(json!({"module_id": "module_1"})).unwrap();
        assert_eq!(by_name.module_id().as_deref(), Some("module_1"));

        let missing: ModuleCompleteRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.module_id(), None);
    }

    #[test]
    fn test_request_defaults() {
        let flashcards: FlashcardReviewRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(flashcards.count, 1);

        let session: StudySessionRequest = serde_json::from_value(json!({"duration_minutes": 25})).unwrap();
        assert_eq!(session.session_type, "module");
        assert_eq!(session.duration_minutes, 25);
        assert_eq!(session.items_completed, 0);
    }

    #[test]
    fn test_progress_to_api_rounds_and_lists_attempts() {
        let now = Utc::now();
        let progress = DbProgress {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            topic_id: Uuid::new_v4(),
            modules_completed: vec!["module_1".to_string()],
            flashcards_reviewed: 4,
            completion_percentage: 33.333_333,
            total_study_time: 30,
            average_score: 72.456,
            last_studied: Some(now),
            updated_at: now,
        };
        let attempt = DbQuizAttempt {
            id: Uuid::new_v4(),
            progress_id: progress.id,
            quiz_id: "module_1_quiz".to_string(),
            score: 72.456,
            taken_at: now,
        };
        let api = progress.to_api(&[attempt]);
        assert_eq!(api.completion_percentage, 33.33);
        assert_eq!(api.average_score, 72.46);
        assert_eq!(api.quiz_scores, vec![72.456]);
        assert_eq!(api.quizzes_taken[0].quiz_id, "module_1_quiz");
    }
}
