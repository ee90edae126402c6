//! PostgreSQL database operations

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a pool that connects on first use
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Database(e.into()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === User Repository ===

    /// Create a user. Returns `None` when the email is already registered.
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<Option<DbUser>> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, name, password_hash, created_at, last_login_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<DbUser>> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"
            SELECT id, email, name, password_hash, created_at, last_login_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<DbUser>> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"
            SELECT id, email, name, password_hash, created_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Stamp a successful login
    pub async fn record_login(&self, user_id: Uuid) -> Result<DbUser> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, password_hash, created_at, last_login_at
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    // === Session Repository ===

    /// Store a new token pair. Only hashes are persisted.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        access_token_hash: &str,
        refresh_token_hash: &str,
        access_expires_at: DateTime<Utc>,
        refresh_expires_at: DateTime<Utc>,
    ) -> Result<DbAuthSession> {
        let session = sqlx::query_as::<_, DbAuthSession>(
            r#"
            INSERT INTO auth_sessions
                (user_id, access_token_hash, refresh_token_hash, access_expires_at, refresh_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, access_expires_at, refresh_expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(access_token_hash)
        .bind(refresh_token_hash)
        .bind(access_expires_at)
        .bind(refresh_expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Resolve an unexpired access token to its session and user
    pub async fn get_session_by_access_token(
        &self,
        access_token_hash: &str,
    ) -> Result<Option<SessionUser>> {
        let session = sqlx::query_as::<_, SessionUser>(
            r#"
            SELECT s.id AS session_id, u.id AS user_id, u.email
            FROM auth_sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.access_token_hash = $1 AND s.access_expires_at > NOW()
            "#,
        )
        .bind(access_token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Replace both tokens of the session holding an unexpired refresh token.
    /// Returns `None` when no such session exists.
    pub async fn rotate_session(
        &self,
        refresh_token_hash: &str,
        new_access_hash: &str,
        new_refresh_hash: &str,
        access_expires_at: DateTime<Utc>,
        refresh_expires_at: DateTime<Utc>,
    ) -> Result<Option<DbAuthSession>> {
        let session = sqlx::query_as::<_, DbAuthSession>(
            r#"
            UPDATE auth_sessions
            SET access_token_hash = $2,
                refresh_token_hash = $3,
                access_expires_at = $4,
                refresh_expires_at = $5
            WHERE refresh_token_hash = $1 AND refresh_expires_at > NOW()
            RETURNING id, user_id, access_expires_at, refresh_expires_at, created_at
            "#,
        )
        .bind(refresh_token_hash)
        .bind(new_access_hash)
        .bind(new_refresh_hash)
        .bind(access_expires_at)
        .bind(refresh_expires_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn delete_session(&self, session_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Drop a user's sessions whose refresh token has lapsed
    pub async fn delete_expired_sessions(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM auth_sessions
            WHERE user_id = $1 AND refresh_expires_at <= NOW()
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // === Topic Repository ===

    /// Insert a topic together with its empty progress row
    pub async fn create_topic(&self, user_id: Uuid, topic: &NewTopic) -> Result<DbTopic> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, DbTopic>(
            r#"
            INSERT INTO topics (user_id, name, description, pdf_filename, video_url,
                                output_directory, num_modules, num_diagrams, num_flashcards,
                                num_quizzes, topics_covered)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, user_id, name, description, pdf_filename, video_url, output_directory,
                      num_modules, num_diagrams, num_flashcards, num_quizzes, topics_covered,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&topic.name)
        .bind(&topic.description)
        .bind(&topic.pdf_filename)
        .bind(&topic.video_url)
        .bind(&topic.output_directory)
        .bind(topic.num_modules)
        .bind(topic.num_diagrams)
        .bind(topic.num_flashcards)
        .bind(topic.num_quizzes)
        .bind(&topic.topics_covered)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO progress (user_id, topic_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(user_id)
        .bind(created.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// All topics of a user, newest first
    pub async fn list_topics(&self, user_id: Uuid) -> Result<Vec<DbTopic>> {
        let topics = sqlx::query_as::<_, DbTopic>(
            r#"
            SELECT id, user_id, name, description, pdf_filename, video_url, output_directory,
                   num_modules, num_diagrams, num_flashcards, num_quizzes, topics_covered,
                   created_at, updated_at
            FROM topics
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(topics)
    }

    /// Get a topic owned by the user
    pub async fn get_topic(&self, user_id: Uuid, topic_id: Uuid) -> Result<Option<DbTopic>> {
        let topic = sqlx::query_as::<_, DbTopic>(
            r#"
            SELECT id, user_id, name, description, pdf_filename, video_url, output_directory,
                   num_modules, num_diagrams, num_flashcards, num_quizzes, topics_covered,
                   created_at, updated_at
            FROM topics
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(topic_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(topic)
    }

    // === Progress Repository ===

    pub async fn get_progress(&self, user_id: Uuid, topic_id: Uuid) -> Result<Option<DbProgress>> {
        let progress = sqlx::query_as::<_, DbProgress>(
            r#"
            SELECT id, user_id, topic_id, modules_completed, flashcards_reviewed,
                   completion_percentage, total_study_time, average_score, last_studied, updated_at
            FROM progress
            WHERE user_id = $1 AND topic_id = $2
            "#,
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(progress)
    }

    /// Progress rows of every topic a user owns
    pub async fn list_progress(&self, user_id: Uuid) -> Result<Vec<DbProgress>> {
        let progress = sqlx::query_as::<_, DbProgress>(
            r#"
            SELECT id, user_id, topic_id, modules_completed, flashcards_reviewed,
                   completion_percentage, total_study_time, average_score, last_studied, updated_at
            FROM progress
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(progress)
    }

    /// Quiz attempts of one progress row, oldest first
    pub async fn get_quiz_attempts(&self, progress_id: Uuid) -> Result<Vec<DbQuizAttempt>> {
        let attempts = sqlx::query_as::<_, DbQuizAttempt>(
            r#"
            SELECT id, progress_id, quiz_id, score, taken_at
            FROM quiz_attempts
            WHERE progress_id = $1
            ORDER BY taken_at, id
            "#,
        )
        .bind(progress_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }

    /// Quiz attempts of all a user's progress rows, grouped by progress id
    pub async fn get_quiz_attempts_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<Uuid, Vec<DbQuizAttempt>>> {
        let attempts = sqlx::query_as::<_, DbQuizAttempt>(
            r#"
            SELECT a.id, a.progress_id, a.quiz_id, a.score, a.taken_at
            FROM quiz_attempts a
            JOIN progress p ON p.id = a.progress_id
            WHERE p.user_id = $1
            ORDER BY a.taken_at, a.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<DbQuizAttempt>> = HashMap::new();
        for attempt in attempts {
            grouped.entry(attempt.progress_id).or_default().push(attempt);
        }
        Ok(grouped)
    }

    /// Add a module to the completed set and recompute completion
    pub async fn mark_module_complete(
        &self,
        progress_id: Uuid,
        module_id: &str,
        num_modules: i32,
    ) -> Result<DbProgress> {
        let mut tx = self.pool.begin().await?;

        let modules: Vec<String> = sqlx::query_scalar(
            r#"
            UPDATE progress
            SET modules_completed = CASE
                    WHEN $2 = ANY(modules_completed) THEN modules_completed
                    ELSE array_append(modules_completed, $2)
                END
            WHERE id = $1
            RETURNING modules_completed
            "#,
        )
        .bind(progress_id)
        .bind(module_id)
        .fetch_one(&mut *tx)
        .await?;

        let progress = sqlx::query_as::<_, DbProgress>(
            r#"
            UPDATE progress
            SET completion_percentage = $2, last_studied = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, topic_id, modules_completed, flashcards_reviewed,
                      completion_percentage, total_study_time, average_score, last_studied, updated_at
            "#,
        )
        .bind(progress_id)
        .bind(completion_percentage(modules.len(), num_modules))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(progress)
    }

    /// Append a quiz attempt and recompute the average score
    pub async fn record_quiz_score(
        &self,
        progress_id: Uuid,
        quiz_id: &str,
        score: f64,
    ) -> Result<(DbProgress, Vec<DbQuizAttempt>)> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO quiz_attempts (progress_id, quiz_id, score)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(progress_id)
        .bind(quiz_id)
        .bind(score)
        .execute(&mut *tx)
        .await?;

        let attempts = sqlx::query_as::<_, DbQuizAttempt>(
            r#"
            SELECT id, progress_id, quiz_id, score, taken_at
            FROM quiz_attempts
            WHERE progress_id = $1
            ORDER BY taken_at, id
            "#,
        )
        .bind(progress_id)
        .fetch_all(&mut *tx)
        .await?;

        let scores: Vec<f64> = attempts.iter().map(|a| a.score).collect();
        let progress = sqlx::query_as::<_, DbProgress>(
            r#"
            UPDATE progress
            SET average_score = $2, last_studied = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, topic_id, modules_completed, flashcards_reviewed,
                      completion_percentage, total_study_time, average_score, last_studied, updated_at
            "#,
        )
        .bind(progress_id)
        .bind(average_score(&scores))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((progress, attempts))
    }

    pub async fn add_flashcards_reviewed(&self, progress_id: Uuid, count: i32) -> Result<DbProgress> {
        let progress = sqlx::query_as::<_, DbProgress>(
            r#"
            UPDATE progress
            SET flashcards_reviewed = flashcards_reviewed + $2,
                last_studied = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, topic_id, modules_completed, flashcards_reviewed,
                      completion_percentage, total_study_time, average_score, last_studied, updated_at
            "#,
        )
        .bind(progress_id)
        .bind(count)
        .fetch_one(&self.pool)
        .await?;

        Ok(progress)
    }

    // === Study Session Repository ===

    /// Record a study session and add its duration to the topic's progress
    pub async fn create_study_session(
        &self,
        user_id: Uuid,
        topic_id: Uuid,
        req: &StudySessionRequest,
    ) -> Result<DbStudySession> {
        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, DbStudySession>(
            r#"
            INSERT INTO study_sessions (user_id, topic_id, session_type, content_id,
                                        duration_minutes, score, items_completed, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, topic_id, session_type, content_id, start_time, end_time,
                      duration_minutes, score, items_completed, notes
            "#,
        )
        .bind(user_id)
        .bind(topic_id)
        .bind(&req.session_type)
        .bind(&req.content_id)
        .bind(req.duration_minutes)
        .bind(req.score)
        .bind(req.items_completed)
        .bind(&req.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE progress
            SET total_study_time = total_study_time + $3,
                last_studied = NOW(),
                updated_at = NOW()
            WHERE user_id = $1 AND topic_id = $2
            "#,
        )
        .bind(user_id)
        .bind(topic_id)
        .bind(req.duration_minutes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(session)
    }
}
