//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext for setting up the app with a database and a stub model
//! - Helper functions for creating users and processed topics
//! - Authentication helpers
//!
//! # Requirements
//! Tests using `TestContext::new` require a PostgreSQL database
//! (set DATABASE_URL env var). `TestContext::without_database` never connects.

#![allow(dead_code)]

pub mod fixtures;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use uuid::Uuid;

use study_automator_backend::config::{PipelineConfig, ServerConfig};
use study_automator_backend::db::Database;
use study_automator_backend::models::{DbTopic, NewTopic};
use study_automator_backend::services::auth::{generate_token, hash_password, hash_token};
use study_automator_backend::services::automator::Automator;
use study_automator_backend::services::llm::{GenerationRequest, Generator, LlmError, Transcriber};
use study_automator_backend::{build_router, AppState};

/// Model stand-in that answers every prompt from the canned fixtures.
pub struct StubGenerator;

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Value, LlmError> {
        Ok(fixtures::canned_reply(&request.system))
    }
}

pub struct StubTranscriber;

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<String, LlmError> {
        Ok(fixtures::SAMPLE_TRANSCRIPT.to_string())
    }
}

/// Test context containing database connection and test router.
pub struct TestContext {
    pub db: Arc<Database>,
    pub automator: Arc<Automator>,
    pub workdir: TempDir,
    app: Router,
}

impl TestContext {
    /// Create a new test context against the database in DATABASE_URL.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        Self::with_database(db, &database_url)
    }

    /// Context whose pool never connects. Only for requests rejected
    /// before any query runs.
    pub fn without_database() -> Self {
        let url = "postgres://localhost/unused";
        let db = Database::connect_lazy(url).expect("Lazy pool from a valid URL");
        Self::with_database(db, url)
    }

    fn with_database(db: Database, database_url: &str) -> Self {
        let workdir = tempfile::tempdir().expect("Failed to create temp dir");
        let pipeline = PipelineConfig {
            openai_api_key: "test-key".to_string(),
            openai_model: "gpt-4".to_string(),
            openai_temperature: 0.7,
            openai_base_url: "http://localhost:9".to_string(),
            output_dir: workdir.path().join("output"),
            temp_dir: workdir.path().join("temp"),
            generation_concurrency: 2,
        };
        let config = ServerConfig {
            database_url: database_url.to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            upload_folder: workdir.path().join("uploads"),
            max_upload_bytes: fixtures::TEST_UPLOAD_LIMIT,
            pipeline: pipeline.clone(),
        };

        let automator = Arc::new(Automator::new(
            pipeline,
            Arc::new(StubGenerator),
            Arc::new(StubTranscriber),
        ));
        let db = Arc::new(db);

        let state = AppState {
            db: db.clone(),
            automator: automator.clone(),
            config: Arc::new(config),
        };

        Self {
            db,
            automator,
            workdir,
            app: build_router(state),
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Create a user with a unique email and a live session.
    /// Returns the user ID and its access token.
    pub async fn create_test_user(&self) -> (Uuid, String) {
        let email = fixtures::unique_email();
        let hash = hash_password(fixtures::TEST_PASSWORD).expect("Failed to hash password");
        let user = self
            .db
            .create_user(&email, "Test User", &hash)
            .await
            .expect("Failed to create test user")
            .expect("Fresh email was already taken");

        let access_token = generate_token();
        let now = chrono::Utc::now();
        self.db
            .create_session(
                user.id,
                &hash_token(&access_token),
                &hash_token(&generate_token()),
                now + chrono::Duration::hours(1),
                now + chrono::Duration::days(30),
            )
            .await
            .expect("Failed to create test session");

        (user.id, access_token)
    }

    /// Run the pipeline on sample text and store the result as a topic.
    pub async fn create_test_topic(&self, user_id: Uuid) -> DbTopic {
        let output_dir = self
            .workdir
            .path()
            .join(format!("topic_{}", Uuid::new_v4().simple()));
        let analysis = self.automator.analyze_content(fixtures::SAMPLE_TEXT).await;
        let results = self
            .automator
            .generate_study_materials(fixtures::SAMPLE_TEXT, analysis, &output_dir)
            .await
            .expect("Failed to generate study materials");
        let summary = &results.summary;

        let topic = NewTopic {
            name: "Cell Biology".to_string(),
            description: Some("Test topic".to_string()),
            pdf_filename: Some("notes.pdf".to_string()),
            video_url: None,
            output_directory: output_dir.to_string_lossy().into_owned(),
            num_modules: summary.modules.len() as i32,
            num_diagrams: summary.diagrams.len() as i32,
            num_flashcards: results.num_flashcards as i32,
            num_quizzes: summary.quizzes.len() as i32,
            topics_covered: summary.analysis.main_topics.clone(),
        };
        self.db
            .create_topic(user_id, &topic)
            .await
            .expect("Failed to create test topic")
    }

    /// Format authorization header value.
    pub fn auth_header_value(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Remove a user and everything it owns.
    pub async fn cleanup_user(&self, user_id: Uuid) {
        // Sessions, topics, progress and study sessions cascade from users
        let _ = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;
    }

    pub async fn cleanup_user_by_email(&self, email: &str) {
        let _ = sqlx::query("DELETE FROM users WHERE email = $1")
            .bind(email)
            .execute(self.db.pool())
            .await;
    }
}
