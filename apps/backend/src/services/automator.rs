//! End-to-end pipeline: sources in, study artifacts out.
//!
//! Fatal problems (no input, unreadable PDF, nothing extracted, output I/O)
//! abort with [`PipelineError`]. Generation failures and unwritable diagrams
//! degrade to empty defaults with a warning.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{stream, StreamExt as _};
use serde::{Deserialize, Serialize};
use study_core::{diagram, export, ContentAnalysis, ExportError, Flashcard, Quiz, StudyModule};
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::services::generators::{StudyGenerator, COMPREHENSIVE_QUIZ_QUESTIONS, DEFAULT_FLASHCARDS};
use crate::services::llm::{Generator, LlmError, OpenAiClient, Transcriber};
use crate::services::processors::{PdfProcessor, ProcessorError, VideoProcessor};

/// Topics that get a concept diagram.
pub const MAX_DIAGRAM_TOPICS: usize = 3;
/// Concepts drawn per diagram.
pub const MAX_DIAGRAM_CONCEPTS: usize = 6;
pub const SUMMARY_FILE: &str = "summary.json";
pub const FLASHCARDS_FILE: &str = "flashcards";
pub const COMPREHENSIVE_QUIZ_FILE: &str = "comprehensive_quiz";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Must provide at least one input source (PDF or video)")]
    NoInput,

    #[error("PDF error: {0}")]
    Pdf(#[source] ProcessorError),

    #[error("No content could be extracted from input sources")]
    NoContent,

    #[error("Could not write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Could not start LLM client: {0}")]
    Client(#[from] LlmError),
}

/// What to process.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub pdf_path: Option<PathBuf>,
    /// Local video path or http(s) URL.
    pub video_source: Option<String>,
    /// Transcribe the video's audio track.
    pub transcribe_video: bool,
}

impl PipelineInput {
    pub fn new(pdf_path: Option<PathBuf>, video_source: Option<String>) -> Self {
        Self {
            pdf_path,
            video_source,
            transcribe_video: true,
        }
    }
}

/// File names written by one run, grouped by kind. Also the body of
/// `summary.json` together with the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub analysis: ContentAnalysis,
    pub modules: Vec<String>,
    pub diagrams: Vec<String>,
    pub flashcards: Vec<String>,
    pub quizzes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineResults {
    pub output_dir: PathBuf,
    pub summary: PipelineSummary,
    pub num_modules: usize,
    pub num_flashcards: usize,
}

async fn write_file(path: PathBuf, contents: String) -> Result<(), PipelineError> {
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| PipelineError::Output { path, source })
}

pub struct Automator {
    config: PipelineConfig,
    generator: StudyGenerator,
    transcriber: Arc<dyn Transcriber>,
    pdf: PdfProcessor,
    video: VideoProcessor,
}

impl Automator {
    pub fn new(
        config: PipelineConfig,
        generator: Arc<dyn Generator>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        let video = VideoProcessor::new(config.temp_dir.clone());
        Self {
            config,
            generator: StudyGenerator::new(generator),
            transcriber,
            pdf: PdfProcessor::new(),
            video,
        }
    }

    /// Build an automator backed by the OpenAI-compatible client.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        let client = Arc::new(OpenAiClient::new(&config)?);
        Ok(Self::new(config, client.clone(), client))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Collect text from every source, analyze it and write all artifacts.
    pub async fn process_materials(
        &self,
        input: &PipelineInput,
        output_dir: Option<&Path>,
    ) -> Result<PipelineResults, PipelineError> {
        if input.pdf_path.is_none() && input.video_source.is_none() {
            return Err(PipelineError::NoInput);
        }

        let mut content = String::new();
        if let Some(pdf_path) = &input.pdf_path {
            tracing::info!("Processing PDF: {}", pdf_path.display());
            let document = self
                .pdf
                .extract_text(pdf_path)
                .await
                .map_err(PipelineError::Pdf)?;
            content.push_str(&document.text);
            content.push_str("\n\n");
        }
        if let Some(source) = &input.video_source {
            let video = self
                .video
                .process(source, input.transcribe_video, self.transcriber.as_ref())
                .await;
            content.push_str(&video.transcript);
            content.push_str("\n\n");
        }

        if content.trim().is_empty() {
            return Err(PipelineError::NoContent);
        }

        let analysis = self.analyze_content(&content).await;
        let output_dir = output_dir.unwrap_or(&self.config.output_dir);
        self.generate_study_materials(&content, analysis, output_dir).await
    }

    /// Analysis with the empty default on failure.
    pub async fn analyze_content(&self, content: &str) -> ContentAnalysis {
        tracing::info!("Analyzing content...");
        match self.generator.analyze_content(content).await {
            Ok(analysis) => {
                tracing::info!("Found {} main topics", analysis.main_topics.len());
                analysis
            }
            Err(e) => {
                tracing::warn!("Content analysis failed, continuing without it: {}", e);
                ContentAnalysis::default()
            }
        }
    }

    async fn module_with_quiz(&self, name: String, number: usize, content: &str) -> (StudyModule, Quiz) {
        let module = match self.generator.generate_module(&name, number, content).await {
            Ok(module) => module,
            Err(e) => {
                tracing::warn!("Module {} generation failed: {}", number, e);
                StudyModule::stub(name, number)
            }
        };
        let quiz = match self.generator.generate_module_quiz(&module, "mixed").await {
            Ok(quiz) => quiz,
            Err(e) => {
                tracing::warn!("Quiz for module {} failed: {}", number, e);
                Quiz::empty().for_module(module.title.clone(), number)
            }
        };
        (module, quiz)
    }

    /// Generate and write every artifact into `output_dir`.
    pub async fn generate_study_materials(
        &self,
        content: &str,
        analysis: ContentAnalysis,
        output_dir: &Path,
    ) -> Result<PipelineResults, PipelineError> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| PipelineError::Output {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let mut summary = PipelineSummary {
            analysis,
            modules: Vec::new(),
            diagrams: Vec::new(),
            flashcards: Vec::new(),
            quizzes: Vec::new(),
        };

        tracing::info!("Generating learning modules...");
        let names = summary.analysis.module_names();
        let num_modules = names.len();
        let generated: Vec<(StudyModule, Quiz)> = stream::iter(names.into_iter().enumerate())
            .map(|(idx, name)| self.module_with_quiz(name, idx + 1, content))
            .buffered(self.config.generation_concurrency)
            .collect()
            .await;

        for (module, quiz) in &generated {
            let i = module.module_number;
            let module_file = format!("module_{i}.txt");
            write_file(output_dir.join(&module_file), export::module_text(module)).await?;
            write_file(output_dir.join(format!("module_{i}.json")), export::module_json(module)?).await?;
            summary.modules.push(module_file);
            tracing::info!("  Created module {}: {}", i, module.title);

            let quiz_file = format!("module_{i}_quiz.txt");
            write_file(output_dir.join(&quiz_file), export::quiz_text(quiz)).await?;
            write_file(output_dir.join(format!("module_{i}_quiz.json")), export::quiz_json(quiz)?).await?;
            summary.quizzes.push(quiz_file);
        }

        tracing::info!("Generating concept diagrams...");
        let mut diagram_names = HashSet::new();
        for group in summary
            .analysis
            .concepts
            .iter()
            .filter(|g| !g.concepts.is_empty())
            .take(MAX_DIAGRAM_TOPICS)
        {
            let shown = &group.concepts[..group.concepts.len().min(MAX_DIAGRAM_CONCEPTS)];
            let file = diagram::unique_diagram_file_name(&group.topic, &mut diagram_names);
            match write_file(output_dir.join(&file), diagram::concept_map(&group.topic, shown)).await {
                Ok(()) => {
                    tracing::info!("  Created diagram: {}", group.topic);
                    summary.diagrams.push(file);
                }
                Err(e) => tracing::warn!("Diagram for {} failed: {}", group.topic, e),
            }
        }

        tracing::info!("Generating flashcards...");
        let flashcards = self.flashcards(content).await;
        if !flashcards.is_empty() {
            let text_file = format!("{FLASHCARDS_FILE}.txt");
            write_file(output_dir.join(&text_file), export::flashcards_text(&flashcards)).await?;
            write_file(
                output_dir.join(format!("{FLASHCARDS_FILE}.json")),
                export::flashcards_json(&flashcards)?,
            )
            .await?;
            write_file(
                output_dir.join(format!("{FLASHCARDS_FILE}.csv")),
                export::flashcards_csv(&flashcards)?,
            )
            .await?;
            summary.flashcards.push(text_file);
            tracing::info!("  Created {} flashcards", flashcards.len());
        }

        tracing::info!("Generating comprehensive quiz...");
        let overall = match self
            .generator
            .generate_quiz(content, COMPREHENSIVE_QUIZ_QUESTIONS)
            .await
        {
            Ok(quiz) => quiz,
            Err(e) => {
                tracing::warn!("Comprehensive quiz failed: {}", e);
                Quiz::empty()
            }
        };
        let quiz_file = format!("{COMPREHENSIVE_QUIZ_FILE}.txt");
        write_file(output_dir.join(&quiz_file), export::quiz_text(&overall)).await?;
        write_file(
            output_dir.join(format!("{COMPREHENSIVE_QUIZ_FILE}.json")),
            export::quiz_json(&overall)?,
        )
        .await?;
        summary.quizzes.push(quiz_file);
        tracing::info!("  Created comprehensive quiz with {} questions", overall.num_questions);

        let summary_json = serde_json::to_string_pretty(&summary).map_err(ExportError::from)?;
        write_file(output_dir.join(SUMMARY_FILE), summary_json).await?;

        tracing::info!(
            "All materials saved to {}: {} modules, {} diagrams, {} flashcard sets, {} quizzes",
            output_dir.display(),
            summary.modules.len(),
            summary.diagrams.len(),
            summary.flashcards.len(),
            summary.quizzes.len()
        );

        Ok(PipelineResults {
            output_dir: output_dir.to_path_buf(),
            summary,
            num_modules,
            num_flashcards: flashcards.len(),
        })
    }

    async fn flashcards(&self, content: &str) -> Vec<Flashcard> {
        match self.generator.generate_flashcards(content, DEFAULT_FLASHCARDS).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!("Flashcard generation failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::GenerationRequest;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use study_core::TopicConcepts;

    /// Routes prompts to canned replies by their system message.
    struct ScriptedGenerator {
        fail_all: bool,
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, request: GenerationRequest) -> Result<Value, LlmError> {
            if self.fail_all {
                return Err(LlmError::EmptyResponse);
            }
            let system = request.system.as_str();
            let reply = if system.contains("analyzing study materials") {
                json!({
                    "main_topics": ["Cells", "Energy"],
                    "concepts": {"Cells": ["membrane", "nucleus"], "Energy": ["ATP"], "Empty": []},
                    "difficulty": "beginner",
                    "module_structure": ["Cell Basics", "Cell Energy"]
                })
            } else if system.contains("curriculum designer") {
                json!({"title": "Generated", "introduction": "Intro", "sections": [{"title": "S", "content": "C"}]})
            } else if system.contains("module assessments") {
                json!({"questions": [{"question": "Q?", "type": "short_answer", "answer": "A", "points": 2}]})
            } else if system.contains("flashcards") {
                json!({"flashcards": [{"front": "F", "back": "B", "difficulty": "hard"}]})
            } else {
                json!({"quiz": {"questions": [{"question": "Overall?", "answer": "Yes"}]}})
            };
            Ok(reply)
        }
    }

    struct NoTranscriber;

    #[async_trait]
    impl Transcriber for NoTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String, LlmError> {
            Err(LlmError::EmptyResponse)
        }
    }

    fn automator(fail_all: bool, dir: &Path) -> Automator {
        let config = PipelineConfig {
            openai_api_key: "test".to_string(),
            openai_model: "gpt-4".to_string(),
            openai_temperature: 0.7,
            openai_base_url: "http://localhost".to_string(),
            output_dir: dir.join("output"),
            temp_dir: dir.join("temp"),
            generation_concurrency: 2,
        };
        Automator::new(config, Arc::new(ScriptedGenerator { fail_all }), Arc::new(NoTranscriber))
    }

    #[tokio::test]
    async fn test_no_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = automator(false, dir.path())
            .process_materials(&PipelineInput::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoInput));
    }

    #[tokio::test]
    async fn test_missing_pdf_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = PipelineInput::new(Some(dir.path().join("nope.pdf")), None);
        let err = automator(false, dir.path())
            .process_materials(&input, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Pdf(ProcessorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_untranscribable_video_means_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let input = PipelineInput::new(None, Some(dir.path().join("lecture.mp4").display().to_string()));
        let err = automator(false, dir.path())
            .process_materials(&input, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoContent));
    }

    #[tokio::test]
    async fn test_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let analysis = automator(false, dir.path()).analyze_content("text").await;
        let results = automator(false, dir.path())
            .generate_study_materials("Some study text", analysis, &out)
            .await
            .unwrap();

        assert_eq!(results.num_modules, 2);
        assert_eq!(results.num_flashcards, 1);
        assert_eq!(results.summary.modules, vec!["module_1.txt", "module_2.txt"]);
        assert_eq!(
            results.summary.quizzes,
            vec!["module_1_quiz.txt", "module_2_quiz.txt", "comprehensive_quiz.txt"]
        );
        assert_eq!(results.summary.diagrams, vec!["diagram_Cells.svg", "diagram_Energy.svg"]);
        assert_eq!(results.summary.flashcards, vec!["flashcards.txt"]);

        for file in [
            "module_1.json",
            "module_2_quiz.json",
            "flashcards.json",
            "flashcards.csv",
            "comprehensive_quiz.json",
            "summary.json",
        ] {
            assert!(out.join(file).exists(), "{file} missing");
        }

        let module: Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("module_2.json")).unwrap()).unwrap();
        assert_eq!(module["module_name"], "Cell Energy");
        assert_eq!(module["module_number"], 2);

        let summary: PipelineSummary =
            serde_json::from_str(&std::fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
        assert_eq!(summary, results.summary);
    }

    #[tokio::test]
    async fn test_diagram_names_are_distinct_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let long_topic = "Photosynthesis ".repeat(40);
        let analysis = ContentAnalysis {
            concepts: vec![
                TopicConcepts { topic: "Cells!".to_string(), concepts: vec!["membrane".to_string()] },
                TopicConcepts { topic: "Cells?".to_string(), concepts: vec!["nucleus".to_string()] },
                TopicConcepts { topic: long_topic, concepts: vec!["light".to_string()] },
            ],
            ..ContentAnalysis::default()
        };

        let results = automator(false, dir.path())
            .generate_study_materials("Some study text", analysis, &out)
            .await
            .unwrap();

        let diagrams = &results.summary.diagrams;
        assert_eq!(diagrams.len(), 3);
        assert_eq!(diagrams[0], "diagram_Cells_.svg");
        assert_eq!(diagrams[1], "diagram_Cells__2.svg");
        for file in diagrams {
            assert!(out.join(file).exists(), "{file} missing");
        }
        let first = std::fs::read_to_string(out.join(&diagrams[0])).unwrap();
        assert!(first.contains("Cells!"));
        let second = std::fs::read_to_string(out.join(&diagrams[1])).unwrap();
        assert!(second.contains("Cells?"));
    }

    #[tokio::test]
    async fn test_generation_failures_degrade_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let auto = automator(true, dir.path());
        let analysis = auto.analyze_content("text").await;
        assert_eq!(analysis, ContentAnalysis::default());

        let results = auto
            .generate_study_materials("Some study text", analysis, &out)
            .await
            .unwrap();

        // One placeholder module, its empty quiz and an empty comprehensive quiz.
        assert_eq!(results.summary.modules, vec!["module_1.txt"]);
        assert_eq!(results.summary.quizzes.len(), 2);
        assert!(results.summary.flashcards.is_empty());
        assert!(results.summary.diagrams.is_empty());

        let module = std::fs::read_to_string(out.join("module_1.txt")).unwrap();
        assert!(module.contains("MODULE 1: Module 1"));
        let quiz: Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("comprehensive_quiz.json")).unwrap()).unwrap();
        assert_eq!(quiz["num_questions"], 0);
    }
}
