//! Command-line front end for the study material pipeline.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};

use study_automator_backend::config::{load_env_file, PipelineConfig};
use study_automator_backend::init_tracing;
use study_automator_backend::services::automator::{Automator, PipelineInput};

/// Convert PDFs and videos into structured study materials.
#[derive(Parser, Debug)]
#[command(name = "study-automator", version)]
#[command(group(ArgGroup::new("source").required(true).multiple(true).args(["pdf", "video"])))]
#[command(after_help = "Examples:
  study-automator --pdf notes.pdf
  study-automator --video https://youtube.com/watch?v=example
  study-automator --pdf notes.pdf --video lecture.mp4 -o my_study_materials")]
struct Cli {
    /// Path to a PDF of class notes
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Path to a video file or a video URL
    #[arg(long)]
    video: Option<String>,

    /// Output directory for generated materials [default: OUTPUT_DIR or "output"]
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Path to a .env configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip audio extraction and transcription for videos
    #[arg(long)]
    no_video_audio: bool,
}

impl Cli {
    fn input(&self) -> PipelineInput {
        PipelineInput {
            pdf_path: self.pdf.clone(),
            video_source: self.video.clone(),
            transcribe_video: !self.no_video_audio,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    load_env_file(cli.config.as_deref())?;
    init_tracing();

    let mut config = PipelineConfig::from_env()
        .context("Configuration error; set OPENAI_API_KEY in the environment or a .env file")?;
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    config.ensure_dirs()?;

    let automator = Automator::from_config(config)?;
    let results = automator.process_materials(&cli.input(), None).await?;
    let summary = &results.summary;

    println!("Study materials generated in {}", results.output_dir.display());
    println!("  Modules:    {}", summary.modules.len());
    println!("  Diagrams:   {}", summary.diagrams.len());
    println!("  Flashcards: {}", results.num_flashcards);
    println!("  Quizzes:    {}", summary.quizzes.len());
    if !summary.analysis.main_topics.is_empty() {
        println!("  Topics:     {}", summary.analysis.main_topics.join(", "));
    }

    Ok(())
}
