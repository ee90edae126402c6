//! Video download, audio extraction and transcription.
//!
//! Shells out to `yt-dlp`, `ffmpeg` and `ffprobe`; transcription goes
//! through a [`Transcriber`].

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tempfile::TempDir;
use tokio::process::Command;

use super::ProcessorError;
use crate::services::llm::Transcriber;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub source: String,
    pub title: Option<String>,
    /// Seconds.
    pub duration: Option<f64>,
    pub description: Option<String>,
}

impl VideoInfo {
    fn unknown(source: &str) -> Self {
        Self {
            source: source.to_string(),
            title: None,
            duration: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoContent {
    pub metadata: VideoInfo,
    /// Empty when audio could not be transcribed.
    pub transcript: String,
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Read title, duration and description from `yt-dlp --dump-json` output.
pub fn parse_ytdlp_info(source: &str, info: &Value) -> VideoInfo {
    VideoInfo {
        source: source.to_string(),
        title: info.get("title").and_then(Value::as_str).map(str::to_string),
        duration: info.get("duration").and_then(Value::as_f64),
        description: info
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

async fn run_tool<I, S>(tool: &'static str, args: I) -> Result<String, ProcessorError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = Command::new(tool)
        .args(args)
        .output()
        .await
        .map_err(|e| ProcessorError::Tool {
            tool,
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ProcessorError::Tool {
            tool,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, Clone)]
pub struct VideoProcessor {
    temp_dir: PathBuf,
}

impl VideoProcessor {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// Fresh scratch directory under the temp directory, removed on drop.
    pub async fn scratch_dir(&self) -> Result<TempDir, ProcessorError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        Ok(tempfile::Builder::new()
            .prefix("video_")
            .tempdir_in(&self.temp_dir)?)
    }

    /// Download a video into `work_dir` and return its path.
    pub async fn download_video(&self, url: &str, work_dir: &Path) -> Result<PathBuf, ProcessorError> {
        let template = work_dir.join("downloaded_video.%(ext)s");
        let stdout = run_tool(
            "yt-dlp",
            [
                OsStr::new("-f"),
                OsStr::new("best"),
                OsStr::new("-o"),
                template.as_os_str(),
                OsStr::new("--print"),
                OsStr::new("after_move:filepath"),
                OsStr::new("--quiet"),
                OsStr::new("--no-warnings"),
                OsStr::new(url),
            ],
        )
        .await?;

        stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| ProcessorError::Tool {
                tool: "yt-dlp",
                message: "no output file reported".to_string(),
            })
    }

    /// Extract mp3 audio into `work_dir`. If ffmpeg fails the video path
    /// itself is returned, since the transcription endpoint accepts most
    /// video containers.
    pub async fn extract_audio(&self, video_path: &Path, work_dir: &Path) -> Result<PathBuf, ProcessorError> {
        if !tokio::fs::try_exists(video_path).await.unwrap_or(false) {
            return Err(ProcessorError::NotFound(video_path.to_path_buf()));
        }
        let audio_path = work_dir.join("audio.mp3");

        let result = run_tool(
            "ffmpeg",
            [
                OsStr::new("-y"),
                OsStr::new("-i"),
                video_path.as_os_str(),
                OsStr::new("-vn"),
                OsStr::new("-acodec"),
                OsStr::new("libmp3lame"),
                OsStr::new("-q:a"),
                OsStr::new("2"),
                audio_path.as_os_str(),
            ],
        )
        .await;

        match result {
            Ok(_) => Ok(audio_path),
            Err(e) => {
                tracing::warn!("Could not extract audio, sending video instead: {}", e);
                Ok(video_path.to_path_buf())
            }
        }
    }

    /// Metadata for a URL or local file. Lookup failures leave fields empty.
    pub async fn get_video_info(&self, source: &str) -> VideoInfo {
        if is_url(source) {
            let info = run_tool("yt-dlp", ["--dump-json", "--skip-download", "--no-warnings", source])
                .await
                .and_then(|out| {
                    serde_json::from_str::<Value>(&out).map_err(|e| ProcessorError::Tool {
                        tool: "yt-dlp",
                        message: e.to_string(),
                    })
                });
            match info {
                Ok(info) => parse_ytdlp_info(source, &info),
                Err(e) => {
                    tracing::warn!("Could not extract video info: {}", e);
                    VideoInfo::unknown(source)
                }
            }
        } else {
            let mut info = VideoInfo::unknown(source);
            info.title = Path::new(source)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            let probe = run_tool(
                "ffprobe",
                [
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                    source,
                ],
            )
            .await;
            match probe {
                Ok(out) => info.duration = out.trim().parse().ok(),
                Err(e) => tracing::warn!("Could not get video info: {}", e),
            }
            info
        }
    }

    /// Collect metadata and, when `extract_audio` is set, a transcript.
    /// Audio failures are logged and leave the transcript empty.
    pub async fn process(
        &self,
        source: &str,
        extract_audio: bool,
        transcriber: &dyn Transcriber,
    ) -> VideoContent {
        tracing::info!("Processing video: {}", source);
        let metadata = self.get_video_info(source).await;
        let mut content = VideoContent {
            metadata,
            transcript: String::new(),
        };

        if extract_audio {
            match self.transcribe_source(source, transcriber).await {
                Ok(transcript) => {
                    tracing::info!("Transcribed {} characters", transcript.chars().count());
                    content.transcript = transcript;
                }
                Err(e) => tracing::warn!("Could not process video audio: {}", e),
            }
        }
        content
    }

    /// Download, extract and transcribe inside a scratch directory of its own.
    /// The directory and everything in it is removed before returning.
    async fn transcribe_source(
        &self,
        source: &str,
        transcriber: &dyn Transcriber,
    ) -> Result<String, ProcessorError> {
        let scratch = self.scratch_dir().await?;

        let video_path = if is_url(source) {
            tracing::info!("Downloading video...");
            self.download_video(source, scratch.path()).await?
        } else {
            PathBuf::from(source)
        };

        tracing::info!("Extracting audio...");
        let audio_path = self.extract_audio(&video_path, scratch.path()).await?;

        tracing::info!("Transcribing audio...");
        let transcript = transcriber.transcribe(&audio_path).await?;

        if let Err(e) = scratch.close() {
            tracing::warn!("Could not remove scratch directory: {}", e);
        }
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedTranscriber;

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<String, LlmError> {
            Ok("hello".to_string())
        }
    }

    /// Remembers every path it was asked to transcribe.
    #[derive(Default)]
    struct RecordingTranscriber {
        paths: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Transcriber for RecordingTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<String, LlmError> {
            self.paths.lock().unwrap().push(audio_path.to_path_buf());
            Ok(format!("transcript of {}", audio_path.display()))
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/v"));
        assert!(is_url("http://example.com/v"));
        assert!(!is_url("ftp://example.com/v"));
        assert!(!is_url("lecture.mp4"));
    }

    #[test]
    fn test_parse_ytdlp_info() {
        let info = parse_ytdlp_info(
            "https://example.com/v",
            &serde_json::json!({"title": "Lecture 1", "duration": 3600, "description": "Intro"}),
        );
        assert_eq!(info.title.as_deref(), Some("Lecture 1"));
        assert_eq!(info.duration, Some(3600.0));
        assert_eq!(info.description.as_deref(), Some("Intro"));
    }

    #[test]
    fn test_parse_ytdlp_info_missing_fields() {
        let info = parse_ytdlp_info("u", &serde_json::json!({}));
        assert_eq!(info, VideoInfo::unknown("u"));
    }

    #[tokio::test]
    async fn test_extract_audio_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let processor = VideoProcessor::new(dir.path());
        let err = processor
            .extract_audio(&dir.path().join("missing.mp4"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_local_video_leaves_transcript_empty() {
        let dir = tempfile::tempdir().unwrap();
        let processor = VideoProcessor::new(dir.path());
        let source = dir.path().join("missing.mp4");
        let content = processor
            .process(&source.to_string_lossy(), true, &FixedTranscriber)
            .await;
        assert_eq!(content.transcript, "");
        assert_eq!(content.metadata.title.as_deref(), Some("missing.mp4"));
    }

    #[tokio::test]
    async fn test_scratch_dirs_are_unique_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("temp");
        let processor = VideoProcessor::new(&temp);

        let first = processor.scratch_dir().await.unwrap();
        let second = processor.scratch_dir().await.unwrap();
        assert_ne!(first.path(), second.path());
        assert!(first.path().starts_with(&temp));
        assert_ne!(first.path().join("audio.mp3"), second.path().join("audio.mp3"));

        let first_path = first.path().to_path_buf();
        drop(first);
        assert!(!first_path.exists());
        assert_eq!(entries(&temp), 1);
    }

    #[tokio::test]
    async fn test_concurrent_transcriptions_leave_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("temp");
        let processor = VideoProcessor::new(&temp);
        let lecture_a = dir.path().join("lecture_a.mp4");
        let lecture_b = dir.path().join("lecture_b.mp4");
        std::fs::write(&lecture_a, b"not really a video").unwrap();
        std::fs::write(&lecture_b, b"not really a video either").unwrap();
        let transcriber = RecordingTranscriber::default();

        let lecture_a_src = lecture_a.to_string_lossy();
        let lecture_b_src = lecture_b.to_string_lossy();
        let (a, b) = tokio::join!(
            processor.transcribe_source(&lecture_a_src, &transcriber),
            processor.transcribe_source(&lecture_b_src, &transcriber),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a, b);

        let paths = transcriber.paths.lock().unwrap();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);
        assert_eq!(entries(&temp), 0);
    }
}
