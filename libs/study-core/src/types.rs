//! Core types for generated study material.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flashcard difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Cards whose difficulty was never stated are medium.
impl Default for Difficulty {
    fn default() -> Self {
        Self::Medium
    }
}

impl Difficulty {
    /// Get the difficulty label as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parse a free-form label. Anything unrecognized is easy.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "hard" => Self::Hard,
            "medium" => Self::Medium,
            _ => Self::Easy,
        }
    }
}

impl From<String> for Difficulty {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single flashcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Flashcard {
    /// Create a card with no hint.
    pub fn new(front: impl Into<String>, back: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            hint: None,
            difficulty,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Quiz question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::TrueFalse => "true_false",
            Self::ShortAnswer => "short_answer",
        }
    }

    /// Parse a label, tolerating the spellings models tend to produce.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['-', ' ', '/'], "_");
        match normalized.as_str() {
            "multiple_choice" | "mcq" => Some(Self::MultipleChoice),
            "true_false" | "truefalse" | "boolean" => Some(Self::TrueFalse),
            "short_answer" | "open" | "open_ended" => Some(Self::ShortAnswer),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quiz question with its canonical answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub points: u32,
}

/// A quiz. `total_points` and `num_questions` are always derived from
/// `questions` by the constructor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quiz {
    pub questions: Vec<Question>,
    pub total_points: u32,
    pub num_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_number: Option<usize>,
}

impl Quiz {
    pub fn new(questions: Vec<Question>) -> Self {
        let total_points = questions.iter().map(|q| q.points).sum();
        let num_questions = questions.len();
        Self {
            questions,
            total_points,
            num_questions,
            module_name: None,
            module_number: None,
        }
    }

    /// An empty quiz, used when generation fails.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[must_use]
    pub fn for_module(mut self, name: impl Into<String>, number: usize) -> Self {
        self.module_name = Some(name.into());
        self.module_number = Some(number);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Per-question grading detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_number: usize,
    pub correct: bool,
    pub user_answer: String,
    pub correct_answer: String,
    pub points_earned: u32,
}

/// Scored outcome of a quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub total_questions: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub score: u32,
    pub max_score: u32,
    pub percentage: f64,
    pub details: Vec<QuestionOutcome>,
}

/// Concepts grouped under one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicConcepts {
    pub topic: String,
    pub concepts: Vec<String>,
}

/// Structure extracted from source material by the analysis prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub main_topics: Vec<String>,
    /// Serialized as a `{topic: [concept]}` object in topic order.
    #[serde(with = "concept_map")]
    pub concepts: Vec<TopicConcepts>,
    pub difficulty: String,
    pub module_structure: Vec<String>,
}

impl Default for ContentAnalysis {
    fn default() -> Self {
        Self {
            main_topics: Vec::new(),
            concepts: Vec::new(),
            difficulty: "intermediate".to_string(),
            module_structure: Vec::new(),
        }
    }
}

impl ContentAnalysis {
    /// Module names to generate: the suggested structure, else the main
    /// topics, else a single placeholder module.
    pub fn module_names(&self) -> Vec<String> {
        if !self.module_structure.is_empty() {
            self.module_structure.clone()
        } else if !self.main_topics.is_empty() {
            self.main_topics.clone()
        } else {
            vec!["Module 1".to_string()]
        }
    }
}

mod concept_map {
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    use super::TopicConcepts;

    pub fn serialize<S: Serializer>(groups: &[TopicConcepts], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for group in groups {
            map.serialize_entry(&group.topic, &group.concepts)?;
        }
        map.end()
    }

    struct GroupsVisitor;

    impl<'de> Visitor<'de> for GroupsVisitor {
        type Value = Vec<TopicConcepts>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of topic to concept list")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut groups = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((topic, concepts)) = access.next_entry::<String, Vec<String>>()? {
                groups.push(TopicConcepts { topic, concepts });
            }
            Ok(groups)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<TopicConcepts>, D::Error> {
        deserializer.deserialize_map(GroupsVisitor)
    }
}

/// One section of a learning module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
}

/// A structured learning module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyModule {
    pub module_number: usize,
    pub module_name: String,
    pub title: String,
    pub learning_objectives: Vec<String>,
    pub introduction: String,
    pub sections: Vec<ModuleSection>,
    pub key_takeaways: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
}

impl StudyModule {
    /// Placeholder module used when generation fails.
    pub fn stub(module_name: impl Into<String>, module_number: usize) -> Self {
        let module_name = module_name.into();
        Self {
            module_number,
            title: module_name.clone(),
            module_name,
            learning_objectives: Vec::new(),
            introduction: String::new(),
            sections: Vec::new(),
            key_takeaways: Vec::new(),
            prerequisites: Vec::new(),
            estimated_time: None,
        }
    }

    /// Introduction followed by every section body, space separated.
    pub fn body_text(&self) -> String {
        let mut content = self.introduction.clone();
        for section in &self.sections {
            content.push(' ');
            content.push_str(&section.content);
        }
        content
    }
}

/// Beginner-level breakdown of a single concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptExplanation {
    pub definition: String,
    pub importance: String,
    pub example: String,
    pub misconceptions: String,
}

impl ConceptExplanation {
    /// Fallback that just restates the concept.
    pub fn fallback(concept: &str) -> Self {
        Self {
            definition: concept.to_string(),
            importance: String::new(),
            example: String::new(),
            misconceptions: String::new(),
        }
    }
}

/// Export formats for generated artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Text,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "txt" | "text" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}
