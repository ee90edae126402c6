//! Reshaping of loosely structured model output into typed values.
//!
//! Generated JSON rarely matches one schema exactly: keys drift
//! (`question` vs `front`), values arrive as the wrong scalar type and whole
//! sections go missing. Every function here is total and fills documented
//! defaults instead of failing.

use serde_json::{Map, Value};

use crate::types::{
    ConceptExplanation, ContentAnalysis, Difficulty, Flashcard, ModuleSection, Question,
    QuestionType, Quiz, StudyModule, TopicConcepts,
};

/// Render a scalar as text. Booleans use the capitalized spelling quiz
/// answers are written in.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First present, non-null key among `keys`, rendered as text.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
        .and_then(scalar_to_string)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Find the array stored under `key`, or treat `value` itself as the array.
fn array_under<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get(key) {
            Some(Value::Array(items)) => items,
            _ => &[],
        },
        _ => &[],
    }
}

/// Reshape one flashcard object.
pub fn flashcard_from_value(value: &Value) -> Option<Flashcard> {
    let obj = value.as_object()?;
    let difficulty = match text_field(obj, &["difficulty"]) {
        Some(label) => Difficulty::from_label(&label),
        None => Difficulty::default(),
    };
    Some(Flashcard {
        front: text_field(obj, &["front", "question"]).unwrap_or_default(),
        back: text_field(obj, &["back", "answer"]).unwrap_or_default(),
        hint: non_empty(text_field(obj, &["hint", "mnemonic"])),
        difficulty,
    })
}

/// Reshape a `{"flashcards": [...]}` response (or a bare array).
pub fn flashcards_from_value(value: &Value) -> Vec<Flashcard> {
    array_under(value, "flashcards")
        .iter()
        .filter_map(flashcard_from_value)
        .collect()
}

/// Reshape one question object.
pub fn question_from_value(value: &Value) -> Option<Question> {
    let obj = value.as_object()?;
    let options = string_list(obj.get("options"));
    let question_type = text_field(obj, &["type", "question_type"])
        .and_then(|label| QuestionType::from_label(&label))
        .unwrap_or(if options.is_empty() {
            QuestionType::ShortAnswer
        } else {
            QuestionType::MultipleChoice
        });
    let points = obj
        .get("points")
        .and_then(|p| p.as_u64().or_else(|| p.as_f64().map(|f| f.round() as u64)))
        .map(|p| p.clamp(1, u64::from(u32::MAX)) as u32)
        .unwrap_or(1);

    Some(Question {
        text: text_field(obj, &["question", "text"]).unwrap_or_default(),
        question_type,
        options,
        correct_answer: text_field(obj, &["correct_answer", "answer"]).unwrap_or_default(),
        explanation: non_empty(text_field(obj, &["explanation"])),
        points,
    })
}

/// Reshape a quiz response. Accepts `{"quiz": {"questions": [...]}}`,
/// `{"questions": [...]}` or a bare array of questions.
pub fn quiz_from_value(value: &Value) -> Quiz {
    let quiz = match value.get("quiz") {
        Some(inner) if inner.get("questions").is_some() => inner,
        _ => value,
    };
    let questions = array_under(quiz, "questions")
        .iter()
        .filter_map(question_from_value)
        .collect();
    Quiz::new(questions)
}

/// Reshape the analysis response.
pub fn analysis_from_value(value: &Value) -> ContentAnalysis {
    let mut analysis = ContentAnalysis::default();
    let Some(obj) = value.as_object() else {
        return analysis;
    };

    analysis.main_topics = string_list(obj.get("main_topics"));
    analysis.module_structure = string_list(obj.get("module_structure"));
    if let Some(difficulty) = non_empty(text_field(obj, &["difficulty"])) {
        analysis.difficulty = difficulty;
    }
    if let Some(Value::Object(concepts)) = obj.get("concepts") {
        analysis.concepts = concepts
            .iter()
            .map(|(topic, list)| TopicConcepts {
                topic: topic.clone(),
                concepts: string_list(Some(list)),
            })
            .collect();
    }
    analysis
}

fn section_from_value(value: &Value) -> Option<ModuleSection> {
    match value {
        Value::Object(obj) => Some(ModuleSection {
            title: Some(text_field(obj, &["title", "name"]).unwrap_or_else(|| "Section".to_string())),
            content: text_field(obj, &["content", "text"]).unwrap_or_default(),
        }),
        Value::String(s) => Some(ModuleSection {
            title: None,
            content: s.clone(),
        }),
        _ => None,
    }
}

/// Reshape a module response, stamping the requested name and number.
pub fn module_from_value(value: &Value, module_name: &str, module_number: usize) -> StudyModule {
    let mut module = StudyModule::stub(module_name, module_number);
    let Some(obj) = value.get("module").and_then(Value::as_object).or_else(|| value.as_object())
    else {
        return module;
    };

    if let Some(title) = non_empty(text_field(obj, &["title", "module_title"])) {
        module.title = title;
    }
    module.learning_objectives = string_list(obj.get("learning_objectives"));
    module.introduction = text_field(obj, &["introduction"]).unwrap_or_default();
    module.sections = match obj.get("sections") {
        Some(Value::Array(items)) => items.iter().filter_map(section_from_value).collect(),
        _ => Vec::new(),
    };
    module.key_takeaways = string_list(obj.get("key_takeaways"));
    module.prerequisites = string_list(obj.get("prerequisites"));
    module.estimated_time = non_empty(text_field(obj, &["estimated_time", "estimated_study_time"]));
    module
}

/// Reshape a `{"concepts": [...]}` response.
pub fn concepts_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(_) => string_list(Some(value)),
        _ => string_list(value.get("concepts")),
    }
}

/// Reshape a concept explanation, falling back to the bare concept.
pub fn explanation_from_value(value: &Value, concept: &str) -> ConceptExplanation {
    let Some(obj) = value.as_object() else {
        return ConceptExplanation::fallback(concept);
    };
    ConceptExplanation {
        definition: text_field(obj, &["definition", "simple_definition"])
            .unwrap_or_else(|| concept.to_string()),
        importance: text_field(obj, &["importance", "why_it_matters"]).unwrap_or_default(),
        example: text_field(obj, &["example", "analogy"]).unwrap_or_default(),
        misconceptions: text_field(obj, &["misconceptions", "common_misconceptions"])
            .unwrap_or_default(),
    }
}

/// Reshape a concept -> related concepts map, keeping document order.
pub fn relationships_from_value(value: &Value) -> Vec<TopicConcepts> {
    match value {
        Value::Object(obj) => obj
            .iter()
            .map(|(topic, related)| TopicConcepts {
                topic: topic.clone(),
                concepts: string_list(Some(related)),
            })
            .collect(),
        _ => Vec::new(),
    }
}
