//! Renderers for generated artifacts.
//!
//! Every renderer returns the file body as a `String`; the caller decides
//! where it goes.

use serde::Serialize;

use crate::error::Result;
use crate::types::{ExportFormat, Flashcard, QuestionType, Quiz, StudyModule};

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[derive(Serialize)]
struct FlashcardDeck<'a> {
    flashcards: &'a [Flashcard],
}

/// `{"flashcards": [...]}`.
pub fn flashcards_json(cards: &[Flashcard]) -> Result<String> {
    to_json(&FlashcardDeck { flashcards: cards })
}

/// Printable card blocks.
pub fn flashcards_text(cards: &[Flashcard]) -> String {
    let mut out = String::new();
    for (i, card) in cards.iter().enumerate() {
        push_line!(out, "{}", rule());
        push_line!(out, "FLASHCARD {}", i + 1);
        push_line!(out, "{}\n", rule());
        push_line!(out, "FRONT (Question):\n{}\n", card.front);
        push_line!(out, "BACK (Answer):\n{}\n", card.back);
        if let Some(hint) = &card.hint {
            push_line!(out, "HINT: {hint}\n");
        }
        push_line!(out, "DIFFICULTY: {}\n", card.difficulty);
        out.push('\n');
    }
    out
}

/// CSV with a `front,back,hint,difficulty` header. A missing hint is an
/// empty field.
pub fn flashcards_csv(cards: &[Flashcard]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["front", "back", "hint", "difficulty"])?;
    for card in cards {
        writer.write_record([
            card.front.as_str(),
            card.back.as_str(),
            card.hint.as_deref().unwrap_or(""),
            card.difficulty.as_str(),
        ])?;
    }
    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}

/// Render flashcards in `format`.
pub fn render_flashcards(cards: &[Flashcard], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => flashcards_json(cards),
        ExportFormat::Text => Ok(flashcards_text(cards)),
        ExportFormat::Csv => flashcards_csv(cards),
    }
}

pub fn quiz_json(quiz: &Quiz) -> Result<String> {
    to_json(quiz)
}

/// Printable quiz with answers and explanations.
pub fn quiz_text(quiz: &Quiz) -> String {
    let mut out = String::new();
    push_line!(out, "{}", rule());
    match &quiz.module_name {
        Some(name) => {
            push_line!(out, "QUIZ: {name}");
        }
        None => out.push_str("QUIZ\n"),
    }
    push_line!(out, "{}\n", rule());
    push_line!(out, "Total Questions: {}", quiz.num_questions);
    push_line!(out, "Total Points: {}\n", quiz.total_points);

    for (i, question) in quiz.questions.iter().enumerate() {
        push_line!(out, "\n{}", rule());
        push_line!(out, "QUESTION {} ({} points)", i + 1, question.points);
        push_line!(out, "{}\n", rule());
        push_line!(out, "{}\n", question.text);
        push_line!(out, "Type: {}\n", question.question_type);

        if question.question_type == QuestionType::MultipleChoice && !question.options.is_empty() {
            out.push_str("Options:\n");
            for (letter, option) in ('A'..='Z').zip(&question.options) {
                push_line!(out, "  {letter}. {option}");
            }
            out.push('\n');
        }

        push_line!(out, "Correct Answer: {}\n", question.correct_answer);
        if let Some(explanation) = &question.explanation {
            push_line!(out, "Explanation: {explanation}\n");
        }
    }
    out
}

pub fn render_quiz(quiz: &Quiz, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => quiz_json(quiz),
        // Quizzes have no tabular form; CSV falls back to text.
        ExportFormat::Text | ExportFormat::Csv => Ok(quiz_text(quiz)),
    }
}

pub fn module_json(module: &StudyModule) -> Result<String> {
    to_json(module)
}

/// Human-readable module summary.
pub fn module_text(module: &StudyModule) -> String {
    let mut out = String::new();
    push_line!(out, "\n{}", rule());
    push_line!(out, "MODULE {}: {}", module.module_number, module.title);
    push_line!(out, "{}\n", rule());

    out.push_str("LEARNING OBJECTIVES:\n");
    for objective in &module.learning_objectives {
        push_line!(out, "  • {objective}");
    }

    push_line!(out, "\nINTRODUCTION:\n{}", module.introduction);

    out.push_str("\nMAIN CONTENT:\n");
    for section in &module.sections {
        match &section.title {
            Some(title) => {
                push_line!(out, "\n{title}:\n{}", section.content);
            }
            None => {
                push_line!(out, "\n{}", section.content);
            }
        }
    }

    out.push_str("\nKEY TAKEAWAYS:\n");
    for takeaway in &module.key_takeaways {
        push_line!(out, "  ✓ {takeaway}");
    }

    if let Some(time) = &module.estimated_time {
        push_line!(out, "\nEstimated Study Time: {time}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, ModuleSection, Question};
    use pretty_assertions::assert_eq;

    fn cards() -> Vec<Flashcard> {
        vec![
            Flashcard::new("What is ATP?", "Energy currency", Difficulty::Hard).with_hint("cells"),
            Flashcard::new("Define osmosis, briefly", "Water \"diffusion\"", Difficulty::Medium),
        ]
    }

    #[test]
    fn csv_has_header_and_quotes_fields() {
        let csv = flashcards_csv(&cards()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "front,back,hint,difficulty");
        assert_eq!(lines[1], "What is ATP?,Energy currency,cells,hard");
        assert_eq!(lines[2], r#""Define osmosis, briefly","Water ""diffusion""",,medium"#);
    }

    #[test]
    fn json_wraps_cards_in_object() {
        let json: serde_json::Value = serde_json::from_str(&flashcards_json(&cards()).unwrap()).unwrap();
        assert_eq!(json["flashcards"][0]["front"], "What is ATP?");
        assert_eq!(json["flashcards"][0]["difficulty"], "hard");
        assert!(json["flashcards"][1].get("hint").is_none());
    }

    #[test]
    fn text_blocks_are_numbered() {
        let text = flashcards_text(&cards());
        assert!(text.contains("FLASHCARD 1\n"));
        assert!(text.contains("FLASHCARD 2\n"));
        assert!(text.contains("HINT: cells"));
        assert_eq!(text.matches("HINT:").count(), 1);
        assert!(text.contains("DIFFICULTY: medium"));
    }

    #[test]
    fn quiz_text_lists_lettered_options() {
        let quiz = Quiz::new(vec![Question {
            text: "Capital of France?".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: vec!["Paris".to_string(), "Rome".to_string()],
            correct_answer: "Paris".to_string(),
            explanation: Some("It is.".to_string()),
            points: 2,
        }])
        .for_module("Geography", 1);

        let text = quiz_text(&quiz);
        assert!(text.contains("QUIZ: Geography"));
        assert!(text.contains("Total Questions: 1"));
        assert!(text.contains("Total Points: 2"));
        assert!(text.contains("QUESTION 1 (2 points)"));
        assert!(text.contains("  A. Paris\n  B. Rome\n"));
        assert!(text.contains("Correct Answer: Paris"));
        assert!(text.contains("Explanation: It is."));
    }

    #[test]
    fn quiz_json_carries_totals() {
        let json: serde_json::Value =
            serde_json::from_str(&quiz_json(&Quiz::empty()).unwrap()).unwrap();
        assert_eq!(json["total_points"], 0);
        assert_eq!(json["num_questions"], 0);
        assert!(json.get("module_name").is_none());
    }

    #[test]
    fn module_text_renders_sections() {
        let mut module = StudyModule::stub("Cells", 3);
        module.title = "Cell Biology".to_string();
        module.learning_objectives = vec!["Name organelles".to_string()];
        module.sections = vec![
            ModuleSection { title: Some("Membranes".to_string()), content: "Bilayer".to_string() },
            ModuleSection { title: None, content: "Loose".to_string() },
        ];
        module.key_takeaways = vec!["Cells matter".to_string()];
        module.estimated_time = Some("30 minutes".to_string());

        let text = module_text(&module);
        assert!(text.contains("MODULE 3: Cell Biology"));
        assert!(text.contains("  • Name organelles"));
        assert!(text.contains("\nMembranes:\nBilayer\n"));
        assert!(text.contains("\nLoose\n"));
        assert!(text.contains("  ✓ Cells matter"));
        assert!(text.contains("Estimated Study Time: 30 minutes"));
    }
}
