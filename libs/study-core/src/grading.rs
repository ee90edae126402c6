//! Quiz grading.

use std::collections::HashMap;

use crate::types::{GradingResult, QuestionOutcome, Quiz};

/// Normalize an answer for comparison (trim and lowercase).
fn normalize_answer(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Whether a submitted answer matches the canonical one.
pub fn answers_match(submitted: &str, correct: &str) -> bool {
    normalize_answer(submitted) == normalize_answer(correct)
}

/// Grade a quiz attempt.
///
/// `answers` maps 1-based question numbers to submitted answers. Questions
/// without an entry are graded as an incorrect empty answer.
pub fn grade_quiz(quiz: &Quiz, answers: &HashMap<usize, String>) -> GradingResult {
    let mut correct = 0;
    let mut score = 0;
    let mut details = Vec::with_capacity(quiz.questions.len());

    for (idx, question) in quiz.questions.iter().enumerate() {
        let question_number = idx + 1;
        let user_answer = answers.get(&question_number).cloned().unwrap_or_default();
        let is_correct = answers_match(&user_answer, &question.correct_answer);

        let points_earned = if is_correct { question.points } else { 0 };
        if is_correct {
            correct += 1;
            score += points_earned;
        }

        details.push(QuestionOutcome {
            question_number,
            correct: is_correct,
            user_answer,
            correct_answer: question.correct_answer.clone(),
            points_earned,
        });
    }

    let max_score = quiz.total_points;
    let percentage = if max_score > 0 {
        f64::from(score) / f64::from(max_score) * 100.0
    } else {
        0.0
    };

    GradingResult {
        total_questions: quiz.questions.len(),
        correct,
        incorrect: quiz.questions.len() - correct,
        score,
        max_score,
        percentage,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Question, QuestionType};
    use pretty_assertions::assert_eq;

    fn question(answer: &str, points: u32) -> Question {
        Question {
            text: "?".to_string(),
            question_type: QuestionType::ShortAnswer,
            options: vec![],
            correct_answer: answer.to_string(),
            explanation: None,
            points,
        }
    }

    fn capital_quiz() -> Quiz {
        Quiz::new(vec![question("Paris", 2), question("True", 1)])
    }

    #[test]
    fn grades_case_insensitively() {
        let answers = HashMap::from([(1, "paris".to_string()), (2, "false".to_string())]);
        let result = grade_quiz(&capital_quiz(), &answers);

        assert_eq!(result.total_questions, 2);
        assert_eq!(result.correct, 1);
        assert_eq!(result.incorrect, 1);
        assert_eq!(result.score, 2);
        assert_eq!(result.max_score, 3);
        assert_eq!((result.percentage * 100.0).round() / 100.0, 66.67);
        assert!(result.details[0].correct);
        assert!(!result.details[1].correct);
        assert_eq!(result.details[0].points_earned, 2);
        assert_eq!(result.details[1].points_earned, 0);
    }

    #[test]
    fn missing_answers_are_incorrect() {
        let result = grade_quiz(&capital_quiz(), &HashMap::new());
        assert_eq!(result.correct, 0);
        assert_eq!(result.incorrect, 2);
        assert_eq!(result.score, 0);
        assert_eq!(result.percentage, 0.0);
        assert_eq!(result.details[0].user_answer, "");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let answers = HashMap::from([(1, "  PARIS \n".to_string()), (2, "true".to_string())]);
        let result = grade_quiz(&capital_quiz(), &answers);
        assert_eq!(result.score, 3);
        assert_eq!(result.percentage, 100.0);
    }

    #[test]
    fn empty_quiz_scores_zero_percent() {
        let result = grade_quiz(&Quiz::empty(), &HashMap::from([(1, "x".to_string())]));
        assert_eq!(result.total_questions, 0);
        assert_eq!(result.max_score, 0);
        assert_eq!(result.percentage, 0.0);
        assert!(result.details.is_empty());
    }

    #[test]
    fn details_follow_question_order() {
        let quiz = Quiz::new(vec![question("a", 1), question("b", 1), question("c", 1)]);
        let answers = HashMap::from([(3, "c".to_string()), (1, "a".to_string())]);
        let result = grade_quiz(&quiz, &answers);
        let numbers: Vec<usize> = result.details.iter().map(|d| d.question_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(result.correct, 2);
    }

    #[test]
    fn answers_match_is_symmetric_on_case() {
        assert!(answers_match("True", "true"));
        assert!(!answers_match("tru", "true"));
    }
}
