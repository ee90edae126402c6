//! Test fixtures and factory functions for creating test data.

use serde_json::{json, Value};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse-battery";
pub const TEST_UPLOAD_LIMIT: usize = 64 * 1024;

pub const SAMPLE_TEXT: &str = "Cells are the basic unit of life. The membrane controls what enters \
and leaves the cell. Mitochondria produce ATP, the energy currency of the cell.";

pub const SAMPLE_TRANSCRIPT: &str = "In today's lecture we cover cell structure and energy.";

/// Email that no other test run uses.
pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4().simple())
}

pub fn register_request(email: &str) -> Value {
    json!({"email": email, "password": TEST_PASSWORD, "name": "Ada Lovelace"})
}

pub fn login_request(email: &str, password: &str) -> Value {
    json!({"email": email, "password": password})
}

/// Canned model reply chosen by the prompt's system message.
pub fn canned_reply(system: &str) -> Value {
    if system.contains("analyzing study materials") {
        json!({
            "main_topics": ["Cell Structure", "Cell Energy"],
            "concepts": {
                "Cell Structure": ["membrane", "nucleus", "cytoplasm"],
                "Cell Energy": ["ATP", "mitochondria"]
            },
            "difficulty": "beginner",
            "module_structure": ["Cell Structure", "Cell Energy"]
        })
    } else if system.contains("curriculum designer") {
        json!({
            "title": "Understanding Cells",
            "learning_objectives": ["Name the parts of a cell"],
            "introduction": "Cells are the basic unit of life.",
            "sections": [{"title": "Membranes", "content": "The membrane controls transport."}],
            "key_takeaways": ["Cells have membranes"],
            "estimated_time": "30 minutes"
        })
    } else if system.contains("module assessments") {
        json!({"questions": [
            {"question": "What controls transport?", "type": "short_answer", "correct_answer": "The membrane", "points": 2}
        ]})
    } else if system.contains("flashcards") {
        json!({"flashcards": [
            {"front": "What is ATP?", "back": "Energy currency", "difficulty": "hard"},
            {"front": "What is a membrane?", "back": "A barrier", "difficulty": "easy"},
            {"front": "Where is DNA kept?", "back": "The nucleus"}
        ]})
    } else {
        json!({"quiz": {"questions": [
            {"question": "Capital of France?", "type": "short_answer", "correct_answer": "Paris", "points": 2},
            {"question": "Cells produce ATP.", "type": "true_false", "correct_answer": "True", "points": 1}
        ]}})
    }
}
