//! Prompt templates over a [`Generator`].
//!
//! Each method builds one prompt, sends it and reshapes the reply with
//! `study_core::reshape`. Errors are returned as-is; callers decide
//! whether to fall back to a default.

use std::sync::Arc;

use serde_json::Value;
use study_core::{
    excerpt, reshape, ConceptExplanation, ContentAnalysis, Flashcard, Quiz, StudyModule,
    TopicConcepts,
};

use crate::services::llm::{GenerationRequest, Generator, LlmError};

/// Characters of source text embedded in most prompts.
pub const CONTENT_EXCERPT: usize = 3000;
/// Characters of source text embedded in module prompts.
pub const MODULE_EXCERPT: usize = 2000;
const CONTEXT_EXCERPT: usize = 500;
const DETAILS_EXCERPT: usize = 1000;

pub const DEFAULT_FLASHCARDS: usize = 20;
pub const COMPREHENSIVE_QUIZ_QUESTIONS: usize = 15;
pub const CONCEPT_FLASHCARDS: usize = 5;

/// Diagram layouts the model can be asked to plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramKind {
    ConceptMap,
    Flow,
    Hierarchy,
}

impl DiagramKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConceptMap => "concept_map",
            Self::Flow => "flow",
            Self::Hierarchy => "hierarchy",
        }
    }
}

#[derive(Clone)]
pub struct StudyGenerator {
    generator: Arc<dyn Generator>,
}

impl StudyGenerator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    async fn ask(&self, request: GenerationRequest) -> Result<Value, LlmError> {
        self.generator.generate(request).await
    }

    pub async fn analyze_content(&self, content: &str) -> Result<ContentAnalysis, LlmError> {
        let prompt = format!(
            r#"Analyze the educational content below and report:
1. The main topics it covers (3-7 topics)
2. The key concepts under each topic
3. Its difficulty level (beginner, intermediate or advanced)
4. A suggested sequence of learning modules

Content:
{}

Reply with a JSON object of this shape:
{{
    "main_topics": ["topic1", "topic2"],
    "concepts": {{"topic1": ["concept1", "concept2"]}},
    "difficulty": "beginner|intermediate|advanced",
    "module_structure": ["module 1 name", "module 2 name"]
}}"#,
            excerpt(content, CONTENT_EXCERPT)
        );
        let value = self
            .ask(GenerationRequest::new(
                "You are an expert educator analyzing study materials.",
                prompt,
            ))
            .await?;
        Ok(reshape::analysis_from_value(&value))
    }

    pub async fn extract_key_concepts(
        &self,
        content: &str,
        num_concepts: usize,
    ) -> Result<Vec<String>, LlmError> {
        let prompt = format!(
            r#"List the {num_concepts} most important concepts in this educational content, most important first.

Content:
{}

Reply with a JSON object: {{"concepts": ["concept1", "concept2"]}}"#,
            excerpt(content, CONTENT_EXCERPT)
        );
        let value = self
            .ask(
                GenerationRequest::new("You are an expert at identifying key concepts.", prompt)
                    .with_temperature(0.5),
            )
            .await?;
        Ok(reshape::concepts_from_value(&value))
    }

    pub async fn simplify_concept(
        &self,
        concept: &str,
        context: &str,
    ) -> Result<ConceptExplanation, LlmError> {
        let context = if context.is_empty() {
            "General education"
        } else {
            excerpt(context, CONTEXT_EXCERPT)
        };
        let prompt = format!(
            r#"Explain this concept so that a beginner can follow it. Cover:
1. A simple definition (1-2 sentences)
2. Why it matters (1-2 sentences)
3. A real-world analogy or example
4. Common misconceptions, if any

Concept: {concept}
Context: {context}

Reply with a JSON object with the keys "definition", "importance", "example" and "misconceptions"."#
        );
        let value = self
            .ask(GenerationRequest::new(
                "You are an expert teacher who excels at simplifying complex topics.",
                prompt,
            ))
            .await?;
        Ok(reshape::explanation_from_value(&value, concept))
    }

    pub async fn identify_relationships(
        &self,
        concepts: &[String],
    ) -> Result<Vec<TopicConcepts>, LlmError> {
        let listed = serde_json::to_string(concepts)?;
        let prompt = format!(
            r#"Given these concepts, work out which ones are related:
{listed}

Reply with a JSON object whose keys are concept names and whose values are lists of related concepts."#
        );
        let value = self
            .ask(
                GenerationRequest::new(
                    "You are an expert at understanding relationships between concepts.",
                    prompt,
                )
                .with_temperature(0.5),
            )
            .await?;
        Ok(reshape::relationships_from_value(&value))
    }

    pub async fn generate_module(
        &self,
        module_name: &str,
        module_number: usize,
        content: &str,
    ) -> Result<StudyModule, LlmError> {
        let prompt = format!(
            r#"Design a structured learning module titled: {module_name}

Using the source content, include:
1. A title and 3-5 learning objectives
2. An introduction of 2-3 paragraphs
3. 3-5 main content sections
4. 5-7 key takeaways
5. Prerequisites, if any
6. An estimated study time

Source content:
{}

Reply with a JSON object with the keys "title", "learning_objectives", "introduction", "sections" (each with "title" and "content"), "key_takeaways", "prerequisites" and "estimated_time"."#,
            excerpt(content, MODULE_EXCERPT)
        );
        let value = self
            .ask(GenerationRequest::new(
                "You are an expert curriculum designer creating engaging learning modules.",
                prompt,
            ))
            .await?;
        Ok(reshape::module_from_value(&value, module_name, module_number))
    }

    pub async fn generate_flashcards(
        &self,
        content: &str,
        num_cards: usize,
    ) -> Result<Vec<Flashcard>, LlmError> {
        let prompt = format!(
            r#"Write {num_cards} flashcards from the educational content below. Each card needs:
- a clear, concise question on the front
- a detailed answer on the back
- an optional hint or mnemonic
- a difficulty of easy, medium or hard

Content:
{}

Reply with a JSON object: {{"flashcards": [{{"front": "...", "back": "...", "hint": "...", "difficulty": "medium"}}]}}"#,
            excerpt(content, CONTENT_EXCERPT)
        );
        let value = self
            .ask(GenerationRequest::new(
                "You are an expert at creating effective study flashcards.",
                prompt,
            ))
            .await?;
        Ok(reshape::flashcards_from_value(&value))
    }

    pub async fn generate_concept_flashcards(
        &self,
        concept: &str,
        details: &str,
    ) -> Result<Vec<Flashcard>, LlmError> {
        let prompt = format!(
            r#"Write {CONCEPT_FLASHCARDS} flashcards about: {concept}

Details:
{}

Cover its definition, key characteristics, applications or examples, common mistakes and related concepts.

Reply with a JSON object: {{"flashcards": [...]}}"#,
            excerpt(details, DETAILS_EXCERPT)
        );
        let value = self
            .ask(GenerationRequest::new(
                "You are an expert at creating targeted study flashcards.",
                prompt,
            ))
            .await?;
        Ok(reshape::flashcards_from_value(&value))
    }

    pub async fn generate_quiz(&self, content: &str, num_questions: usize) -> Result<Quiz, LlmError> {
        let prompt = format!(
            r#"Write a {num_questions}-question quiz from the content below, mixing:
- multiple choice questions with 4 options
- true/false questions
- short answer questions

Content:
{}

For each question give the question text, its type (multiple_choice, true_false or short_answer), options for multiple choice, the correct answer, an explanation and a points value reflecting difficulty.

Reply with a JSON object: {{"quiz": {{"questions": [...]}}}}"#,
            excerpt(content, CONTENT_EXCERPT)
        );
        let value = self
            .ask(GenerationRequest::new(
                "You are an expert educator creating effective assessment quizzes.",
                prompt,
            ))
            .await?;
        Ok(reshape::quiz_from_value(&value))
    }

    /// Quiz over a module's introduction and sections.
    pub async fn generate_module_quiz(
        &self,
        module: &StudyModule,
        difficulty: &str,
    ) -> Result<Quiz, LlmError> {
        let objectives = serde_json::to_string(&module.learning_objectives)?;
        let body = module.body_text();
        let prompt = format!(
            r#"Write a quiz for the module: {}

Learning objectives:
{objectives}

Difficulty level: {difficulty}

Write 8-12 questions that test the learning objectives, cover the module's key concepts and use a mix of question types.

Content excerpt:
{}

Reply with a JSON object: {{"questions": [{{"question": "...", "type": "multiple_choice", "options": [], "correct_answer": "...", "explanation": "...", "points": 1}}]}}"#,
            module.title,
            excerpt(&body, MODULE_EXCERPT)
        );
        let value = self
            .ask(GenerationRequest::new(
                "You are an expert at creating module assessments.",
                prompt,
            ))
            .await?;
        Ok(reshape::quiz_from_value(&value).for_module(module.title.clone(), module.module_number))
    }

    /// Ask the model what a diagram about `concept` should contain.
    pub async fn generate_diagram_spec(
        &self,
        concept: &str,
        kind: DiagramKind,
    ) -> Result<Value, LlmError> {
        let prompt = format!(
            r#"Plan a {} diagram about: {concept}

Describe:
1. The main elements to include
2. How the elements relate
3. Labels and annotations
4. A suggested layout

Reply with a JSON object."#,
            kind.as_str()
        );
        self.ask(GenerationRequest::new(
            "You are an expert at creating educational diagrams.",
            prompt,
        ))
        .await
    }
}
