use async_trait::async_trait;
use studyhall_core::{Generator, GeneratorError};
use tracing::info;

const QUESTION_MARKER: &str = "Student's question:";
const CONTEXT_MARKER: &str = "Context from knowledge base:";

const INSUFFICIENT_CONTEXT: &str = "I don't have enough information to answer that question. \
     Please contact our support team for assistance.";

/// Deterministic rule-based generator for tests and degraded operation.
///
/// Produces canned answers keyed on keywords in the embedded question,
/// with a fixed insufficient-context response when the prompt carries
/// little or no grounding context. Substitutable behind [`Generator`]
/// when no real backend is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubGenerator;

impl StubGenerator {
    #[must_use]
    pub fn new() -> Self {
        info!("Stub generator initialized");
        Self
    }

    /// Pull the question line out of the user prompt.
    fn extract_question(prompt: &str) -> &str {
        prompt
            .split_once(QUESTION_MARKER)
            .map(|(_, rest)| rest.lines().next().unwrap_or("").trim())
            .unwrap_or("student question")
    }

    /// Pull the grounding context block out of the user prompt.
    fn extract_context(prompt: &str) -> &str {
        prompt
            .split_once(CONTEXT_MARKER)
            .map(|(_, rest)| {
                rest.split_once(QUESTION_MARKER)
                    .map_or(rest, |(context, _)| context)
                    .trim()
            })
            .unwrap_or("")
    }

    fn canned_answer(question_lower: &str, context: &str) -> String {
        if question_lower.contains("admission") || question_lower.contains("requirement") {
            "The admission requirements include a high school diploma or equivalent, minimum \
             GPA, and English proficiency test scores. Please check the specific requirements \
             for your program."
                .to_string()
        } else if question_lower.contains("tuition")
            || question_lower.contains("fee")
            || question_lower.contains("cost")
        {
            "Tuition and fees vary by program. Annual tuition for undergraduate programs is \
             approximately $15,000. Additional fees apply. Financial aid options are available."
                .to_string()
        } else if question_lower.contains("visa") || question_lower.contains("international") {
            "International students need an F-1 student visa. You'll need proof of acceptance, \
             financial support documents, and must complete the DS-160 form. Processing \
             typically takes 2-4 weeks."
                .to_string()
        } else if question_lower.contains("housing") || question_lower.contains("accommodation") {
            "Both on-campus and off-campus housing options are available. On-campus housing \
             includes meal plans. Applications open in April for the fall semester."
                .to_string()
        } else if question_lower.contains("registration") || question_lower.contains("course") {
            "Course registration opens two weeks before each semester. You can register online \
             through the student portal. Make sure prerequisites are completed."
                .to_string()
        } else {
            let preview: String = context.chars().take(200).collect();
            format!("I found relevant information in our knowledge base. {preview}...")
        }
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(
        &self,
        _system_prompt: Option<&str>,
        prompt: &str,
        max_tokens: usize,
        _temperature: f32,
    ) -> Result<String, GeneratorError> {
        let question = Self::extract_question(prompt);
        let context = Self::extract_context(prompt);

        // Too little context to ground an answer on.
        if context.trim().chars().count() < 50 {
            return Ok(INSUFFICIENT_CONTEXT.to_string());
        }

        let mut response = format!("Based on the information available: {question}\n\n");
        response.push_str("Here's what I found in our knowledge base:\n\n");
        response.push_str(&Self::canned_answer(&question.to_lowercase(), context));
        response.push_str("\n\nIf you need more specific information, please contact our support team.");

        if response.chars().count() > max_tokens {
            response = response.chars().take(max_tokens).collect::<String>() + "...";
        }

        info!("Stub generator produced response (length: {})", response.len());
        Ok(response.trim().to_string())
    }
}
