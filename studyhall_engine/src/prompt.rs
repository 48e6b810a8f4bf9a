//! Fixed prompt templates and canned answer sentences.

/// Terminal answer when retrieval finds nothing, or a generation comes
/// back too short to trust.
pub const NO_KNOWLEDGE_RESPONSE: &str = "I don't have enough information to answer that \
     question. Please contact our support team for assistance.";

/// Substituted answer when generation fails or the pipeline hits an
/// unexpected error.
pub const ERROR_RESPONSE: &str = "I apologize, but I encountered an error processing your \
     question. Please try again or contact support.";

/// System instruction enumerating the grounding rules.
pub(crate) fn system_prompt(max_response_length: usize, language_name: &str) -> String {
    format!(
        "You are a helpful student support assistant. Answer the student's question based \
         ONLY on the provided context.\n\
         \n\
         IMPORTANT RULES:\n\
         1. Only use information from the provided context below\n\
         2. If the context doesn't contain enough information, say \"I don't have enough \
         information to answer that question. Please contact support for assistance.\"\n\
         3. Do not make up or infer information not explicitly stated in the context\n\
         4. Keep your response concise and clear (under {max_response_length} characters)\n\
         5. Respond in {language_name}, the language of the student's question\n\
         6. If this is a follow-up question, use the conversation history to understand context"
    )
}

/// User turn embedding the grounding context and the question.
pub(crate) fn user_prompt(context: &str, query: &str) -> String {
    format!(
        "Context from knowledge base:\n{context}\n\n\
         Student's question: {query}\n\n\
         Provide a helpful, accurate response based only on the context above:"
    )
}
