//! Prompt assembly. Section order and labels are fixed.

/// Default system instructions placed at the top of every prompt.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a knowledgeable assistant with access to PeakSpan MasterClass documents and external API data.";

/// Concatenate the prompt sections in their fixed order.
pub fn compose(
    instructions: &str,
    document_context: &str,
    api_info: &str,
    history: &str,
    query: &str,
) -> String {
    format!(
        "{instructions}\n\n\
         Relevant Document Context:\n{document_context}\n\n\
         Additional API Information:\n{api_info}\n\n\
         Conversation History:\n{history}\n\n\
         User: {query}\n\
         Assistant:"
    )
}
