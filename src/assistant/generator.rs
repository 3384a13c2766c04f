//! Turn processing: routing, retrieval, aggregation, prompting and generation.

use super::aggregator::ApiAggregator;
use super::conversation::{ConversationState, Role};
use super::prompt::{DEFAULT_INSTRUCTIONS, compose};
use crate::index::EmbeddingIndex;
use crate::llm::LanguageModel;
use crate::metrics::SessionMetrics;
use serde::Serialize;
use std::sync::Arc;

/// Number of chunks retrieved per turn.
pub const SEARCH_TOP_K: usize = 3;

/// Canned reply for bare greetings.
pub const GREETING_REPLY: &str = "Hello! I'm your assistant here to help with information about PeakSpan MasterClasses, team profiles, investments, sectors, and more. How can I assist you today?";

/// Canned reply for "what are you / what can you do" questions.
pub const META_REPLY: &str = "I am an intelligent assistant designed to provide you with up-to-date information about PeakSpan MasterClasses, team profiles, investments, sectors, and related insights. I retrieve document-based context and external API data to help answer your questions accurately. How may I assist you today?";

/// Reply used when the language model fails.
pub const APOLOGY_REPLY: &str = "Sorry, I encountered an error while generating the answer.";

const GREETINGS: [&str; 3] = ["hello", "hi", "hey"];

/// How a turn is handled. Depends only on the current query text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Bare greeting answered with [`GREETING_REPLY`].
    GreetingShortcut,
    /// Capability question answered with [`META_REPLY`].
    MetaShortcut,
    /// Retrieval, aggregation and generation.
    FullPipeline,
}

/// Classify a query into its [`Route`].
pub fn classify(query: &str) -> Route {
    let lowered = query.trim().to_lowercase();
    if GREETINGS.contains(&lowered.as_str()) {
        Route::GreetingShortcut
    } else if lowered.contains("what are you") && lowered.contains("what can you do") {
        Route::MetaShortcut
    } else {
        Route::FullPipeline
    }
}

/// The reply to one turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Answer {
    /// Route the turn took.
    pub route: Route,
    /// Text shown to the user.
    pub text: String,
}

/// Answer generator owning the conversation.
///
/// The index and language model are injected once at startup and held for the session.
pub struct Assistant {
    index: Arc<EmbeddingIndex>,
    llm: Arc<dyn LanguageModel>,
    aggregator: ApiAggregator,
    conversation: ConversationState,
    instructions: String,
    metrics: Arc<SessionMetrics>,
}

impl Assistant {
    /// Assemble an assistant from its collaborators.
    pub fn new(
        index: Arc<EmbeddingIndex>,
        llm: Arc<dyn LanguageModel>,
        aggregator: ApiAggregator,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            index,
            llm,
            aggregator,
            conversation: ConversationState::new(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            metrics,
        }
    }

    /// Replace the instruction block placed at the top of every prompt.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Process one query to completion and record it in the conversation.
    ///
    /// Never fails: retrieval errors degrade to an empty context, lookup errors become notes,
    /// and a language model error becomes [`APOLOGY_REPLY`].
    pub async fn respond(&mut self, query: &str) -> Answer {
        let route = classify(query);
        tracing::info!(?route, "Handling query");

        let text = match route {
            Route::GreetingShortcut => GREETING_REPLY.to_string(),
            Route::MetaShortcut => META_REPLY.to_string(),
            Route::FullPipeline => self.run_pipeline(query).await,
        };

        self.conversation.append(Role::User, query);
        self.conversation.append(Role::Assistant, text.clone());
        self.metrics.record_turn(route != Route::FullPipeline);

        Answer { route, text }
    }

    async fn run_pipeline(&self, query: &str) -> String {
        let history = self.conversation.render();
        let (document_context, api_info) = tokio::join!(
            self.retrieve_context(query),
            self.aggregator.augment(query, &history)
        );

        let prompt = compose(
            &self.instructions,
            &document_context,
            &api_info,
            &history,
            query,
        );
        tracing::debug!(
            context_chars = document_context.len(),
            api_chars = api_info.len(),
            history_turns = self.conversation.len(),
            "Composed prompt"
        );

        match self.llm.generate(&prompt).await {
            Ok(completion) => completion,
            Err(error) => {
                tracing::warn!(error = %error, "Language model invocation failed");
                self.metrics.record_generation_failure();
                APOLOGY_REPLY.to_string()
            }
        }
    }

    async fn retrieve_context(&self, query: &str) -> String {
        match self.index.search(query, SEARCH_TOP_K).await {
            Ok(hits) => hits
                .into_iter()
                .map(|hit| hit.text)
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(error) => {
                tracing::warn!(error = %error, "Similarity search failed; continuing without context");
                String::new()
            }
        }
    }

    /// Conversation so far.
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Shared session counters.
    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greetings_are_exact_after_trim_and_case_fold() {
        assert_eq!(classify("hi"), Route::GreetingShortcut);
        assert_eq!(classify("  HeLLo \n"), Route::GreetingShortcut);
        assert_eq!(classify("hey"), Route::GreetingShortcut);
        assert_eq!(classify("hi there"), Route::FullPipeline);
        assert_eq!(classify("hello!"), Route::FullPipeline);
    }

    #[test]
    fn meta_requires_both_phrases() {
        assert_eq!(
            classify("What are you and what can you do?"),
            Route::MetaShortcut
        );
        assert_eq!(classify("what are you?"), Route::FullPipeline);
        assert_eq!(classify("what can you do?"), Route::FullPipeline);
    }

    #[test]
    fn everything_else_runs_the_pipeline() {
        assert_eq!(
            classify("Tell me about the sector of Healthcare"),
            Route::FullPipeline
        );
        assert_eq!(classify(""), Route::FullPipeline);
    }
}
