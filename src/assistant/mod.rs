//! Conversational answer generation over the document index and portfolio API.

pub mod aggregator;
pub mod conversation;
pub mod extraction;
pub mod generator;
pub mod prompt;

pub use aggregator::{ApiAggregator, LookupKind, LookupOutcome, LookupResult};
pub use conversation::{ConversationState, ConversationTurn, Role};
pub use extraction::{EntityExtractor, PatternExtractor};
pub use generator::{APOLOGY_REPLY, Answer, Assistant, GREETING_REPLY, META_REPLY, Route, classify};
pub use prompt::{DEFAULT_INSTRUCTIONS, compose};
