use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing a session.
#[derive(Default)]
pub struct SessionMetrics {
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
    turns_answered: AtomicU64,
    shortcut_turns: AtomicU64,
    lookup_failures: AtomicU64,
    generation_failures: AtomicU64,
}

impl SessionMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the corpus that was indexed at startup.
    pub fn record_corpus(&self, documents: u64, chunks: u64) {
        self.documents_indexed.fetch_add(documents, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunks, Ordering::Relaxed);
    }

    /// Record a completed turn; `shortcut` marks canned replies.
    pub fn record_turn(&self, shortcut: bool) {
        self.turns_answered.fetch_add(1, Ordering::Relaxed);
        if shortcut {
            self.shortcut_turns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a portfolio lookup that failed and was replaced by a note.
    pub fn record_lookup_failure(&self) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a language model failure answered with the apology text.
    pub fn record_generation_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            turns_answered: self.turns_answered.load(Ordering::Relaxed),
            shortcut_turns: self.shortcut_turns.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of session counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Documents loaded into the index at startup.
    pub documents_indexed: u64,
    /// Chunks embedded into the index at startup.
    pub chunks_indexed: u64,
    /// Turns answered, shortcuts included.
    pub turns_answered: u64,
    /// Turns answered with a canned reply.
    pub shortcut_turns: u64,
    /// Portfolio lookups that failed during turns.
    pub lookup_failures: u64,
    /// Language model invocations that failed.
    pub generation_failures: u64,
}
