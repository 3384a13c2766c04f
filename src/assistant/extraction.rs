//! Pattern-based entity extraction.
//!
//! The aggregator only talks to the [`EntityExtractor`] trait, so a statistical recognizer can
//! replace [`PatternExtractor`] without touching lookup logic. Absence is a normal result.

use regex::Regex;

/// Extracts lookup entities from free text.
pub trait EntityExtractor: Send + Sync {
    /// Person name introduced by `keyword`, e.g. "consult with Jane Smith".
    fn extract_person(&self, text: &str, keyword: &str) -> Option<String>;
    /// Company name following the word "company".
    fn extract_company(&self, text: &str) -> Option<String>;
    /// Sector name following "sector", "sectors" or "sector of".
    fn extract_sector(&self, text: &str) -> Option<String>;
    /// First `http://` or `https://` URL.
    fn extract_url(&self, text: &str) -> Option<String>;
}

/// Try `extract` on the query first and fall back to the history only when the query has no match.
pub fn resolve_with_history<F>(query: &str, history: &str, extract: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    extract(query).or_else(|| extract(history))
}

/// Keywords the aggregator uses to introduce person names; their patterns are compiled once.
const PERSON_KEYWORDS: [&str; 3] = ["consult", "profile", "team"];

/// Regex-backed extractor.
///
/// Trigger words match case-insensitively; person names must be capitalised
/// (`[A-Z][a-z]+`, at least two words).
pub struct PatternExtractor {
    person: Vec<(&'static str, Regex)>,
    company: Regex,
    sector: Regex,
    url: Regex,
}

impl PatternExtractor {
    /// Compile the fixed patterns.
    pub fn new() -> Self {
        Self {
            person: PERSON_KEYWORDS
                .iter()
                .map(|keyword| (*keyword, Self::person_pattern(keyword)))
                .collect(),
            company: Regex::new(r"(?i:company)\s+([A-Z][a-zA-Z0-9& ]+)")
                .expect("valid company pattern"),
            sector: Regex::new(r"(?i)sectors?(?:\s+of)?\s+([A-Za-z ]+)")
                .expect("valid sector pattern"),
            url: Regex::new(r"https?://\S+").expect("valid url pattern"),
        }
    }

    fn person_pattern(keyword: &str) -> Regex {
        let pattern = format!(
            r"(?i:{})\s+(?i:with|for)?\s*([A-Z][a-z]+(?: [A-Z][a-z]+)+)",
            regex::escape(keyword)
        );
        Regex::new(&pattern).expect("escaped keyword yields a valid person pattern")
    }
}

impl Default for PatternExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|matched| matched.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

impl EntityExtractor for PatternExtractor {
    fn extract_person(&self, text: &str, keyword: &str) -> Option<String> {
        match self.person.iter().find(|(known, _)| *known == keyword) {
            Some((_, pattern)) => first_capture(pattern, text),
            None => first_capture(&Self::person_pattern(keyword), text),
        }
    }

    fn extract_company(&self, text: &str) -> Option<String> {
        first_capture(&self.company, text)
    }

    fn extract_sector(&self, text: &str) -> Option<String> {
        first_capture(&self.sector, text)
    }

    fn extract_url(&self, text: &str) -> Option<String> {
        self.url.find(text).map(|matched| matched.as_str().to_string())
    }
}
