//! Keyword-triggered portfolio lookups rendered into prompt annotations.
//!
//! Triggers are case-insensitive substring tests on the query, evaluated in a fixed order:
//! ping, consult, profile/team, investment/invest/company, sector, then URL (query or history).
//! Each triggered lookup resolves to a [`LookupOutcome`]; failures never escape
//! [`ApiAggregator::augment`], they become notes in the returned text.

use super::extraction::{EntityExtractor, resolve_with_history};
use crate::metrics::SessionMetrics;
use crate::portfolio::{Lookup, PortfolioApi};
use serde_json::Value;
use std::sync::Arc;

/// What an annotation block is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKind {
    /// Credential check.
    Ping,
    /// One of the structured entity lookups.
    Entity(Lookup),
}

/// Terminal state of a single lookup. Absence is a valid outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupResult {
    /// The endpoint returned a non-empty payload.
    Found(Value),
    /// The endpoint answered with an empty payload.
    NoData,
    /// The request failed; the reason is logged, not shown.
    Failed(String),
    /// The entity needed for the lookup could not be extracted; carries the note to show.
    EntityMissing(&'static str),
}

/// One aggregated lookup and its result.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupOutcome {
    /// Endpoint consulted.
    pub kind: LookupKind,
    /// Entity value sent to the endpoint, when one was found.
    pub entity: Option<String>,
    /// Result of the lookup.
    pub result: LookupResult,
}

impl LookupOutcome {
    /// Render the outcome as a prompt annotation block.
    pub fn render(&self) -> String {
        let entity = self.entity.as_deref().unwrap_or_default();
        let body = match (&self.kind, &self.result) {
            (LookupKind::Ping, LookupResult::Found(payload)) => {
                return format!("\n[Ping Info]\n{payload}\n");
            }
            (LookupKind::Ping, _) => "Note: Unable to verify API credentials at this time.".to_string(),
            (LookupKind::Entity(lookup), LookupResult::Found(payload)) => {
                return format!("\n[{} {entity}]\n{payload}\n", found_label(*lookup));
            }
            (LookupKind::Entity(_), LookupResult::EntityMissing(note)) => (*note).to_string(),
            (LookupKind::Entity(Lookup::Scrape), LookupResult::Failed(_)) => {
                format!("Note: Unable to scrape content from {entity}.")
            }
            (LookupKind::Entity(lookup), LookupResult::NoData | LookupResult::Failed(_)) => {
                format!("Note: No {} found for {entity}.", subject(*lookup))
            }
        };
        format!("\n[{body}]\n")
    }
}

fn found_label(lookup: Lookup) -> &'static str {
    match lookup {
        Lookup::Consultations => "Consultations for",
        Lookup::TeamProfile => "Team Profile for",
        Lookup::TeamInsights => "Team Insights for",
        Lookup::Investments => "Investments info for",
        Lookup::InvestmentInsights => "Investment Insights for",
        Lookup::Sectors => "Sectors info for",
        Lookup::Scrape => "Scraped Content from",
    }
}

fn subject(lookup: Lookup) -> &'static str {
    match lookup {
        Lookup::Consultations => "consultations",
        Lookup::TeamProfile => "team profile",
        Lookup::TeamInsights => "team insights",
        Lookup::Investments => "investment info",
        Lookup::InvestmentInsights => "investment insights",
        Lookup::Sectors => "sector info",
        Lookup::Scrape => "scraped content",
    }
}

const NO_CONSULTANT: &str = "Note: No consultant name found for consultation lookup.";
const NO_PERSON: &str = "Note: No person name found for team profile lookup.";
const NO_COMPANY: &str = "Note: No company name found for investment lookup.";
const NO_SECTOR: &str = "Note: No sector name found for lookup.";

/// Empty payloads count as "no data": null, false, zero, and empty strings, arrays or objects.
pub fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Bool(value) => !value,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Decides which portfolio lookups a query needs and gathers their results.
pub struct ApiAggregator {
    api: Arc<dyn PortfolioApi>,
    extractor: Arc<dyn EntityExtractor>,
    metrics: Arc<SessionMetrics>,
}

impl ApiAggregator {
    /// Build an aggregator over the given API client and entity extractor.
    pub fn new(
        api: Arc<dyn PortfolioApi>,
        extractor: Arc<dyn EntityExtractor>,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        Self {
            api,
            extractor,
            metrics,
        }
    }

    /// Annotation text for `query`; empty when no trigger matches.
    pub async fn augment(&self, query: &str, history: &str) -> String {
        self.collect(query, history)
            .await
            .iter()
            .map(LookupOutcome::render)
            .collect()
    }

    /// Run every triggered lookup in trigger-table order and return the typed outcomes.
    pub async fn collect(&self, query: &str, history: &str) -> Vec<LookupOutcome> {
        let lowered = query.to_lowercase();
        let mut outcomes = Vec::new();

        if lowered.contains("ping") {
            let result = match self.api.ping().await {
                Ok(payload) => LookupResult::Found(payload),
                Err(error) => {
                    tracing::warn!(error = %error, "Ping lookup failed");
                    self.metrics.record_lookup_failure();
                    LookupResult::Failed(error.to_string())
                }
            };
            outcomes.push(LookupOutcome {
                kind: LookupKind::Ping,
                entity: None,
                result,
            });
        }

        if lowered.contains("consult") {
            let person = resolve_with_history(query, history, |text| {
                self.extractor.extract_person(text, "consult")
            });
            self.run(&mut outcomes, &[Lookup::Consultations], person, NO_CONSULTANT)
                .await;
        }

        if lowered.contains("profile") || lowered.contains("team") {
            let person = self
                .extractor
                .extract_person(query, "profile")
                .or_else(|| self.extractor.extract_person(query, "team"))
                .or_else(|| self.extractor.extract_person(history, "profile"))
                .or_else(|| self.extractor.extract_person(history, "team"));
            self.run(
                &mut outcomes,
                &[Lookup::TeamProfile, Lookup::TeamInsights],
                person,
                NO_PERSON,
            )
            .await;
        }

        // "investment" contains "invest"; both are listed to mirror the trigger table.
        if lowered.contains("investment") || lowered.contains("invest") || lowered.contains("company")
        {
            let company = resolve_with_history(query, history, |text| {
                self.extractor.extract_company(text)
            });
            self.run(
                &mut outcomes,
                &[Lookup::Investments, Lookup::InvestmentInsights],
                company,
                NO_COMPANY,
            )
            .await;
        }

        if lowered.contains("sector") {
            let sector = resolve_with_history(query, history, |text| {
                self.extractor.extract_sector(text)
            });
            self.run(&mut outcomes, &[Lookup::Sectors], sector, NO_SECTOR)
                .await;
        }

        // The URL doubles as the trigger, so scrape never reports a missing entity.
        if let Some(url) =
            resolve_with_history(query, history, |text| self.extractor.extract_url(text))
        {
            self.fetch(&mut outcomes, &[Lookup::Scrape], &url).await;
        }

        outcomes
    }

    /// Run `lookups` for one entity; a missing entity yields `missing_note` and no calls.
    async fn run(
        &self,
        outcomes: &mut Vec<LookupOutcome>,
        lookups: &[Lookup],
        entity: Option<String>,
        missing_note: &'static str,
    ) {
        match entity {
            Some(entity) => self.fetch(outcomes, lookups, &entity).await,
            None => {
                tracing::debug!(lookup = %lookups[0], "No entity found; skipping lookup");
                outcomes.push(LookupOutcome {
                    kind: LookupKind::Entity(lookups[0]),
                    entity: None,
                    result: LookupResult::EntityMissing(missing_note),
                });
            }
        }
    }

    async fn fetch(&self, outcomes: &mut Vec<LookupOutcome>, lookups: &[Lookup], entity: &str) {
        for lookup in lookups {
            let result = match self.api.lookup(*lookup, entity).await {
                Ok(payload) if is_empty_payload(&payload) => LookupResult::NoData,
                Ok(payload) => LookupResult::Found(payload),
                Err(error) => {
                    tracing::warn!(%lookup, entity = %entity, error = %error, "Portfolio lookup failed");
                    self.metrics.record_lookup_failure();
                    LookupResult::Failed(error.to_string())
                }
            };
            outcomes.push(LookupOutcome {
                kind: LookupKind::Entity(*lookup),
                entity: Some(entity.to_string()),
                result,
            });
        }
    }
}
