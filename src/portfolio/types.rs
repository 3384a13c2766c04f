//! Shared types used by the portfolio API client and its callers.

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors returned while interacting with the portfolio API.
#[derive(Debug, Error)]
pub enum PortfolioApiError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid portfolio API URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API responded with a non-success status code.
    #[error("Unexpected portfolio API response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the API.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Structured lookup endpoints exposed by the portfolio API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    /// Consultations mentioning a consultant by name.
    Consultations,
    /// Team member profile by name.
    TeamProfile,
    /// Team member insights by name.
    TeamInsights,
    /// Investment details by company name.
    Investments,
    /// Investment insights by company name.
    InvestmentInsights,
    /// Sector overview by sector name.
    Sectors,
    /// Scraped page content by URL.
    Scrape,
}

impl Lookup {
    /// Request path relative to the API base URL.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Consultations => "api/consultations",
            Self::TeamProfile => "api/team",
            Self::TeamInsights => "api/team/insights",
            Self::Investments => "api/investments",
            Self::InvestmentInsights => "api/investments/insights",
            Self::Sectors => "api/sectors",
            Self::Scrape => "api/scrape",
        }
    }

    /// Query-string parameter carrying the entity value.
    pub const fn parameter(self) -> &'static str {
        match self {
            Self::Consultations | Self::TeamProfile | Self::TeamInsights => "name",
            Self::Investments | Self::InvestmentInsights => "company_name",
            Self::Sectors => "sector",
            Self::Scrape => "url",
        }
    }
}

impl std::fmt::Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Consultations => "consultations",
            Self::TeamProfile => "team_profile",
            Self::TeamInsights => "team_insights",
            Self::Investments => "investments",
            Self::InvestmentInsights => "investment_insights",
            Self::Sectors => "sectors",
            Self::Scrape => "scrape",
        };
        f.write_str(name)
    }
}
