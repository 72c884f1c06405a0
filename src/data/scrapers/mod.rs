//! Source adapters for fixture providers
//!
//! One adapter per provider shape. Adapters only pull text out of tables;
//! turning that text into typed fixtures is the normalizer's job.

pub mod fetch;
pub mod fixed;
pub mod freeform;

use crate::data::table::RawPayload;
use crate::{ProviderConfig, Result, SourceKind};

pub use fetch::{Fetched, Fetcher, HttpFetcher};
pub use fixed::FixedSchemaAdapter;
pub use freeform::FreeFormAdapter;

/// Score text as the provider wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawScore {
    /// Both goals in one cell, e.g. "2–1"
    Combined(String),
    /// Goals in separate columns
    Split { home: String, away: String },
    Missing,
}

/// A fixture row pulled from a provider table, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub date: Option<String>,
    pub time: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub score: RawScore,
    pub league: String,
    pub country: String,
}

impl RawMatch {
    /// Row skeleton carrying the provider's league labels
    pub fn for_provider(provider: &ProviderConfig) -> Self {
        RawMatch {
            date: None,
            time: None,
            home_team: String::new(),
            away_team: String::new(),
            score: RawScore::Missing,
            league: provider.league.clone(),
            country: provider.country.clone(),
        }
    }
}

/// Trait for all source adapters
pub trait SourceAdapter {
    /// Extract fixture rows from a raw payload
    ///
    /// Unusable rows and tables are skipped; an error means the whole
    /// payload is unusable for this provider.
    fn normalize_raw(&self, payload: &RawPayload) -> Result<Vec<RawMatch>>;
}

/// Pick the adapter matching a provider's configured shape
pub fn adapter_for(provider: &ProviderConfig) -> Box<dyn SourceAdapter> {
    match &provider.source {
        SourceKind::Fixed { columns, .. } => {
            Box::new(FixedSchemaAdapter::new(provider.clone(), columns.clone()))
        }
        SourceKind::FreeForm => Box::new(FreeFormAdapter::new(provider.clone())),
    }
}
