//! One ingestion run
//!
//! Fetch every provider in turn, normalize, merge with the stored dataset,
//! recompute strength indices and write both artifacts back. Provider
//! failures are recorded and skipped; only storage failures end the run.

use crate::data::dataset::{read_dataset, write_dataset, write_strength};
use crate::data::scrapers::{adapter_for, Fetcher};
use crate::data::{merge, DocumentStore, MergeStats, Normalizer, WriteCondition, WriteOutcome};
use crate::features::strength;
use crate::{Config, FootballError, MatchRecord, ProviderConfig, Result, StorageConfig};
use chrono::NaiveDate;
use std::fmt;
use std::time::Duration;

/// What happened to one provider
#[derive(Debug)]
pub enum ProviderOutcome {
    Ingested {
        /// Rows the adapter extracted
        rows: usize,
        /// Rows that became fixtures
        records: usize,
        dropped: usize,
    },
    Failed(FootballError),
}

#[derive(Debug)]
pub struct ProviderReport {
    pub provider: String,
    pub outcome: ProviderOutcome,
}

/// What happened to one stored artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    Written,
    /// Content identical to what is stored
    Unchanged,
    /// Another writer got there first; nothing was written
    Conflict,
    /// Nothing to write
    Skipped,
}

impl fmt::Display for ArtifactOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ArtifactOutcome::Written => "written",
            ArtifactOutcome::Unchanged => "unchanged",
            ArtifactOutcome::Conflict => "CONFLICT",
            ArtifactOutcome::Skipped => "skipped",
        };
        f.pad(text)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactReport {
    pub key: String,
    pub outcome: ArtifactOutcome,
    pub rows: usize,
}

/// Everything an operator needs to know about a run
#[derive(Debug)]
pub struct RunSummary {
    pub providers: Vec<ProviderReport>,
    pub merge: MergeStats,
    pub dataset: ArtifactReport,
    pub strength: ArtifactReport,
}

impl RunSummary {
    /// False if either artifact hit a concurrent writer
    pub fn is_success(&self) -> bool {
        self.dataset.outcome != ArtifactOutcome::Conflict
            && self.strength.outcome != ArtifactOutcome::Conflict
    }

    pub fn failed_providers(&self) -> usize {
        self.providers
            .iter()
            .filter(|p| matches!(p.outcome, ProviderOutcome::Failed(_)))
            .count()
    }
}

/// Ingestion run settings
pub struct Pipeline {
    providers: Vec<ProviderConfig>,
    storage: StorageConfig,
    /// Pause after each network fetch
    pacing: Duration,
    today: NaiveDate,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Self {
        Pipeline {
            providers: config.providers.clone(),
            storage: config.storage.clone(),
            pacing: Duration::from_secs(config.fetch.pacing_secs),
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Restrict the run to these providers
    pub fn with_providers(mut self, providers: Vec<ProviderConfig>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Date substituted for "today" placeholders
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Fetch and normalize every provider, one at a time
    pub fn ingest(&self, fetcher: &dyn Fetcher) -> (Vec<MatchRecord>, Vec<ProviderReport>) {
        let normalizer = Normalizer::new(self.today);
        let mut records = Vec::new();
        let mut reports = Vec::new();
        let mut last_from_network = false;

        for provider in &self.providers {
            if last_from_network && !self.pacing.is_zero() {
                log::debug!("Waiting {:?} before next provider", self.pacing);
                std::thread::sleep(self.pacing);
            }

            let outcome = match fetcher.fetch(provider) {
                Ok(fetched) => {
                    last_from_network = fetched.from_network;
                    match adapter_for(provider).normalize_raw(&fetched.payload) {
                        Ok(rows) => {
                            let row_count = rows.len();
                            let report = normalizer.normalize(rows);
                            log::info!(
                                "{}: {} fixtures from {} rows ({} dropped)",
                                provider.name,
                                report.records.len(),
                                row_count,
                                report.dropped.len()
                            );
                            let outcome = ProviderOutcome::Ingested {
                                rows: row_count,
                                records: report.records.len(),
                                dropped: report.dropped.len(),
                            };
                            records.extend(report.records);
                            outcome
                        }
                        Err(e) => ProviderOutcome::Failed(e),
                    }
                }
                Err(e) => {
                    last_from_network = false;
                    ProviderOutcome::Failed(e)
                }
            };

            if let ProviderOutcome::Failed(e) = &outcome {
                log::warn!("{}: skipped: {}", provider.name, e);
            }
            reports.push(ProviderReport {
                provider: provider.name.clone(),
                outcome,
            });
        }

        (records, reports)
    }

    /// Full run: ingest, then merge and persist
    pub fn run(&self, fetcher: &dyn Fetcher, store: &dyn DocumentStore) -> Result<RunSummary> {
        let (incoming, reports) = self.ingest(fetcher);
        self.persist(store, incoming, reports)
    }

    /// Merge `incoming` into the stored dataset and rewrite both artifacts
    ///
    /// With nothing ingested this recomputes indices from the stored dataset
    /// alone. If the dataset write conflicts, the strength table is not
    /// written either and is reported as `Skipped`.
    pub fn persist(
        &self,
        store: &dyn DocumentStore,
        incoming: Vec<MatchRecord>,
        providers: Vec<ProviderReport>,
    ) -> Result<RunSummary> {
        let historical_doc = store.read(&self.storage.historical_key)?;
        let strength_doc = store.read(&self.storage.strength_key)?;

        let mut summary = RunSummary {
            providers,
            merge: MergeStats::default(),
            dataset: self.report(&self.storage.historical_key, ArtifactOutcome::Skipped, 0),
            strength: self.report(&self.storage.strength_key, ArtifactOutcome::Skipped, 0),
        };

        if historical_doc.is_none() && incoming.is_empty() {
            log::info!("Nothing ingested and no stored dataset, nothing to do");
            return Ok(summary);
        }

        let historical = match &historical_doc {
            Some(doc) => read_dataset(&doc.content)?,
            None => Vec::new(),
        };
        log::info!(
            "Merging {} new records into {} stored",
            incoming.len(),
            historical.len()
        );

        let merged = merge(historical, incoming);
        summary.merge = merged.stats;

        let content = write_dataset(&merged.records)?;
        let outcome = self.save(
            store,
            &self.storage.historical_key,
            &content,
            historical_doc.as_ref().map(|d| d.content.as_str()),
            WriteCondition::from_existing(historical_doc.as_ref()),
        )?;
        summary.dataset = self.report(&self.storage.historical_key, outcome, merged.records.len());

        // Indices from a dataset that wasn't stored would describe nothing
        if outcome == ArtifactOutcome::Conflict {
            return Ok(summary);
        }

        let indices = strength::compute(&merged.records);
        let content = write_strength(&indices)?;
        let outcome = self.save(
            store,
            &self.storage.strength_key,
            &content,
            strength_doc.as_ref().map(|d| d.content.as_str()),
            WriteCondition::from_existing(strength_doc.as_ref()),
        )?;
        summary.strength = self.report(&self.storage.strength_key, outcome, indices.len());

        Ok(summary)
    }

    fn save(
        &self,
        store: &dyn DocumentStore,
        key: &str,
        content: &str,
        stored: Option<&str>,
        condition: WriteCondition,
    ) -> Result<ArtifactOutcome> {
        if stored == Some(content) {
            log::info!("{}: unchanged", key);
            return Ok(ArtifactOutcome::Unchanged);
        }

        match store.write(key, content, condition)? {
            WriteOutcome::Written(version) => {
                log::info!("{}: written (version {})", key, version.0);
                Ok(ArtifactOutcome::Written)
            }
            WriteOutcome::Conflict => {
                log::error!("{}", FootballError::PersistenceConflict { key: key.to_string() });
                Ok(ArtifactOutcome::Conflict)
            }
        }
    }

    fn report(&self, key: &str, outcome: ArtifactOutcome, rows: usize) -> ArtifactReport {
        ArtifactReport {
            key: key.to_string(),
            outcome,
            rows,
        }
    }
}
