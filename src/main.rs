//! Football fixtures CLI
//!
//! Syncs schedules and results from the configured providers into the
//! stored dataset and keeps the team strength table up to date.

use clap::{Parser, Subcommand};
use football::{Config, Result};

#[derive(Parser)]
#[command(name = "football")]
#[command(about = "Football fixture ingestion and team strength indices", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Fetch providers, merge into the stored dataset, recompute strength
    Sync {
        /// Only sync these providers (repeatable)
        #[arg(long = "provider")]
        providers: Vec<String>,
        /// Cache directory for fetched pages
        #[arg(long)]
        cache: Option<String>,
        /// Use only cached files (no network requests)
        #[arg(long)]
        offline: bool,
    },
    /// Recompute the strength table from the stored dataset
    Strength,
    /// Show what is stored
    Status {
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Write a stored document to a file
    Export {
        /// Document key, e.g. matches.csv
        key: String,
        /// Output path
        output: String,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Sync {
            providers,
            cache,
            offline,
        } => commands::sync(&config, providers, cache, offline),
        Commands::Strength => commands::strength(&config),
        Commands::Status { format } => commands::status(&config, format),
        Commands::Export { key, output } => commands::export(&config, &key, &output),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

mod commands {
    use super::*;
    use football::data::dataset::{read_dataset, read_strength};
    use football::data::scrapers::HttpFetcher;
    use football::data::{Database, DocumentStore};
    use football::pipeline::{Pipeline, ProviderOutcome, RunSummary};
    use football::FootballError;
    use serde::Serialize;

    /// Commands return `Ok(false)` when they ran but the outcome needs attention
    type Outcome = Result<bool>;

    pub fn init(config_path: &str) -> Outcome {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        if let Some(parent) = std::path::Path::new(&config.storage.database_path).parent() {
            std::fs::create_dir_all(parent)?;
            println!("Created {}/ directory", parent.display());
        }

        println!("\nNext steps:");
        println!("  1. Edit {} to add or remove providers", config_path);
        println!("  2. Run 'football sync' to fetch fixtures and results");
        println!("  3. Run 'football status' to see what is stored");

        Ok(true)
    }

    pub fn sync(
        config: &Config,
        names: Vec<String>,
        cache: Option<String>,
        offline: bool,
    ) -> Outcome {
        let mut pipeline = Pipeline::from_config(config);
        if !names.is_empty() {
            let selected = names
                .iter()
                .map(|name| {
                    config.provider(name).cloned().ok_or_else(|| {
                        let known: Vec<&str> = config.providers.iter().map(|p| p.name.as_str()).collect();
                        FootballError::Config(format!(
                            "Unknown provider: {}. Available: {}",
                            name,
                            known.join(", ")
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            pipeline = pipeline.with_providers(selected);
        }

        let mut fetcher = HttpFetcher::new(&config.fetch)?;
        if let Some(cache_dir) = cache {
            println!("Using cache directory: {}", cache_dir);
            fetcher = fetcher.with_cache(&cache_dir);
        }
        if offline {
            println!("Offline mode: using cached files only");
            fetcher = fetcher.offline_only(true);
        }

        let db = Database::open(&config.storage.database_path)?;
        let summary = pipeline.run(&fetcher, &db)?;
        print_summary(&summary);

        Ok(summary.is_success())
    }

    pub fn strength(config: &Config) -> Outcome {
        let db = Database::open(&config.storage.database_path)?;
        let summary = Pipeline::from_config(config).persist(&db, Vec::new(), Vec::new())?;
        print_summary(&summary);
        Ok(summary.is_success())
    }

    fn print_summary(summary: &RunSummary) {
        if !summary.providers.is_empty() {
            println!("\n=== Providers ===");
            for report in &summary.providers {
                match &report.outcome {
                    ProviderOutcome::Ingested {
                        rows,
                        records,
                        dropped,
                    } => println!(
                        "  {:<16} {:>5} fixtures ({} rows, {} dropped)",
                        report.provider, records, rows, dropped
                    ),
                    ProviderOutcome::Failed(e) => println!("  {:<16} FAILED: {}", report.provider, e),
                }
            }
        }

        let stats = &summary.merge;
        println!("\n=== Merge ===");
        println!(
            "  added {}, settled {}, updated {}, unchanged {}",
            stats.added, stats.settled, stats.updated, stats.unchanged
        );

        println!("\n=== Artifacts ===");
        for artifact in [&summary.dataset, &summary.strength] {
            println!("  {:<24} {:<10} {} rows", artifact.key, artifact.outcome, artifact.rows);
        }

        if !summary.is_success() {
            eprintln!("\nAnother writer updated the store during this run; rerun to merge its changes.");
        }
    }

    #[derive(Serialize)]
    struct StatusReport {
        documents: Vec<football::data::database::DocumentInfo>,
        fixtures: usize,
        settled: usize,
        leagues: Vec<String>,
        first_date: Option<String>,
        last_date: Option<String>,
        strength_rows: usize,
    }

    pub fn status(config: &Config, format: OutputFormat) -> Outcome {
        let db = Database::open(&config.storage.database_path)?;

        let records = match db.read(&config.storage.historical_key)? {
            Some(doc) => read_dataset(&doc.content)?,
            None => Vec::new(),
        };
        let strength_rows = match db.read(&config.storage.strength_key)? {
            Some(doc) => read_strength(&doc.content)?.len(),
            None => 0,
        };

        let mut leagues: Vec<String> = records.iter().map(|r| r.league.clone()).collect();
        leagues.sort();
        leagues.dedup();

        let report = StatusReport {
            documents: db.stats()?,
            fixtures: records.len(),
            settled: records.iter().filter(|r| r.is_settled()).count(),
            leagues,
            first_date: records.iter().map(|r| r.date).min().map(|d| d.to_string()),
            last_date: records.iter().map(|r| r.date).max().map(|d| d.to_string()),
            strength_rows,
        };

        match format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&report)
                    .map_err(|e| FootballError::Parse(e.to_string()))?;
                println!("{}", json);
            }
            OutputFormat::Table => {
                println!("Database: {}", config.storage.database_path);
                for doc in &report.documents {
                    println!(
                        "  {:<24} v{:<4} {:>9} bytes  {}",
                        doc.key, doc.version, doc.bytes, doc.updated_at
                    );
                }
                println!(
                    "Fixtures: {} ({} settled, {} upcoming)",
                    report.fixtures,
                    report.settled,
                    report.fixtures - report.settled
                );
                if let (Some(first), Some(last)) = (&report.first_date, &report.last_date) {
                    println!("Date range: {} to {}", first, last);
                }
                println!("Leagues: {}", report.leagues.join(", "));
                println!("Strength rows: {}", report.strength_rows);
            }
        }

        Ok(true)
    }

    pub fn export(config: &Config, key: &str, output: &str) -> Outcome {
        let db = Database::open(&config.storage.database_path)?;
        let Some(doc) = db.read(key)? else {
            return Err(FootballError::Config(format!("No document stored under {}", key)));
        };

        std::fs::write(output, &doc.content)?;
        println!("Wrote {} (version {}) to {}", key, doc.version.0, output);
        Ok(true)
    }
}
