use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tier_engine::{
    config::{DatabaseSettings, Settings},
    driver::{PeriodAggregationDriver, RawActivityRow},
    models::{CohortScope, Metric, ReportingPeriod, Tier},
    report::compare_periods,
    scoring::MetricScorer,
    store::{MemoryStore, SqliteStore, TierStore},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "tier-engine")]
#[clap(about = "Score customers and calibrate value tiers per reporting period", long_about = None)]
struct Cli {
    /// Settings file layered over the defaults
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate and persist tiers for one or more periods
    Calculate {
        /// Period as 2025-03, 2025-Q1 or 2025; repeat for several
        #[clap(short, long, required = true)]
        period: Vec<String>,
        
        /// JSON array of raw activity rows; without it rows come from the database
        #[clap(short, long)]
        input: Option<PathBuf>,
        
        /// Database URL overriding the configured one
        #[clap(long)]
        database: Option<String>,
        
        /// Calibrate each business line separately
        #[clap(long)]
        per_line: bool,
        
        /// Restrict to one business line (MYR, SGD, USC, ...)
        #[clap(long)]
        line: Option<String>,
    },
    
    /// Score a single raw value on a metric curve
    Score {
        /// DA, GGR, PF, ATV or WIN_RATE
        #[clap(short, long)]
        metric: String,
        
        #[clap(short, long, allow_negative_numbers = true)]
        value: f64,
    },
    
    /// Compare persisted tiers between two periods
    Movement {
        #[clap(long)]
        from: String,
        
        #[clap(long)]
        to: String,
        
        #[clap(long)]
        database: Option<String>,
        
        #[clap(long)]
        line: Option<String>,
    },
    
    /// Print the tier name and group table
    Tiers,
}

fn parse_period(s: &str) -> anyhow::Result<ReportingPeriod> {
    Ok(s.parse::<ReportingPeriod>()?)
}

async fn open_database(settings: &Settings, url: Option<String>) -> anyhow::Result<SqliteStore> {
    let db = DatabaseSettings {
        url: url.unwrap_or_else(|| settings.database.url.clone()),
        ..settings.database.clone()
    };
    Ok(SqliteStore::connect(&db).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    
    // Load configuration
    let settings = Settings::load(cli.config.as_deref())?;
    
    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.app.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    
    // Validate settings
    if let Err(e) = settings.validate() {
        error!("Invalid settings: {}", e);
        return Err(e.into());
    }
    
    let total_weight = settings.total_weight();
    if (total_weight - 1.0).abs() > 0.01 {
        warn!(total_weight, "Enabled metric weights do not sum to 1.0");
    }
    
    match cli.command {
        Commands::Calculate { period, input, database, per_line, line } => {
            let periods = period
                .iter()
                .map(|p| parse_period(p))
                .collect::<anyhow::Result<Vec<_>>>()?;
            
            let scope = if per_line {
                CohortScope::PeriodAndLine
            } else {
                settings.scoring.cohort_scope
            };
            let driver = PeriodAggregationDriver::new(&settings);
            
            match input {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)?;
                    let rows = RawActivityRow::from_json_array(&text)?;
                    info!("Loaded {} rows from {}", rows.len(), path.display());
                    
                    let store = MemoryStore::with_rows(rows);
                    let summaries = driver
                        .run_many(&store, &store, &periods, scope, line)
                        .await
                        .into_iter()
                        .collect::<tier_engine::Result<Vec<_>>>()?;
                    
                    let mut assignments = Vec::new();
                    for p in &periods {
                        assignments.extend(store.load_assignments(*p, None).await?);
                    }
                    let output = serde_json::json!({
                        "summaries": summaries,
                        "assignments": assignments,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                None => {
                    let store = open_database(&settings, database).await?;
                    let summaries = driver
                        .run_many(&store, &store, &periods, scope, line)
                        .await
                        .into_iter()
                        .collect::<tier_engine::Result<Vec<_>>>()?;
                    println!("{}", serde_json::to_string_pretty(&summaries)?);
                }
            }
        }
        
        Commands::Score { metric, value } => {
            let metric = Metric::from_code(&metric)
                .ok_or_else(|| anyhow::anyhow!("Unknown metric: {}", metric))?;
            let scorer = MetricScorer::new(&settings.scoring.curves);
            
            match scorer.score(metric, value) {
                Some(score) => println!("{} ({}) = {:.4}", scorer.label(metric), value, score),
                None => println!("{} ({}) = excluded", scorer.label(metric), value),
            }
        }
        
        Commands::Movement { from, to, database, line } => {
            let from = parse_period(&from)?;
            let to = parse_period(&to)?;
            let store = open_database(&settings, database).await?;
            
            let previous = store.load_assignments(from, line.clone()).await?;
            let current = store.load_assignments(to, line).await?;
            let report = compare_periods(from, &previous, to, &current);
            
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        
        Commands::Tiers => {
            let labels = settings.tiers.names.iter().zip(&settings.tiers.groups);
            for (tier, (name, group)) in Tier::all().zip(labels) {
                println!("{}  {:<12} {}", tier, name, group);
            }
        }
    }
    
    Ok(())
}
