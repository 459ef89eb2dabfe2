use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::info;

use tm_common::embedding::HashEmbeddingProvider;
use tm_common::engine::{
    CancellationHandle, MatchDirection, RecommendRequest, RecommendationEngine, RecommendationFilters,
};
use tm_common::explain::TemplateExplainer;
use tm_common::recommender::{FreelancerRecommender, JobRecommender};
use tm_common::{EngineConfig, Entity, EntityRole, logging, run_id, telemetry};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Parser)]
#[command(
    name = "tm-recommend",
    about = "Rank jobs and freelancers from a JSON fixture"
)]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    /// Start the Prometheus exporter on TM_METRICS_PORT (default 9464)
    #[arg(long, env = "TM_METRICS_ENABLED", default_value_t = false)]
    metrics: bool,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

/// Engine knobs. Unset flags keep the `TM_*` environment values or their defaults.
#[derive(Debug, Clone, Default, Args)]
struct EngineArgs {
    /// Maximum entries per ranked list
    #[arg(long, env = "TM_MAX_RECOMMENDATIONS", global = true)]
    max_recommendations: Option<usize>,

    /// Minimum adjusted score kept in a ranked list
    #[arg(long, env = "TM_DEFAULT_MIN_SCORE", global = true)]
    min_score: Option<f64>,

    /// Embedding cache entries
    #[arg(long, env = "TM_CACHE_CAPACITY", global = true)]
    cache_capacity: Option<usize>,

    /// Dimension of the local hashing embedder
    #[arg(long, env = "TM_EMBEDDING_DIMENSION", global = true)]
    embedding_dimension: Option<usize>,

    /// Concurrent pipelines in batch mode
    #[arg(long, env = "TM_BATCH_CONCURRENCY", global = true)]
    batch_concurrency: Option<usize>,
}

impl EngineArgs {
    fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(max) = self.max_recommendations {
            config.max_recommendations = max;
        }
        if let Some(min_score) = self.min_score.filter(|s| s.is_finite()) {
            config.default_min_score = min_score.clamp(0.0, 1.0);
        }
        if let Some(capacity) = self.cache_capacity {
            config.cache_capacity = capacity.max(1);
        }
        if let Some(dimension) = self.embedding_dimension {
            config.embedding_dimension = dimension.max(1);
        }
        if let Some(concurrency) = self.batch_concurrency {
            config.batch_concurrency = concurrency.max(1);
        }
        config
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open jobs for one freelancer profile: {"query": profile, "pool": [jobs], "filters": {..}}
    Jobs {
        input: PathBuf,
    },
    /// Available freelancers for one job: {"query": job, "pool": [profiles], "filters": {..}}
    Freelancers {
        input: PathBuf,
    },
    /// Items of the same kind closest to a reference: {"query": item, "pool": [items]}
    Similar {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Side::Job)]
        kind: Side,
    },
    /// Detailed breakdown for one pair: {"job": job, "profile": profile, "score": 0.8}
    Explain {
        input: PathBuf,
    },
    /// One ranked list per query: {"queries": [..], "pool": [..], "filters": {..}}
    Batch {
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Direction::ProfilesForJob)]
        direction: Direction,
        #[arg(long, default_value_t = false)]
        explain: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Side {
    Job,
    Profile,
}

impl From<Side> for EntityRole {
    fn from(side: Side) -> Self {
        match side {
            Side::Job => EntityRole::Job,
            Side::Profile => EntityRole::Profile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Direction {
    JobsForProfile,
    ProfilesForJob,
}

impl From<Direction> for MatchDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::JobsForProfile => MatchDirection::JobsForProfile,
            Direction::ProfilesForJob => MatchDirection::ProfilesForJob,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RankFixture {
    query: Entity,
    #[serde(default)]
    pool: Vec<Entity>,
    #[serde(default)]
    filters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PairFixture {
    job: Entity,
    profile: Entity,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BatchFixture {
    queries: Vec<Entity>,
    #[serde(default)]
    pool: Vec<Entity>,
    #[serde(default)]
    filters: Map<String, Value>,
}

fn load<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    let parsed = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid fixture {}: {err}", path.display()))?;
    Ok(parsed)
}

fn build_engine(config: EngineConfig) -> Arc<RecommendationEngine> {
    let provider = Arc::new(HashEmbeddingProvider::new(
        config.embedding_model.clone(),
        config.embedding_dimension,
    ));
    Arc::new(RecommendationEngine::from_provider(
        config,
        provider,
        Arc::new(TemplateExplainer),
    ))
}

async fn jobs_for(engine: &Arc<RecommendationEngine>, fixture: RankFixture) -> CliResult<Value> {
    let recommender = JobRecommender::new(Arc::clone(engine), None);
    let ranked = recommender
        .get_recommendations(
            &fixture.query,
            &fixture.pool,
            None,
            RecommendationFilters::from_map(&fixture.filters),
        )
        .await?;
    Ok(serde_json::to_value(ranked)?)
}

async fn freelancers_for(engine: &Arc<RecommendationEngine>, fixture: RankFixture) -> CliResult<Value> {
    let recommender = FreelancerRecommender::new(Arc::clone(engine), None);
    let ranked = recommender
        .get_recommendations(
            &fixture.query,
            &fixture.pool,
            None,
            RecommendationFilters::from_map(&fixture.filters),
        )
        .await?;
    Ok(serde_json::to_value(ranked)?)
}

async fn similar(engine: &Arc<RecommendationEngine>, fixture: RankFixture, side: Side) -> CliResult<Value> {
    let ranked = match side {
        Side::Profile => {
            FreelancerRecommender::new(Arc::clone(engine), None)
                .similar_profiles(&fixture.query, &fixture.pool, None)
                .await?
        }
        Side::Job => {
            engine
                .similar_to(&fixture.query, &fixture.pool, None, side.into())
                .await?
        }
    };
    Ok(serde_json::to_value(ranked)?)
}

async fn explain(engine: &Arc<RecommendationEngine>, fixture: PairFixture) -> CliResult<Value> {
    let score = match fixture.score {
        Some(score) => score,
        None => {
            // Score the pair the same way a ranked list would.
            let request = RecommendRequest {
                min_score: Some(0.0),
                limit: Some(1),
                ..Default::default()
            };
            engine
                .recommend(
                    MatchDirection::ProfilesForJob,
                    &fixture.job,
                    std::slice::from_ref(&fixture.profile),
                    &request,
                )
                .await?
                .first()
                .map_or(0.0, |r| r.score)
        }
    };
    let detail = FreelancerRecommender::new(Arc::clone(engine), None)
        .explain_match(&fixture.job, &fixture.profile, score)
        .await;
    Ok(serde_json::to_value(detail)?)
}

async fn batch(
    engine: &Arc<RecommendationEngine>,
    fixture: BatchFixture,
    direction: Direction,
    include_explanation: bool,
) -> CliResult<Value> {
    let request = RecommendRequest {
        filters: RecommendationFilters::from_map(&fixture.filters),
        include_explanation,
        ..Default::default()
    };
    let outcome = engine
        .batch_recommend(
            direction.into(),
            fixture.queries,
            Arc::new(fixture.pool),
            request,
            &CancellationHandle::new(),
        )
        .await;

    Ok(json!({
        "results": outcome.report(),
        "skipped": outcome.skipped,
        "cancelled": outcome.cancelled,
    }))
}

async fn execute(engine: &Arc<RecommendationEngine>, command: &Command) -> CliResult<Value> {
    match command {
        Command::Jobs { input } => jobs_for(engine, load(input)?).await,
        Command::Freelancers { input } => freelancers_for(engine, load(input)?).await,
        Command::Similar { input, kind } => similar(engine, load(input)?, *kind).await,
        Command::Explain { input } => explain(engine, load(input)?).await,
        Command::Batch {
            input,
            direction,
            explain,
        } => batch(engine, load(input)?, *direction, *explain).await,
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Jobs { .. } => "jobs",
        Command::Freelancers { .. } => "freelancers",
        Command::Similar { .. } => "similar",
        Command::Explain { .. } => "explain",
        Command::Batch { .. } => "batch",
    }
}

async fn run() -> CliResult<()> {
    dotenv().ok();
    logging::init_tracing_subscriber("tm-recommend");
    logging::install_tracing_panic_hook("tm-recommend");

    let cli = Cli::parse();
    if cli.metrics && tm_metrics::init_metrics("TM_METRICS_PORT", 9464).is_some() {
        telemetry::describe();
    }

    let config = cli.engine.apply(EngineConfig::from_env());
    info!(run_id = %run_id::get(), command = command_name(&cli.command), "starting");
    let engine = build_engine(config);

    let results = execute(&engine, &cli.command).await?;
    let envelope = json!({
        "run_id": run_id::get().to_string(),
        "generated_at": Utc::now().to_rfc3339(),
        "command": command_name(&cli.command),
        "cache": engine.cache_stats(),
        "results": results,
    });

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("tm-recommend failed: {err}");
        std::process::exit(1);
    }
}
