//! Corpus maintenance CLI.
//!
//! Runs the offline jobs around a JSON corpus snapshot: ingestion, index
//! rebuilds, duplicate resolution, and ad-hoc queries against the current
//! artifacts. Jobs are sequential by design; each command loads the
//! snapshot, does its work, and writes results back before exiting.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use paper_rank::dedup::DuplicateResolver;
use paper_rank::embedding::EmbeddingProvider;
use paper_rank::index::lexical::LexicalIndex;
use paper_rank::index::semantic::SemanticIndex;
use paper_rank::ingestion::IngestionPipeline;
use paper_rank::provider::json::JsonExportProvider;
use paper_rank::query::{FusionEngine, SearchMode};
use paper_rank::storage::memory::MemoryStore;
use paper_rank::storage::RecordStore;
use paper_rank::RankingConfig;

#[derive(Parser)]
#[command(name = "maintenance", about = "Corpus maintenance jobs", version)]
struct Cli {
    /// Directory holding the corpus snapshot and index artifacts
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Optional ranking config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a preprint feed export (matched by external id)
    IngestPreprints {
        /// JSON export file
        file: PathBuf,
    },
    /// Ingest a publication listing export (matched by title and authors)
    IngestPublications {
        /// JSON export file
        file: PathBuf,
    },
    /// Rebuild the TF-IDF index from the full corpus
    RebuildLexical,
    /// Incrementally sync record embeddings
    SyncSemantic,
    /// Collapse duplicate records onto their survivors
    Dedup,
    /// Run a search against the current artifacts
    Search {
        /// Free-text query
        query: String,
        /// Override the configured mode
        #[arg(long, value_enum)]
        mode: Option<CliMode>,
        /// Override the configured result limit
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the records most similar to one record
    Similar {
        /// Record id
        id: i64,
        /// Number of neighbors
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliMode {
    Lexical,
    Semantic,
    Exact,
    Fused,
}

impl From<CliMode> for SearchMode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Lexical => SearchMode::Lexical,
            CliMode::Semantic => SearchMode::Semantic,
            CliMode::Exact => SearchMode::ExactMatch,
            CliMode::Fused => SearchMode::Fused,
        }
    }
}

/// Artifact locations inside the data directory.
struct Paths {
    corpus: PathBuf,
    tfidf_model: PathBuf,
    tfidf_matrix: PathBuf,
    vectors: PathBuf,
    fingerprints: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        Self {
            corpus: data_dir.join("papers.json"),
            tfidf_model: data_dir.join("tfidf_model.json"),
            tfidf_matrix: data_dir.join("tfidf_matrix.json"),
            vectors: data_dir.join("vectors.json"),
            fingerprints: data_dir.join("fingerprints.json"),
        }
    }
}

#[cfg(feature = "local-embeddings")]
fn embedding_provider() -> anyhow::Result<impl EmbeddingProvider> {
    paper_rank::embedding::local::LocalEmbeddingProvider::with_defaults()
        .context("failed to initialize local embedding model")
}

/// Without a bundled model, semantic operations report themselves
/// unavailable and fused search degrades to the remaining signals.
#[cfg(not(feature = "local-embeddings"))]
fn embedding_provider() -> anyhow::Result<impl EmbeddingProvider> {
    struct Disabled;

    #[async_trait::async_trait]
    impl EmbeddingProvider for Disabled {
        async fn embed(
            &self,
            _text: &str,
        ) -> paper_rank::embedding::EmbeddingResult<Vec<f32>> {
            Err(paper_rank::embedding::EmbeddingError::ConfigError(
                "built without the local-embeddings feature".to_string(),
            ))
        }

        fn dimension(&self) -> usize {
            0
        }

        fn model_name(&self) -> &str {
            "disabled"
        }
    }

    Ok(Disabled)
}

async fn load_store(paths: &Paths) -> anyhow::Result<MemoryStore> {
    if paths.corpus.exists() {
        MemoryStore::load(&paths.corpus)
            .await
            .with_context(|| format!("failed to load corpus {}", paths.corpus.display()))
    } else {
        info!(path = %paths.corpus.display(), "no corpus snapshot, starting empty");
        Ok(MemoryStore::new())
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RankingConfig> {
    match path {
        Some(path) => RankingConfig::load(path).context("failed to load ranking config"),
        None => Ok(RankingConfig::default()),
    }
}

fn try_load_lexical(paths: &Paths) -> Option<LexicalIndex> {
    match LexicalIndex::load(&paths.tfidf_model, &paths.tfidf_matrix) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!(error = %e, "lexical index unavailable");
            None
        }
    }
}

fn try_load_semantic(paths: &Paths) -> Option<SemanticIndex> {
    match SemanticIndex::load(&paths.vectors, &paths.fingerprints) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!(error = %e, "semantic index unavailable");
            None
        }
    }
}

fn print_results(results: &[paper_rank::models::RankedPaper]) {
    if results.is_empty() {
        println!("no results");
        return;
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>3}. [{:.4}] {} ({})",
            rank + 1,
            result.score,
            result.paper.title,
            result.paper.authors
        );
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::new(&cli.data_dir);
    tokio::fs::create_dir_all(&cli.data_dir)
        .await
        .with_context(|| format!("failed to create {}", cli.data_dir.display()))?;

    match cli.command {
        Command::IngestPreprints { file } => {
            let mut store = load_store(&paths).await?;
            let provider = JsonExportProvider::new(file);
            let stats = IngestionPipeline::ingest_preprints(&mut store, &provider).await?;
            store.save(&paths.corpus).await?;
            println!(
                "fetched {}, inserted {}, updated {}, unchanged {}, skipped {}",
                stats.fetched, stats.inserted, stats.updated, stats.unchanged, stats.skipped
            );
            if stats.changed() {
                println!("indices are stale: run rebuild-lexical and sync-semantic");
            }
        }
        Command::IngestPublications { file } => {
            let mut store = load_store(&paths).await?;
            let provider = JsonExportProvider::new(file);
            let stats = IngestionPipeline::ingest_publications(&mut store, &provider).await?;
            store.save(&paths.corpus).await?;
            println!(
                "fetched {}, inserted {}, updated {}, unchanged {}",
                stats.fetched, stats.inserted, stats.updated, stats.unchanged
            );
            if stats.changed() {
                println!("indices are stale: run rebuild-lexical and sync-semantic");
            }
        }
        Command::RebuildLexical => {
            let store = load_store(&paths).await?;
            let corpus = store.get_all_papers().await?;
            let index = LexicalIndex::fit(&corpus)?;
            index.save(&paths.tfidf_model, &paths.tfidf_matrix)?;
            println!("indexed {} records", index.len());
        }
        Command::SyncSemantic => {
            let store = load_store(&paths).await?;
            let corpus = store.get_all_papers().await?;
            let provider = embedding_provider()?;
            let mut index = try_load_semantic(&paths).unwrap_or_default();
            let stats = index.sync(&corpus, &provider).await?;
            index.save(&paths.vectors, &paths.fingerprints)?;
            println!(
                "embedded {}, unchanged {}, removed {}",
                stats.embedded, stats.unchanged, stats.removed
            );
        }
        Command::Dedup => {
            let mut store = load_store(&paths).await?;
            let report = DuplicateResolver::resolve(&mut store).await?;
            store.save(&paths.corpus).await?;
            println!(
                "scanned {}, groups {}, removed {}, enriched {}",
                report.scanned, report.groups, report.removed, report.enriched
            );
            if report.changed() {
                println!("indices are stale: run rebuild-lexical and sync-semantic");
            }
        }
        Command::Search { query, mode, limit } => {
            let config = load_config(cli.config.as_deref())?;
            let store = load_store(&paths).await?;
            let corpus = store.get_all_papers().await?;

            let mut engine = FusionEngine::new(corpus, embedding_provider()?);
            if let Some(index) = try_load_lexical(&paths) {
                engine = engine.with_lexical(index);
            }
            if let Some(index) = try_load_semantic(&paths) {
                engine = engine.with_semantic(index);
            }

            let mode = mode.map(SearchMode::from).unwrap_or(config.mode);
            let limit = limit.unwrap_or(config.result_limit);
            let results = engine
                .search(&query, mode, &config.weights, limit)
                .await?;
            print_results(&results);
        }
        Command::Similar { id, top } => {
            let store = load_store(&paths).await?;
            let corpus = store.get_all_papers().await?;

            let mut engine = FusionEngine::new(corpus, embedding_provider()?);
            if let Some(index) = try_load_semantic(&paths) {
                engine = engine.with_semantic(index);
            }
            let source = engine.paper(id)?;
            println!("similar to: {}", source.title);
            let results = engine.nearest(id, top)?;
            print_results(&results);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    run(Cli::parse()).await
}
