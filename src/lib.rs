//! paper-rank - multi-signal ranking and deduplication for paper metadata.
//!
//! This library maintains three independent similarity signals over a corpus
//! of academic paper records and fuses them into a single ranked result set:
//!
//! - **lexical**: TF-IDF vectors over title, authors, and abstract
//! - **semantic**: dense sentence embeddings, incrementally recomputed via
//!   content fingerprints
//! - **exact**: weighted term matching against title, authors, and abstract
//!
//! It also resolves duplicate records that arrive from inconsistently
//! formatted sources (arXiv feeds, DBLP listings, BibTeX files, legacy JSON
//! exports) by merging publication metadata into one surviving record.
//!
//! # Architecture
//!
//! - **models**: core data structures (Paper, RankedPaper)
//! - **normalize**: canonicalization of titles and author strings
//! - **fingerprint**: content hashing for staleness detection
//! - **embedding**: text embedding abstraction and local implementation
//! - **storage**: abstract record store and in-memory backend
//! - **index**: persisted lexical (TF-IDF) and semantic (embedding) indices
//! - **query**: rank fusion engine and result cache
//! - **dedup**: duplicate detection and field-level merge
//! - **ingestion**: upsert pipeline for normalized adapter records
//! - **provider**: paper metadata sources (legacy JSON export)
//! - **config**: hot-reloadable ranking configuration
//!
//! # Workflow
//!
//! Maintenance jobs run sequentially (single-writer model):
//!
//! 1. Ingest normalized records from adapters into the record store
//! 2. Resolve duplicates (merge venue metadata, delete the rest)
//! 3. Rebuild the lexical index over the full corpus
//! 4. Sync the semantic index (re-embed only changed records)
//!
//! Queries are read-only against loaded index snapshots and may be served
//! concurrently:
//!
//! ```ignore
//! use paper_rank::query::{FusionEngine, SearchMode, SignalWeights};
//!
//! # async fn example(engine: &paper_rank::query::FusionEngine<P>) -> anyhow::Result<()> {
//! let results = engine
//!     .search("transformer robustness", SearchMode::Fused, &SignalWeights::default(), 20)
//!     .await?;
//! for ranked in results {
//!     println!("{:.3}  {}", ranked.score, ranked.paper.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dedup;
pub mod embedding;
pub mod fingerprint;
pub mod index;
pub mod ingestion;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod query;
pub mod storage;

// Re-export commonly used types at the crate root
pub use config::RankingConfig;
pub use dedup::{DuplicateResolver, MergeReport};
pub use embedding::EmbeddingProvider;
pub use models::{Paper, RankedPaper};
pub use query::{FusionEngine, SearchMode, SignalWeights};
pub use storage::RecordStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model name
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Default embedding dimension for all-MiniLM-L6-v2
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
