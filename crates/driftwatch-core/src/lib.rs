//! # driftwatch-core
//!
//! Data model and storage for the driftwatch OKR analysis service.
//!
//! ## Features
//!
//! - SQLite-backed subject/activity store and append-only analysis records
//! - Namespaced knowledge index with local embeddings and similarity search
//! - Self-healing knowledge index (integrity check, rebuild from seed data)
//! - Extended-JSON record encoding
//!
//! ## Example
//!
//! ```no_run
//! use driftwatch_core::{Database, KnowledgeStore, Pillar, RecordStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Database::open("~/.driftwatch/driftwatch.db").await?;
//!     let knowledge = KnowledgeStore::open("~/.driftwatch/knowledge.db").await?;
//!     knowledge.reseed().await?;
//!
//!     let hits = knowledge.query(Pillar::Scd, "interview preparation", 3).await?;
//!     let reports = db.records().recent(1, 5).await?;
//!
//!     println!("{} hits, {} reports", hits.len(), reports.len());
//!     Ok(())
//! }
//! ```

pub mod activity;
pub mod db;
pub mod embedding;
pub mod error;
pub mod ext_json;
pub mod knowledge;
pub mod records;
pub mod seed;
pub mod types;

// Re-exports for convenience
pub use activity::{Activities, ActivityStore};
pub use db::Database;
pub use embedding::{Embedder, HashingEmbedder};
pub use error::{Error, Result};
pub use knowledge::{KnowledgeStore, RecoveryPolicy};
pub use records::{RecordStore, Records};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
