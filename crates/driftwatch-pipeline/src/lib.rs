//! # driftwatch-pipeline
//!
//! Staged OKR drift analysis and the research router for driftwatch.
//!
//! ## Features
//!
//! - Five-stage analysis (extract, trajectory, drift, pattern, coaching)
//!   over a write-once shared state
//! - Generic sequential engine with cancellation and progress observers
//! - Model access with per-call timeout and exponential backoff
//! - Tolerant parsing of model JSON with tagged fallbacks
//! - Query router choosing web search, knowledge base, or a direct answer
//!
//! ## Example
//!
//! ```no_run
//! use driftwatch_core::{Database, KnowledgeStore, RunParameters};
//! use driftwatch_pipeline::{AgentGenerator, ModelClient, OkrAnalyzer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Database::open("~/.driftwatch/driftwatch.db").await?;
//!     let knowledge = KnowledgeStore::open("~/.driftwatch/knowledge.db").await?;
//!     let model = ModelClient::new(Arc::new(AgentGenerator::default()));
//!
//!     let analyzer = OkrAnalyzer::new(
//!         Arc::new(db.activity()),
//!         Arc::new(db.records()),
//!         knowledge,
//!         model,
//!     );
//!     let record = analyzer.run(1, RunParameters::default()).await?;
//!
//!     println!("Record {} ({} coaching cells)", record.id, record.coaching_plan.cell_count());
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod analyzer;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod model;
pub mod parse;
pub mod prompts;
pub mod research;
pub mod stages;
pub mod state;
pub mod summary;

// Re-exports
pub use analyzer::OkrAnalyzer;
pub use engine::{Engine, NoopObserver, PipelineState, Stage, StageObserver, Workflow};
pub use error::{Error, Result};
pub use model::{AgentGenerator, ModelClient, Persona, RetryPolicy, TextGenerator};
pub use parse::{first_json_object, parse_drift_report, ParseOutcome};
pub use research::{
    DisabledSearch, ResearchOutcome, ResearchRouter, Route, SearchHit, TavilySearch, WebSearch,
};
pub use stages::{OkrStep, OkrWorkflow};
pub use state::{AnalysisState, StateUpdate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
