//! Application state

use crate::config::Config;
use anyhow::{Context, Result};
use driftwatch_core::{Database, HashingEmbedder, KnowledgeStore, RecoveryPolicy};
use driftwatch_pipeline::{
    AgentGenerator, DisabledSearch, Engine, ModelClient, OkrAnalyzer, Persona, ResearchRouter,
    StageObserver, TavilySearch, TextGenerator, WebSearch,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Model and search backends the state is built over
pub struct Backends {
    pub analyst: Arc<dyn TextGenerator>,
    pub researcher: Arc<dyn TextGenerator>,
    pub search: Arc<dyn WebSearch>,
}

impl Backends {
    /// llm-toolkit agents, plus Tavily when an API key is configured
    pub fn from_config(config: &Config) -> Self {
        let search: Arc<dyn WebSearch> = match &config.search.tavily_api_key {
            Some(key) => {
                let tavily = TavilySearch::new(key.clone()).with_policy(config.retry_policy());
                Arc::new(tavily)
            }
            None => {
                info!("No Tavily API key configured; web research disabled");
                Arc::new(DisabledSearch)
            }
        };

        Self {
            analyst: Arc::new(AgentGenerator::new(Persona::Analyst)),
            researcher: Arc::new(AgentGenerator::new(Persona::Researcher)),
            search,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Subjects, activity and analysis records
    pub db: Database,
    pub knowledge: KnowledgeStore,
    pub analyzer: Arc<OkrAnalyzer>,
    pub research: Arc<ResearchRouter>,
    analyst: ModelClient,
}

impl AppState {
    /// Open the stores with the production backends
    pub async fn new(config: Config) -> Result<Self> {
        let backends = Backends::from_config(&config);
        Self::with_backends(config, backends).await
    }

    /// Open the stores, recover and reseed the knowledge index, and wire the
    /// analyzer and research router over `backends`
    pub async fn with_backends(config: Config, backends: Backends) -> Result<Self> {
        let db = Database::open(config.database_path())
            .await
            .context("Failed to open database")?;

        let recovery = RecoveryPolicy {
            attempts: config.knowledge.init_attempts,
            backoff: Duration::from_millis(config.knowledge.init_backoff_ms),
        };
        let knowledge = KnowledgeStore::open_with_recovery(
            config.knowledge_path(),
            recovery,
            Arc::new(HashingEmbedder::default()),
        )
        .await
        .context("Failed to initialize knowledge index")?;

        let seeded = knowledge
            .reseed_with_retry(recovery)
            .await
            .context("Failed to seed knowledge index")?;
        info!("Knowledge index seeded ({} new items)", seeded);

        let policy = config.retry_policy();
        let analyst = ModelClient::with_policy(backends.analyst, policy);
        let analyzer = build_analyzer(&db, &knowledge, &analyst);
        let research = ResearchRouter::new(
            knowledge.clone(),
            backends.search,
            ModelClient::with_policy(backends.researcher, policy),
        );

        Ok(Self {
            config: Arc::new(config),
            db,
            knowledge,
            analyzer: Arc::new(analyzer),
            research: Arc::new(research),
            analyst,
        })
    }

    /// Analyzer reporting stage progress to `observer`
    pub fn observed_analyzer(&self, observer: Arc<dyn StageObserver>) -> OkrAnalyzer {
        build_analyzer(&self.db, &self.knowledge, &self.analyst)
            .with_engine(Engine::new().with_observer(observer))
    }
}

fn build_analyzer(db: &Database, knowledge: &KnowledgeStore, model: &ModelClient) -> OkrAnalyzer {
    OkrAnalyzer::new(
        Arc::new(db.activity()),
        Arc::new(db.records()),
        knowledge.clone(),
        model.clone(),
    )
}
