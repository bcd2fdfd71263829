//! Research router: answers a free-form query through exactly one of three
//! paths (web search, knowledge base, or the model alone)
//!
//! ```text
//! Route ──> WebResearch ──┐
//!   │                     ├──> Summarize ──> end
//!   ├────> KnowledgeBase ─┘
//!   └────> Direct ──────────────────────────> end
//! ```

use crate::engine::{Engine, PipelineState, Stage, Workflow};
use crate::model::{ModelClient, RetryPolicy};
use crate::prompts;
use crate::state::write_once;
use crate::{Error, Result};
use async_trait::async_trait;
use driftwatch_core::{KnowledgeItem, KnowledgeStore, Pillar};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Branch chosen by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    WebResearch,
    KnowledgeBase,
    Direct,
}

/// State of one research query
#[derive(Debug, Clone, Default)]
pub struct ResearchState {
    pub query: String,
    pub route: Option<Route>,
    pub web_result: Option<String>,
    pub knowledge_result: Option<String>,
    pub answer: Option<String>,
}

impl ResearchState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Partial updates produced by research stages
#[derive(Debug, Clone)]
pub enum ResearchUpdate {
    Routed(Route),
    Web(String),
    Knowledge(String),
    Answer(String),
}

impl PipelineState for ResearchState {
    type Update = ResearchUpdate;

    fn apply(&mut self, stage: &'static str, update: ResearchUpdate) -> Result<()> {
        match update {
            ResearchUpdate::Routed(route) => write_once(&mut self.route, route, stage, "route"),
            ResearchUpdate::Web(text) => {
                write_once(&mut self.web_result, text, stage, "web_result")
            }
            ResearchUpdate::Knowledge(text) => {
                write_once(&mut self.knowledge_result, text, stage, "knowledge_result")
            }
            ResearchUpdate::Answer(text) => write_once(&mut self.answer, text, stage, "answer"),
        }
    }
}

/// One web search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Web search provider
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

/// Search provider used when no API key is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSearch;

#[async_trait]
impl WebSearch for DisabledSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>> {
        debug!("Web search disabled; no results for '{}'", query);
        Ok(Vec::new())
    }
}

/// Tavily search API client
pub struct TavilySearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    policy: RetryPolicy,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl TavilySearch {
    pub const ENDPOINT: &'static str = "https://api.tavily.com/search";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: Self::ENDPOINT.to_string(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn search_once(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query,
                search_depth: "basic",
                max_results,
            })
            .send()
            .await
            .map_err(|e| Error::ExternalCall(format!("web search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ExternalCall(format!("web search returned {}", status)));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedOutput(format!("web search response: {}", e)))?;
        Ok(body.results)
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.policy
            .run("web search", || self.search_once(query, max_results))
            .await
    }
}

/// Knowledge score at or above which the knowledge base is worth consulting
pub const KNOWLEDGE_THRESHOLD: f32 = 0.1;
const KNOWLEDGE_HITS: usize = 3;
const WEB_HITS: usize = 3;

/// Whether the query asks for fresh information
pub fn wants_fresh_information(query: &str) -> bool {
    let query = query.to_lowercase();
    query.contains("latest") || query.contains("current")
}

/// Best-scoring knowledge items across every namespace, highest first
async fn best_knowledge(
    knowledge: &KnowledgeStore,
    query: &str,
    k: usize,
) -> Result<Vec<(Pillar, KnowledgeItem, f32)>> {
    let mut hits = Vec::new();
    for pillar in Pillar::all() {
        for scored in knowledge.query_scored(*pillar, query, k).await? {
            hits.push((*pillar, scored.item, scored.score));
        }
    }
    hits.sort_by(|a, b| b.2.total_cmp(&a.2));
    hits.truncate(k);
    Ok(hits)
}

struct RouteStage {
    knowledge: KnowledgeStore,
}

#[async_trait]
impl Stage<ResearchState> for RouteStage {
    fn name(&self) -> &'static str {
        "route"
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate> {
        let route = if wants_fresh_information(&state.query) {
            Route::WebResearch
        } else {
            let best = best_knowledge(&self.knowledge, &state.query, 1).await?;
            match best.first() {
                Some((_, _, score)) if *score >= KNOWLEDGE_THRESHOLD => Route::KnowledgeBase,
                _ => Route::Direct,
            }
        };

        info!("Research query routed to {:?}", route);
        Ok(ResearchUpdate::Routed(route))
    }
}

struct WebResearchStage {
    search: Arc<dyn WebSearch>,
}

#[async_trait]
impl Stage<ResearchState> for WebResearchStage {
    fn name(&self) -> &'static str {
        "web_research"
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate> {
        let hits = self.search.search(&state.query, WEB_HITS).await?;
        if hits.is_empty() {
            return Ok(ResearchUpdate::Web("No relevant web pages found.".to_string()));
        }

        let text = hits
            .iter()
            .map(|hit| format!("{} ({})\n{}", hit.title, hit.url, hit.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(ResearchUpdate::Web(text))
    }
}

struct KnowledgeBaseStage {
    knowledge: KnowledgeStore,
}

#[async_trait]
impl Stage<ResearchState> for KnowledgeBaseStage {
    fn name(&self) -> &'static str {
        "knowledge_base"
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate> {
        let hits: Vec<(Pillar, KnowledgeItem)> =
            best_knowledge(&self.knowledge, &state.query, KNOWLEDGE_HITS)
                .await?
                .into_iter()
                .map(|(pillar, item, _)| (pillar, item))
                .collect();
        Ok(ResearchUpdate::Knowledge(prompts::knowledge_block(&hits)))
    }
}

struct SummarizeStage {
    model: ModelClient,
}

#[async_trait]
impl Stage<ResearchState> for SummarizeStage {
    fn name(&self) -> &'static str {
        "summarize"
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate> {
        let prompt = prompts::research_summary(
            &state.query,
            state.web_result.as_deref(),
            state.knowledge_result.as_deref(),
        );
        let answer = self.model.complete(&prompt).await?;
        Ok(ResearchUpdate::Answer(answer.trim().to_string()))
    }
}

struct DirectStage {
    model: ModelClient,
}

#[async_trait]
impl Stage<ResearchState> for DirectStage {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn run(&self, state: &ResearchState) -> Result<ResearchUpdate> {
        let answer = self
            .model
            .complete(&prompts::direct_answer(&state.query))
            .await?;
        Ok(ResearchUpdate::Answer(answer.trim().to_string()))
    }
}

/// Nodes of the research workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchNode {
    Route,
    WebResearch,
    KnowledgeBase,
    Summarize,
    Direct,
}

/// The research state machine
pub struct ResearchWorkflow {
    route: RouteStage,
    web: WebResearchStage,
    knowledge: KnowledgeBaseStage,
    summarize: SummarizeStage,
    direct: DirectStage,
}

impl ResearchWorkflow {
    pub fn new(knowledge: KnowledgeStore, search: Arc<dyn WebSearch>, model: ModelClient) -> Self {
        Self {
            route: RouteStage {
                knowledge: knowledge.clone(),
            },
            web: WebResearchStage { search },
            knowledge: KnowledgeBaseStage { knowledge },
            summarize: SummarizeStage {
                model: model.clone(),
            },
            direct: DirectStage { model },
        }
    }
}

impl Workflow<ResearchState> for ResearchWorkflow {
    type Node = ResearchNode;

    fn entry(&self) -> ResearchNode {
        ResearchNode::Route
    }

    fn stage(&self, node: ResearchNode) -> &dyn Stage<ResearchState> {
        match node {
            ResearchNode::Route => &self.route,
            ResearchNode::WebResearch => &self.web,
            ResearchNode::KnowledgeBase => &self.knowledge,
            ResearchNode::Summarize => &self.summarize,
            ResearchNode::Direct => &self.direct,
        }
    }

    fn next(&self, node: ResearchNode, state: &ResearchState) -> Option<ResearchNode> {
        match node {
            ResearchNode::Route => match state.route? {
                Route::WebResearch => Some(ResearchNode::WebResearch),
                Route::KnowledgeBase => Some(ResearchNode::KnowledgeBase),
                Route::Direct => Some(ResearchNode::Direct),
            },
            ResearchNode::WebResearch | ResearchNode::KnowledgeBase => {
                Some(ResearchNode::Summarize)
            }
            ResearchNode::Summarize | ResearchNode::Direct => None,
        }
    }
}

/// Route taken and final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub route: Route,
    pub answer: String,
}

/// Runs research queries
pub struct ResearchRouter {
    engine: Engine,
    workflow: ResearchWorkflow,
}

impl ResearchRouter {
    pub fn new(knowledge: KnowledgeStore, search: Arc<dyn WebSearch>, model: ModelClient) -> Self {
        Self {
            engine: Engine::new(),
            workflow: ResearchWorkflow::new(knowledge, search, model),
        }
    }

    pub async fn answer(&self, query: &str, cancel: &CancellationToken) -> Result<ResearchOutcome> {
        let mut state = ResearchState::new(query);
        self.engine
            .execute(&self.workflow, &mut state, cancel)
            .await?;

        match (state.route, state.answer) {
            (Some(route), Some(answer)) => Ok(ResearchOutcome { route, answer }),
            _ => Err(Error::Other("research finished without an answer".to_string())),
        }
    }
}
