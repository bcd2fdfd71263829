//! Agent definitions for driftwatch-pipeline
//!
//! Every stage talks to the model in free text; the prompt carries the task.
//! Agents live in their own module to keep the macro output away from the
//! crate's `Result<T>` alias.

use llm_toolkit::agent;

/// General-purpose analyst used by every OKR stage
#[agent(
    expertise = r#"You are an academic and career coach who analyses student OKRs (Objectives and Key Results).

Students plan quarterly OKRs across five pillars:
- CLT: Continuous Learning & Training
- CFC: Create, Fund & Commercialize
- SCD: Skill & Competency Development
- IIPC: Industry Integration & Professional Connect
- SRI: Social Responsibility & Impact

Follow the instructions in each request exactly. When a request asks for JSON, answer with a single JSON object and nothing else."#,
    output = "String",
    backend = "claude"
)]
pub struct OkrAnalystAgent;

/// Agent for answering and summarising research queries
#[agent(
    expertise = r#"You are a research assistant.

Given a query and any gathered material, write a clear, structured answer.
Prefer the gathered material over prior knowledge and say so when it is insufficient."#,
    output = "String",
    backend = "claude"
)]
pub struct ResearchAgent;
