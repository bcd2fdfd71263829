//! Prompt templates for the analysis stages and the research router

use crate::catalog::CatalogEntry;
use crate::Result;
use driftwatch_core::{
    BehaviorPattern, DriftAssessment, DriftReport, HistorySnapshot, KnowledgeItem,
    PatternClassification, Pillar,
};

const PILLAR_OVERVIEW: &str = "\
- CLT: Continuous Learning & Training (PrepInsta courses, GenAI, Product Management)
- CFC: Create, Fund & Commercialize (Hackathons, BMC videos, GenAI projects)
- SCD: Skill & Competency Development (LeetCode, Mock exams, Competitive programming)
- IIPC: Industry Integration & Professional Connect (LinkedIn networking, Article writing)
- SRI: Social Responsibility & Impact (Community engagement, Design thinking activities)";

/// Prefix `prompt` with retrieved knowledge, if any
pub fn with_context(prompt: &str, context: &[KnowledgeItem]) -> String {
    if context.is_empty() {
        return prompt.to_string();
    }

    let context_text = context
        .iter()
        .map(|item| {
            format!(
                "Context: {}\nMetadata: {}",
                item.content,
                serde_json::Value::Object(item.metadata.clone())
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("Context Information:\n{}\n\nQuery: {}", context_text, prompt)
}

fn history_json(history: &HistorySnapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(&history.items)?)
}

pub fn trajectory(history: &HistorySnapshot, goal: &str) -> Result<String> {
    Ok(format!(
        r#"Analyze the student's OKR progression across cycles and identify their trajectory.

Quarterly goal: {goal}

OKR History:
{history}

Consider the 5 OKR Pillars:
{PILLAR_OVERVIEW}

Analyze:
1. Primary focus areas and their evolution
2. Skill progression patterns across pillars
3. Career direction alignment and coherence
4. Cross-pillar connections and synergies
5. Depth vs breadth of skill development

Provide a concise trajectory summary (2-3 sentences) that captures the student's goal progression pattern."#,
        history = history_json(history)?,
    ))
}

pub fn drift(trajectory: &str, history: &HistorySnapshot, goal: &str) -> Result<String> {
    Ok(format!(
        r#"Analyze the student's OKR progression for goal drift patterns.

Quarterly goal: {goal}
Trajectory Summary: {trajectory}
OKR Data:
{history}

5-Pillar Framework Context:
- CLT: Should show progressive learning (basic -> advanced courses)
- CFC: Should build from participation -> creation -> commercialization
- SCD: Should demonstrate consistent skill building
- IIPC: Should show growing professional network and thought leadership
- SRI: Should demonstrate sustained community engagement

Detect and analyze:
1. Significant detours from logical progression within pillars
2. Inconsistent pillar focus without clear strategic rationale
3. Abandoned learning paths or incomplete skill development
4. Conflicting objectives that don't build on each other
5. Lack of cross-pillar synergy (e.g., not connecting CLT learning with CFC projects)

Rate drift severity (Low/Medium/High) based on:
- Low: Minor exploration, mostly coherent progression
- Medium: Some scattered focus, partial alignment issues
- High: Major inconsistencies, no clear direction

Return as JSON with: {{"drift_level": "", "flagged_transitions": [], "reasoning": ""}}

Each flagged_transition should include: {{"from": "", "to": "", "reason": "", "suggested_action": ""}}"#,
        history = history_json(history)?,
    ))
}

pub fn pattern(report: &DriftReport, trajectory: &str, goal: &str) -> Result<String> {
    let taxonomy = BehaviorPattern::all()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{}. **{}** - {}\n   - Characteristics: {}",
                i + 1,
                p.name(),
                p.summary(),
                p.characteristics()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(format!(
        r#"Analyze the student's behavioral pattern in relation to their quarterly goal: {goal}

Drift Report:
{report}
Trajectory: {trajectory}

Focus your analysis on:
1. How well their activities align with {goal}
2. Whether their progress shows coherent development toward {goal}
3. Any deviations that might hinder achieving {goal}

Use the following behavioral patterns as a reference:

{taxonomy}

Analyze the pattern and provide:
1. Primary pattern classification (use one of the pattern names above verbatim)
2. Evidence from the data supporting this classification
3. Any secondary patterns observed
4. Overall assessment of goal coherence

Format as a detailed pattern analysis (3-4 sentences)."#,
        report = serde_json::to_string_pretty(report)?,
    ))
}

/// Derived findings the coaching prompts build on
#[derive(Debug, Clone, Copy)]
pub struct CoachingContext<'a> {
    pub goal: &'a str,
    pub level: &'a str,
    pub trajectory: &'a str,
    pub drift: &'a DriftAssessment,
    pub pattern: &'a PatternClassification,
}

impl CoachingContext<'_> {
    fn profile(&self) -> String {
        let pattern = self
            .pattern
            .primary
            .map(|p| p.name())
            .unwrap_or("Unclassified");
        format!(
            "Trajectory: {}\n\
             Drift level: {}\n\
             Drift reasoning: {}\n\
             Behavior pattern: {}\n\
             Pattern analysis: {}",
            self.trajectory,
            self.drift.report.drift_level,
            self.drift.report.reasoning,
            pattern,
            self.pattern.analysis,
        )
    }
}

pub fn project_ideas(ctx: &CoachingContext<'_>) -> String {
    format!(
        r#"Generate 3 project ideas for a {level} level student aiming to become {goal}.

{profile}

Fit the ideas to the drift level and behavior pattern above.
Each idea should:
- Be achievable in 3 months
- Cover multiple technical aspects
- Have clear milestones
- Include potential real-world applications

Format each idea as:
1. [Project Name]
   - Objective:
   - Key Technologies:
   - Monthly Milestones:
     - Month 1:
     - Month 2:
     - Month 3:
   - Potential Impact:"#,
        level = ctx.level,
        goal = ctx.goal,
        profile = ctx.profile(),
    )
}

pub fn coaching_guidance(entry: &CatalogEntry, month: u8, ctx: &CoachingContext<'_>) -> String {
    format!(
        r#"A {level} level student is working toward: {goal}

{profile}

Pillar: {pillar} ({title})
Activity: {activity}
Month {month} action: {action}

Using the context above, write 2-3 sentences of concrete guidance for completing this action this month.
Name specific resources from the context where they fit.
Where drift is Medium or High, steer the student back toward the goal."#,
        level = ctx.level,
        goal = ctx.goal,
        profile = ctx.profile(),
        pillar = entry.pillar,
        title = entry.pillar.title(),
        activity = entry.activity,
        action = entry.action(month),
    )
}

pub fn research_summary(query: &str, web: Option<&str>, knowledge: Option<&str>) -> String {
    format!(
        "Synthesize the following information into a structured response to the query: {}\n\n\
         Web Research Result: {}\n\
         Knowledge Base Result: {}\n\n\
         Final Answer:",
        query,
        web.unwrap_or(""),
        knowledge.unwrap_or(""),
    )
}

pub fn direct_answer(query: &str) -> String {
    format!("Answer the following query: {}", query)
}

/// Knowledge items formatted as a research source block
pub fn knowledge_block(hits: &[(Pillar, KnowledgeItem)]) -> String {
    hits.iter()
        .map(|(pillar, item)| format!("[{}] {}", pillar, item.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_core::Metadata;

    #[test]
    fn test_context_prefix() {
        assert_eq!(with_context("plain", &[]), "plain");

        let mut metadata = Metadata::new();
        metadata.insert("platform".into(), "LeetCode".into());
        let item = KnowledgeItem::new(Pillar::Scd, "LeetCode practice", metadata);

        let prompt = with_context("What next?", &[item]);
        assert!(prompt.starts_with("Context Information:\nContext: LeetCode practice\n"));
        assert!(prompt.contains(r#"Metadata: {"platform":"LeetCode"}"#));
        assert!(prompt.ends_with("Query: What next?"));
    }

    #[test]
    fn test_drift_prompt_asks_for_json() {
        let history = HistorySnapshot {
            items: Vec::new(),
            synthesized: false,
        };
        let prompt = drift("steady", &history, "data science").unwrap();
        assert!(prompt
            .contains(r#"{"drift_level": "", "flagged_transitions": [], "reasoning": ""}"#));
        assert!(prompt.contains("Trajectory Summary: steady"));
    }

    #[test]
    fn test_coaching_prompts_carry_derived_findings() {
        let drift = DriftAssessment {
            report: DriftReport {
                drift_level: driftwatch_core::DriftLevel::High,
                flagged_transitions: Vec::new(),
                reasoning: "Dropped courses midway.".to_string(),
            },
            source: driftwatch_core::DriftSource::Parsed,
        };
        let pattern = PatternClassification {
            primary: Some(BehaviorPattern::ScatteredApproach),
            analysis: "Scattered across pillars.".to_string(),
        };
        let ctx = CoachingContext {
            goal: "data scientist",
            level: "beginner",
            trajectory: "Wandering between courses",
            drift: &drift,
            pattern: &pattern,
        };

        let entry = &crate::catalog::entries()[0];
        for prompt in [coaching_guidance(entry, 2, &ctx), project_ideas(&ctx)] {
            assert!(prompt.contains("Trajectory: Wandering between courses"));
            assert!(prompt.contains("Drift level: High"));
            assert!(prompt.contains("Drift reasoning: Dropped courses midway."));
            assert!(prompt.contains("Behavior pattern: Scattered Approach"));
            assert!(prompt.contains("Pattern analysis: Scattered across pillars."));
            assert!(prompt.contains("data scientist"));
        }
    }

    #[test]
    fn test_pattern_prompt_lists_taxonomy() {
        let prompt = pattern(&DriftReport::fallback(), "t", "ml").unwrap();
        for p in BehaviorPattern::all() {
            assert!(prompt.contains(p.name()));
        }
    }
}
