//! Type definitions shared by the stores and the analysis pipeline

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ext_json;

/// Free-form structured tags attached to activity and knowledge items
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata from a JSON object; any other value yields empty metadata
pub fn metadata(value: serde_json::Value) -> Metadata {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

/// Current time truncated to millisecond precision
///
/// Everything persisted goes through extended-JSON dates, which carry
/// milliseconds; truncating up front keeps values stable across a round trip.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// OKR pillar, the namespace that partitions the knowledge store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Pillar {
    /// Continuous Learning & Training
    Clt,
    /// Create, Fund & Commercialize
    Cfc,
    /// Skill & Competency Development
    Scd,
    /// Industry Integration & Professional Connect
    Iipc,
    /// Social Responsibility & Impact
    Sri,
}

impl FromStr for Pillar {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, crate::Error> {
        match s.to_uppercase().as_str() {
            "CLT" => Ok(Pillar::Clt),
            "CFC" => Ok(Pillar::Cfc),
            "SCD" => Ok(Pillar::Scd),
            "IIPC" => Ok(Pillar::Iipc),
            "SRI" => Ok(Pillar::Sri),
            _ => Err(crate::Error::InvalidPillar(s.to_string())),
        }
    }
}

impl Pillar {
    /// Short code used as namespace key
    pub fn as_str(&self) -> &'static str {
        match self {
            Pillar::Clt => "CLT",
            Pillar::Cfc => "CFC",
            Pillar::Scd => "SCD",
            Pillar::Iipc => "IIPC",
            Pillar::Sri => "SRI",
        }
    }

    /// Human-readable pillar name
    pub fn title(&self) -> &'static str {
        match self {
            Pillar::Clt => "Continuous Learning & Training",
            Pillar::Cfc => "Create, Fund & Commercialize",
            Pillar::Scd => "Skill & Competency Development",
            Pillar::Iipc => "Industry Integration & Professional Connect",
            Pillar::Sri => "Social Responsibility & Impact",
        }
    }

    /// Get all pillars
    pub fn all() -> &'static [Pillar] {
        &[
            Pillar::Clt,
            Pillar::Cfc,
            Pillar::Scd,
            Pillar::Iipc,
            Pillar::Sri,
        ]
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Person whose activity history is analysed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub subject_id: i64,
    pub name: String,
    pub register_number: String,
}

/// One historical activity item (an OKR for one cycle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    /// Cycle label, e.g. "2024-Q1"
    pub cycle: String,
    pub pillar: Pillar,
    pub objective: String,
    #[serde(default)]
    pub key_results: Vec<String>,
    /// Fraction completed, 0.0..=1.0
    pub completion_status: f64,
    #[serde(with = "ext_json::date")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ActivityItem {
    /// Objective and key results as one searchable string
    pub fn text(&self) -> String {
        if self.key_results.is_empty() {
            self.objective.clone()
        } else {
            format!("{} {}", self.objective, self.key_results.join(" "))
        }
    }
}

/// Caller-supplied configuration, fixed for the duration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub goal: String,
    pub level: String,
    /// Number of activity cycles to pull; the history limit is `cycles * 5`
    pub cycles: u32,
}

impl RunParameters {
    pub const DEFAULT_GOAL: &'static str = "career development";
    pub const DEFAULT_LEVEL: &'static str = "beginner";
    pub const DEFAULT_CYCLES: u32 = 3;
    /// Activity items considered per cycle
    pub const ITEMS_PER_CYCLE: u32 = 5;

    pub fn new(goal: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            level: level.into(),
            cycles: Self::DEFAULT_CYCLES,
        }
    }

    pub fn with_cycles(mut self, cycles: u32) -> Self {
        self.cycles = cycles;
        self
    }

    /// Maximum number of history items pulled by extraction
    pub fn history_limit(&self) -> u32 {
        self.cycles.max(1).saturating_mul(Self::ITEMS_PER_CYCLE)
    }
}

impl Default for RunParameters {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GOAL, Self::DEFAULT_LEVEL)
    }
}

/// History pulled by the extraction stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub items: Vec<ActivityItem>,
    /// True when the subject had no stored history and a placeholder was used
    pub synthesized: bool,
}

/// Qualitative drift judgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriftLevel {
    Low,
    Medium,
    High,
}

impl FromStr for DriftLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, crate::Error> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(DriftLevel::Low),
            "medium" => Ok(DriftLevel::Medium),
            "high" => Ok(DriftLevel::High),
            _ => Err(crate::Error::InvalidDriftLevel(s.to_string())),
        }
    }
}

impl DriftLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriftLevel::Low => "Low",
            DriftLevel::Medium => "Medium",
            DriftLevel::High => "High",
        }
    }
}

impl fmt::Display for DriftLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transition between activities that looks like a detour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedTransition {
    pub from: String,
    pub to: String,
    pub reason: String,
    #[serde(default)]
    pub suggested_action: String,
}

/// Structured drift result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub drift_level: DriftLevel,
    #[serde(default)]
    pub flagged_transitions: Vec<FlaggedTransition>,
    #[serde(default)]
    pub reasoning: String,
}

impl DriftReport {
    pub const FALLBACK_REASONING: &'static str = "Analysis completed but parsing failed";

    /// Value used when the model output cannot be parsed
    pub fn fallback() -> Self {
        Self {
            drift_level: DriftLevel::Medium,
            flagged_transitions: Vec::new(),
            reasoning: Self::FALLBACK_REASONING.to_string(),
        }
    }
}

/// How a drift report was obtained from model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DriftSource {
    /// Parsed from the model response
    Parsed,
    /// Model response was unusable; the fallback report was substituted
    Fallback { reason: String },
}

/// Drift report together with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftAssessment {
    #[serde(flatten)]
    pub report: DriftReport,
    pub source: DriftSource,
}

impl DriftAssessment {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, DriftSource::Fallback { .. })
    }
}

/// Closed taxonomy of behavioural patterns offered to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorPattern {
    ShinyObjectSyndrome,
    HealthyExplorationPhase,
    IterativeRefinement,
    StrategicPivot,
    ScatteredApproach,
    DepthBuilding,
    MultiPillarIntegration,
}

impl BehaviorPattern {
    pub fn all() -> &'static [BehaviorPattern] {
        &[
            BehaviorPattern::ShinyObjectSyndrome,
            BehaviorPattern::HealthyExplorationPhase,
            BehaviorPattern::IterativeRefinement,
            BehaviorPattern::StrategicPivot,
            BehaviorPattern::ScatteredApproach,
            BehaviorPattern::DepthBuilding,
            BehaviorPattern::MultiPillarIntegration,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BehaviorPattern::ShinyObjectSyndrome => "Shiny Object Syndrome",
            BehaviorPattern::HealthyExplorationPhase => "Healthy Exploration Phase",
            BehaviorPattern::IterativeRefinement => "Iterative Refinement",
            BehaviorPattern::StrategicPivot => "Strategic Pivot",
            BehaviorPattern::ScatteredApproach => "Scattered Approach",
            BehaviorPattern::DepthBuilding => "Depth Building",
            BehaviorPattern::MultiPillarIntegration => "Multi-Pillar Integration",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            BehaviorPattern::ShinyObjectSyndrome => {
                "Frequent switches to trending topics without completion"
            }
            BehaviorPattern::HealthyExplorationPhase => {
                "Strategic experimentation across domains"
            }
            BehaviorPattern::IterativeRefinement => {
                "Gradual focus narrowing with consistent improvement"
            }
            BehaviorPattern::StrategicPivot => "Deliberate direction changes based on learning",
            BehaviorPattern::ScatteredApproach => "Lack of clear direction or strategy",
            BehaviorPattern::DepthBuilding => "Consistent skill deepening in chosen areas",
            BehaviorPattern::MultiPillarIntegration => "Effective connection across OKR pillars",
        }
    }

    pub fn characteristics(&self) -> &'static str {
        match self {
            BehaviorPattern::ShinyObjectSyndrome => {
                "Abandons previous goals for new trends, lack of follow-through"
            }
            BehaviorPattern::HealthyExplorationPhase => {
                "Tries different areas but maintains some coherence"
            }
            BehaviorPattern::IterativeRefinement => {
                "Progressive depth building, connected skill development"
            }
            BehaviorPattern::StrategicPivot => {
                "Clear reasoning for changes, builds on previous experience"
            }
            BehaviorPattern::ScatteredApproach => {
                "Random goal selection, no apparent progression logic"
            }
            BehaviorPattern::DepthBuilding => {
                "Advanced learning in specific domains, expertise development"
            }
            BehaviorPattern::MultiPillarIntegration => {
                "Uses CLT learning in CFC projects, connects IIPC with other pillars"
            }
        }
    }

    /// The pattern named earliest in `text`, if any (case-insensitive)
    pub fn first_mentioned(text: &str) -> Option<BehaviorPattern> {
        let haystack = text.to_lowercase();
        Self::all()
            .iter()
            .filter_map(|p| haystack.find(&p.name().to_lowercase()).map(|pos| (pos, *p)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, p)| p)
    }
}

impl fmt::Display for BehaviorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output of the pattern-classification stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternClassification {
    pub primary: Option<BehaviorPattern>,
    pub analysis: String,
}

/// One knowledge-backed recommendation in a coaching cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Coaching for one activity type in one pillar for one month
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoachingEntry {
    pub action: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ideas: Vec<String>,
    #[serde(default)]
    pub guidance: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub success_metrics: Vec<String>,
}

/// Month label -> pillar -> activity type -> entry
pub type QuarterlyRoadmap = BTreeMap<String, BTreeMap<Pillar, BTreeMap<String, CoachingEntry>>>;

/// Output of the coaching stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoachingPlan {
    pub quarterly_roadmap: QuarterlyRoadmap,
    pub goal_alignment: String,
    pub cross_pillar_synergies: Vec<String>,
}

impl CoachingPlan {
    /// Number of populated (month, pillar, activity) cells
    pub fn cell_count(&self) -> usize {
        self.quarterly_roadmap
            .values()
            .flat_map(|pillars| pillars.values())
            .map(|activities| activities.len())
            .sum()
    }
}

/// Trend label for a pillar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Stable,
    Down,
}

/// Per-pillar share of the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarScore {
    pub score: u32,
    pub focus: String,
    pub completion: u32,
    pub trend: Trend,
}

/// Goal context echoed into the record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalAnalysis {
    pub quarterly_goal: String,
    pub current_level: String,
    /// 0..=100, based on the amount of learning/building/skill history
    pub readiness_score: u32,
}

/// Immutable snapshot of one completed analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(rename = "_id", with = "ext_json::id")]
    pub id: Uuid,
    pub subject_id: i64,
    pub student_info: SubjectProfile,
    pub run_parameters: RunParameters,
    pub goal_analysis: GoalAnalysis,
    pub history: HistorySnapshot,
    pub trajectory_summary: String,
    pub drift_analysis: DriftAssessment,
    pub pattern_analysis: PatternClassification,
    pub coaching_plan: CoachingPlan,
    pub pillar_analysis: BTreeMap<Pillar, PillarScore>,
    #[serde(with = "ext_json::date")]
    pub run_started_at: DateTime<Utc>,
    #[serde(with = "ext_json::date")]
    pub analysis_date: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Convert to JSON for storage
    pub fn to_json(&self) -> Result<String, crate::Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// What `append` hands back: the generated id and timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReceipt {
    pub id: Uuid,
    pub analysis_date: DateTime<Utc>,
}

/// Immutable knowledge snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub content: String,
    pub namespace: Pillar,
    #[serde(default)]
    pub metadata: Metadata,
}

impl KnowledgeItem {
    pub fn new(namespace: Pillar, content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            namespace,
            metadata,
        }
    }
}

/// Knowledge item with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: KnowledgeItem,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pillar_conversion() {
        assert_eq!(Pillar::from_str("clt").unwrap(), Pillar::Clt);
        assert_eq!(Pillar::from_str("IIPC").unwrap(), Pillar::Iipc);
        assert!(Pillar::from_str("XYZ").is_err());

        assert_eq!(serde_json::to_string(&Pillar::Sri).unwrap(), "\"SRI\"");
        assert_eq!(Pillar::Cfc.to_string(), "CFC");
    }

    #[test]
    fn test_drift_level_parse() {
        assert_eq!(DriftLevel::from_str(" high ").unwrap(), DriftLevel::High);
        assert_eq!(DriftLevel::from_str("Low").unwrap(), DriftLevel::Low);
        assert!(DriftLevel::from_str("extreme").is_err());
    }

    #[test]
    fn test_history_limit() {
        assert_eq!(RunParameters::default().history_limit(), 15);
        assert_eq!(RunParameters::default().with_cycles(0).history_limit(), 5);
        assert_eq!(
            RunParameters::default().with_cycles(1_000_000_000).history_limit(),
            u32::MAX
        );
        assert_eq!(
            RunParameters::default().with_cycles(u32::MAX).history_limit(),
            u32::MAX
        );
    }

    #[test]
    fn test_metadata_from_json() {
        let tags = metadata(serde_json::json!({"type": "course", "hours": 4}));
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["type"], "course");

        assert!(metadata(serde_json::json!(["course"])).is_empty());
        assert!(metadata(serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_first_mentioned_pattern() {
        let text = "Primary: Iterative Refinement. Secondary signs of shiny object syndrome.";
        assert_eq!(
            BehaviorPattern::first_mentioned(text),
            Some(BehaviorPattern::IterativeRefinement)
        );
        assert_eq!(BehaviorPattern::first_mentioned("nothing here"), None);
    }

    #[test]
    fn test_drift_assessment_flattens_report() {
        let assessment = DriftAssessment {
            report: DriftReport::fallback(),
            source: DriftSource::Fallback {
                reason: "no JSON object".to_string(),
            },
        };

        let value = serde_json::to_value(&assessment).unwrap();
        assert_eq!(value["drift_level"], "Medium");
        assert_eq!(value["reasoning"], DriftReport::FALLBACK_REASONING);
        assert_eq!(value["source"]["outcome"], "fallback");
        assert!(assessment.is_fallback());
    }
}
