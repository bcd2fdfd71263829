//! Fixed coaching catalog: activity types per pillar, with monthly actions,
//! knowledge queries and success metrics

use driftwatch_core::Pillar;

/// Months covered by a coaching plan
pub const MONTHS: [u8; 3] = [1, 2, 3];

/// One activity type within a pillar
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub pillar: Pillar,
    pub activity: &'static str,
    actions: [&'static str; 3],
    /// Query templates; `{goal}` is replaced with the run goal
    queries: [&'static str; 3],
    pub success_metrics: &'static [&'static str],
}

impl CatalogEntry {
    /// Fixed action for `month` (1-based)
    pub fn action(&self, month: u8) -> &'static str {
        self.actions[month_index(month)]
    }

    /// Knowledge query for `month`, specialised to `goal`
    pub fn query(&self, goal: &str, month: u8) -> String {
        self.queries[month_index(month)].replace("{goal}", goal)
    }

    /// Whether this cell is filled by idea generation instead of recommendations
    pub fn generates_ideas(&self, month: u8) -> bool {
        self.activity == "Project" && month == 1
    }

    pub fn metrics(&self) -> Vec<String> {
        self.success_metrics.iter().map(|m| m.to_string()).collect()
    }
}

fn month_index(month: u8) -> usize {
    usize::from(month.clamp(1, 3) - 1)
}

const ENTRIES: &[CatalogEntry] = &[
    CatalogEntry {
        pillar: Pillar::Clt,
        activity: "Value Added Course",
        actions: [
            "Complete beginner course with certification (30+ hours)",
            "Finish intermediate course with project submission",
            "Complete advanced certification and build portfolio project",
        ],
        queries: [
            "beginner {goal} course 30+ hours with certification",
            "intermediate {goal} course with hands-on projects",
            "advanced {goal} certification with capstone project",
        ],
        success_metrics: &[
            "Course completion certificate",
            "Project submission (if applicable)",
            "Self-assessment quiz score >85%",
        ],
    },
    CatalogEntry {
        pillar: Pillar::Cfc,
        activity: "Hackathon",
        actions: [
            "Participate in beginner hackathon and submit project",
            "Join intermediate competition and reach semifinals",
            "Compete in advanced challenge and get feedback from judges",
        ],
        queries: [
            "upcoming {goal} hackathon for beginners",
            "intermediate {goal} hackathon with prizes",
            "advanced {goal} startup competition",
        ],
        success_metrics: &[
            "Participation certificate",
            "Project submission",
            "Judge feedback (if available)",
        ],
    },
    CatalogEntry {
        pillar: Pillar::Cfc,
        activity: "BMC Video Analysis",
        actions: [
            "Analyze 3 YC companies in your field",
            "Compare business models of 2 successful startups",
            "Create your own BMC for your project",
        ],
        queries: [
            "top Y Combinator companies in {goal} field",
            "{goal} startup business model analysis",
            "{goal} unicorn company case study",
        ],
        success_metrics: &[
            "Completed BMC worksheets",
            "Key insights documented",
            "Comparison analysis report",
        ],
    },
    CatalogEntry {
        pillar: Pillar::Cfc,
        activity: "Project",
        actions: [
            "Define project scope and setup development environment",
            "Complete core functionality and initial testing",
            "Finalize project and prepare documentation",
        ],
        queries: [
            "{goal} beginner project ideas",
            "intermediate {goal} project with real-world application",
            "advanced {goal} portfolio project",
        ],
        success_metrics: &[
            "GitHub repository with code",
            "Documentation",
            "Demo video or live demo",
        ],
    },
    CatalogEntry {
        pillar: Pillar::Scd,
        activity: "LeetCode Problems",
        actions: [
            "Solve 20 beginner problems with 90% accuracy",
            "Complete 15 intermediate challenges",
            "Master 10 advanced algorithms with optimal solutions",
        ],
        queries: [
            "basic Python problems for {goal} applications",
            "intermediate algorithms for {goal}",
            "advanced {goal} system design problems",
        ],
        success_metrics: &[
            "Number of problems solved",
            "Accuracy rate",
            "Time complexity improvements",
        ],
    },
    CatalogEntry {
        pillar: Pillar::Iipc,
        activity: "LinkedIn Connect",
        actions: [
            "Connect with 5 professionals and initiate conversations",
            "Get 2 informational interviews with experts",
            "Secure 1 mentorship connection",
        ],
        queries: [
            "top {goal} professionals on LinkedIn",
            "{goal} industry mentors to connect with",
            "{goal} community leaders LinkedIn",
        ],
        success_metrics: &[
            "Number of new connections",
            "Response rate",
            "Informational interviews secured",
        ],
    },
    CatalogEntry {
        pillar: Pillar::Iipc,
        activity: "LinkedIn Article",
        actions: [
            "Publish 1 article about beginner learnings",
            "Write about project development experience",
            "Create technical article showcasing expertise",
        ],
        queries: [
            "trending {goal} topics to write about",
            "{goal} project experience article examples",
            "{goal} technical article ideas",
        ],
        success_metrics: &[
            "Article published",
            "Engagement metrics (likes, comments)",
            "Profile view increase",
        ],
    },
    CatalogEntry {
        pillar: Pillar::Sri,
        activity: "DT Engagement Activity",
        actions: [
            "Teach 5 people basic concepts",
            "Conduct workshop for 10+ participants",
            "Mentor 2 beginners through their first project",
        ],
        queries: [
            "simple {goal} teaching activities for beginners",
            "intermediate {goal} workshop ideas",
            "advanced {goal} mentorship program",
        ],
        success_metrics: &[
            "Number of participants",
            "Feedback scores",
            "Documented impact",
        ],
    },
];

/// Every catalog entry, grouped by pillar in pillar order
pub fn entries() -> &'static [CatalogEntry] {
    ENTRIES
}

/// Alignment note attached to every plan
pub fn goal_alignment(goal: &str, level: &str) -> String {
    format!(
        "The recommendations are specifically tailored for a {level} level student aiming to become {goal}.\n\
         - Course progression follows beginner -> intermediate -> advanced track\n\
         - Hackathons and projects focus on {goal} applications\n\
         - Coding problems selected for {goal} relevance\n\
         - Networking targets {goal} professionals\n\
         - Teaching activities build {goal} communication skills"
    )
}

/// Cross-pillar connections attached to every plan
pub fn cross_pillar_synergies(goal: &str) -> Vec<String> {
    vec![
        format!("CLT courses provide knowledge for CFC projects and IIPC articles about {goal}"),
        format!("SCD coding skills improve CFC project quality in {goal}"),
        format!("IIPC connections can lead to SRI mentorship opportunities in {goal}"),
        format!("CFC projects can be showcased in IIPC articles about {goal}"),
        format!("SRI teaching reinforces CLT learning about {goal}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_pillar() {
        for pillar in Pillar::all() {
            assert!(entries().iter().any(|e| e.pillar == *pillar));
        }
        assert_eq!(entries().len(), 8);
    }

    #[test]
    fn test_only_first_project_month_generates_ideas() {
        let idea_cells: Vec<_> = MONTHS
            .iter()
            .flat_map(|m| entries().iter().map(move |e| (e, *m)))
            .filter(|(e, m)| e.generates_ideas(*m))
            .collect();

        assert_eq!(idea_cells.len(), 1);
        assert_eq!(idea_cells[0].0.activity, "Project");
        assert_eq!(idea_cells[0].1, 1);
    }

    #[test]
    fn test_query_substitutes_goal() {
        let course = &entries()[0];
        assert_eq!(
            course.query("data science", 2),
            "intermediate data science course with hands-on projects"
        );
        assert_eq!(course.action(3), "Complete advanced certification and build portfolio project");
    }
}
