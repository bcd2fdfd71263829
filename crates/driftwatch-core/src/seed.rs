//! Fixed seed data: the knowledge base and the demo subjects

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::types::{self, ActivityItem, KnowledgeItem, Metadata, Pillar, SubjectProfile};

fn item(pillar: Pillar, content: &str, metadata: serde_json::Value) -> KnowledgeItem {
    let mut metadata = types::metadata(metadata);
    metadata.insert("pillar".to_string(), json!(pillar.as_str()));
    KnowledgeItem::new(pillar, content, metadata)
}

/// Seed knowledge for one namespace, in insertion order
pub fn knowledge_for(pillar: Pillar) -> Vec<KnowledgeItem> {
    match pillar {
        Pillar::Clt => vec![
            item(
                pillar,
                "GenAI courses on PrepInsta platform focusing on practical AI applications and project-based learning",
                json!({"type": "course", "platform": "PrepInsta", "domain": "GenAI"}),
            ),
            item(
                pillar,
                "Product Management certification from EdX covering user research, product strategy, and market analysis",
                json!({"type": "course", "platform": "EdX", "domain": "Product Management"}),
            ),
            item(
                pillar,
                "Innovation and emerging technology courses covering blockchain, IoT, AR/VR, and quantum computing",
                json!({"type": "course", "domain": "Innovation"}),
            ),
        ],
        Pillar::Cfc => vec![
            item(
                pillar,
                "OpenAI - AI research and deployment company focusing on safe artificial general intelligence",
                json!({"type": "company", "source": "YCombinator", "domain": "AI"}),
            ),
            item(
                pillar,
                "Stripe - Payment processing platform enabling online commerce for businesses worldwide",
                json!({"type": "company", "source": "YCombinator", "domain": "FinTech"}),
            ),
            item(
                pillar,
                "Airbnb - Home sharing platform revolutionizing travel and accommodation industry",
                json!({"type": "company", "source": "YCombinator", "domain": "Marketplace"}),
            ),
            item(
                pillar,
                "Dropbox - File storage and sharing platform for personal and business use",
                json!({"type": "company", "source": "YCombinator", "domain": "Enterprise"}),
            ),
            item(
                pillar,
                "DevPost hackathons for team-based development projects with 3-5 members focusing on real-world problems",
                json!({"type": "hackathon", "platform": "DevPost"}),
            ),
            item(
                pillar,
                "Unstop competitions and hackathons for skill development and industry exposure",
                json!({"type": "hackathon", "platform": "Unstop"}),
            ),
        ],
        Pillar::Scd => vec![
            item(
                pillar,
                "LeetCode problem solving for competitive programming and interview preparation",
                json!({"type": "practice", "platform": "LeetCode"}),
            ),
            item(
                pillar,
                "Mock competitive exams for government positions including SSB and UPSC preparation",
                json!({"type": "exam", "category": "Government"}),
            ),
            item(
                pillar,
                "SAT test preparation for academic excellence and international opportunities",
                json!({"type": "exam", "category": "Academic"}),
            ),
        ],
        Pillar::Iipc => vec![
            item(
                pillar,
                "LinkedIn networking with SNS15 Mango BiG7 professionals for industry insights",
                json!({"type": "networking", "category": "SNS15"}),
            ),
            item(
                pillar,
                "Connect with YCombinator startup founders and employees for startup ecosystem understanding",
                json!({"type": "networking", "category": "Startups"}),
            ),
            item(
                pillar,
                "Article writing on LinkedIn using hashtags #snsinstitutions #snsdesignthinkers #designthinking",
                json!({"type": "content", "platform": "LinkedIn"}),
            ),
        ],
        Pillar::Sri => vec![
            item(
                pillar,
                "Design Thinking engagement activities with previous schools/colleges for community impact",
                json!({"type": "community", "method": "Design Thinking"}),
            ),
            item(
                pillar,
                "Team-based social impact projects with 3-5 members focusing on local community problems",
                json!({"type": "project", "team_size": "3-5"}),
            ),
        ],
    }
}

/// A demo subject together with its activity history
#[derive(Debug, Clone)]
pub struct DemoSubject {
    pub profile: SubjectProfile,
    pub activity: Vec<ActivityItem>,
}

fn activity(
    now: DateTime<Utc>,
    days_ago: i64,
    cycle: &str,
    pillar: Pillar,
    objective: &str,
    key_results: &[&str],
    completion_status: f64,
) -> ActivityItem {
    ActivityItem {
        cycle: cycle.to_string(),
        pillar,
        objective: objective.to_string(),
        key_results: key_results.iter().map(|s| s.to_string()).collect(),
        completion_status,
        created_at: now - Duration::days(days_ago),
        metadata: Metadata::new(),
    }
}

/// Three subjects with consistent, exploratory and scattered histories
pub fn demo_subjects(now: DateTime<Utc>) -> Vec<DemoSubject> {
    vec![
        DemoSubject {
            profile: SubjectProfile {
                subject_id: 1,
                name: "Consistent Student".to_string(),
                register_number: "REG-0001".to_string(),
            },
            activity: vec![
                activity(now, 90, "2024-Q1", Pillar::Clt, "Learn GenAI fundamentals",
                    &["Complete course", "Build basic model"], 0.9),
                activity(now, 60, "2024-Q2", Pillar::Clt, "Advanced GenAI applications",
                    &["Implement RAG", "Fine-tune model"], 0.7),
            ],
        },
        DemoSubject {
            profile: SubjectProfile {
                subject_id: 2,
                name: "Exploratory Student".to_string(),
                register_number: "REG-0002".to_string(),
            },
            activity: vec![
                activity(now, 90, "2024-Q1", Pillar::Clt, "Explore GenAI",
                    &["Try different models"], 0.8),
                activity(now, 60, "2024-Q2", Pillar::Cfc, "Try hackathon",
                    &["Join competition"], 0.6),
            ],
        },
        DemoSubject {
            profile: SubjectProfile {
                subject_id: 3,
                name: "Scattered Student".to_string(),
                register_number: "REG-0003".to_string(),
            },
            activity: vec![
                activity(now, 90, "2024-Q1", Pillar::Clt, "Learn programming",
                    &["Complete Python course"], 0.5),
                activity(now, 60, "2024-Q2", Pillar::Sri, "Community service",
                    &["Volunteer 10 hours"], 0.3),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_pillar_has_seed_data() {
        for pillar in Pillar::all() {
            let items = knowledge_for(*pillar);
            assert!(!items.is_empty(), "{} has no seed data", pillar);
            assert!(items.iter().all(|i| i.namespace == *pillar));
            assert_eq!(items[0].metadata["pillar"], pillar.as_str());
        }
    }
}
