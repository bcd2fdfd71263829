//! Deterministic report sections computed from the history

use driftwatch_core::{ActivityItem, Pillar, PillarScore, Trend};
use std::collections::BTreeMap;

fn focus_keywords(pillar: Pillar) -> &'static [&'static str] {
    match pillar {
        Pillar::Clt => &["genai", "course", "learning", "product management", "innovation"],
        Pillar::Cfc => &["hackathon", "project", "startup", "business model", "commercial"],
        Pillar::Scd => &["leetcode", "competitive", "exam", "skill", "programming"],
        Pillar::Iipc => &["linkedin", "network", "article", "professional", "connect"],
        Pillar::Sri => &["community", "design thinking", "social", "responsibility", "impact"],
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Per-pillar share of the history, dominant focus keyword and trend
///
/// `score` is the pillar's share of items scaled so that half the history
/// maps to 100; `completion` is the mean completion of the pillar's items.
pub fn pillar_analysis(items: &[ActivityItem]) -> BTreeMap<Pillar, PillarScore> {
    let total = items.len();

    Pillar::all()
        .iter()
        .map(|pillar| {
            let mine: Vec<&ActivityItem> = items.iter().filter(|i| i.pillar == *pillar).collect();

            let score = if total == 0 {
                0
            } else {
                ((mine.len() * 200) / total).min(100) as u32
            };

            let completion = if mine.is_empty() {
                0
            } else {
                let total: f64 = mine.iter().map(|i| i.completion_status).sum();
                let mean = total / mine.len() as f64;
                (mean.clamp(0.0, 1.0) * 100.0).round() as u32
            };

            let mut best: Option<(&str, usize)> = None;
            for keyword in focus_keywords(*pillar) {
                let hits = mine
                    .iter()
                    .filter(|i| i.text().to_lowercase().contains(keyword))
                    .count();
                if hits > 0 && best.map_or(true, |(_, n)| hits > n) {
                    best = Some((*keyword, hits));
                }
            }
            let focus = match best {
                Some((keyword, _)) => title_case(keyword),
                None if total > 0 => "General".to_string(),
                None => String::new(),
            };

            let trend = if total > 0 && score > 60 {
                Trend::Up
            } else if total > 0 && score < 40 {
                Trend::Down
            } else {
                Trend::Stable
            };

            (
                *pillar,
                PillarScore {
                    score,
                    focus,
                    completion,
                    trend,
                },
            )
        })
        .collect()
}

/// How much learning, building and skill history backs the goal (0..=100)
pub fn readiness_score(items: &[ActivityItem]) -> u32 {
    let relevant = items
        .iter()
        .filter(|i| matches!(i.pillar, Pillar::Clt | Pillar::Cfc | Pillar::Scd))
        .count();
    (relevant.min(10) * 10) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::placeholder_history;
    use driftwatch_core::now_millis;

    #[test]
    fn test_pillar_analysis_of_placeholder_history() {
        let items = placeholder_history(now_millis());
        let analysis = pillar_analysis(&items);

        let clt = &analysis[&Pillar::Clt];
        assert_eq!(clt.score, 66);
        assert_eq!(clt.focus, "Genai");
        assert_eq!(clt.completion, 80);
        assert_eq!(clt.trend, Trend::Up);

        let sri = &analysis[&Pillar::Sri];
        assert_eq!(sri.score, 0);
        assert_eq!(sri.focus, "General");
        assert_eq!(sri.trend, Trend::Down);
    }

    #[test]
    fn test_empty_history() {
        let analysis = pillar_analysis(&[]);
        assert_eq!(analysis.len(), 5);
        assert!(analysis.values().all(|s| s.score == 0 && s.trend == Trend::Stable));
        assert_eq!(readiness_score(&[]), 0);
    }

    #[test]
    fn test_readiness_counts_learning_building_and_skills() {
        let items = placeholder_history(now_millis());
        assert_eq!(readiness_score(&items), 30);
    }
}
