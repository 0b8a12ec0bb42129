use crate::core::{
    scoring::{calculate_match_score, explain},
    skills::{matched_skills, parse_skills},
};
use crate::models::{JobPosting, Recommendation, ScoringRules};

/// Skill-based job recommender
///
/// # Pipeline Stages
/// 1. Normalize the profile's skill string
/// 2. Substring-match each skill against every posting description
/// 3. Score and explain postings with at least one match
/// 4. Rank by score, descending, keeping input order for ties
#[derive(Debug, Clone, Default)]
pub struct Recommender {
    rules: ScoringRules,
}

impl Recommender {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    /// Recommend postings for a raw comma-separated skill string.
    ///
    /// A blank or all-separator string yields nothing.
    pub fn recommend(&self, raw_skills: &str, postings: Vec<JobPosting>) -> Vec<Recommendation> {
        let skills = parse_skills(raw_skills);
        self.recommend_for_skills(&skills, postings)
    }

    /// Recommend postings for already-normalized skills
    ///
    /// # Arguments
    /// * `skills` - Lower-case, trimmed, non-empty skill tokens
    /// * `postings` - Candidate postings, conventionally in ascending id order
    pub fn recommend_for_skills(&self, skills: &[String], postings: Vec<JobPosting>) -> Vec<Recommendation> {
        if skills.is_empty() {
            return Vec::new();
        }

        let mut recommendations: Vec<Recommendation> = postings
            .into_iter()
            .filter_map(|job| {
                let matched = matched_skills(skills, job.description.as_deref());
                if matched.is_empty() {
                    return None;
                }

                let score = calculate_match_score(matched.len(), &self.rules);
                let explanation = explain(&matched);
                let matched_skills = matched.iter().map(|s| s.to_string()).collect();

                Some(Recommendation {
                    job,
                    score,
                    explanation,
                    matched_skills,
                })
            })
            .collect();

        // Stable sort keeps posting order among equal scores
        recommendations.sort_by(|a, b| b.score.cmp(&a.score));

        tracing::debug!(
            "Recommended {} postings for {} skills",
            recommendations.len(),
            skills.len()
        );

        recommendations
    }
}
