use crate::core::skills::capitalize;
use crate::models::ScoringRules;

/// Calculate a match score (0-100) from the number of matched skills
///
/// Scoring formula:
/// score = min(max, base + per_skill * matched)
///
/// Zero matches is not scored; callers drop those postings.
pub fn calculate_match_score(matched: usize, rules: &ScoringRules) -> u8 {
    let bonus = usize::from(rules.per_skill).saturating_mul(matched);
    let total = usize::from(rules.base).saturating_add(bonus);

    total.min(usize::from(rules.max)) as u8
}

/// Human-readable reason listing the matched skills in order
pub fn explain(matched: &[&str]) -> String {
    let names: Vec<String> = matched.iter().map(|skill| capitalize(skill)).collect();
    format!("Matched skills: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_grows_per_skill() {
        let rules = ScoringRules::default();

        assert_eq!(calculate_match_score(1, &rules), 60);
        assert_eq!(calculate_match_score(2, &rules), 70);
        assert_eq!(calculate_match_score(4, &rules), 90);
    }

    #[test]
    fn test_score_is_capped() {
        let rules = ScoringRules::default();

        assert_eq!(calculate_match_score(5, &rules), 100);
        assert_eq!(calculate_match_score(50, &rules), 100);
        assert_eq!(calculate_match_score(usize::MAX, &rules), 100);
    }

    #[test]
    fn test_custom_rules() {
        let rules = ScoringRules {
            base: 20,
            per_skill: 25,
            max: 90,
        };

        assert_eq!(calculate_match_score(1, &rules), 45);
        assert_eq!(calculate_match_score(3, &rules), 90);
    }

    #[test]
    fn test_explanation() {
        assert_eq!(explain(&["python"]), "Matched skills: Python");
        assert_eq!(explain(&["python", "sql"]), "Matched skills: Python, Sql");
    }
}
