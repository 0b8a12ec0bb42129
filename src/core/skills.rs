/// Normalize a comma-separated skill string into lower-case tokens.
///
/// Tokens are trimmed, empty ones dropped, and repeats collapsed while
/// keeping first-occurrence order.
pub fn parse_skills(raw: &str) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();

    for token in raw.split(',') {
        let token = token.trim().to_lowercase();
        if !token.is_empty() && !skills.contains(&token) {
            skills.push(token);
        }
    }

    skills
}

/// Upper-case the first character, leave the rest as-is
pub fn capitalize(skill: &str) -> String {
    let mut chars = skill.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Skills (already normalized) that occur as substrings of `description`
#[inline]
pub fn matched_skills<'a>(skills: &'a [String], description: Option<&str>) -> Vec<&'a str> {
    let haystack = description.unwrap_or("").to_lowercase();

    skills
        .iter()
        .map(String::as_str)
        .filter(|skill| haystack.contains(skill))
        .collect()
}
