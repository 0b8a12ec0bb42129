use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type JobId = i64;

/// Account record. The password is only ever held as an argon2 PHC string.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(rename = "isStaff")]
    pub is_staff: bool,
    #[serde(rename = "emailVerified")]
    pub email_verified: bool,
    #[serde(rename = "dateJoined")]
    pub date_joined: DateTime<Utc>,
}

/// Account to be created together with its empty profile
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_staff: bool,
}

/// Professional details attached one-to-one to a user
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub phone: Option<String>,
    pub location: Option<String>,
    /// Comma-separated, free text
    pub skills: Option<String>,
    pub experience: Option<String>,
    pub education: Option<String>,
    #[serde(rename = "lastProfileUpdate", default)]
    pub last_profile_update: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            last_profile_update: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Skills split for display, untouched apart from trimming
    pub fn skill_list(&self) -> Vec<String> {
        self.skills
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Job advertisement
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    pub description: Option<String>,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    #[serde(rename = "jobType")]
    pub job_type: String,
    #[serde(rename = "experienceLevel")]
    pub experience_level: String,
    #[serde(rename = "employmentType")]
    pub employment_type: String,
    #[serde(rename = "remoteOption")]
    pub remote_option: bool,
    #[serde(rename = "skillsRequired")]
    pub skills_required: Option<String>,
    pub deadline: Option<NaiveDate>,
    #[serde(rename = "createdBy")]
    pub created_by: Option<UserId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

pub const JOB_TYPES: &[&str] = &["Full-time", "Part-time", "Internship", "Contract", "Remote"];
pub const EXPERIENCE_LEVELS: &[&str] = &["Entry", "Mid", "Senior", "Manager"];
pub const EMPLOYMENT_TYPES: &[&str] = &["On-site", "Hybrid", "Remote"];

/// Search criteria for the public job list; every field is a
/// case-insensitive containment test
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFilter {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

impl JobFilter {
    pub fn matches(&self, job: &JobPosting) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle.as_deref().map(str::trim) {
                None | Some("") => true,
                Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
            }
        }

        let text_match = match self.q.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(_) => {
                contains(&job.title, &self.q)
                    || contains(job.description.as_deref().unwrap_or(""), &self.q)
            }
        };

        text_match && contains(&job.location, &self.location) && contains(&job.company, &self.company)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Declined,
}

impl ApplicationStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Application {
    pub id: i64,
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "appliedAt")]
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
}

/// Application joined with the posting it targets
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApplicationSummary {
    pub id: i64,
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    #[serde(rename = "jobTitle")]
    pub job_title: String,
    pub company: String,
    #[serde(rename = "appliedAt")]
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
}

/// Application joined with its applicant and posting, for staff review
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApplicationOverview {
    pub id: i64,
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    #[serde(rename = "jobTitle")]
    pub job_title: String,
    pub company: String,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    #[serde(rename = "appliedAt")]
    pub applied_at: DateTime<Utc>,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    Submitted(Application),
    AlreadyApplied,
}

/// Bookmark joined with the saved posting
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookmarkSummary {
    pub id: i64,
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    #[serde(rename = "jobTitle")]
    pub job_title: String,
    pub company: String,
    pub location: String,
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkToggle {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: ApplicationStatus,
    pub count: i64,
}

/// One-time reset code bound to a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PasswordResetCode {
    pub id: i64,
    pub user_id: UserId,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetCode {
    /// True once strictly more than `ttl` has elapsed since creation
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now > self.created_at + ttl
    }
}

/// A posting recommended to a user with its score (0-100) and the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub job: JobPosting,
    pub score: u8,
    pub explanation: String,
    #[serde(rename = "matchedSkills")]
    pub matched_skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    #[serde(rename = "userId")]
    pub user_id: Option<UserId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "extraData")]
    pub extra_data: Option<serde_json::Value>,
}

/// Scoring rules for skill matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringRules {
    pub base: u8,
    pub per_skill: u8,
    pub max: u8,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            base: 50,
            per_skill: 10,
            max: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(title: &str, description: Option<&str>, company: &str, location: &str) -> JobPosting {
        JobPosting {
            id: 1,
            title: title.to_string(),
            description: description.map(str::to_string),
            company: company.to_string(),
            location: location.to_string(),
            salary: None,
            job_type: "Full-time".to_string(),
            experience_level: "Entry".to_string(),
            employment_type: "On-site".to_string(),
            remote_option: false,
            skills_required: None,
            deadline: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_job_filter_title_or_description() {
        let job = posting("Backend Engineer", Some("Rust and Postgres"), "Acme", "Berlin");

        let by_title = JobFilter { q: Some("backend".into()), ..Default::default() };
        let by_desc = JobFilter { q: Some("POSTGRES".into()), ..Default::default() };
        let miss = JobFilter { q: Some("java".into()), ..Default::default() };

        assert!(by_title.matches(&job));
        assert!(by_desc.matches(&job));
        assert!(!miss.matches(&job));
    }

    #[test]
    fn test_job_filter_location_and_company() {
        let job = posting("Designer", None, "Acme Corp", "Lagos, Nigeria");

        let filter = JobFilter {
            q: None,
            location: Some("lagos".into()),
            company: Some("acme".into()),
        };
        assert!(filter.matches(&job));

        let wrong_company = JobFilter { company: Some("globex".into()), ..filter };
        assert!(!wrong_company.matches(&job));
    }

    #[test]
    fn test_blank_filter_matches_everything() {
        let job = posting("Anything", None, "X", "Y");
        let filter = JobFilter { q: Some("   ".into()), ..Default::default() };
        assert!(filter.matches(&job));
    }

    #[test]
    fn test_application_status_parse() {
        assert_eq!(ApplicationStatus::parse("accepted"), Some(ApplicationStatus::Accepted));
        assert_eq!(ApplicationStatus::parse("pending"), Some(ApplicationStatus::Pending));
        assert_eq!(ApplicationStatus::parse("Accepted"), None);
        assert_eq!(ApplicationStatus::parse("hired"), None);
    }

    #[test]
    fn test_reset_code_expiry_boundary() {
        let created = Utc::now();
        let code = PasswordResetCode {
            id: 1,
            user_id: 1,
            code: "12345".into(),
            created_at: created,
        };
        let ttl = chrono::Duration::minutes(10);

        assert!(!code.is_expired_at(created + ttl, ttl));
        assert!(code.is_expired_at(created + ttl + chrono::Duration::seconds(1), ttl));
    }

    #[test]
    fn test_profile_skill_list() {
        let mut profile = UserProfile::empty(7);
        assert!(profile.skill_list().is_empty());

        profile.skills = Some("Python, Django ,, SQL".into());
        assert_eq!(profile.skill_list(), vec!["Python", "Django", "SQL"]);
    }
}
