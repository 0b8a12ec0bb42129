use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use crate::core::password_reset::ResetStep;
use crate::models::domain::{
    ApplicationOverview, ApplicationSummary, BookmarkSummary, BookmarkToggle, JobId, JobPosting, Recommendation,
    StatusCount, User, UserProfile,
};

/// Recommendations plus the ids the caller already acted on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
    #[serde(rename = "appliedIds")]
    pub applied_ids: BTreeSet<JobId>,
    #[serde(rename = "bookmarkedIds")]
    pub bookmarked_ids: BTreeSet<JobId>,
}

/// Outcome of a successful reset step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetStepResponse {
    pub message: String,
    #[serde(rename = "nextStep")]
    pub next_step: ResetStep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobPosting>,
    #[serde(rename = "appliedIds")]
    pub applied_ids: BTreeSet<JobId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetailResponse {
    pub job: JobPosting,
    #[serde(rename = "hasApplied")]
    pub has_applied: bool,
}

/// Human-readable result of apply/bookmark/status actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkResponse {
    pub message: String,
    pub state: BookmarkToggle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: User,
    pub profile: Option<UserProfile>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyApplicationsResponse {
    pub applications: Vec<ApplicationSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyBookmarksResponse {
    pub bookmarks: Vec<BookmarkSummary>,
    #[serde(rename = "appliedIds")]
    pub applied_ids: BTreeSet<JobId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    #[serde(rename = "totalUsers")]
    pub total_users: i64,
    #[serde(rename = "totalJobs")]
    pub total_jobs: i64,
    #[serde(rename = "totalApplications")]
    pub total_applications: i64,
    #[serde(rename = "statusCounts")]
    pub status_counts: Vec<StatusCount>,
    /// Newest first
    pub applications: Vec<ApplicationOverview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    #[serde(rename = "expiresIn")]
    pub expires_in: i64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
