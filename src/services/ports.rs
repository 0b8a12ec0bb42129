use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::models::{
    Application, ApplicationOverview, ApplicationStatus, ApplicationSummary, ApplyOutcome, BookmarkSummary,
    BookmarkToggle, JobDraft, JobFilter, JobId, JobPosting, NewUser, PasswordResetCode,
    ProfileUpdate, Recommendation, StatusCount, User, UserId, UserProfile,
};
use crate::services::password::PasswordHashError;

/// Errors raised by any persistent store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Password hashing failed: {0}")]
    HashError(#[from] PasswordHashError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Account lookup and credential updates
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create the account and its empty profile together
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Store a salted hash of `new_password`; plaintext never reaches storage
    async fn set_password(&self, id: UserId, new_password: &str) -> Result<(), StoreError>;

    async fn profile_for(&self, id: UserId) -> Result<Option<UserProfile>, StoreError>;

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<UserProfile, StoreError>;

    /// Number of non-staff accounts
    async fn count_job_seekers(&self) -> Result<i64, StoreError>;

    /// Non-staff accounts, most recently joined first
    async fn list_job_seekers(&self) -> Result<Vec<User>, StoreError>;
}

/// Job postings
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Every posting in ascending id order
    async fn list_all_postings(&self) -> Result<Vec<JobPosting>, StoreError>;

    /// Postings matching `filter`, newest first
    async fn search_postings(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError>;

    async fn get_posting(&self, id: JobId) -> Result<Option<JobPosting>, StoreError>;

    /// Postings created by `user`, newest first
    async fn postings_by(&self, user: UserId) -> Result<Vec<JobPosting>, StoreError>;

    async fn create_posting(&self, created_by: UserId, draft: JobDraft) -> Result<JobPosting, StoreError>;

    async fn update_posting(&self, id: JobId, draft: JobDraft) -> Result<JobPosting, StoreError>;

    async fn delete_posting(&self, id: JobId) -> Result<bool, StoreError>;

    async fn count_postings(&self) -> Result<i64, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Applications and bookmarks
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn applied_job_ids(&self, user: UserId) -> Result<BTreeSet<JobId>, StoreError>;

    async fn bookmarked_job_ids(&self, user: UserId) -> Result<BTreeSet<JobId>, StoreError>;

    async fn apply(&self, user: UserId, job: JobId) -> Result<ApplyOutcome, StoreError>;

    /// Remove the caller's application, returning it if one existed
    async fn withdraw(&self, user: UserId, job: JobId) -> Result<Option<Application>, StoreError>;

    async fn applications_for(&self, user: UserId) -> Result<Vec<ApplicationSummary>, StoreError>;

    async fn get_application(&self, id: i64) -> Result<Option<Application>, StoreError>;

    async fn set_status(&self, id: i64, status: ApplicationStatus) -> Result<Application, StoreError>;

    async fn toggle_bookmark(&self, user: UserId, job: JobId) -> Result<BookmarkToggle, StoreError>;

    async fn bookmarks_for(&self, user: UserId) -> Result<Vec<BookmarkSummary>, StoreError>;

    async fn count_applications(&self) -> Result<i64, StoreError>;

    async fn status_counts(&self) -> Result<Vec<StatusCount>, StoreError>;

    /// Every application with its applicant and posting, newest first
    async fn all_applications(&self) -> Result<Vec<ApplicationOverview>, StoreError>;
}

/// Reset code persistence
#[async_trait]
pub trait ResetCodeStore: Send + Sync {
    /// Persist a code atomically. With `supersede`, the user's earlier codes
    /// are removed in the same transaction.
    async fn create(
        &self,
        user: UserId,
        code: &str,
        created_at: DateTime<Utc>,
        supersede: bool,
    ) -> Result<PasswordResetCode, StoreError>;

    /// Latest code by creation time
    async fn most_recent_for(&self, user: UserId) -> Result<Option<PasswordResetCode>, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Remove every code created before `cutoff`
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Audit trail written after a mutation commits
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        user: Option<UserId>,
        action: String,
        extra: Option<serde_json::Value>,
    ) -> Result<(), StoreError>;

    async fn record_recommendation(&self, user: UserId, rec: &Recommendation) -> Result<(), StoreError>;
}
