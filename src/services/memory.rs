use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use tokio::sync::RwLock;

use crate::models::{
    Application, ApplicationOverview, ApplicationStatus, ApplicationSummary, ApplyOutcome, AuditEntry, BookmarkSummary,
    BookmarkToggle, JobDraft, JobFilter, JobId, JobPosting, NewUser, PasswordResetCode,
    ProfileUpdate, Recommendation, StatusCount, User, UserId, UserProfile,
};
use crate::services::mailer::{MailerError, Notifier};
use crate::services::password::hash_password_async;
use crate::services::ports::{
    ApplicationStore, AuditSink, JobStore, ResetCodeStore, StoreError, UserDirectory,
};

#[derive(Debug, Clone)]
struct BookmarkRow {
    id: i64,
    user_id: UserId,
    job_id: JobId,
    saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct RecommendationRow {
    user_id: UserId,
    job_id: JobId,
    score: u8,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    profiles: BTreeMap<UserId, UserProfile>,
    jobs: BTreeMap<JobId, JobPosting>,
    applications: BTreeMap<i64, Application>,
    bookmarks: BTreeMap<i64, BookmarkRow>,
    reset_codes: BTreeMap<i64, PasswordResetCode>,
    audit: Vec<AuditEntry>,
    recommendation_audit: Vec<RecommendationRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local implementation of every store trait.
///
/// Ids come from one shared sequence. Ordering guarantees match the
/// Postgres client: postings by ascending id, reset codes by creation time.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reset code as-is, bypassing the issuance rules
    pub async fn insert_reset_code(&self, user: UserId, code: &str, created_at: DateTime<Utc>) -> PasswordResetCode {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let row = PasswordResetCode {
            id,
            user_id: user,
            code: code.to_string(),
            created_at,
        };
        tables.reset_codes.insert(id, row.clone());
        row
    }

    pub async fn reset_codes_for(&self, user: UserId) -> Vec<PasswordResetCode> {
        let tables = self.tables.read().await;
        tables
            .reset_codes
            .values()
            .filter(|c| c.user_id == user)
            .cloned()
            .collect()
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.tables.read().await.audit.clone()
    }

    /// (user, job, score) triples written by recommendation auditing
    pub async fn recommendation_audits(&self) -> Vec<(UserId, JobId, u8)> {
        let tables = self.tables.read().await;
        tables
            .recommendation_audit
            .iter()
            .map(|r| (r.user_id, r.job_id, r.score))
            .collect()
    }
}

fn posting_from_draft(id: JobId, created_by: Option<UserId>, created_at: DateTime<Utc>, draft: JobDraft) -> JobPosting {
    JobPosting {
        id,
        title: draft.title,
        description: draft.description,
        company: draft.company,
        location: draft.location,
        salary: draft.salary,
        job_type: draft.job_type,
        experience_level: draft.experience_level,
        employment_type: draft.employment_type,
        remote_option: draft.remote_option,
        skills_required: draft.skills_required,
        deadline: draft.deadline,
        created_by,
        created_at,
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let password_hash = hash_password_async(new_user.password.clone()).await?;
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == new_user.username) {
            return Err(StoreError::Conflict(format!("username {} is taken", new_user.username)));
        }

        let id = tables.next_id();
        let user = User {
            id,
            username: new_user.username,
            email: new_user.email,
            password_hash,
            is_staff: new_user.is_staff,
            email_verified: false,
            date_joined: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        tables.profiles.insert(id, UserProfile::empty(id));

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn set_password(&self, id: UserId, new_password: &str) -> Result<(), StoreError> {
        let password_hash = hash_password_async(new_password.to_string()).await?;
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        user.password_hash = password_hash;
        Ok(())
    }

    async fn profile_for(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<UserProfile, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }

        let profile = tables.profiles.entry(id).or_insert_with(|| UserProfile::empty(id));
        profile.phone = update.phone;
        profile.location = update.location;
        profile.skills = update.skills;
        profile.experience = update.experience;
        profile.education = update.education;
        profile.last_profile_update = Some(Utc::now());

        Ok(profile.clone())
    }

    async fn count_job_seekers(&self) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().filter(|u| !u.is_staff).count() as i64)
    }

    async fn list_job_seekers(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().filter(|u| !u.is_staff).cloned().collect();
        users.sort_by(|a, b| b.date_joined.cmp(&a.date_joined).then_with(|| b.id.cmp(&a.id)));
        Ok(users)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn list_all_postings(&self) -> Result<Vec<JobPosting>, StoreError> {
        Ok(self.tables.read().await.jobs.values().cloned().collect())
    }

    async fn search_postings(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<JobPosting> = tables
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn get_posting(&self, id: JobId) -> Result<Option<JobPosting>, StoreError> {
        Ok(self.tables.read().await.jobs.get(&id).cloned())
    }

    async fn postings_by(&self, user: UserId) -> Result<Vec<JobPosting>, StoreError> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<JobPosting> = tables
            .jobs
            .values()
            .filter(|job| job.created_by == Some(user))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn create_posting(&self, created_by: UserId, draft: JobDraft) -> Result<JobPosting, StoreError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let job = posting_from_draft(id, Some(created_by), Utc::now(), draft);
        tables.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn update_posting(&self, id: JobId, draft: JobDraft) -> Result<JobPosting, StoreError> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .jobs
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("job {}", id)))?;
        let job = posting_from_draft(id, existing.created_by, existing.created_at, draft);
        tables.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn delete_posting(&self, id: JobId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let removed = tables.jobs.remove(&id).is_some();
        if removed {
            tables.applications.retain(|_, a| a.job_id != id);
            tables.bookmarks.retain(|_, b| b.job_id != id);
        }
        Ok(removed)
    }

    async fn count_postings(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.jobs.len() as i64)
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn applied_job_ids(&self, user: UserId) -> Result<BTreeSet<JobId>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .values()
            .filter(|a| a.user_id == user)
            .map(|a| a.job_id)
            .collect())
    }

    async fn bookmarked_job_ids(&self, user: UserId) -> Result<BTreeSet<JobId>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookmarks
            .values()
            .filter(|b| b.user_id == user)
            .map(|b| b.job_id)
            .collect())
    }

    async fn apply(&self, user: UserId, job: JobId) -> Result<ApplyOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.jobs.contains_key(&job) {
            return Err(StoreError::NotFound(format!("job {}", job)));
        }
        if tables.applications.values().any(|a| a.user_id == user && a.job_id == job) {
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        let id = tables.next_id();
        let application = Application {
            id,
            job_id: job,
            user_id: user,
            applied_at: Utc::now(),
            status: ApplicationStatus::Pending,
        };
        tables.applications.insert(id, application.clone());
        Ok(ApplyOutcome::Submitted(application))
    }

    async fn withdraw(&self, user: UserId, job: JobId) -> Result<Option<Application>, StoreError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .applications
            .values()
            .find(|a| a.user_id == user && a.job_id == job)
            .map(|a| a.id);

        Ok(id.and_then(|id| tables.applications.remove(&id)))
    }

    async fn applications_for(&self, user: UserId) -> Result<Vec<ApplicationSummary>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ApplicationSummary> = tables
            .applications
            .values()
            .filter(|a| a.user_id == user)
            .filter_map(|a| {
                tables.jobs.get(&a.job_id).map(|job| ApplicationSummary {
                    id: a.id,
                    job_id: a.job_id,
                    job_title: job.title.clone(),
                    company: job.company.clone(),
                    applied_at: a.applied_at,
                    status: a.status,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(rows)
    }

    async fn get_application(&self, id: i64) -> Result<Option<Application>, StoreError> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn set_status(&self, id: i64, status: ApplicationStatus) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("application {}", id)))?;
        application.status = status;
        Ok(application.clone())
    }

    async fn toggle_bookmark(&self, user: UserId, job: JobId) -> Result<BookmarkToggle, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.jobs.contains_key(&job) {
            return Err(StoreError::NotFound(format!("job {}", job)));
        }

        let existing = tables
            .bookmarks
            .values()
            .find(|b| b.user_id == user && b.job_id == job)
            .map(|b| b.id);

        match existing {
            Some(id) => {
                tables.bookmarks.remove(&id);
                Ok(BookmarkToggle::Removed)
            }
            None => {
                let id = tables.next_id();
                tables.bookmarks.insert(
                    id,
                    BookmarkRow {
                        id,
                        user_id: user,
                        job_id: job,
                        saved_at: Utc::now(),
                    },
                );
                Ok(BookmarkToggle::Added)
            }
        }
    }

    async fn bookmarks_for(&self, user: UserId) -> Result<Vec<BookmarkSummary>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bookmarks
            .values()
            .filter(|b| b.user_id == user)
            .filter_map(|b| {
                tables.jobs.get(&b.job_id).map(|job| BookmarkSummary {
                    id: b.id,
                    job_id: b.job_id,
                    job_title: job.title.clone(),
                    company: job.company.clone(),
                    location: job.location.clone(),
                    saved_at: b.saved_at,
                })
            })
            .collect())
    }

    async fn count_applications(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.applications.len() as i64)
    }

    async fn status_counts(&self) -> Result<Vec<StatusCount>, StoreError> {
        let tables = self.tables.read().await;
        let mut counts: BTreeMap<&'static str, (ApplicationStatus, i64)> = BTreeMap::new();
        for application in tables.applications.values() {
            counts
                .entry(application.status.as_str())
                .or_insert((application.status, 0))
                .1 += 1;
        }
        Ok(counts
            .into_values()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    async fn all_applications(&self) -> Result<Vec<ApplicationOverview>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ApplicationOverview> = tables
            .applications
            .values()
            .filter_map(|a| {
                let job = tables.jobs.get(&a.job_id)?;
                let user = tables.users.get(&a.user_id)?;
                Some(ApplicationOverview {
                    id: a.id,
                    job_id: a.job_id,
                    job_title: job.title.clone(),
                    company: job.company.clone(),
                    user_id: a.user_id,
                    username: user.username.clone(),
                    email: user.email.clone(),
                    applied_at: a.applied_at,
                    status: a.status,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.applied_at.cmp(&a.applied_at).then_with(|| b.id.cmp(&a.id)));
        Ok(rows)
    }
}

#[async_trait]
impl ResetCodeStore for MemoryStore {
    async fn create(
        &self,
        user: UserId,
        code: &str,
        created_at: DateTime<Utc>,
        supersede: bool,
    ) -> Result<PasswordResetCode, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user) {
            return Err(StoreError::NotFound(format!("user {}", user)));
        }
        if supersede {
            tables.reset_codes.retain(|_, c| c.user_id != user);
        }

        let id = tables.next_id();
        let row = PasswordResetCode {
            id,
            user_id: user,
            code: code.to_string(),
            created_at,
        };
        tables.reset_codes.insert(id, row.clone());
        Ok(row)
    }

    async fn most_recent_for(&self, user: UserId) -> Result<Option<PasswordResetCode>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_codes
            .values()
            .filter(|c| c.user_id == user)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.tables.write().await.reset_codes.remove(&id);
        Ok(())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.reset_codes.len();
        tables.reset_codes.retain(|_, c| c.created_at >= cutoff);
        Ok((before - tables.reset_codes.len()) as u64)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn record(
        &self,
        user: Option<UserId>,
        action: String,
        extra: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables.audit.push(AuditEntry {
            id,
            action,
            user_id: user,
            created_at: Utc::now(),
            extra_data: extra,
        });
        Ok(())
    }

    async fn record_recommendation(&self, user: UserId, rec: &Recommendation) -> Result<(), StoreError> {
        self.tables.write().await.recommendation_audit.push(RecommendationRow {
            user_id: user,
            job_id: rec.job.id,
            score: rec.score,
        });
        Ok(())
    }
}

/// A sent message captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Notifier that keeps messages in memory instead of delivering them.
/// Can be switched into a failing mode to exercise delivery errors.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    outbox: Mutex<Vec<SentMessage>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, recipient: &str) -> Option<SentMessage> {
        self.sent().into_iter().rev().find(|m| m.recipient == recipient)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(MailerError::Rejected("recording notifier set to fail".to_string()));
        }

        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(SentMessage {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }
        Ok(())
    }
}
