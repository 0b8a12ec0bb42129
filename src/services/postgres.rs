use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::models::{
    Application, ApplicationOverview, ApplicationStatus, ApplicationSummary, ApplyOutcome, BookmarkSummary,
    BookmarkToggle, JobDraft, JobFilter, JobId, JobPosting, NewUser, PasswordResetCode,
    ProfileUpdate, Recommendation, StatusCount, User, UserId, UserProfile,
};
use crate::services::password::hash_password_async;
use crate::services::ports::{
    ApplicationStore, AuditSink, JobStore, ResetCodeStore, StoreError, UserDirectory,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, email_verified, date_joined";

const JOB_COLUMNS: &str = "id, title, description, company, location, salary, job_type, \
     experience_level, employment_type, remote_option, skills_required, deadline, created_by, created_at";

/// PostgreSQL backend for users, postings, applications, bookmarks,
/// reset codes and the audit trail
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(url: &str, settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            settings.max_connections.unwrap_or(10),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

/// Escape LIKE metacharacters and wrap for a containment match
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(like_pattern)
}

#[async_trait]
impl UserDirectory for PostgresClient {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let password_hash = hash_password_async(new_user.password.clone()).await?;
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO users (username, email, password_hash, is_staff)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (username) DO NOTHING
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user: Option<User> = sqlx::query_as(&query)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&password_hash)
            .bind(new_user.is_staff)
            .fetch_optional(&mut *tx)
            .await?;

        let user = user.ok_or_else(|| StoreError::Conflict(format!("username {} is taken", new_user.username)))?;

        sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!("Created user {} ({})", user.username, user.id);

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as(&query).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        // Emails are not unique; the oldest account wins
        let query = format!(
            "SELECT {} FROM users WHERE email = $1 ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        Ok(sqlx::query_as(&query).bind(email).fetch_optional(&self.pool).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as(&query).bind(username).fetch_optional(&self.pool).await?)
    }

    async fn set_password(&self, id: UserId, new_password: &str) -> Result<(), StoreError> {
        let password_hash = hash_password_async(new_password.to_string()).await?;

        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(&password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn profile_for(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let query = r#"
            SELECT user_id, phone, location, skills, experience, education, last_profile_update
            FROM profiles
            WHERE user_id = $1
        "#;
        Ok(sqlx::query_as(query).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<UserProfile, StoreError> {
        let query = r#"
            INSERT INTO profiles (user_id, phone, location, skills, experience, education, last_profile_update)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                phone = EXCLUDED.phone,
                location = EXCLUDED.location,
                skills = EXCLUDED.skills,
                experience = EXCLUDED.experience,
                education = EXCLUDED.education,
                last_profile_update = EXCLUDED.last_profile_update
            RETURNING user_id, phone, location, skills, experience, education, last_profile_update
        "#;

        Ok(sqlx::query_as(query)
            .bind(id)
            .bind(update.phone)
            .bind(update.location)
            .bind(update.skills)
            .bind(update.experience)
            .bind(update.education)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_job_seekers(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM users WHERE NOT is_staff")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    async fn list_job_seekers(&self) -> Result<Vec<User>, StoreError> {
        let query = format!(
            "SELECT {} FROM users WHERE NOT is_staff ORDER BY date_joined DESC, id DESC",
            USER_COLUMNS
        );
        Ok(sqlx::query_as(&query).fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl JobStore for PostgresClient {
    async fn list_all_postings(&self) -> Result<Vec<JobPosting>, StoreError> {
        let query = format!("SELECT {} FROM job_postings ORDER BY id", JOB_COLUMNS);
        Ok(sqlx::query_as(&query).fetch_all(&self.pool).await?)
    }

    async fn search_postings(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError> {
        let query = format!(
            r#"
            SELECT {}
            FROM job_postings
            WHERE ($1::TEXT IS NULL OR title ILIKE $1 OR COALESCE(description, '') ILIKE $1)
              AND ($2::TEXT IS NULL OR location ILIKE $2)
              AND ($3::TEXT IS NULL OR company ILIKE $3)
            ORDER BY created_at DESC, id DESC
            "#,
            JOB_COLUMNS
        );

        Ok(sqlx::query_as(&query)
            .bind(non_blank(&filter.q))
            .bind(non_blank(&filter.location))
            .bind(non_blank(&filter.company))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_posting(&self, id: JobId) -> Result<Option<JobPosting>, StoreError> {
        let query = format!("SELECT {} FROM job_postings WHERE id = $1", JOB_COLUMNS);
        Ok(sqlx::query_as(&query).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn postings_by(&self, user: UserId) -> Result<Vec<JobPosting>, StoreError> {
        let query = format!(
            "SELECT {} FROM job_postings WHERE created_by = $1 ORDER BY created_at DESC, id DESC",
            JOB_COLUMNS
        );
        Ok(sqlx::query_as(&query).bind(user).fetch_all(&self.pool).await?)
    }

    async fn create_posting(&self, created_by: UserId, draft: JobDraft) -> Result<JobPosting, StoreError> {
        let query = format!(
            r#"
            INSERT INTO job_postings (title, description, company, location, salary, job_type,
                experience_level, employment_type, remote_option, skills_required, deadline, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        Ok(sqlx::query_as(&query)
            .bind(draft.title)
            .bind(draft.description)
            .bind(draft.company)
            .bind(draft.location)
            .bind(draft.salary)
            .bind(draft.job_type)
            .bind(draft.experience_level)
            .bind(draft.employment_type)
            .bind(draft.remote_option)
            .bind(draft.skills_required)
            .bind(draft.deadline)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_posting(&self, id: JobId, draft: JobDraft) -> Result<JobPosting, StoreError> {
        let query = format!(
            r#"
            UPDATE job_postings SET
                title = $2, description = $3, company = $4, location = $5, salary = $6,
                job_type = $7, experience_level = $8, employment_type = $9, remote_option = $10,
                skills_required = $11, deadline = $12
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        );

        let job: Option<JobPosting> = sqlx::query_as(&query)
            .bind(id)
            .bind(draft.title)
            .bind(draft.description)
            .bind(draft.company)
            .bind(draft.location)
            .bind(draft.salary)
            .bind(draft.job_type)
            .bind(draft.experience_level)
            .bind(draft.employment_type)
            .bind(draft.remote_option)
            .bind(draft.skills_required)
            .bind(draft.deadline)
            .fetch_optional(&self.pool)
            .await?;

        job.ok_or_else(|| StoreError::NotFound(format!("job {}", id)))
    }

    async fn delete_posting(&self, id: JobId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM job_postings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_postings(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM job_postings")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl ApplicationStore for PostgresClient {
    async fn applied_job_ids(&self, user: UserId) -> Result<BTreeSet<JobId>, StoreError> {
        let rows = sqlx::query("SELECT job_id FROM applications WHERE user_id = $1")
            .bind(user)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("job_id")).collect())
    }

    async fn bookmarked_job_ids(&self, user: UserId) -> Result<BTreeSet<JobId>, StoreError> {
        let rows = sqlx::query("SELECT job_id FROM bookmarks WHERE user_id = $1")
            .bind(user)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("job_id")).collect())
    }

    /// Uses INSERT ... ON CONFLICT DO NOTHING so a repeat apply is a no-op
    async fn apply(&self, user: UserId, job: JobId) -> Result<ApplyOutcome, StoreError> {
        let query = r#"
            INSERT INTO applications (job_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (job_id, user_id) DO NOTHING
            RETURNING id, job_id, user_id, applied_at, status
        "#;

        let inserted: Option<Application> = sqlx::query_as(query)
            .bind(job)
            .bind(user)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match inserted {
            Some(application) => ApplyOutcome::Submitted(application),
            None => ApplyOutcome::AlreadyApplied,
        })
    }

    async fn withdraw(&self, user: UserId, job: JobId) -> Result<Option<Application>, StoreError> {
        let query = r#"
            DELETE FROM applications
            WHERE user_id = $1 AND job_id = $2
            RETURNING id, job_id, user_id, applied_at, status
        "#;
        Ok(sqlx::query_as(query).bind(user).bind(job).fetch_optional(&self.pool).await?)
    }

    async fn applications_for(&self, user: UserId) -> Result<Vec<ApplicationSummary>, StoreError> {
        let query = r#"
            SELECT a.id, a.job_id, j.title AS job_title, j.company, a.applied_at, a.status
            FROM applications a
            JOIN job_postings j ON j.id = a.job_id
            WHERE a.user_id = $1
            ORDER BY a.applied_at DESC
        "#;
        Ok(sqlx::query_as(query).bind(user).fetch_all(&self.pool).await?)
    }

    async fn get_application(&self, id: i64) -> Result<Option<Application>, StoreError> {
        let query = "SELECT id, job_id, user_id, applied_at, status FROM applications WHERE id = $1";
        Ok(sqlx::query_as(query).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn set_status(&self, id: i64, status: ApplicationStatus) -> Result<Application, StoreError> {
        let query = r#"
            UPDATE applications SET status = $2
            WHERE id = $1
            RETURNING id, job_id, user_id, applied_at, status
        "#;

        let updated: Option<Application> = sqlx::query_as(query)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or_else(|| StoreError::NotFound(format!("application {}", id)))
    }

    async fn toggle_bookmark(&self, user: UserId, job: JobId) -> Result<BookmarkToggle, StoreError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND job_id = $2")
            .bind(user)
            .bind(job)
            .execute(&mut *tx)
            .await?;

        let state = if removed.rows_affected() > 0 {
            BookmarkToggle::Removed
        } else {
            sqlx::query("INSERT INTO bookmarks (user_id, job_id) VALUES ($1, $2)")
                .bind(user)
                .bind(job)
                .execute(&mut *tx)
                .await?;
            BookmarkToggle::Added
        };

        tx.commit().await?;
        Ok(state)
    }

    async fn bookmarks_for(&self, user: UserId) -> Result<Vec<BookmarkSummary>, StoreError> {
        let query = r#"
            SELECT b.id, b.job_id, j.title AS job_title, j.company, j.location, b.saved_at
            FROM bookmarks b
            JOIN job_postings j ON j.id = b.job_id
            WHERE b.user_id = $1
            ORDER BY b.saved_at
        "#;
        Ok(sqlx::query_as(query).bind(user).fetch_all(&self.pool).await?)
    }

    async fn count_applications(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM applications")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total"))
    }

    async fn status_counts(&self) -> Result<Vec<StatusCount>, StoreError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM applications GROUP BY status ORDER BY status::TEXT",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StatusCount {
                status: row.get("status"),
                count: row.get("count"),
            })
            .collect())
    }

    async fn all_applications(&self) -> Result<Vec<ApplicationOverview>, StoreError> {
        let query = r#"
            SELECT a.id, a.job_id, j.title AS job_title, j.company,
                   a.user_id, u.username, u.email, a.applied_at, a.status
            FROM applications a
            JOIN job_postings j ON j.id = a.job_id
            JOIN users u ON u.id = a.user_id
            ORDER BY a.applied_at DESC, a.id DESC
        "#;
        Ok(sqlx::query_as(query).fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl ResetCodeStore for PostgresClient {
    async fn create(
        &self,
        user: UserId,
        code: &str,
        created_at: DateTime<Utc>,
        supersede: bool,
    ) -> Result<PasswordResetCode, StoreError> {
        let mut tx = self.pool.begin().await?;

        if supersede {
            let removed = sqlx::query("DELETE FROM password_reset_codes WHERE user_id = $1")
                .bind(user)
                .execute(&mut *tx)
                .await?;
            tracing::debug!("Superseded {} reset codes for user {}", removed.rows_affected(), user);
        }

        let row: PasswordResetCode = sqlx::query_as(
            r#"
            INSERT INTO password_reset_codes (user_id, code, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, code, created_at
            "#,
        )
        .bind(user)
        .bind(code)
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn most_recent_for(&self, user: UserId) -> Result<Option<PasswordResetCode>, StoreError> {
        let query = r#"
            SELECT id, user_id, code, created_at
            FROM password_reset_codes
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
        "#;
        Ok(sqlx::query_as(query).bind(user).fetch_optional(&self.pool).await?)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM password_reset_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM password_reset_codes WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        tracing::info!("Purged {} expired reset codes", result.rows_affected());
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AuditSink for PostgresClient {
    async fn record(
        &self,
        user: Option<UserId>,
        action: String,
        extra: Option<serde_json::Value>,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO audit_logs (action, user_id, extra_data) VALUES ($1, $2, $3)")
            .bind(&action)
            .bind(user)
            .bind(extra)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Audit: {}", action);
        Ok(())
    }

    async fn record_recommendation(&self, user: UserId, rec: &Recommendation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO recommendation_audits (user_id, job_id, match_score, explanation)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user)
        .bind(rec.job.id)
        .bind(i32::from(rec.score))
        .bind(&rec.explanation)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
