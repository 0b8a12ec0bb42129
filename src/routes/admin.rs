use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::models::{
    ApplicationStatus, DashboardResponse, JobDraft, JobId, JobPosting, MessageResponse,
    UserListResponse,
};
use crate::routes::{auth::AuthenticatedUser, errors::ApiError, jobs::posting_or_404, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/jobs", web::get().to(my_postings))
        .route("/admin/jobs", web::post().to(create_job))
        .route("/admin/jobs/{id}", web::put().to(update_job))
        .route("/admin/jobs/{id}", web::delete().to(delete_job))
        .route(
            "/admin/applications/{id}/status/{status}",
            web::post().to(update_application_status),
        )
        .route("/admin/dashboard", web::get().to(dashboard))
        .route("/admin/users", web::get().to(job_seekers));
}

/// Postings may only be changed by the staff member who created them
async fn owned_posting(state: &AppState, user: &AuthenticatedUser, id: JobId) -> Result<JobPosting, ApiError> {
    let job = posting_or_404(state, id).await?;
    if job.created_by != Some(user.id) {
        // Same answer as a missing posting
        return Err(ApiError::not_found(format!("Job {} does not exist", id)));
    }
    Ok(job)
}

/// GET /api/v1/admin/jobs
async fn my_postings(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;

    let jobs = state.jobs.postings_by(user.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "jobs": jobs })))
}

/// POST /api/v1/admin/jobs
async fn create_job(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    draft: web::Json<JobDraft>,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;
    draft.validate()?;

    let job = state.jobs.create_posting(user.id, draft.into_inner()).await?;
    state
        .log_action(Some(user.id), format!("Created job: {}", job.title), None)
        .await;

    Ok(HttpResponse::Created().json(job))
}

/// PUT /api/v1/admin/jobs/{id}
async fn update_job(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<JobId>,
    draft: web::Json<JobDraft>,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;
    draft.validate()?;

    let existing = owned_posting(&state, &user, path.into_inner()).await?;
    let job = state.jobs.update_posting(existing.id, draft.into_inner()).await?;
    state
        .log_action(Some(user.id), format!("Updated job: {}", job.title), None)
        .await;

    Ok(HttpResponse::Ok().json(job))
}

/// DELETE /api/v1/admin/jobs/{id}
async fn delete_job(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<JobId>,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;

    let job = owned_posting(&state, &user, path.into_inner()).await?;
    if !state.jobs.delete_posting(job.id).await? {
        return Err(ApiError::not_found(format!("Job {} does not exist", job.id)));
    }

    state
        .log_action(Some(user.id), format!("Deleted job: {}", job.title), None)
        .await;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("Job '{}' deleted.", job.title),
    }))
}

/// POST /api/v1/admin/applications/{id}/status/{status}
///
/// Status must be one of: pending, accepted, declined
async fn update_application_status(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(i64, String)>,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;

    let (id, raw_status) = path.into_inner();
    let status = ApplicationStatus::parse(&raw_status).ok_or_else(|| {
        ApiError::bad_request(
            "invalid_status",
            "Status must be one of: pending, accepted, declined",
        )
    })?;

    let application = state.applications.set_status(id, status).await?;
    let title = state
        .jobs
        .get_posting(application.job_id)
        .await?
        .map(|job| job.title)
        .unwrap_or_default();

    state
        .log_action(
            Some(application.user_id),
            format!("Updated application for job: {}", title),
            Some(serde_json::json!({ "status": status.as_str(), "updatedBy": user.id })),
        )
        .await;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: format!("Application marked as {}.", crate::core::capitalize(status.as_str())),
    }))
}

/// GET /api/v1/admin/dashboard
async fn dashboard(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        total_users: state.users.count_job_seekers().await?,
        total_jobs: state.jobs.count_postings().await?,
        total_applications: state.applications.count_applications().await?,
        status_counts: state.applications.status_counts().await?,
        applications: state.applications.all_applications().await?,
    }))
}

/// GET /api/v1/admin/users
///
/// Job seekers, most recently joined first.
async fn job_seekers(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    user.require_staff()?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        users: state.users.list_job_seekers().await?,
    }))
}
