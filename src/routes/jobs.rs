use actix_web::{web, HttpResponse};
use std::collections::BTreeSet;

use crate::models::{
    ApplyOutcome, BookmarkResponse, BookmarkToggle, JobDetailResponse, JobFilter, JobId,
    JobListResponse, JobPosting, MessageResponse,
};
use crate::routes::{auth::AuthenticatedUser, errors::ApiError, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/jobs", web::get().to(list_jobs))
        .route("/jobs/{id}", web::get().to(job_detail))
        .route("/jobs/{id}/apply", web::post().to(apply))
        .route("/jobs/{id}/apply", web::delete().to(withdraw))
        .route("/jobs/{id}/bookmark", web::post().to(toggle_bookmark));
}

pub(crate) async fn posting_or_404(state: &AppState, id: JobId) -> Result<JobPosting, ApiError> {
    state
        .jobs
        .get_posting(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Job {} does not exist", id)))
}

fn message(text: impl Into<String>) -> MessageResponse {
    MessageResponse { message: text.into() }
}

/// Search postings
///
/// GET /api/v1/jobs?q={text}&location={text}&company={text}
async fn list_jobs(
    state: web::Data<AppState>,
    filter: web::Query<JobFilter>,
    user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, ApiError> {
    let jobs = state.jobs.search_postings(&filter).await?;

    let applied_ids = match user {
        Some(user) if !user.is_staff => state.applications.applied_job_ids(user.id).await?,
        _ => BTreeSet::new(),
    };

    Ok(HttpResponse::Ok().json(JobListResponse { jobs, applied_ids }))
}

/// GET /api/v1/jobs/{id}
async fn job_detail(
    state: web::Data<AppState>,
    path: web::Path<JobId>,
    user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, ApiError> {
    let job = posting_or_404(&state, path.into_inner()).await?;

    let has_applied = match user {
        Some(user) => state.applications.applied_job_ids(user.id).await?.contains(&job.id),
        None => false,
    };

    Ok(HttpResponse::Ok().json(JobDetailResponse { job, has_applied }))
}

/// POST /api/v1/jobs/{id}/apply
async fn apply(
    state: web::Data<AppState>,
    path: web::Path<JobId>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let job = posting_or_404(&state, path.into_inner()).await?;

    match state.applications.apply(user.id, job.id).await? {
        ApplyOutcome::Submitted(application) => {
            state
                .log_action(
                    Some(user.id),
                    format!("Submitted application for job: {}", job.title),
                    Some(serde_json::json!({ "applicationId": application.id, "jobId": job.id })),
                )
                .await;

            tracing::info!("User {} applied to job {}", user.id, job.id);
            Ok(HttpResponse::Created().json(message("Your application has been submitted.")))
        }
        ApplyOutcome::AlreadyApplied => {
            Ok(HttpResponse::Ok().json(message("You have already applied for this job.")))
        }
    }
}

/// DELETE /api/v1/jobs/{id}/apply
async fn withdraw(
    state: web::Data<AppState>,
    path: web::Path<JobId>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let job = posting_or_404(&state, path.into_inner()).await?;

    let application = state
        .applications
        .withdraw(user.id, job.id)
        .await?
        .ok_or_else(|| ApiError::not_found("You have not applied for this job."))?;

    state
        .log_action(
            Some(user.id),
            format!("Withdrew application for job: {}", job.title),
            Some(serde_json::json!({ "applicationId": application.id, "jobId": job.id })),
        )
        .await;

    Ok(HttpResponse::Ok().json(message("Your application has been withdrawn.")))
}

/// POST /api/v1/jobs/{id}/bookmark
async fn toggle_bookmark(
    state: web::Data<AppState>,
    path: web::Path<JobId>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let job = posting_or_404(&state, path.into_inner()).await?;
    let bookmark_state = state.applications.toggle_bookmark(user.id, job.id).await?;

    let text = match bookmark_state {
        BookmarkToggle::Added => format!("Bookmarked '{}' successfully!", job.title),
        BookmarkToggle::Removed => format!("Removed bookmark for '{}'.", job.title),
    };

    Ok(HttpResponse::Ok().json(BookmarkResponse {
        message: text,
        state: bookmark_state,
    }))
}
