use actix_web::{web, HttpResponse};

use crate::core::parse_skills;
use crate::models::RecommendationsResponse;
use crate::routes::{auth::AuthenticatedUser, errors::ApiError, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/recommendations", web::get().to(recommendations));
}

/// Recommendations for the caller's profile skills
///
/// GET /api/v1/recommendations
async fn recommendations(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let profile = state.users.profile_for(user.id).await?;
    let skills = parse_skills(profile.and_then(|p| p.skills).as_deref().unwrap_or(""));

    if skills.is_empty() {
        tracing::debug!("User {} has no skills on file", user.id);
        return Ok(HttpResponse::Ok().json(RecommendationsResponse::default()));
    }

    let postings = state.jobs.list_all_postings().await?;
    let total = postings.len();
    let recommendations = state.recommender.recommend_for_skills(&skills, postings);

    if state.audit_recommendations {
        for rec in &recommendations {
            // Audit is best-effort; the caller still gets results
            if let Err(e) = state.audit.record_recommendation(user.id, rec).await {
                tracing::warn!("Failed to audit recommendation of job {}: {}", rec.job.id, e);
            }
        }
    }

    let applied_ids = state.applications.applied_job_ids(user.id).await?;
    let bookmarked_ids = state.applications.bookmarked_job_ids(user.id).await?;

    tracing::info!(
        "Returning {} recommendations for user {} (from {} postings)",
        recommendations.len(),
        user.id,
        total
    );

    Ok(HttpResponse::Ok().json(RecommendationsResponse {
        recommendations,
        applied_ids,
        bookmarked_ids,
    }))
}
