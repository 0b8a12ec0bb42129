use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::models::{
    MyApplicationsResponse, MyBookmarksResponse, ProfileResponse, ProfileUpdate, UserId,
};
use crate::routes::{auth::AuthenticatedUser, errors::ApiError, AppState};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/me/profile", web::get().to(view_profile))
        .route("/me/profile", web::put().to(edit_profile))
        .route("/me/applications", web::get().to(my_applications))
        .route("/me/bookmarks", web::get().to(my_bookmarks));
}

async fn load_profile(state: &AppState, id: UserId) -> Result<ProfileResponse, ApiError> {
    // A valid token for a deleted account
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    let profile = state.users.profile_for(id).await?;
    let skills = profile.as_ref().map(|p| p.skill_list()).unwrap_or_default();

    Ok(ProfileResponse { user, profile, skills })
}

async fn view_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(load_profile(&state, user.id).await?))
}

async fn edit_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    update: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    update.validate()?;

    state.users.update_profile(user.id, update.into_inner()).await?;
    tracing::info!("User {} updated their profile", user.id);

    Ok(HttpResponse::Ok().json(load_profile(&state, user.id).await?))
}

async fn my_applications(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let applications = state.applications.applications_for(user.id).await?;
    Ok(HttpResponse::Ok().json(MyApplicationsResponse { applications }))
}

async fn my_bookmarks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let bookmarks = state.applications.bookmarks_for(user.id).await?;
    let applied_ids = state.applications.applied_job_ids(user.id).await?;

    Ok(HttpResponse::Ok().json(MyBookmarksResponse { bookmarks, applied_ids }))
}
