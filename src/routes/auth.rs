use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest, HttpResponse};
use std::future::{ready, Ready};
use validator::Validate;

use crate::models::{NewUser, RegisterRequest, TokenRequest, TokenResponse, UserId};
use crate::routes::{errors::ApiError, AppState};
use crate::services::verify_password_async;

/// Caller identity taken from the `Authorization: Bearer` header
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub is_staff: bool,
}

impl AuthenticatedUser {
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff {
            Ok(())
        } else {
            Err(ApiError::forbidden("Staff access required"))
        }
    }

    fn extract(req: &HttpRequest) -> Result<Self, ApiError> {
        let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
            tracing::error!("AppState missing from request");
            ApiError::internal()
        })?;

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        let claims = state.tokens.verify(token.trim())?;

        Ok(Self {
            id: claims.user_id()?,
            is_staff: claims.staff,
        })
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::extract(req))
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/token", web::post().to(issue_token))
        .route("/register", web::post().to(register));
}

/// POST /api/v1/token
async fn issue_token(
    state: web::Data<AppState>,
    req: web::Json<TokenRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let invalid = || ApiError::unauthorized("Invalid username or password.");

    let user = state
        .users
        .find_by_username(&req.username)
        .await?
        .ok_or_else(invalid)?;

    let matches = verify_password_async(req.password.clone(), user.password_hash.clone())
        .await
        .map_err(|e| {
            tracing::error!("Unusable password hash for user {}: {}", user.id, e);
            ApiError::internal()
        })?;
    if !matches {
        tracing::info!("Failed login for {}", req.username);
        return Err(invalid());
    }

    let access = state.tokens.issue(&user).map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::internal()
    })?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        access,
        expires_in: state.tokens.ttl_secs(),
    }))
}

/// POST /api/v1/register
///
/// Creates a job-seeker account and its empty profile.
async fn register(
    state: web::Data<AppState>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let req = req.into_inner();
    let user = state
        .users
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            password: req.password1,
            is_staff: false,
        })
        .await?;

    tracing::info!("Registered user {}", user.id);

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Registration successful! You can now log in.",
        "user": user,
    })))
}
