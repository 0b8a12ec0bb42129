use actix_web::{
    cookie::{Cookie, SameSite},
    web, HttpRequest, HttpResponse, HttpResponseBuilder,
};
use validator::Validate;

use crate::core::{RequestOutcome, ResetStep};
use crate::models::{ForgotPasswordRequest, ResetPasswordRequest, ResetStepResponse, VerifyCodeRequest};
use crate::routes::{errors::ApiError, AppState};
use crate::services::Session;

const CODE_SENT: &str = "A 5-digit code has been sent to your email.";
const CODE_VERIFIED: &str = "Code verified. Choose a new password.";
const RESET_DONE: &str = "Password reset successful! You can now log in.";

/// Browser session id carried in a cookie; minted when absent or garbled
struct BrowserSession {
    id: String,
    fresh: bool,
}

impl BrowserSession {
    fn from_request(req: &HttpRequest, cookie_name: &str) -> Self {
        let existing = req
            .cookie(cookie_name)
            .map(|c| c.value().to_string())
            .filter(|value| uuid::Uuid::parse_str(value).is_ok());

        match existing {
            Some(id) => Self { id, fresh: false },
            None => Self {
                id: uuid::Uuid::new_v4().to_string(),
                fresh: true,
            },
        }
    }

    fn respond(&self, mut builder: HttpResponseBuilder, cookie_name: &str) -> HttpResponseBuilder {
        if self.fresh {
            builder.cookie(
                Cookie::build(cookie_name.to_string(), self.id.clone())
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .finish(),
            );
        }
        builder
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/password/forgot", web::post().to(forgot_password))
        .route("/password/verify", web::post().to(verify_code))
        .route("/password/reset", web::post().to(reset_password))
        .route("/password/step", web::get().to(current_step));
}

fn step_response(message: &str, next_step: ResetStep) -> ResetStepResponse {
    ResetStepResponse {
        message: message.to_string(),
        next_step,
    }
}

/// POST /api/v1/password/forgot
///
/// Request body:
/// ```json
/// { "email": "string" }
/// ```
async fn forgot_password(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let browser = BrowserSession::from_request(&http_req, &state.session_cookie);
    let session = Session::new(state.sessions.as_ref(), &browser.id);

    match state.password_reset.request(&session, &req.email).await? {
        RequestOutcome::CodeSent { user_id } => {
            tracing::debug!("Session {} now resetting user {}", browser.id, user_id);
        }
        RequestOutcome::Suppressed => {}
    }

    Ok(browser
        .respond(HttpResponse::Ok(), &state.session_cookie)
        .json(step_response(CODE_SENT, ResetStep::Verify)))
}

/// POST /api/v1/password/verify
///
/// Request body:
/// ```json
/// { "code": "12345" }
/// ```
async fn verify_code(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<VerifyCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let browser = BrowserSession::from_request(&http_req, &state.session_cookie);
    let session = Session::new(state.sessions.as_ref(), &browser.id);

    let next_step = state.password_reset.verify(&session, &req.code).await?;

    Ok(browser
        .respond(HttpResponse::Ok(), &state.session_cookie)
        .json(step_response(CODE_VERIFIED, next_step)))
}

/// POST /api/v1/password/reset
///
/// Request body:
/// ```json
/// { "password1": "string", "password2": "string" }
/// ```
async fn reset_password(
    state: web::Data<AppState>,
    http_req: HttpRequest,
    req: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let browser = BrowserSession::from_request(&http_req, &state.session_cookie);
    let session = Session::new(state.sessions.as_ref(), &browser.id);

    let next_step = state
        .password_reset
        .reset(&session, &req.password1, &req.password2)
        .await?;

    Ok(browser
        .respond(HttpResponse::Ok(), &state.session_cookie)
        .json(step_response(RESET_DONE, next_step)))
}

/// GET /api/v1/password/step
async fn current_step(state: web::Data<AppState>, http_req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let browser = BrowserSession::from_request(&http_req, &state.session_cookie);
    let session = Session::new(state.sessions.as_ref(), &browser.id);

    let step = state.password_reset.current_step(&session).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "step": step })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_fresh_session_when_cookie_missing() {
        let req = TestRequest::default().to_http_request();
        let browser = BrowserSession::from_request(&req, "sessionid");

        assert!(browser.fresh);
        assert!(uuid::Uuid::parse_str(&browser.id).is_ok());
    }

    #[test]
    fn test_existing_cookie_is_reused() {
        let id = uuid::Uuid::new_v4().to_string();
        let req = TestRequest::default()
            .cookie(Cookie::new("sessionid", id.clone()))
            .to_http_request();
        let browser = BrowserSession::from_request(&req, "sessionid");

        assert!(!browser.fresh);
        assert_eq!(browser.id, id);
    }

    #[test]
    fn test_garbled_cookie_is_replaced() {
        let req = TestRequest::default()
            .cookie(Cookie::new("sessionid", "../../etc"))
            .to_http_request();
        let browser = BrowserSession::from_request(&req, "sessionid");

        assert!(browser.fresh);
        assert_ne!(browser.id, "../../etc");
    }
}
