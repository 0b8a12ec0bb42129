use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::ResetSettings;
use crate::models::UserId;
use crate::services::mailer::{MailerError, Notifier};
use crate::services::ports::{ResetCodeStore, StoreError, UserDirectory};
use crate::services::session::{Session, SessionError};

/// Session key holding the user who requested a code
pub const RESET_USER_KEY: &str = "reset_user_id";

/// Session key holding the user who confirmed a code
pub const VERIFIED_USER_KEY: &str = "verified_user_id";

pub const RESET_EMAIL_SUBJECT: &str = "Your Password Reset Code";

const CODE_RANGE: std::ops::RangeInclusive<u32> = 10_000..=99_999;

/// Where a browser session stands in the reset flow.
///
/// `Request` is both the initial state and the state every hard failure
/// sends the client back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStep {
    Request,
    Verify,
    Reset,
    Complete,
}

#[derive(Debug, Error)]
pub enum ResetError {
    #[error("No account found with that email.")]
    UserNotFound,

    #[error("Please enter your email first.")]
    FlowNotStarted,

    #[error("No code found. Please request a new one.")]
    NoCodeFound,

    #[error("Code expired. Please request a new one.")]
    CodeExpired,

    #[error("Invalid code.")]
    CodeMismatch,

    #[error("You must verify your code first.")]
    NotVerified,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters.")]
    PasswordTooShort(usize),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Could not deliver reset code: {0}")]
    Delivery(#[from] MailerError),
}

impl ResetError {
    /// The step the client should return to
    pub fn step(&self) -> ResetStep {
        match self {
            Self::CodeMismatch => ResetStep::Verify,
            Self::PasswordMismatch | Self::PasswordTooShort(_) => ResetStep::Reset,
            _ => ResetStep::Request,
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Session(_) | Self::Delivery(_))
    }
}

/// Result of a Request step that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    CodeSent { user_id: UserId },
    /// Unknown email answered like a known one
    Suppressed,
}

#[derive(Debug, Clone, Copy)]
pub struct ResetPolicy {
    pub code_ttl: Duration,
    pub min_password_length: usize,
    pub supersede_prior_codes: bool,
    pub uniform_response: bool,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self {
            code_ttl: Duration::minutes(10),
            min_password_length: 6,
            supersede_prior_codes: true,
            uniform_response: false,
        }
    }
}

impl From<&ResetSettings> for ResetPolicy {
    fn from(settings: &ResetSettings) -> Self {
        Self {
            code_ttl: Duration::minutes(settings.code_ttl_minutes),
            min_password_length: settings.min_password_length,
            supersede_prior_codes: settings.supersede_prior_codes,
            uniform_response: settings.uniform_response,
        }
    }
}

/// Draw a reset code uniformly from 10000..=99999
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(CODE_RANGE).to_string()
}

/// Three-step password reset: request a code by email, confirm it, then
/// choose a new password.
///
/// Progress lives in the caller's session under [`RESET_USER_KEY`] and
/// [`VERIFIED_USER_KEY`]. A password is only changed while the verified
/// marker is present, and that marker is only written after a matching,
/// unexpired code was consumed.
pub struct PasswordReset {
    users: Arc<dyn UserDirectory>,
    codes: Arc<dyn ResetCodeStore>,
    notifier: Arc<dyn Notifier>,
    policy: ResetPolicy,
}

impl PasswordReset {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        codes: Arc<dyn ResetCodeStore>,
        notifier: Arc<dyn Notifier>,
        policy: ResetPolicy,
    ) -> Self {
        Self {
            users,
            codes,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &ResetPolicy {
        &self.policy
    }

    /// Issue and email a code for the account registered under `email`
    pub async fn request(&self, session: &Session<'_>, email: &str) -> Result<RequestOutcome, ResetError> {
        self.request_at(session, email, Utc::now()).await
    }

    pub async fn request_at(
        &self,
        session: &Session<'_>,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestOutcome, ResetError> {
        let user = match self.users.find_by_email(email.trim()).await? {
            Some(user) => user,
            None if self.policy.uniform_response => {
                tracing::info!("Reset requested for unknown email, response suppressed");
                return Ok(RequestOutcome::Suppressed);
            }
            None => return Err(ResetError::UserNotFound),
        };

        let code = generate_code();
        self.codes
            .create(user.id, &code, now, self.policy.supersede_prior_codes)
            .await?;

        let body = format!(
            "Your 5-digit password reset code is: {}\nIt will expire in {} minutes.",
            code,
            self.policy.code_ttl.num_minutes()
        );

        // The stored code stays; the user can simply request again
        if let Err(e) = self.notifier.send(&user.email, RESET_EMAIL_SUBJECT, &body).await {
            tracing::error!("Failed to deliver reset code to user {}: {}", user.id, e);
            return Err(ResetError::Delivery(e));
        }

        // A new request restarts the flow
        session.clear(VERIFIED_USER_KEY).await?;
        session.set(RESET_USER_KEY, &user.id.to_string()).await?;

        tracing::info!("Reset code issued for user {}", user.id);
        Ok(RequestOutcome::CodeSent { user_id: user.id })
    }

    /// Confirm the most recent code issued to the session's user
    pub async fn verify(&self, session: &Session<'_>, code: &str) -> Result<ResetStep, ResetError> {
        self.verify_at(session, code, Utc::now()).await
    }

    pub async fn verify_at(
        &self,
        session: &Session<'_>,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<ResetStep, ResetError> {
        let user_id = session
            .get_id(RESET_USER_KEY)
            .await?
            .ok_or(ResetError::FlowNotStarted)?;

        // Both dead ends send the session back to the request step
        let stored = match self.codes.most_recent_for(user_id).await? {
            Some(stored) => stored,
            None => {
                session.clear(RESET_USER_KEY).await?;
                return Err(ResetError::NoCodeFound);
            }
        };

        if stored.is_expired_at(now, self.policy.code_ttl) {
            self.codes.delete(stored.id).await?;
            session.clear(RESET_USER_KEY).await?;
            tracing::info!("Expired reset code discarded for user {}", user_id);
            return Err(ResetError::CodeExpired);
        }

        if code != stored.code {
            tracing::debug!("Reset code mismatch for user {}", user_id);
            return Err(ResetError::CodeMismatch);
        }

        self.codes.delete(stored.id).await?;
        session.set(VERIFIED_USER_KEY, &user_id.to_string()).await?;

        tracing::info!("Reset code verified for user {}", user_id);
        Ok(ResetStep::Reset)
    }

    /// Set the new password once the session holds a verified user
    pub async fn reset(
        &self,
        session: &Session<'_>,
        password: &str,
        confirmation: &str,
    ) -> Result<ResetStep, ResetError> {
        let user_id = session
            .get_id(VERIFIED_USER_KEY)
            .await?
            .ok_or(ResetError::NotVerified)?;

        if password != confirmation {
            return Err(ResetError::PasswordMismatch);
        }
        if password.chars().count() < self.policy.min_password_length {
            return Err(ResetError::PasswordTooShort(self.policy.min_password_length));
        }

        match self.users.set_password(user_id, password).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::warn!("Verified user {} no longer exists", user_id);
                self.clear_markers(session).await?;
                return Err(ResetError::NotVerified);
            }
            Err(e) => return Err(e.into()),
        }

        self.clear_markers(session).await?;

        tracing::info!("Password reset completed for user {}", user_id);
        Ok(ResetStep::Complete)
    }

    /// Step implied by the markers currently in the session
    pub async fn current_step(&self, session: &Session<'_>) -> Result<ResetStep, ResetError> {
        if session.get_id(VERIFIED_USER_KEY).await?.is_some() {
            return Ok(ResetStep::Reset);
        }
        if session.get_id(RESET_USER_KEY).await?.is_some() {
            return Ok(ResetStep::Verify);
        }
        Ok(ResetStep::Request)
    }

    /// Delete every code already past its lifetime
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ResetError> {
        Ok(self.codes.purge_expired(now - self.policy.code_ttl).await?)
    }

    async fn clear_markers(&self, session: &Session<'_>) -> Result<(), SessionError> {
        session.clear(VERIFIED_USER_KEY).await?;
        session.clear(RESET_USER_KEY).await
    }
}
