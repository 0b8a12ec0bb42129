// Route exports
pub mod admin;
pub mod auth;
pub mod errors;
pub mod health;
pub mod jobs;
pub mod password_reset;
pub mod profile;
pub mod recommendations;

use actix_web::web;
use std::sync::Arc;

use crate::config::Settings;
use crate::core::{PasswordReset, Recommender, ResetPolicy};
use crate::models::{ScoringRules, UserId};
use crate::services::{
    ApplicationStore, AuditSink, JobStore, Notifier, ResetCodeStore, SessionStore, TokenIssuer,
    UserDirectory,
};

pub use auth::AuthenticatedUser;
pub use errors::{handle_json_payload_error, handle_path_error, handle_query_payload_error, ApiError};

/// Tunables that shape the application state
#[derive(Debug, Clone)]
pub struct StateOptions {
    pub reset: ResetPolicy,
    pub scoring: ScoringRules,
    pub session_cookie: String,
    pub audit_recommendations: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            reset: ResetPolicy::default(),
            scoring: ScoringRules::default(),
            session_cookie: "sessionid".to_string(),
            audit_recommendations: false,
        }
    }
}

impl From<&Settings> for StateOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            reset: ResetPolicy::from(&settings.reset),
            scoring: ScoringRules {
                base: settings.recommendation.base_score,
                per_skill: settings.recommendation.per_skill,
                max: settings.recommendation.max_score,
            },
            session_cookie: settings.session.cookie_name.clone(),
            audit_recommendations: settings.recommendation.audit,
        }
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserDirectory>,
    pub jobs: Arc<dyn JobStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub audit: Arc<dyn AuditSink>,
    pub sessions: Arc<dyn SessionStore>,
    pub password_reset: Arc<PasswordReset>,
    pub recommender: Recommender,
    pub tokens: Arc<TokenIssuer>,
    pub session_cookie: String,
    pub audit_recommendations: bool,
}

impl AppState {
    /// Wire every store role to one backend
    pub fn new<S>(
        store: Arc<S>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        tokens: TokenIssuer,
        options: StateOptions,
    ) -> Self
    where
        S: UserDirectory + JobStore + ApplicationStore + ResetCodeStore + AuditSink + 'static,
    {
        let password_reset = PasswordReset::new(
            store.clone(),
            store.clone(),
            notifier,
            options.reset,
        );

        Self {
            users: store.clone(),
            jobs: store.clone(),
            applications: store.clone(),
            audit: store,
            sessions,
            password_reset: Arc::new(password_reset),
            recommender: Recommender::new(options.scoring),
            tokens: Arc::new(tokens),
            session_cookie: options.session_cookie,
            audit_recommendations: options.audit_recommendations,
        }
    }

    /// Append to the audit trail once a mutation has committed.
    /// Failures are logged and never undo the mutation.
    pub async fn log_action(&self, user: Option<UserId>, action: String, extra: Option<serde_json::Value>) {
        tracing::debug!("Audit: {}", action);
        if let Err(e) = self.audit.record(user, action, extra).await {
            tracing::warn!("Failed to write audit entry: {}", e);
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(auth::configure)
            .configure(recommendations::configure)
            .configure(password_reset::configure)
            .configure(jobs::configure)
            .configure(profile::configure)
            .configure(admin::configure),
    );
}
