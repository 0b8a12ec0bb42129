//! AccessJobs - job board service core
//!
//! This library provides the skill-based job recommender and the
//! code-verified password reset flow, plus the JSON API around them.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{parse_skills, PasswordReset, Recommender, ResetError, ResetPolicy, ResetStep};
pub use models::{JobPosting, Recommendation, RecommendationsResponse, ScoringRules, UserProfile};
