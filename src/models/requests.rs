use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::models::domain::{EMPLOYMENT_TYPES, EXPERIENCE_LEVELS, JOB_TYPES};

/// First step of the reset flow
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Second step: the 5-digit code received by email
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(length(min = 1))]
    pub code: String,
}

/// Final step: the new password and its confirmation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub password1: String,
    pub password2: String,
}

/// Username/password exchange for a bearer token
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(
        length(min = 6),
        must_match(other = "password2", message = "Passwords do not match.")
    )]
    pub password1: String,
    pub password2: String,
}

/// Fields an admin supplies when creating or editing a posting
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JobDraft {
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub company: String,
    #[validate(length(min = 1, max = 200), custom(function = "not_blank"))]
    pub location: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub salary: Option<String>,
    #[serde(rename = "jobType", default = "default_job_type")]
    #[validate(custom(function = "job_type_choice"))]
    pub job_type: String,
    #[serde(rename = "experienceLevel", default = "default_experience_level")]
    #[validate(custom(function = "experience_level_choice"))]
    pub experience_level: String,
    #[serde(rename = "employmentType", default = "default_employment_type")]
    #[validate(custom(function = "employment_type_choice"))]
    pub employment_type: String,
    #[serde(rename = "remoteOption", default)]
    pub remote_option: bool,
    #[serde(rename = "skillsRequired", default)]
    pub skills_required: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

fn default_job_type() -> String { "Full-time".to_string() }
fn default_experience_level() -> String { "Entry".to_string() }
fn default_employment_type() -> String { "On-site".to_string() }

/// Editable profile fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 20))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub skills: Option<String>,
    #[validate(length(max = 50))]
    pub experience: Option<String>,
    pub education: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some(Cow::from("must not be blank"));
        return Err(err);
    }
    Ok(())
}

fn one_of(value: &str, choices: &[&str]) -> Result<(), ValidationError> {
    if choices.contains(&value) {
        return Ok(());
    }
    let mut err = ValidationError::new("invalid_choice");
    err.message = Some(Cow::from(format!(
        "'{}' is not one of: {}",
        value,
        choices.join(", ")
    )));
    Err(err)
}

fn job_type_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, JOB_TYPES)
}

fn experience_level_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, EXPERIENCE_LEVELS)
}

fn employment_type_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, EMPLOYMENT_TYPES)
}
