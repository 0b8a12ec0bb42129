// Core algorithm exports
pub mod password_reset;
pub mod recommender;
pub mod scoring;
pub mod skills;

pub use password_reset::{
    generate_code, PasswordReset, RequestOutcome, ResetError, ResetPolicy, ResetStep,
    RESET_USER_KEY, VERIFIED_USER_KEY,
};
pub use recommender::Recommender;
pub use scoring::{calculate_match_score, explain};
pub use skills::{capitalize, matched_skills, parse_skills};
