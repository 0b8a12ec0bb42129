// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Application, ApplicationOverview, ApplicationStatus, ApplicationSummary, ApplyOutcome, AuditEntry, BookmarkSummary,
    BookmarkToggle, JobFilter, JobId, JobPosting, NewUser, PasswordResetCode, Recommendation,
    ScoringRules, StatusCount, User, UserId, UserProfile, EMPLOYMENT_TYPES, EXPERIENCE_LEVELS,
    JOB_TYPES,
};
pub use requests::{
    ForgotPasswordRequest, JobDraft, ProfileUpdate, RegisterRequest, ResetPasswordRequest,
    TokenRequest, VerifyCodeRequest,
};
pub use responses::{
    BookmarkResponse, DashboardResponse, HealthResponse, JobDetailResponse, JobListResponse,
    MessageResponse, MyApplicationsResponse, MyBookmarksResponse, ProfileResponse,
    RecommendationsResponse, ResetStepResponse, TokenResponse, UserListResponse,
};
