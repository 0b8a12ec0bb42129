// Service exports
pub mod auth;
pub mod mailer;
pub mod memory;
pub mod password;
pub mod ports;
pub mod postgres;
pub mod session;

pub use auth::{AuthError, Claims, TokenIssuer};
pub use mailer::{MailerError, Notifier, SmtpMailer};
pub use memory::{MemoryStore, RecordingNotifier, SentMessage};
pub use password::{
    hash_password, hash_password_async, verify_password, verify_password_async, PasswordHashError,
};
pub use ports::{ApplicationStore, AuditSink, JobStore, ResetCodeStore, StoreError, UserDirectory};
pub use postgres::PostgresClient;
pub use session::{MemorySessionStore, RedisSessionStore, Session, SessionError, SessionStore};
