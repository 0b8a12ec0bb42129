// End-to-end password reset flow on in-memory collaborators

use accessjobs::core::{
    PasswordReset, RequestOutcome, ResetError, ResetPolicy, ResetStep, RESET_USER_KEY,
    VERIFIED_USER_KEY,
};
use accessjobs::models::NewUser;
use accessjobs::services::{
    verify_password, MemorySessionStore, MemoryStore, RecordingNotifier, Session, UserDirectory,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

struct Harness {
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    sessions: MemorySessionStore,
    reset: PasswordReset,
}

impl Harness {
    fn new(policy: ResetPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let reset = PasswordReset::new(store.clone(), store.clone(), notifier.clone(), policy);

        Self {
            store,
            notifier,
            sessions: MemorySessionStore::new(100, 3600),
            reset,
        }
    }

    fn session<'a>(&'a self, id: &'a str) -> Session<'a> {
        Session::new(&self.sessions, id)
    }

    async fn user(&self, username: &str, email: &str, password: &str) -> i64 {
        self.store
            .create_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                is_staff: false,
            })
            .await
            .unwrap()
            .id
    }

    fn last_code(&self, email: &str) -> String {
        let message = self.notifier.last_to(email).expect("no email sent");
        message
            .body
            .split(": ")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .expect("code missing from body")
            .to_string()
    }
}

fn other_code(code: &str) -> String {
    if code == "12345" { "54321".to_string() } else { "12345".to_string() }
}

#[tokio::test]
async fn test_full_reset_changes_password_and_clears_markers() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("amina", "amina@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    let outcome = h.reset.request(&session, "amina@example.com").await.unwrap();
    assert_eq!(outcome, RequestOutcome::CodeSent { user_id });
    assert_eq!(session.get_id(RESET_USER_KEY).await.unwrap(), Some(user_id));

    let sent = h.notifier.last_to("amina@example.com").unwrap();
    assert_eq!(sent.subject, "Your Password Reset Code");
    assert!(sent.body.ends_with("It will expire in 10 minutes."));

    let code = h.last_code("amina@example.com");
    assert_eq!(h.reset.verify(&session, &code).await.unwrap(), ResetStep::Reset);
    assert_eq!(session.get_id(VERIFIED_USER_KEY).await.unwrap(), Some(user_id));
    assert!(h.store.reset_codes_for(user_id).await.is_empty());

    let step = h.reset.reset(&session, "newpass1", "newpass1").await.unwrap();
    assert_eq!(step, ResetStep::Complete);

    assert_eq!(session.get(RESET_USER_KEY).await.unwrap(), None);
    assert_eq!(session.get(VERIFIED_USER_KEY).await.unwrap(), None);

    let user = h.store.find_by_id(user_id).await.unwrap().unwrap();
    assert!(verify_password("newpass1", &user.password_hash).unwrap());
    assert!(!verify_password("oldpass1", &user.password_hash).unwrap());
}

#[tokio::test]
async fn test_unknown_email_creates_nothing() {
    let h = Harness::new(ResetPolicy::default());
    let session = h.session("browser-1");

    let result = h.reset.request(&session, "ghost@example.com").await;

    assert!(matches!(result, Err(ResetError::UserNotFound)));
    assert!(h.notifier.sent().is_empty());
    assert_eq!(session.get(RESET_USER_KEY).await.unwrap(), None);
    assert_eq!(h.reset.current_step(&session).await.unwrap(), ResetStep::Request);
}

#[tokio::test]
async fn test_uniform_response_hides_unknown_email() {
    let h = Harness::new(ResetPolicy {
        uniform_response: true,
        ..ResetPolicy::default()
    });
    let session = h.session("browser-1");

    let outcome = h.reset.request(&session, "ghost@example.com").await.unwrap();

    assert_eq!(outcome, RequestOutcome::Suppressed);
    assert!(h.notifier.sent().is_empty());
    assert_eq!(session.get(RESET_USER_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_wrong_code_leaves_issued_code_valid() {
    let h = Harness::new(ResetPolicy::default());
    h.user("kofi", "kofi@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    h.reset.request(&session, "kofi@example.com").await.unwrap();
    let code = h.last_code("kofi@example.com");

    let wrong = h.reset.verify(&session, &other_code(&code)).await;
    assert!(matches!(wrong, Err(ResetError::CodeMismatch)));
    assert_eq!(session.get(VERIFIED_USER_KEY).await.unwrap(), None);
    assert_eq!(h.reset.current_step(&session).await.unwrap(), ResetStep::Verify);

    assert_eq!(h.reset.verify(&session, &code).await.unwrap(), ResetStep::Reset);
}

#[tokio::test]
async fn test_expired_code_is_rejected_and_removed() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("lina", "lina@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    session.set(RESET_USER_KEY, &user_id.to_string()).await.unwrap();
    h.store
        .insert_reset_code(user_id, "24680", Utc::now() - Duration::minutes(11))
        .await;

    let result = h.reset.verify(&session, "24680").await;

    assert!(matches!(result, Err(ResetError::CodeExpired)));
    assert!(h.store.reset_codes_for(user_id).await.is_empty());
    assert_eq!(session.get(RESET_USER_KEY).await.unwrap(), None);
    assert_eq!(h.reset.current_step(&session).await.unwrap(), ResetStep::Request);

    // Retrying the same code now reports an unstarted flow
    assert!(matches!(
        h.reset.verify(&session, "24680").await,
        Err(ResetError::FlowNotStarted)
    ));

    // A fresh request opens a new window
    h.reset.request(&session, "lina@example.com").await.unwrap();
    let code = h.last_code("lina@example.com");
    assert_eq!(h.reset.verify(&session, &code).await.unwrap(), ResetStep::Reset);
}

#[tokio::test]
async fn test_code_at_exactly_ten_minutes_still_valid() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("tomas", "tomas@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    let created = Utc::now();
    session.set(RESET_USER_KEY, &user_id.to_string()).await.unwrap();
    h.store.insert_reset_code(user_id, "13579", created).await;

    let step = h
        .reset
        .verify_at(&session, "13579", created + Duration::minutes(10))
        .await
        .unwrap();
    assert_eq!(step, ResetStep::Reset);
}

#[tokio::test]
async fn test_verify_without_request() {
    let h = Harness::new(ResetPolicy::default());
    let session = h.session("browser-1");

    assert!(matches!(
        h.reset.verify(&session, "12345").await,
        Err(ResetError::FlowNotStarted)
    ));
}

#[tokio::test]
async fn test_verify_with_no_code_on_file() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("sade", "sade@example.com", "oldpass1").await;
    let session = h.session("browser-1");
    session.set(RESET_USER_KEY, &user_id.to_string()).await.unwrap();

    assert!(matches!(
        h.reset.verify(&session, "12345").await,
        Err(ResetError::NoCodeFound)
    ));
    assert_eq!(h.reset.current_step(&session).await.unwrap(), ResetStep::Request);
}

#[tokio::test]
async fn test_reset_requires_verification() {
    let h = Harness::new(ResetPolicy::default());
    h.user("noor", "noor@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    h.reset.request(&session, "noor@example.com").await.unwrap();

    assert!(matches!(
        h.reset.reset(&session, "newpass1", "newpass1").await,
        Err(ResetError::NotVerified)
    ));
}

#[tokio::test]
async fn test_password_rules_keep_verified_state() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("ivan", "ivan@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    h.reset.request(&session, "ivan@example.com").await.unwrap();
    let code = h.last_code("ivan@example.com");
    h.reset.verify(&session, &code).await.unwrap();

    // Mismatch is reported before length
    assert!(matches!(
        h.reset.reset(&session, "abc", "abd").await,
        Err(ResetError::PasswordMismatch)
    ));
    assert!(matches!(
        h.reset.reset(&session, "abc12", "abc12").await,
        Err(ResetError::PasswordTooShort(6))
    ));
    assert_eq!(session.get_id(VERIFIED_USER_KEY).await.unwrap(), Some(user_id));

    assert_eq!(
        h.reset.reset(&session, "abc123", "abc123").await.unwrap(),
        ResetStep::Complete
    );
}

#[tokio::test]
async fn test_new_request_supersedes_previous_code() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("maya", "maya@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    h.reset.request(&session, "maya@example.com").await.unwrap();
    let first = h.last_code("maya@example.com");
    h.reset.request(&session, "maya@example.com").await.unwrap();
    let second = h.last_code("maya@example.com");

    let codes = h.store.reset_codes_for(user_id).await;
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].code, second);

    if first != second {
        assert!(matches!(
            h.reset.verify(&session, &first).await,
            Err(ResetError::CodeMismatch)
        ));
    }
    assert_eq!(h.reset.verify(&session, &second).await.unwrap(), ResetStep::Reset);
}

#[tokio::test]
async fn test_delivery_failure_keeps_code_but_sets_no_marker() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("omar", "omar@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    h.notifier.set_failing(true);
    let result = h.reset.request(&session, "omar@example.com").await;

    assert!(matches!(result, Err(ResetError::Delivery(_))));
    assert_eq!(h.store.reset_codes_for(user_id).await.len(), 1);
    assert_eq!(session.get(RESET_USER_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_sessions_do_not_share_progress() {
    let h = Harness::new(ResetPolicy::default());
    h.user("zane", "zane@example.com", "oldpass1").await;

    let first = h.session("browser-1");
    let second = h.session("browser-2");

    h.reset.request(&first, "zane@example.com").await.unwrap();
    let code = h.last_code("zane@example.com");

    assert!(matches!(
        h.reset.verify(&second, &code).await,
        Err(ResetError::FlowNotStarted)
    ));
}

#[tokio::test]
async fn test_purge_removes_only_expired_codes() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("ada", "ada@example.com", "oldpass1").await;
    let now = Utc::now();

    h.store.insert_reset_code(user_id, "11111", now - Duration::minutes(30)).await;
    h.store.insert_reset_code(user_id, "22222", now - Duration::minutes(2)).await;

    assert_eq!(h.reset.purge_expired(now).await.unwrap(), 1);

    let remaining = h.store.reset_codes_for(user_id).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].code, "22222");
}

#[tokio::test]
async fn test_failed_delivery_replaces_earlier_code() {
    let h = Harness::new(ResetPolicy::default());
    let user_id = h.user("femi", "femi@example.com", "oldpass1").await;
    let session = h.session("browser-1");

    h.reset.request(&session, "femi@example.com").await.unwrap();
    let delivered = h.last_code("femi@example.com");

    h.notifier.set_failing(true);
    assert!(h.reset.request(&session, "femi@example.com").await.is_err());

    // Only the undelivered code is on file; the session still points at the user
    let codes = h.store.reset_codes_for(user_id).await;
    assert_eq!(codes.len(), 1);
    assert_eq!(session.get_id(RESET_USER_KEY).await.unwrap(), Some(user_id));

    if codes[0].code != delivered {
        assert!(matches!(
            h.reset.verify(&session, &delivered).await,
            Err(ResetError::CodeMismatch)
        ));
    }

    h.notifier.set_failing(false);
    h.reset.request(&session, "femi@example.com").await.unwrap();
    let fresh = h.last_code("femi@example.com");
    assert_eq!(h.reset.verify(&session, &fresh).await.unwrap(), ResetStep::Reset);
}
