//! End-to-end lockout behaviour against SQLite.
#![cfg(feature = "sqlite")]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use narthex::{
    Account, AccountId, LockRemaining, LoginOutcome, ManualClock, Narthex, NarthexBuilder,
    NarthexError, NewAccount, OutcomeKind, SqliteRepositoryProvider,
};
use sqlx::SqlitePool;

const PASSWORD: &str = "Parroquia#2024";

struct TestContext {
    narthex: Narthex<SqliteRepositoryProvider, ManualClock>,
    clock: Arc<ManualClock>,
    pool: SqlitePool,
    start: DateTime<Utc>,
}

async fn setup() -> TestContext {
    let _ = tracing_subscriber::fmt().try_init();

    let start = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    let narthex = NarthexBuilder::new()
        .with_sqlite_pool(pool.clone())
        .with_clock(clock.clone())
        .apply_migrations(true)
        .build()
        .await
        .expect("Failed to build Narthex");

    TestContext {
        narthex,
        clock,
        pool,
        start,
    }
}

async fn register(ctx: &TestContext, number: &str) -> Account {
    let account = NewAccount::builder()
        .document("CC", number)
        .first_name("Lucia")
        .last_name("Restrepo")
        .email("lucia@example.com")
        .build()
        .expect("valid account");

    ctx.narthex
        .register_account(account, PASSWORD)
        .await
        .expect("registration failed")
}

async fn login(ctx: &TestContext, number: &str, password: &str) -> LoginOutcome {
    ctx.narthex
        .login("CC", number, password)
        .await
        .expect("login could not be evaluated")
}

fn assert_locked(outcome: &LoginOutcome, until: DateTime<Utc>, minutes: u64, seconds: u64) {
    match outcome {
        LoginOutcome::RejectedLocked {
            locked_until,
            remaining,
        } => {
            assert_eq!(*locked_until, until);
            assert_eq!(*remaining, LockRemaining { minutes, seconds });
        }
        other => panic!("expected a lock, got {other:?}"),
    }
}

#[tokio::test]
async fn test_progressive_lockout_scenario() {
    let ctx = setup().await;
    register(&ctx, "1032456789").await;

    let first = login(&ctx, "1032456789", "wrong").await;
    assert_eq!(
        first,
        LoginOutcome::RejectedBadCredentials {
            attempts_remaining: 2
        }
    );
    assert_eq!(
        first.message(),
        "Invalid document type, document number or password. 2 attempt(s) remaining"
    );
    assert_eq!(first.status_code(), 401);

    let second = login(&ctx, "1032456789", "wrong").await;
    assert_eq!(
        second,
        LoginOutcome::RejectedBadCredentials {
            attempts_remaining: 1
        }
    );

    // Third failure locks for the base duration.
    let first_lock_until = ctx.start + Duration::minutes(60);
    let third = login(&ctx, "1032456789", "wrong").await;
    assert_locked(&third, first_lock_until, 60, 0);
    assert_eq!(third.status_code(), 423);
    assert_eq!(
        third.message(),
        "Account locked. Try again in 60 minutes 0 seconds"
    );

    // The correct password does not get through a lock.
    ctx.clock.advance(Duration::minutes(10));
    let during = login(&ctx, "1032456789", PASSWORD).await;
    assert_locked(&during, first_lock_until, 50, 0);

    ctx.clock.advance(Duration::seconds(29 * 60 + 30));
    let countdown = login(&ctx, "1032456789", "wrong").await;
    assert_locked(&countdown, first_lock_until, 20, 30);

    // Once the lock runs out the counter starts over...
    ctx.clock.set(first_lock_until);
    let after = login(&ctx, "1032456789", "wrong").await;
    assert_eq!(
        after,
        LoginOutcome::RejectedBadCredentials {
            attempts_remaining: 2
        }
    );
    login(&ctx, "1032456789", "wrong").await;

    // ...but the next lock is longer.
    let second_lock_until = first_lock_until + Duration::minutes(90);
    let relock = login(&ctx, "1032456789", "wrong").await;
    assert_locked(&relock, second_lock_until, 90, 0);

    // A successful login clears the escalation.
    ctx.clock.set(second_lock_until);
    let success = login(&ctx, "1032456789", PASSWORD).await;
    assert_eq!(success.kind(), OutcomeKind::Authenticated);
    assert_eq!(success.message(), "Login successful");
    let account = success.into_account().expect("authenticated account");
    assert_eq!(account.document_number, "1032456789");

    let status = ctx
        .narthex
        .lockout_status("CC", "1032456789")
        .await
        .unwrap();
    assert_eq!(status.failed_attempts, 0);
    assert_eq!(status.lock_count, 0);
    assert_eq!(status.locked_until, None);
    assert!(!status.is_locked);

    for _ in 0..2 {
        login(&ctx, "1032456789", "wrong").await;
    }
    let fresh_lock = login(&ctx, "1032456789", "wrong").await;
    assert_locked(
        &fresh_lock,
        second_lock_until + Duration::minutes(60),
        60,
        0,
    );
}

#[tokio::test]
async fn test_lock_status_reports_retry_after() {
    let ctx = setup().await;
    let account = register(&ctx, "52111222").await;

    for _ in 0..3 {
        login(&ctx, "52111222", "wrong").await;
    }
    ctx.clock.advance(Duration::seconds(90));

    let status = ctx.narthex.lockout_status("CC", "52111222").await.unwrap();
    assert_eq!(status.account_id, account.id);
    assert_eq!(status.failed_attempts, 3);
    assert_eq!(status.lock_count, 1);
    assert!(status.is_locked);
    assert_eq!(
        status.locked_until,
        Some(ctx.start + Duration::minutes(60))
    );
    assert_eq!(status.retry_after_seconds, Some(3600 - 90));

    // Reading the status does not touch the record.
    let again = ctx.narthex.lockout_status("CC", "52111222").await.unwrap();
    assert_eq!(again, status);
}

#[tokio::test]
async fn test_unknown_document_looks_like_wrong_password() {
    let ctx = setup().await;
    register(&ctx, "1032456789").await;

    let unknown = login(&ctx, "1032456789999", "whatever").await;
    let wrong = login(&ctx, "1032456789", "whatever").await;

    assert_eq!(unknown, wrong);
    assert_eq!(unknown.message(), wrong.message());

    // Repeated attempts against an unknown document never lock anything.
    for _ in 0..5 {
        let outcome = login(&ctx, "1032456789999", "whatever").await;
        assert_eq!(outcome.kind(), OutcomeKind::BadCredentials);
    }
}

#[tokio::test]
async fn test_document_is_trimmed_on_login() {
    let ctx = setup().await;
    register(&ctx, "1032456789").await;

    let outcome = ctx
        .narthex
        .login("  CC ", " 1032456789  ", PASSWORD)
        .await
        .unwrap();
    assert!(outcome.is_authenticated());
}

#[tokio::test]
async fn test_inactive_profile_is_rejected_after_password_check() {
    let ctx = setup().await;
    let account = register(&ctx, "80222333").await;

    login(&ctx, "80222333", "wrong").await;

    sqlx::query("UPDATE accounts SET profile_active = 0 WHERE id = ?")
        .bind(account.id.as_str())
        .execute(&ctx.pool)
        .await
        .unwrap();

    let outcome = login(&ctx, "80222333", PASSWORD).await;
    assert_eq!(outcome, LoginOutcome::RejectedInactive);
    assert_eq!(outcome.status_code(), 403);
    assert_eq!(
        outcome.message(),
        "Account inactive. Contact the system administrator"
    );

    // The correct password still resets the counter.
    let status = ctx.narthex.lockout_status("CC", "80222333").await.unwrap();
    assert_eq!(status.failed_attempts, 0);

    // A wrong password on an inactive account counts like any other.
    let wrong = login(&ctx, "80222333", "wrong").await;
    assert_eq!(
        wrong,
        LoginOutcome::RejectedBadCredentials {
            attempts_remaining: 2
        }
    );
}

#[tokio::test]
async fn test_admin_unlock() {
    let ctx = setup().await;
    let account = register(&ctx, "1144555666").await;

    for _ in 0..3 {
        login(&ctx, "1144555666", "wrong").await;
    }
    assert_eq!(
        login(&ctx, "1144555666", PASSWORD).await.kind(),
        OutcomeKind::Locked
    );

    assert!(ctx.narthex.unlock_account(&account.id).await.unwrap());
    assert!(login(&ctx, "1144555666", PASSWORD).await.is_authenticated());

    // Nothing left to unlock.
    assert!(!ctx.narthex.unlock_account(&account.id).await.unwrap());

    let missing = ctx
        .narthex
        .unlock_account(&AccountId::new("does-not-exist"))
        .await;
    assert!(matches!(missing, Err(NarthexError::AccountNotFound)));
}

#[tokio::test]
async fn test_registration_rules() {
    let ctx = setup().await;
    let account = register(&ctx, "1032456789").await;

    let fetched = ctx.narthex.get_account(&account.id).await.unwrap();
    assert_eq!(fetched, Some(account));

    let duplicate = NewAccount::builder()
        .document("CC", "1032456789")
        .first_name("Otra")
        .last_name("Persona")
        .build()
        .unwrap();
    let err = ctx
        .narthex
        .register_account(duplicate, PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, NarthexError::AccountAlreadyExists));
    assert_eq!(err.status_code(), 409);

    let weak = NewAccount::builder()
        .document("CC", "99887766")
        .first_name("Mateo")
        .last_name("Gomez")
        .build()
        .unwrap();
    let err = ctx
        .narthex
        .register_account(weak, "password")
        .await
        .unwrap_err();
    assert!(matches!(err, NarthexError::ValidationError(_)));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_missing_fields_are_errors_not_outcomes() {
    let ctx = setup().await;

    let err = ctx.narthex.login("CC", "", PASSWORD).await.unwrap_err();
    assert!(matches!(err, NarthexError::ValidationError(_)));

    let err = ctx.narthex.login("CC", "1032456789", "").await.unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_outcome_serializes_for_api_responses() {
    let ctx = setup().await;
    register(&ctx, "1032456789").await;

    let outcome = login(&ctx, "1032456789", "wrong").await;
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "outcome": "rejected_bad_credentials",
            "attempts_remaining": 2
        })
    );
}

#[tokio::test]
async fn test_security_settings_defaults() {
    let ctx = setup().await;
    let settings = ctx.narthex.security_settings();

    assert_eq!(settings.max_login_attempts, 3);
    assert_eq!(settings.base_lock_duration_minutes, 60);
    assert_eq!(settings.lock_multiplier, 1.5);
    assert_eq!(settings.max_lock_duration_minutes, 480);
    assert_eq!(settings.lock_examples.first_lock, 60);
    assert_eq!(settings.lock_examples.second_lock, 90);
    assert_eq!(settings.lock_examples.third_lock, 135);
    assert_eq!(settings.lock_examples.max_lock, 480);
}
