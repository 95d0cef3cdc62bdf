//! Session state machine and authorization gate tests.

use std::sync::Arc;

use anyhow::Result;
use tempfile::tempdir;

use wishbot::config::{AllowList, Identity};
use wishbot::session::{Denial, Gate, LoginOutcome, SessionManager};
use wishbot::storage::{JsonStore, Store};

const ALICE: i64 = 111;
const MALLORY: i64 = 999;

fn manager(dir: &tempfile::TempDir) -> Result<SessionManager> {
    let allow_list = AllowList::parse("111 @bob");
    let store = Arc::new(Store::Json(JsonStore::open(
        dir.path().join("wishes.json"),
        &allow_list.numeric_ids(),
    )?));
    Ok(SessionManager::new(allow_list, store))
}

#[tokio::test]
async fn test_login_activates_authorized_user() -> Result<()> {
    let dir = tempdir()?;
    let sessions = manager(&dir)?;
    let alice = Identity::new(ALICE, None);

    assert!(!sessions.store().is_session_active(ALICE).await?);
    assert_eq!(sessions.login(&alice).await?, LoginOutcome::Accepted);
    assert!(sessions.store().is_session_active(ALICE).await?);
    Ok(())
}

#[tokio::test]
async fn test_login_by_handle() -> Result<()> {
    let dir = tempdir()?;
    let sessions = manager(&dir)?;
    // Numeric id unknown, but the handle is on the list.
    let bob = Identity::new(3333, Some("Bob".to_string()));
    assert_eq!(sessions.login(&bob).await?, LoginOutcome::Accepted);
    assert!(sessions.store().is_session_active(3333).await?);
    Ok(())
}

#[tokio::test]
async fn test_login_rejection_reports_attempted_identifiers() -> Result<()> {
    let dir = tempdir()?;
    let sessions = manager(&dir)?;
    let mallory = Identity::new(MALLORY, Some("mallory".to_string()));

    let outcome = sessions.login(&mallory).await?;
    assert_eq!(
        outcome,
        LoginOutcome::Rejected {
            attempted: vec!["999".to_string(), "@mallory".to_string()],
        }
    );
    // The flag is persisted as explicitly inactive, not merely absent.
    assert!(!sessions.store().is_session_active(MALLORY).await?);
    Ok(())
}

#[tokio::test]
async fn test_logout_deactivates() -> Result<()> {
    let dir = tempdir()?;
    let sessions = manager(&dir)?;
    let alice = Identity::new(ALICE, None);

    sessions.login(&alice).await?;
    sessions.logout(ALICE).await?;
    assert!(!sessions.store().is_session_active(ALICE).await?);
    Ok(())
}

#[tokio::test]
async fn test_gate_requires_both_authorization_and_active_flag() -> Result<()> {
    let dir = tempdir()?;
    let sessions = manager(&dir)?;
    let alice = Identity::new(ALICE, None);
    let mallory = Identity::new(MALLORY, None);

    // Authorized but never logged in: the persisted flag gates it.
    assert_eq!(
        sessions.authorize_and_continue(&alice).await?,
        Gate::Denied(Denial::SessionExpired)
    );

    sessions.login(&alice).await?;
    assert_eq!(sessions.authorize_and_continue(&alice).await?, Gate::Allowed);

    // Not on the allow-list at all.
    assert_eq!(
        sessions.authorize_and_continue(&mallory).await?,
        Gate::Denied(Denial::NotAuthorized)
    );
    Ok(())
}

#[tokio::test]
async fn test_gate_sees_flag_flip_immediately() -> Result<()> {
    let dir = tempdir()?;
    let sessions = manager(&dir)?;
    let alice = Identity::new(ALICE, None);

    sessions.login(&alice).await?;
    assert_eq!(sessions.authorize_and_continue(&alice).await?, Gate::Allowed);

    // Some other event turns the session off; the very next gate check
    // must fail closed with no stale-cache window.
    sessions.store().mark_session_inactive(ALICE).await?;
    assert_eq!(
        sessions.authorize_and_continue(&alice).await?,
        Gate::Denied(Denial::SessionExpired)
    );
    Ok(())
}

#[tokio::test]
async fn test_start_sets_flag_by_authorization() -> Result<()> {
    let dir = tempdir()?;
    let sessions = manager(&dir)?;

    assert!(sessions.start(&Identity::new(ALICE, None)).await?);
    assert!(sessions.store().is_session_active(ALICE).await?);

    assert!(!sessions.start(&Identity::new(MALLORY, None)).await?);
    assert!(!sessions.store().is_session_active(MALLORY).await?);
    Ok(())
}
