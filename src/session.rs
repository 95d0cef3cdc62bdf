//! Session state machine and authorization gate.
//!
//! Each user is either ACTIVE or LOGGED_OUT, and that flag is persisted by
//! the store; it is deliberately not the same thing as the in-memory
//! conversational cursor. Every privileged handler funnels through
//! [`SessionManager::authorize_and_continue`]; when the persisted flag and
//! the in-memory state disagree, the persisted flag wins and the gate
//! fails closed.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::{AllowList, Identity};
use crate::storage::Store;

/// Why the gate refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Identity is not in the allow-list. Not an error, a normal outcome.
    NotAuthorized,
    /// Authorized identity but the persisted session flag is off.
    SessionExpired,
}

impl Denial {
    pub fn user_message(&self) -> &'static str {
        match self {
            Denial::NotAuthorized => {
                "You do not have access to this bot. \
                 Ask the administrator to add your identifier."
            }
            Denial::SessionExpired => "Your session is not active. Use /login to continue.",
        }
    }
}

/// Gate verdict for one inbound privileged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Allowed,
    Denied(Denial),
}

/// Result of a /login attempt. On rejection the attempted identifiers are
/// reported back so the user can relay them to the administrator.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Accepted,
    Rejected { attempted: Vec<String> },
}

pub struct SessionManager {
    allow_list: AllowList,
    store: Arc<Store>,
}

impl SessionManager {
    pub fn new(allow_list: AllowList, store: Arc<Store>) -> Self {
        Self { allow_list, store }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// `login`: authorized identities become ACTIVE; everyone else is
    /// explicitly persisted as inactive, not merely left absent.
    pub async fn login(&self, identity: &Identity) -> Result<LoginOutcome> {
        if let Some(matched) = self.allow_list.matched_identifier(identity) {
            self.store.mark_session_active(identity.user_id).await?;
            info!(user_id = identity.user_id, identifier = %matched, "Login accepted");
            return Ok(LoginOutcome::Accepted);
        }

        self.store.mark_session_inactive(identity.user_id).await?;
        info!(user_id = identity.user_id, "Login rejected");
        Ok(LoginOutcome::Rejected {
            attempted: identity.candidates(),
        })
    }

    pub async fn logout(&self, user_id: i64) -> Result<()> {
        self.store.mark_session_inactive(user_id).await?;
        info!(user_id, "Logged out");
        Ok(())
    }

    /// First contact / restart. Returns whether the identity is
    /// authorized; the caller also clears any in-flight conversation.
    pub async fn start(&self, identity: &Identity) -> Result<bool> {
        let authorized = self.allow_list.is_authorized(identity);
        if authorized {
            self.store.mark_session_active(identity.user_id).await?;
        } else {
            self.store.mark_session_inactive(identity.user_id).await?;
        }
        Ok(authorized)
    }

    /// The gate in front of every privileged operation: allow-list
    /// membership AND the persisted active flag. The persisted flag is
    /// authoritative; a stale in-memory cursor never opens the gate.
    pub async fn authorize_and_continue(&self, identity: &Identity) -> Result<Gate> {
        if !self.allow_list.is_authorized(identity) {
            self.store.mark_session_inactive(identity.user_id).await?;
            debug!(user_id = identity.user_id, "Gate: not authorized");
            return Ok(Gate::Denied(Denial::NotAuthorized));
        }
        if !self.store.is_session_active(identity.user_id).await? {
            debug!(user_id = identity.user_id, "Gate: session inactive");
            return Ok(Gate::Denied(Denial::SessionExpired));
        }
        Ok(Gate::Allowed)
    }
}
