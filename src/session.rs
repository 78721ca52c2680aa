//! Session state machine.
//!
//! Registration writes the profile record *after* the auth backend reports
//! the new account as signed in, so the raw auth event stream briefly claims
//! a signed-in user whose profile does not exist yet. The controller makes
//! that window an explicit state: auth events are ignored while
//! `Registering`, and registration itself decides the next state when it
//! completes or fails.

use log::debug;
use thiserror::Error;

use crate::model::UserId;

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    SignedOut,
    /// An account is being created; auth events are suppressed until the
    /// registration settles.
    Registering,
    SignedIn {
        user_id: UserId,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("registration can only start from the signed-out state")]
    NotSignedOut,
    #[error("no registration is in progress")]
    NotRegistering,
}

/// Tracks one client's session across auth events and registration.
#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Feed one event from the auth backend's state stream: `Some` when it
    /// reports a signed-in user, `None` when it reports signed out.
    ///
    /// While a registration is in progress the event is dropped; the
    /// registration outcome, not the backend stream, decides the next state.
    pub fn auth_event(&mut self, user_id: Option<UserId>) {
        if self.state == SessionState::Registering {
            debug!("auth event ignored during registration");
            return;
        }
        self.state = match user_id {
            Some(user_id) => SessionState::SignedIn { user_id },
            None => SessionState::SignedOut,
        };
    }

    /// Enter the registration window. Only valid while signed out.
    pub fn begin_registration(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::SignedOut {
            return Err(SessionError::NotSignedOut);
        }
        self.state = SessionState::Registering;
        Ok(())
    }

    /// Registration finished: the profile record exists and `user_id` is the
    /// session's user.
    pub fn complete_registration(&mut self, user_id: UserId) -> Result<(), SessionError> {
        if self.state != SessionState::Registering {
            return Err(SessionError::NotRegistering);
        }
        self.state = SessionState::SignedIn { user_id };
        Ok(())
    }

    /// Registration failed partway; the session settles back to signed out.
    pub fn fail_registration(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Registering {
            return Err(SessionError::NotRegistering);
        }
        self.state = SessionState::SignedOut;
        Ok(())
    }
}
