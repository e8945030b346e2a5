use serde::{Deserialize, Serialize};

/// Account record returned by the service. An immutable snapshot: it is
/// replaced wholesale on login and profile refresh, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// States of the client-side session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionState {
    /// Nobody has run the initialize pass yet
    Uninitialized,

    /// The initialize pass is restoring the session from storage
    Initializing,

    /// A token is persisted and the user record is in memory
    Authenticated { user: User },

    /// No valid session
    Unauthenticated,
}

impl SessionState {
    /// The signed-in user, when there is one
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated { user } => Some(user),
            _ => None,
        }
    }

    /// Whether a user is signed in
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Whether the session has not yet reached a terminal state. Guards
    /// defer their decision while this is true.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Uninitialized | Self::Initializing)
    }
}

/// Immutable copy of the session fields, taken synchronously
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_initialized: bool,
}

/// Domain events emitted by the session store. The shell interprets these
/// into notifications and navigation; the store itself never navigates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    /// A login or registration completed
    LoggedIn { user: User },

    /// The user signed out; the shell should navigate to the login route
    LoggedOut,

    /// A persisted session was rejected during initialize and has been cleared
    Expired { reason: String },
}

impl SessionEvent {
    /// Get a string representation of the event type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LoggedIn { .. } => "logged_in",
            Self::LoggedOut => "logged_out",
            Self::Expired { .. } => "expired",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> User {
        User {
            id: 1,
            username: "ann".to_string(),
            email: "ann@x.com".to_string(),
        }
    }

    #[test]
    fn loading_covers_both_pre_terminal_states() {
        assert!(SessionState::Uninitialized.is_loading());
        assert!(SessionState::Initializing.is_loading());
        assert!(!SessionState::Unauthenticated.is_loading());
        assert!(!SessionState::Authenticated { user: ann() }.is_loading());
    }

    #[test]
    fn only_authenticated_has_a_user() {
        assert_eq!(SessionState::Authenticated { user: ann() }.user(), Some(&ann()));
        assert_eq!(SessionState::Unauthenticated.user(), None);
        assert!(SessionState::Authenticated { user: ann() }.is_authenticated());
        assert!(!SessionState::Initializing.is_authenticated());
    }

    #[test]
    fn event_kinds() {
        assert_eq!(SessionEvent::LoggedIn { user: ann() }.kind(), "logged_in");
        assert_eq!(SessionEvent::LoggedOut.kind(), "logged_out");
    }
}
