use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::auth::session::SessionSnapshot;

/// Symbolic navigation targets. Guard logic never deals in path strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    About,
    Login,
    Register,
    Notes,
    Profile,
}

/// Who may enter a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Anyone
    Public,
    /// Signed-in users only
    RequiresAuth,
    /// Signed-out users only (login/registration views)
    GuestOnly,
}

impl Route {
    /// Every route, in navbar order
    pub const ALL: [Route; 6] = [
        Route::Home,
        Route::Notes,
        Route::About,
        Route::Profile,
        Route::Login,
        Route::Register,
    ];

    /// URL path for this route
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::About => "/about",
            Route::Login => "/auth",
            Route::Register => "/register",
            Route::Notes => "/notes",
            Route::Profile => "/profile",
        }
    }

    /// Access policy for this route
    pub fn policy(self) -> AccessPolicy {
        match self {
            Route::Home | Route::About => AccessPolicy::Public,
            Route::Login | Route::Register => AccessPolicy::GuestOnly,
            Route::Notes | Route::Profile => AccessPolicy::RequiresAuth,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Home => "home",
            Route::About => "about",
            Route::Login => "login",
            Route::Register => "register",
            Route::Notes => "notes",
            Route::Profile => "profile",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Route {
    type Err = String;

    /// Accepts the route name or its path
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" | "/" => Ok(Route::Home),
            "about" | "/about" => Ok(Route::About),
            "login" | "auth" | "/auth" => Ok(Route::Login),
            "register" | "/register" => Ok(Route::Register),
            "notes" | "/notes" => Ok(Route::Notes),
            "profile" | "/profile" => Ok(Route::Profile),
            other => Err(format!("unknown route: {other}")),
        }
    }
}

/// What a guard decided about entering a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Enter the route
    Allow,
    /// Do not enter; go here instead
    Redirect(Route),
}

impl GuardOutcome {
    pub fn is_allowed(self) -> bool {
        matches!(self, GuardOutcome::Allow)
    }
}

/// Gate for routes that need a signed-in user.
///
/// While the session is still loading the decision is deferred to the view,
/// which reacts once loading completes.
pub fn require_auth(session: &SessionSnapshot) -> GuardOutcome {
    if session.is_loading {
        return GuardOutcome::Allow;
    }
    if !session.is_authenticated {
        return GuardOutcome::Redirect(Route::Login);
    }
    GuardOutcome::Allow
}

/// Gate for routes that only make sense signed out
pub fn require_guest(session: &SessionSnapshot) -> GuardOutcome {
    if session.is_loading {
        return GuardOutcome::Allow;
    }
    if session.is_authenticated {
        return GuardOutcome::Redirect(Route::Home);
    }
    GuardOutcome::Allow
}

/// Apply a route's access policy to the current session
pub fn check_route(route: Route, session: &SessionSnapshot) -> GuardOutcome {
    match route.policy() {
        AccessPolicy::Public => GuardOutcome::Allow,
        AccessPolicy::RequiresAuth => require_auth(session),
        AccessPolicy::GuestOnly => require_guest(session),
    }
}
