// common/src/router.rs
//! Role-gated routing.
//!
//! [`AuthState`] is recomputed from the persisted session on every protected
//! load; nothing here is cached between requests.

use crate::models::{Role, UserSession};

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const ROLE_SELECTION_PATH: &str = "/role-selection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    AuthenticatedNoRole,
    AuthenticatedWithRole(Role),
}

#[derive(Debug, Clone, Copy)]
pub enum AuthEvent<'a> {
    /// Login or registration finished; carries the session's role, if any
    LoggedIn(Option<Role>),
    RoleAssigned(Role),
    LoggedOut,
    /// App load: whatever the store currently holds
    Rehydrated(Option<&'a UserSession>),
}

/// A navigation target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    RoleSelection,
    Dashboard(Role),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Register => REGISTER_PATH,
            Route::RoleSelection => ROLE_SELECTION_PATH,
            Route::Dashboard(role) => role.dashboard_path(),
        }
    }
}

impl AuthState {
    pub fn from_session(session: Option<&UserSession>) -> Self {
        match session {
            Some(s) if s.is_authenticated => match s.role {
                Some(role) => AuthState::AuthenticatedWithRole(role),
                None => AuthState::AuthenticatedNoRole,
            },
            _ => AuthState::Unauthenticated,
        }
    }

    /// Next state. Events that don't apply to the current state leave it as is.
    pub fn apply(self, event: AuthEvent<'_>) -> Self {
        match (self, event) {
            (_, AuthEvent::LoggedIn(Some(role))) => AuthState::AuthenticatedWithRole(role),
            (_, AuthEvent::LoggedIn(None)) => AuthState::AuthenticatedNoRole,
            (AuthState::Unauthenticated, AuthEvent::RoleAssigned(_)) => self,
            (_, AuthEvent::RoleAssigned(role)) => AuthState::AuthenticatedWithRole(role),
            (_, AuthEvent::LoggedOut) => AuthState::Unauthenticated,
            (_, AuthEvent::Rehydrated(session)) => AuthState::from_session(session),
        }
    }

    pub fn target(&self) -> Route {
        match self {
            AuthState::Unauthenticated => Route::Login,
            AuthState::AuthenticatedNoRole => Route::RoleSelection,
            AuthState::AuthenticatedWithRole(role) => Route::Dashboard(*role),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, AuthState::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileExtension;

    fn session(role: Option<Role>) -> UserSession {
        UserSession::open(
            "s".into(),
            "0xabc".into(),
            "W".into(),
            ProfileExtension { role, ..Default::default() },
        )
    }

    #[test]
    fn test_login_then_role_then_logout() {
        let state = AuthState::default().apply(AuthEvent::LoggedIn(None));
        assert_eq!(state, AuthState::AuthenticatedNoRole);
        assert_eq!(state.target(), Route::RoleSelection);

        let state = state.apply(AuthEvent::RoleAssigned(Role::Customer));
        assert_eq!(state.target().path(), "/customer");

        let state = state.apply(AuthEvent::LoggedOut);
        assert_eq!(state, AuthState::Unauthenticated);
        assert_eq!(state.target().path(), "/login");
    }

    #[test]
    fn test_role_assignment_needs_a_login() {
        let state = AuthState::Unauthenticated.apply(AuthEvent::RoleAssigned(Role::Vendor));
        assert_eq!(state, AuthState::Unauthenticated);
    }

    #[test]
    fn test_reassignment_moves_to_new_role() {
        let state = AuthState::AuthenticatedWithRole(Role::Vendor).apply(AuthEvent::RoleAssigned(Role::Supplier));
        assert_eq!(state, AuthState::AuthenticatedWithRole(Role::Supplier));
    }

    #[test]
    fn test_rehydration() {
        let with_role = session(Some(Role::BlockchainExpert));
        let state = AuthState::Unauthenticated.apply(AuthEvent::Rehydrated(Some(&with_role)));
        assert_eq!(state.target().path(), "/blockchain-expert");

        let no_role = session(None);
        assert_eq!(AuthState::from_session(Some(&no_role)), AuthState::AuthenticatedNoRole);

        let mut stale = session(Some(Role::Vendor));
        stale.is_authenticated = false;
        assert_eq!(AuthState::from_session(Some(&stale)), AuthState::Unauthenticated);

        let state = AuthState::AuthenticatedWithRole(Role::Vendor).apply(AuthEvent::Rehydrated(None));
        assert_eq!(state, AuthState::Unauthenticated);
    }

    #[test]
    fn test_every_role_routes_to_its_dashboard() {
        for role in Role::ALL {
            let state = AuthState::default().apply(AuthEvent::LoggedIn(Some(role)));
            assert_eq!(state.target().path(), format!("/{}", role));
        }
    }
}
