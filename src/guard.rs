// Role-based route guard
// Allow-list decision for gating navigation subtrees by user role

use std::collections::HashSet;

use crate::config::{DEFAULT_FALLBACK_ROUTE, DEFAULT_LOGIN_ROUTE};
use crate::error::Result;
use crate::models::{Role, UserSummary};
use crate::session::SessionManager;

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Authentication state is still being restored; render a neutral
    /// loading state instead of deciding.
    Loading,

    /// The user may see the guarded content.
    Allow,

    /// Send the user to this route instead.
    Redirect(String),
}

/// Allow-list guard for a navigation subtree.
///
/// An unauthenticated user is sent to the login route; an authenticated user
/// whose role is not in the allow-list is sent to the fallback route.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: HashSet<Role>,
    login_route: String,
    fallback_route: String,
}

impl RoleGuard {
    /// Guard allowing the given roles, with the default routes.
    pub fn new<I: IntoIterator<Item = Role>>(allowed: I) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            fallback_route: DEFAULT_FALLBACK_ROUTE.to_string(),
        }
    }

    /// Parse an allow-list of role names. Case does not matter; `"Admin"`
    /// and `"admin"` build the same guard.
    pub fn from_names<'a, I: IntoIterator<Item = &'a str>>(names: I) -> Result<Self> {
        let allowed = names
            .into_iter()
            .map(|name| name.parse::<Role>())
            .collect::<Result<HashSet<Role>>>()?;
        Ok(Self::new(allowed))
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn with_fallback_route(mut self, route: impl Into<String>) -> Self {
        self.fallback_route = route.into();
        self
    }

    /// Decide for a user snapshot. Pure; `evaluate` is the wired form.
    pub fn check(&self, user: Option<&UserSummary>, loading: bool) -> GuardDecision {
        if loading {
            return GuardDecision::Loading;
        }

        let user = match user {
            Some(user) => user,
            None => return GuardDecision::Redirect(self.login_route.clone()),
        };

        if self.allowed.contains(&user.role) {
            GuardDecision::Allow
        } else {
            tracing::debug!(role = %user.role, "Role not in allow-list, redirecting");
            GuardDecision::Redirect(self.fallback_route.clone())
        }
    }

    /// Decide against the live session state.
    pub async fn evaluate(&self, session: &SessionManager) -> GuardDecision {
        if session.is_loading() {
            return GuardDecision::Loading;
        }
        if !session.is_authenticated().await {
            return GuardDecision::Redirect(self.login_route.clone());
        }
        let user = session.current_user().await;
        self.check(user.as_ref(), false)
    }
}
