// Navigation seam
// Stands in for the host application's routing when sessions are forced out

use std::sync::Mutex;

/// Sink for forced navigations.
///
/// When a session terminates (logout, failed refresh) the client redirects to
/// the login route through this trait; the embedding application decides what
/// a route change actually does.
pub trait Navigator: Send + Sync {
    /// Route the application is currently showing.
    fn current_route(&self) -> String;

    /// Forces the application to `route`.
    fn navigate(&self, route: &str);
}

struct NavState {
    route: String,
    history: Vec<String>,
}

/// In-memory navigator that just tracks the current route and every forced
/// navigation. The default when the embedder does not wire its own routing.
pub struct MemoryNavigator {
    state: Mutex<NavState>,
}

impl MemoryNavigator {
    pub fn new(initial_route: &str) -> Self {
        Self {
            state: Mutex::new(NavState {
                route: initial_route.to_string(),
                history: Vec::new(),
            }),
        }
    }

    /// Every route passed to `navigate`, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .history
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_route(&self) -> String {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .route
            .clone()
    }

    fn navigate(&self, route: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!("Navigating from {} to {}", state.route, route);
        state.route = route.to_string();
        state.history.push(route.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_updates_route_and_history() {
        let nav = MemoryNavigator::new("/dashboard");
        assert_eq!(nav.current_route(), "/dashboard");
        assert!(nav.history().is_empty());

        nav.navigate("/login");
        assert_eq!(nav.current_route(), "/login");
        assert_eq!(nav.history(), vec!["/login".to_string()]);
    }

    #[test]
    fn test_default_starts_at_root() {
        let nav = MemoryNavigator::default();
        assert_eq!(nav.current_route(), "/");
    }
}
