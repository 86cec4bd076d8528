//! Access gate for protected views.
//!
//! The gate holds no state of its own: every decision is a projection of the
//! current `SessionContext`.

use super::context::{Navigation, SessionContext, SessionState};

/// Public login view
pub const LOGIN_PATH: &str = "/login";

/// Dashboard landing view
pub const HOME_PATH: &str = "/";

/// Paths reachable without a session
const PUBLIC_PATHS: &[&str] = &[LOGIN_PATH];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision<V> {
    /// Restoration still running: show a neutral placeholder only
    Loading,
    /// No session: go to the login view, replacing history
    Redirect(Navigation),
    Render(V),
}

impl<V> GateDecision<V> {
    pub fn is_render(&self) -> bool {
        matches!(self, GateDecision::Render(_))
    }
}

pub struct AccessGate;

impl AccessGate {
    /// Pure decision from a state snapshot and the authenticated check.
    pub fn decide<V>(state: &SessionState, authenticated: bool, view: V) -> GateDecision<V> {
        if state.is_loading {
            GateDecision::Loading
        } else if authenticated {
            GateDecision::Render(view)
        } else {
            GateDecision::Redirect(Navigation::to_login())
        }
    }

    /// Wrap a protected view.
    pub fn guard<V>(session: &SessionContext, view: V) -> GateDecision<V> {
        Self::decide(&session.state(), session.is_authenticated(), view)
    }

    pub fn is_public(path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
        PUBLIC_PATHS.contains(&path)
    }

    /// Route table: public paths render directly, everything else goes
    /// through the gate.
    pub fn route<V>(session: &SessionContext, path: &str, view: V) -> GateDecision<V> {
        if Self::is_public(path) {
            GateDecision::Render(view)
        } else {
            Self::guard(session, view)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::api::SessionClient;
    use crate::auth::{CredentialStore, MemoryStorage};
    use crate::models::UserProfile;

    fn user() -> UserProfile {
        serde_json::from_value(serde_json::json!({"id": "1", "email": "a@b.com"})).unwrap()
    }

    fn context(seed: bool) -> SessionContext {
        let store = Arc::new(CredentialStore::new(Arc::new(MemoryStorage::new())));
        if seed {
            store.save_session("t1", &user()).unwrap();
        }
        let client = SessionClient::new("http://127.0.0.1:1/login", Duration::from_secs(1), store).unwrap();
        SessionContext::new(client).0
    }

    #[test]
    fn test_loading_while_initializing() {
        let ctx = context(true);
        assert_eq!(AccessGate::guard(&ctx, "dashboard"), GateDecision::Loading);
    }

    #[test]
    fn test_redirects_when_unauthenticated() {
        let ctx = context(false);
        ctx.restore();

        let decision = AccessGate::guard(&ctx, "dashboard");
        assert_eq!(
            decision,
            GateDecision::Redirect(Navigation {
                path: "/login".to_string(),
                replace: true,
            })
        );
    }

    #[test]
    fn test_renders_when_authenticated() {
        let ctx = context(true);
        ctx.restore();
        assert_eq!(AccessGate::guard(&ctx, "dashboard"), GateDecision::Render("dashboard"));
    }

    #[test]
    fn test_redirects_after_logout() {
        let ctx = context(true);
        ctx.restore();
        ctx.logout().unwrap();
        assert!(matches!(AccessGate::guard(&ctx, "dashboard"), GateDecision::Redirect(_)));
    }

    #[test]
    fn test_decide_is_pure() {
        let ctx = context(false);
        let loading = ctx.state();
        assert_eq!(AccessGate::decide(&loading, true, 1), GateDecision::Loading);

        ctx.restore();
        let settled = ctx.state();
        assert_eq!(AccessGate::decide(&settled, true, 1), GateDecision::Render(1));
        assert!(!AccessGate::decide(&settled, false, 1).is_render());
    }

    #[test]
    fn test_is_public() {
        assert!(AccessGate::is_public("/login"));
        assert!(AccessGate::is_public("/login/"));
        assert!(AccessGate::is_public("/login?next=/reports"));
        assert!(!AccessGate::is_public("/"));
        assert!(!AccessGate::is_public("/reports"));
        assert!(!AccessGate::is_public("/login-help"));
    }

    #[test]
    fn test_route_login_is_public_even_while_loading() {
        let ctx = context(false);
        assert_eq!(AccessGate::route(&ctx, "/login", "login"), GateDecision::Render("login"));
        assert_eq!(AccessGate::route(&ctx, "/reports", "reports"), GateDecision::Loading);

        ctx.restore();
        assert!(matches!(AccessGate::route(&ctx, HOME_PATH, "home"), GateDecision::Redirect(_)));
    }
}
