//! Tab-lifetime session state and the gate in front of protected views.
//!
//! - `SessionContext`: owns the restoration state machine and exposes
//!   `{user, is_authenticated, is_loading, login, logout}` to the application
//! - `AccessGate`: decides between loading, redirect to login, or rendering

pub mod context;
pub mod gate;

pub use context::{Navigation, SessionContext, SessionState, SessionStatus};
pub use gate::{AccessGate, GateDecision, HOME_PATH, LOGIN_PATH};
