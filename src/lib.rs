// DriveHub API client
// Session lifecycle, token refresh and role-gated navigation for the
// DriveHub driving school platform

pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod navigator;
pub mod http;
pub mod session;
pub mod guard;
pub mod validate;

pub use config::{ClientConfig, Environment};
pub use error::ApiError;
pub use guard::{GuardDecision, RoleGuard};
pub use http::{ApiClient, ApiRequest};
pub use models::{Role, Session, UserSummary};
pub use navigator::{MemoryNavigator, Navigator};
pub use session::SessionManager;
pub use store::{MemoryStore, SessionStore, SqliteStore, StoreKey};
