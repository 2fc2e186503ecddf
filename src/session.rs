// Session manager
// Owns login, logout, startup bootstrap and the password flows, plus the
// authentication state the rest of the application reads

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{ApiClient, ApiRequest};
use crate::models::{
    MessageResponse, PasswordChangeRequest, PasswordResetConfirm, PasswordResetRequest, Session,
    TokenPair, UserSummary,
};
use crate::navigator::Navigator;
use crate::store::{self, SessionStore, SqliteStore, StoreKey};

/// Authentication context of the client.
///
/// Holds the API client, the persisted session fields and a cached copy of
/// the signed-in user's profile. Thread-safe; share it behind an `Arc`.
pub struct SessionManager {
    client: ApiClient,

    /// Persisted session fields, shared with the API client
    store: Arc<dyn SessionStore>,

    /// Cached profile of the signed-in user
    user: Arc<RwLock<Option<UserSummary>>>,

    /// True until `bootstrap` has resolved
    loading: AtomicBool,
}

impl SessionManager {
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let client = ApiClient::new(config, Arc::clone(&store), navigator)?;
        Ok(Self {
            client,
            store,
            user: Arc::new(RwLock::new(None)),
            loading: AtomicBool::new(true),
        })
    }

    /// Manager with the default SQLite-backed storage at
    /// `config.session_file`.
    pub fn with_default_store(
        config: ClientConfig,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let store = SqliteStore::open(&config.session_file)?;
        Self::new(config, Arc::new(store), navigator)
    }

    /// The underlying API client, for request types beyond the auth surface.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Sign in with email and password.
    ///
    /// Credentials go out form-encoded: the server implements the OAuth2
    /// password flow, not a JSON login. On success the tokens are persisted
    /// and the profile is fetched and cached. On any failure no partial
    /// state survives; a profile fetch failure rolls the tokens back.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserSummary> {
        let request =
            ApiRequest::post("/auth/login").with_form(&[("username", email), ("password", password)]);
        let tokens: TokenPair = self.client.send_json(request).await?;

        self.store.set(StoreKey::AccessToken, &tokens.access_token)?;
        if let Some(refresh) = &tokens.refresh_token {
            self.store.set(StoreKey::RefreshToken, refresh)?;
        }

        let user = match self.fetch_profile().await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, "Profile fetch after login failed, rolling back");
                self.clear_local_session().await;
                return Err(err);
            }
        };

        tracing::info!(role = %user.role, "Login successful");
        Ok(user)
    }

    /// Sign out.
    ///
    /// The server call is best-effort; a dead network must never trap the
    /// user in a session. Local state is always cleared.
    pub async fn logout(&self) {
        if let Err(err) = self.client.send(ApiRequest::post("/auth/logout")).await {
            tracing::warn!(error = %err, "Server logout failed, clearing local session anyway");
        }

        self.clear_local_session().await;
        tracing::info!("Logged out");
    }

    /// Restore the session at startup.
    ///
    /// A stored token is validated by fetching the profile. A missing or
    /// rejected token silently resolves to signed-out; startup is never an
    /// error. Returns whether a session is active. `is_loading` reports
    /// true until this completes.
    pub async fn bootstrap(&self) -> bool {
        let authenticated = self.try_restore().await;
        self.loading.store(false, Ordering::SeqCst);
        authenticated
    }

    async fn try_restore(&self) -> bool {
        match self.store.get(StoreKey::AccessToken) {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::debug!("No stored session");
                return false;
            }
            Err(err) => {
                tracing::warn!("Failed to read stored session: {:?}", err);
                return false;
            }
        }

        match self.fetch_profile().await {
            Ok(user) => {
                tracing::info!(role = %user.role, "Session restored");
                true
            }
            Err(err) => {
                // An expired session at startup means signed out, not an error.
                tracing::debug!(error = %err, "Stored session is no longer valid");
                self.clear_local_session().await;
                false
            }
        }
    }

    /// Change the signed-in user's password.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<String> {
        let request = ApiRequest::post("/auth/change-password").with_json(&PasswordChangeRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        })?;
        let response: MessageResponse = self.client.send_json(request).await?;
        Ok(response.message)
    }

    /// Request a password reset email.
    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        let request = ApiRequest::post("/auth/forgot-password").with_json(&PasswordResetRequest {
            email: email.to_string(),
        })?;
        let response: MessageResponse = self.client.send_json(request).await?;
        Ok(response.message)
    }

    /// Set a new password using a token from the reset email.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<String> {
        let request = ApiRequest::post("/auth/reset-password").with_json(&PasswordResetConfirm {
            token: token.to_string(),
            new_password: new_password.to_string(),
        })?;
        let response: MessageResponse = self.client.send_json(request).await?;
        Ok(response.message)
    }

    /// True while the startup bootstrap has not resolved yet.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// A session counts as authenticated when both a stored access token and
    /// a cached profile are present.
    pub async fn is_authenticated(&self) -> bool {
        let has_token = matches!(self.store.get(StoreKey::AccessToken), Ok(Some(_)));
        has_token && self.user.read().await.is_some()
    }

    /// Cached profile of the signed-in user.
    pub async fn current_user(&self) -> Option<UserSummary> {
        self.user.read().await.clone()
    }

    /// The persisted session, if any. The cached user is parsed leniently;
    /// an unreadable profile yields a session without one.
    pub fn current_session(&self) -> Result<Option<Session>> {
        let access_token = match self.store.get(StoreKey::AccessToken)? {
            Some(token) => token,
            None => return Ok(None),
        };
        let refresh_token = self.store.get(StoreKey::RefreshToken)?;
        let user = store::load_cached_user(self.store.as_ref());
        Ok(Some(Session {
            access_token,
            refresh_token,
            user,
        }))
    }

    /// Fetch `GET /users/me`, persist the profile and cache it.
    async fn fetch_profile(&self) -> Result<UserSummary> {
        let user: UserSummary = self.client.send_json(ApiRequest::get("/users/me")).await?;

        let serialized =
            serde_json::to_string(&user).context("Failed to serialize user profile")?;
        self.store.set(StoreKey::User, &serialized)?;
        *self.user.write().await = Some(user.clone());
        Ok(user)
    }

    async fn clear_local_session(&self) {
        if let Err(err) = self.store.clear() {
            tracing::error!("Failed to clear session storage: {:?}", err);
        }
        *self.user.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::navigator::MemoryNavigator;
    use crate::store::MemoryStore;

    // Base URL pointing at a closed port; these tests never reach the network.
    fn offline_manager(store: Arc<MemoryStore>) -> SessionManager {
        let mut config = ClientConfig::for_base_url("http://127.0.0.1:9/api/v1");
        config.retry_delay_ms = 1;
        SessionManager::new(config, store, Arc::new(MemoryNavigator::default())).unwrap()
    }

    #[tokio::test]
    async fn test_loading_until_bootstrap_resolves() {
        let manager = offline_manager(Arc::new(MemoryStore::new()));
        assert!(manager.is_loading());

        // Empty store: bootstrap resolves without touching the network.
        let authenticated = manager.bootstrap().await;
        assert!(!authenticated);
        assert!(!manager.is_loading());
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_authenticated_needs_token_and_cached_user() {
        let store = Arc::new(MemoryStore::new());
        let manager = offline_manager(Arc::clone(&store));

        assert!(!manager.is_authenticated().await);

        // A token alone is not enough; the profile cache must be populated.
        store.set(StoreKey::AccessToken, "at-1").unwrap();
        assert!(!manager.is_authenticated().await);

        *manager.user.write().await = Some(UserSummary {
            id: uuid::Uuid::new_v4(),
            email: None,
            full_name: None,
            role: Role::Student,
            is_active: true,
            created_at: None,
            updated_at: None,
        });
        assert!(manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_current_session_assembled_from_store() {
        let store = Arc::new(MemoryStore::new());
        let manager = offline_manager(Arc::clone(&store));

        assert!(manager.current_session().unwrap().is_none());

        store.set(StoreKey::AccessToken, "at-1").unwrap();
        store.set(StoreKey::RefreshToken, "rt-1").unwrap();
        store
            .set(
                StoreKey::User,
                r#"{"id": "4a6ef6ff-6f52-45aa-9a3a-2a9e8478c086", "role": "manager"}"#,
            )
            .unwrap();

        let session = manager.current_session().unwrap().unwrap();
        assert_eq!(session.access_token, "at-1");
        assert_eq!(session.refresh_token.as_deref(), Some("rt-1"));
        assert_eq!(session.user.unwrap().role, Role::Manager);
    }

    #[tokio::test]
    async fn test_current_session_tolerates_broken_user_cache() {
        let store = Arc::new(MemoryStore::new());
        let manager = offline_manager(Arc::clone(&store));

        store.set(StoreKey::AccessToken, "at-1").unwrap();
        store.set(StoreKey::User, "{ broken").unwrap();

        let session = manager.current_session().unwrap().unwrap();
        assert_eq!(session.access_token, "at-1");
        assert!(session.user.is_none());
    }
}
