use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::auth::AuthApi;
use crate::error::Result;
use crate::types::User;

#[derive(Debug, Default)]
struct SessionState {
    user: Option<User>,
    is_loading: bool,
}

/// Who is logged in, on top of [`AuthApi`].
///
/// `user` is only ever set from a response that carried a full user record;
/// any failure leaves the session logged out.
#[derive(Debug)]
pub struct AuthSession {
    api: AuthApi,
    state: Mutex<SessionState>,
}

impl AuthSession {
    pub fn new(api: AuthApi) -> Self {
        Self {
            api,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn api(&self) -> &AuthApi {
        &self.api
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.lock().is_loading = true;
        let result = self.api.login(email, password).await;
        self.finish(result.map(|login| login.user))
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        confirm_password: &str,
    ) -> Result<User> {
        self.lock().is_loading = true;
        let result = self
            .api
            .register(email, password, name, confirm_password)
            .await;
        self.finish(result.map(|login| login.user))
    }

    /// Clear the token and the user.
    pub fn logout(&self) {
        self.api.clear_token();
        self.lock().user = None;
    }

    /// Validate the stored token against `/users/profile`. Any failure
    /// logs the session out; the check itself never errors.
    pub async fn check_auth(&self) -> bool {
        match self.api.profile().await {
            Ok(user) => {
                self.lock().user = Some(user);
                true
            }
            Err(e) => {
                debug!(error = %e, "stored session is not valid");
                self.logout();
                false
            }
        }
    }

    /// Replace the cached user, e.g. after a profile update.
    pub fn set_user(&self, user: User) {
        self.lock().user = Some(user);
    }

    fn finish(&self, result: Result<User>) -> Result<User> {
        let mut state = self.lock();
        state.is_loading = false;
        let user = result?;
        state.user = Some(user.clone());
        Ok(user)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
