use serde::Serialize;
use tracing::{info, warn};

use crate::api::decode;
use crate::error::Result;
use crate::http::ApiClient;
use crate::types::{LoginResponse, User};

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Registration<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
    confirm_password: &'a str,
}

#[derive(Serialize)]
struct ProfileUpdate<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChange<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

/// Typed wrappers around the `/users/*` endpoints.
///
/// Successful login and registration store the returned token in the
/// client's [`TokenStore`](crate::token::TokenStore).
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `POST /users/login`.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let data = self
            .client
            .post("/users/login", &Credentials { email, password })
            .await?;
        let login: LoginResponse = decode(data, "login")?;
        self.save_token(&login)?;
        info!(user = %login.user.id, "logged in");
        Ok(login)
    }

    /// `POST /users/register`.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        confirm_password: &str,
    ) -> Result<LoginResponse> {
        let body = Registration {
            email,
            password,
            name,
            confirm_password,
        };
        let data = self.client.post("/users/register", &body).await?;
        let login: LoginResponse = decode(data, "registration")?;
        self.save_token(&login)?;
        info!(user = %login.user.id, "registered");
        Ok(login)
    }

    /// `GET /users/profile`. Doubles as the session validity check.
    pub async fn profile(&self) -> Result<User> {
        let data = self.client.get("/users/profile").await?;
        decode(data, "profile")
    }

    /// `PUT /users/profile`.
    pub async fn update_profile(&self, name: &str, avatar: Option<&str>) -> Result<User> {
        let data = self
            .client
            .put("/users/profile", &ProfileUpdate { name, avatar })
            .await?;
        decode(data, "profile")
    }

    /// `PUT /users/password`.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        self.client
            .put(
                "/users/password",
                &PasswordChange {
                    old_password,
                    new_password,
                },
            )
            .await?;
        Ok(())
    }

    /// Forget the stored token. Local only, there is no logout endpoint.
    pub fn clear_token(&self) {
        if let Err(e) = self.client.tokens().clear_token() {
            warn!(error = %e, "failed to clear stored token");
        }
    }

    fn save_token(&self, login: &LoginResponse) -> Result<()> {
        if !login.token.is_empty() {
            self.client.tokens().set_token(&login.token)?;
        }
        Ok(())
    }
}
