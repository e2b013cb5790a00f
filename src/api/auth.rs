use log::{info, warn};
use reqwest::Method;
use serde_json::json;

use super::{send_json, SupportApi};
use crate::error::ApiResult;
use crate::models::{AdminUser, LoginResponse};
use crate::validation::validate_login;

impl SupportApi {
    /// Exchanges admin credentials for a bearer token and keeps it on the client.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        validate_login(email, password)?;

        let request = self
            .public(Method::POST, "/auth/login")
            .json(&json!({ "email": email.trim(), "password": password }));

        match send_json::<LoginResponse>(request).await {
            Ok(login) => {
                self.set_token(Some(login.access_token.clone()));
                info!("Logged in as {}", login.user.email);
                Ok(login)
            }
            Err(e) => {
                warn!("Login failed for {}: {}", email, e);
                Err(e)
            }
        }
    }

    /// Resolves the token to its user; used to check a stored token on startup.
    pub async fn current_user(&self) -> ApiResult<AdminUser> {
        send_json(self.authed(Method::GET, "/auth/me")?).await
    }

    pub fn logout(&self) {
        self.set_token(None);
    }
}
