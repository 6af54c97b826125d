use crate::error::ApiError;
use crate::http::ApiClient;
use crate::model::{AuthResponse, IdentityLogin, PasswordLogin};

/// Token issuing endpoints.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `POST /auth/login/` with email + password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = PasswordLogin { email: email.to_string(), password: password.to_string() };
        self.client.post("/auth/login/", &body, None).await
    }

    /// `POST /auth/google/`: exchange an identity assertion for a token.
    pub async fn identity_login(&self, login: &IdentityLogin) -> Result<AuthResponse, ApiError> {
        self.client.post("/auth/google/", login, None).await
    }
}
