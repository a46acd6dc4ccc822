use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};

use super::error::ApiError;

/// Basic-auth accounts, username -> password.
#[derive(Clone, Debug, Default)]
pub struct Accounts(HashMap<String, String>);

impl Accounts {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self(users)
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.0
            .get(username)
            .is_some_and(|expected| expected == password)
    }
}

pub async fn basic_auth_middleware(
    Extension(accounts): Extension<Arc<Accounts>>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match credentials {
        Some(TypedHeader(auth)) if accounts.verify(auth.username(), auth.password()) => {
            tracing::Span::current().record("user", auth.username());
            Ok(next.run(request).await)
        }
        _ => {
            tracing::warn!("Rejected request with missing or invalid credentials");
            Err(ApiError::Unauthorized)
        }
    }
}
