use sea_orm::DbErr;
use thiserror::Error;

use crate::identifier::ParseError;

pub type AlertResult<T> = Result<T, AlertError>;

/// Failures surfaced by alert operations.
///
/// `NotFound` and `InvalidId` are the recoverable cases callers are expected to
/// branch on. `Store` covers everything else (connectivity, constraint
/// violations, commit failures) and is not retried here.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert for the given external id not found")]
    NotFound,
    #[error("invalid identifier format: {0}")]
    InvalidId(#[from] ParseError),
    #[error("store error: {0}")]
    Store(#[from] DbErr),
}

impl AlertError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
