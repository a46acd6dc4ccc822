//! Alert persistence.
//!
//! [`AlertStore`] is the capability set the HTTP layer consumes. The
//! production implementation is [`DatabaseAlertStore`]; tests substitute
//! their own doubles behind the same trait object.
//!
//! Every mutating call runs in exactly one transaction of its own. All calls
//! are plain futures: dropping one mid-flight (request deadline, client
//! disconnect) rolls back any open transaction and hands the pooled
//! connection back.

mod database;

pub use database::DatabaseAlertStore;

use async_trait::async_trait;

use crate::entities::alert;
use crate::error::AlertResult;
use crate::identifier::ExternalId;

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Inserts a new alert with a freshly generated external id.
    /// `message` is assumed to be validated by the caller.
    async fn create(&self, message: String) -> AlertResult<alert::Model>;

    async fn get_by_external_id(&self, id: ExternalId) -> AlertResult<alert::Model>;

    /// Replaces the message and bumps `updated_at`. Fails with `NotFound` if the
    /// row is absent, including when it disappears between lookup and write.
    async fn update_by_external_id(
        &self,
        id: ExternalId,
        message: String,
    ) -> AlertResult<alert::Model>;

    /// Physically removes the row. A repeated delete fails with `NotFound`.
    async fn delete_by_external_id(&self, id: ExternalId) -> AlertResult<()>;

    async fn count(&self) -> AlertResult<u64>;
}
