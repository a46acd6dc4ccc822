use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{error, info, warn};

use super::AlertStore;
use crate::entities::{alert, Alert};
use crate::error::{AlertError, AlertResult};
use crate::identifier::ExternalId;
use crate::metrics;

/// sea-orm backed store. Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct DatabaseAlertStore {
    db: DatabaseConnection,
}

impl DatabaseAlertStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Maps an external id to the internal row key, or `NotFound`.
    ///
    /// Runs outside any write transaction, so the row may vanish before the
    /// caller uses the key; writers must check their affected-row count.
    pub async fn resolve_internal_id(&self, id: ExternalId) -> AlertResult<i32> {
        Alert::find()
            .select_only()
            .column(alert::Column::Id)
            .filter(alert::Column::ExternalId.eq(id.as_uuid()))
            .into_tuple::<i32>()
            .one(&self.db)
            .await?
            .ok_or(AlertError::NotFound)
    }

    // An uncommitted `DatabaseTransaction` rolls back when dropped, so every
    // early return below (including `?` and cancellation) leaves no trace.

    async fn insert(&self, message: String) -> AlertResult<alert::Model> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let alert = alert::ActiveModel {
            external_id: Set(ExternalId::generate().as_uuid()),
            created_at: Set(now),
            updated_at: Set(now),
            message: Set(message),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(alert)
    }

    async fn update_message(
        &self,
        internal_id: i32,
        message: String,
    ) -> AlertResult<alert::Model> {
        let txn = self.db.begin().await?;

        let result = Alert::update_many()
            .set(alert::ActiveModel {
                message: Set(message),
                updated_at: Set(Utc::now()),
                ..Default::default()
            })
            .filter(alert::Column::Id.eq(internal_id))
            .exec(&txn)
            .await?;

        // Deleted after resolution.
        if result.rows_affected == 0 {
            return Err(AlertError::NotFound);
        }

        let alert = Alert::find_by_id(internal_id)
            .one(&txn)
            .await?
            .ok_or(AlertError::NotFound)?;

        txn.commit().await?;
        Ok(alert)
    }

    async fn remove(&self, internal_id: i32) -> AlertResult<()> {
        let txn = self.db.begin().await?;

        let result = Alert::delete_by_id(internal_id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(AlertError::NotFound);
        }

        txn.commit().await?;
        Ok(())
    }
}

fn log_failure(action: &str, id: Option<ExternalId>, err: &AlertError) {
    match (err, id) {
        (AlertError::NotFound, Some(id)) => {
            warn!(external_id = %id, "Alert not found while trying to {}", action)
        }
        (AlertError::NotFound, None) => warn!("Alert not found while trying to {}", action),
        (e, Some(id)) => error!(external_id = %id, "Failed to {} alert: {}", action, e),
        (e, None) => error!("Failed to {} alert: {}", action, e),
    }
}

#[async_trait]
impl AlertStore for DatabaseAlertStore {
    async fn create(&self, message: String) -> AlertResult<alert::Model> {
        let result = self.insert(message).await;
        metrics::record_operation("create", &result);

        match &result {
            Ok(alert) => {
                info!(external_id = %alert.external_id, "Created alert");
                metrics::increment_alerts();
            }
            Err(e) => log_failure("create", None, e),
        }
        result
    }

    async fn get_by_external_id(&self, id: ExternalId) -> AlertResult<alert::Model> {
        let result = Alert::find()
            .filter(alert::Column::ExternalId.eq(id.as_uuid()))
            .one(&self.db)
            .await
            .map_err(AlertError::from)
            .and_then(|found| found.ok_or(AlertError::NotFound));
        metrics::record_operation("get", &result);

        if let Err(e) = &result {
            log_failure("get", Some(id), e);
        }
        result
    }

    async fn update_by_external_id(
        &self,
        id: ExternalId,
        message: String,
    ) -> AlertResult<alert::Model> {
        let result = match self.resolve_internal_id(id).await {
            Ok(internal_id) => self.update_message(internal_id, message).await,
            Err(e) => Err(e),
        };
        metrics::record_operation("update", &result);

        match &result {
            Ok(_) => info!(external_id = %id, "Updated alert"),
            Err(e) => log_failure("update", Some(id), e),
        }
        result
    }

    async fn delete_by_external_id(&self, id: ExternalId) -> AlertResult<()> {
        let result = match self.resolve_internal_id(id).await {
            Ok(internal_id) => self.remove(internal_id).await,
            Err(e) => Err(e),
        };
        metrics::record_operation("delete", &result);

        match &result {
            Ok(()) => {
                info!(external_id = %id, "Deleted alert");
                metrics::decrement_alerts();
            }
            Err(e) => log_failure("delete", Some(id), e),
        }
        result
    }

    async fn count(&self) -> AlertResult<u64> {
        Ok(Alert::find().count(&self.db).await?)
    }
}
