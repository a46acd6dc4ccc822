use crate::error::{AlertError, AlertResult};
use crate::store::AlertStore;

pub const STORE_OPERATIONS_TOTAL: &str = "alert_service_store_operations_total";
pub const ALERTS_TOTAL: &str = "alert_service_alerts_total";

pub async fn init_metrics(store: &dyn AlertStore) {
    match store.count().await {
        Ok(count) => {
            metrics::gauge!(ALERTS_TOTAL).set(count as f64);
            tracing::info!("Initialized metrics: Alerts={}", count);
        }
        Err(e) => tracing::warn!("Failed to count alerts for metrics: {}", e),
    }
}

fn outcome<T>(result: &AlertResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AlertError::NotFound) => "not_found",
        Err(_) => "error",
    }
}

pub fn record_operation<T>(operation: &'static str, result: &AlertResult<T>) {
    metrics::counter!(
        STORE_OPERATIONS_TOTAL,
        "operation" => operation,
        "outcome" => outcome(result)
    )
    .increment(1);
}

pub fn increment_alerts() {
    metrics::gauge!(ALERTS_TOTAL).increment(1.0);
}

pub fn decrement_alerts() {
    metrics::gauge!(ALERTS_TOTAL).decrement(1.0);
}
