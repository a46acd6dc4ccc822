pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod identifier;
pub mod metrics;
pub mod migrator;
pub mod store;
pub mod telemetry;

pub use error::{AlertError, AlertResult};
pub use identifier::{ExternalId, ParseError};
pub use store::{AlertStore, DatabaseAlertStore};

pub use sea_orm;
