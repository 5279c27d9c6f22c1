//! Metadata store abstraction and implementations for armature.
//!
//! This crate provides the control-plane data model:
//! - Persisted avatar records and owner-scoped listings
//! - Subscription plan limits and their resolution into rig tiers
//!
//! Two backends are provided: SQLite for single-node deployments and
//! tests, PostgreSQL for everything larger. Both seed the built-in plans
//! on migration and leave operator edits to them intact.

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod resolve;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use models::{AvatarRow, PlanRow};
pub use postgres::PostgresStore;
pub use repos::{AvatarRepo, PlanRepo};
pub use resolve::resolve_tier;
pub use store::{MetadataStore, SqliteStore};

use armature_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
        MetadataConfig::Postgres {
            url,
            max_connections,
        } => {
            tracing::info!("connecting to PostgreSQL metadata store");
            let store = PostgresStore::from_url(url, *max_connections).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
