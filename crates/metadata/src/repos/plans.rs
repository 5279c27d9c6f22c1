//! Plan repository.

use crate::error::MetadataResult;
use crate::models::PlanRow;
use async_trait::async_trait;

/// Repository for durable plan configuration.
#[async_trait]
pub trait PlanRepo: Send + Sync {
    /// Get a plan by its slug.
    async fn get_plan(&self, id: &str) -> MetadataResult<Option<PlanRow>>;

    /// List all plans, ordered by slug.
    async fn list_plans(&self) -> MetadataResult<Vec<PlanRow>>;

    /// Insert or replace a plan's limits. Takes effect on the next rig
    /// because tiers are re-resolved per request.
    async fn upsert_plan(&self, plan: &PlanRow) -> MetadataResult<()>;
}
