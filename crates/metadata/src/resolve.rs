//! Plan-to-tier resolution.

use crate::store::MetadataStore;
use armature_core::TierConfig;

/// Resolve a plan slug into the tier limits to rig under.
///
/// Fails closed: an unknown plan or a store failure yields the free tier,
/// so a degraded database narrows capability instead of widening it.
pub async fn resolve_tier(store: &dyn MetadataStore, plan_id: &str) -> TierConfig {
    match store.get_plan(plan_id).await {
        Ok(Some(plan)) => plan.tier_config(),
        Ok(None) => {
            tracing::warn!(plan_id, "unknown plan, rigging under free tier limits");
            TierConfig::free()
        }
        Err(error) => {
            tracing::warn!(
                plan_id,
                %error,
                "plan lookup failed, rigging under free tier limits"
            );
            TierConfig::free()
        }
    }
}
