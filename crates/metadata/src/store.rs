//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::PlanRow;
use crate::repos::{AvatarRepo, PlanRepo};
use armature_core::TierConfig;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: AvatarRepo + PlanRepo + Send + Sync {
    /// Run database migrations and seed the built-in plans.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
///
/// Single-connection pool: SQLite permits limited write concurrency, and
/// one connection avoids "database is locked" failures under concurrent
/// request handling. Suitable for single-node deployments and tests; use
/// Postgres beyond that.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) a store at `path`. `:memory:` gives an ephemeral
    /// store for tests. Migrations run before this returns.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        let opts = if path == Path::new(":memory:") {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MetadataError::Config(format!("creating {parent:?}: {e}")))?;
            }
            SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
                .create_if_missing(true)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        }
        .foreign_keys(true)
        // Prevent transient "database is locked" errors under concurrent access.
        .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    async fn seed_builtin_plans(&self) -> MetadataResult<()> {
        // INSERT OR IGNORE: operator edits to seeded plans survive restarts.
        for tier in TierConfig::builtin_plans() {
            let plan = PlanRow::from_tier(&tier, OffsetDateTime::now_utc());
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO plans (
                    id, max_bones, max_morph_targets, max_file_size_bytes,
                    tracking_precision, face_tracking, body_tracking,
                    hand_tracking, finger_tracking, eye_tracking, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&plan.id)
            .bind(plan.max_bones)
            .bind(plan.max_morph_targets)
            .bind(plan.max_file_size_bytes)
            .bind(&plan.tracking_precision)
            .bind(plan.face_tracking)
            .bind(plan.body_tracking)
            .bind(plan.hand_tracking)
            .bind(plan.finger_tracking)
            .bind(plan.eye_tracking)
            .bind(plan.updated_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        self.seed_builtin_plans().await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::models::AvatarRow;
    use uuid::Uuid;

    #[async_trait]
    impl AvatarRepo for SqliteStore {
        async fn create_avatar(&self, avatar: &AvatarRow) -> MetadataResult<()> {
            if self.get_avatar(avatar.id).await?.is_some() {
                return Err(MetadataError::AlreadyExists(format!(
                    "avatar {} already exists",
                    avatar.id
                )));
            }

            sqlx::query(
                r#"
                INSERT INTO avatars (
                    id, owner_id, name, model_url, thumbnail_url,
                    is_rigged, bone_count, morph_target_names, file_size, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(avatar.id)
            .bind(avatar.owner_id)
            .bind(&avatar.name)
            .bind(&avatar.model_url)
            .bind(&avatar.thumbnail_url)
            .bind(avatar.is_rigged)
            .bind(avatar.bone_count)
            .bind(&avatar.morph_target_names)
            .bind(avatar.file_size)
            .bind(avatar.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_avatar(&self, id: Uuid) -> MetadataResult<Option<AvatarRow>> {
            let row = sqlx::query_as::<_, AvatarRow>("SELECT * FROM avatars WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_avatars_for_owner(&self, owner_id: Uuid) -> MetadataResult<Vec<AvatarRow>> {
            let rows = sqlx::query_as::<_, AvatarRow>(
                "SELECT * FROM avatars WHERE owner_id = ? ORDER BY created_at DESC",
            )
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn delete_avatar(&self, id: Uuid) -> MetadataResult<()> {
            let result = sqlx::query("DELETE FROM avatars WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("avatar {id}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PlanRepo for SqliteStore {
        async fn get_plan(&self, id: &str) -> MetadataResult<Option<PlanRow>> {
            let row = sqlx::query_as::<_, PlanRow>("SELECT * FROM plans WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_plans(&self) -> MetadataResult<Vec<PlanRow>> {
            let rows = sqlx::query_as::<_, PlanRow>("SELECT * FROM plans ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }

        async fn upsert_plan(&self, plan: &PlanRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO plans (
                    id, max_bones, max_morph_targets, max_file_size_bytes,
                    tracking_precision, face_tracking, body_tracking,
                    hand_tracking, finger_tracking, eye_tracking, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    max_bones = excluded.max_bones,
                    max_morph_targets = excluded.max_morph_targets,
                    max_file_size_bytes = excluded.max_file_size_bytes,
                    tracking_precision = excluded.tracking_precision,
                    face_tracking = excluded.face_tracking,
                    body_tracking = excluded.body_tracking,
                    hand_tracking = excluded.hand_tracking,
                    finger_tracking = excluded.finger_tracking,
                    eye_tracking = excluded.eye_tracking,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&plan.id)
            .bind(plan.max_bones)
            .bind(plan.max_morph_targets)
            .bind(plan.max_file_size_bytes)
            .bind(&plan.tracking_precision)
            .bind(plan.face_tracking)
            .bind(plan.body_tracking)
            .bind(plan.hand_tracking)
            .bind(plan.finger_tracking)
            .bind(plan.eye_tracking)
            .bind(plan.updated_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        }
    }
}

const SCHEMA_SQL: &str = r#"
-- Durable avatars
CREATE TABLE IF NOT EXISTS avatars (
    id BLOB PRIMARY KEY,
    owner_id BLOB NOT NULL,
    name TEXT NOT NULL,
    model_url TEXT NOT NULL,
    thumbnail_url TEXT NOT NULL,
    is_rigged INTEGER NOT NULL DEFAULT 0,
    bone_count INTEGER NOT NULL DEFAULT 0,
    morph_target_names TEXT NOT NULL DEFAULT '[]',
    file_size INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_avatars_owner ON avatars(owner_id, created_at);

-- Plan limits (seeded with the built-in plans after table creation)
CREATE TABLE IF NOT EXISTS plans (
    id TEXT PRIMARY KEY,
    max_bones INTEGER NOT NULL,
    max_morph_targets INTEGER NOT NULL,
    max_file_size_bytes INTEGER NOT NULL,
    tracking_precision TEXT NOT NULL,
    face_tracking INTEGER NOT NULL DEFAULT 0,
    body_tracking INTEGER NOT NULL DEFAULT 0,
    hand_tracking INTEGER NOT NULL DEFAULT 0,
    finger_tracking INTEGER NOT NULL DEFAULT 0,
    eye_tracking INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AvatarRow;
    use armature_core::PersistedAvatar;
    use uuid::Uuid;

    async fn make_store() -> (tempfile::TempDir, SqliteStore) {
        let temp = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp.path().join("metadata.db"))
            .await
            .unwrap();
        (temp, store)
    }

    fn sample_avatar(owner_id: Uuid, name: &str, created_unix: i64) -> PersistedAvatar {
        PersistedAvatar {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            model_url: format!("avatars/{owner_id}/{name}.glb"),
            thumbnail_url: format!("thumbnails/{owner_id}/{name}.png"),
            is_rigged: true,
            bone_count: 60,
            morph_target_names: vec!["jawOpen".to_string()],
            file_size: 1024,
            created_at: OffsetDateTime::from_unix_timestamp(created_unix).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_avatar_create_get_roundtrip() {
        let (_temp, store) = make_store().await;
        let avatar = sample_avatar(Uuid::new_v4(), "hero", 1_700_000_000);
        store
            .create_avatar(&AvatarRow::from_avatar(&avatar).unwrap())
            .await
            .unwrap();

        let fetched = store.get_avatar(avatar.id).await.unwrap().unwrap();
        assert_eq!(fetched.into_avatar().unwrap(), avatar);
    }

    #[tokio::test]
    async fn test_duplicate_avatar_rejected() {
        let (_temp, store) = make_store().await;
        let avatar = sample_avatar(Uuid::new_v4(), "dup", 1_700_000_000);
        let row = AvatarRow::from_avatar(&avatar).unwrap();
        store.create_avatar(&row).await.unwrap();

        match store.create_avatar(&row).await {
            Err(MetadataError::AlreadyExists(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_avatars_newest_first_scoped_to_owner() {
        let (_temp, store) = make_store().await;
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        for (name, at) in [("old", 1_700_000_000), ("new", 1_700_000_100)] {
            let avatar = sample_avatar(owner, name, at);
            store
                .create_avatar(&AvatarRow::from_avatar(&avatar).unwrap())
                .await
                .unwrap();
        }
        let foreign = sample_avatar(other, "foreign", 1_700_000_200);
        store
            .create_avatar(&AvatarRow::from_avatar(&foreign).unwrap())
            .await
            .unwrap();

        let listed = store.list_avatars_for_owner(owner).await.unwrap();
        let names: Vec<_> = listed.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_delete_avatar_then_not_found() {
        let (_temp, store) = make_store().await;
        let avatar = sample_avatar(Uuid::new_v4(), "gone", 1_700_000_000);
        store
            .create_avatar(&AvatarRow::from_avatar(&avatar).unwrap())
            .await
            .unwrap();

        store.delete_avatar(avatar.id).await.unwrap();
        assert!(store.get_avatar(avatar.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_avatar(avatar.id).await,
            Err(MetadataError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_builtin_plans_are_seeded() {
        let (_temp, store) = make_store().await;
        let plans = store.list_plans().await.unwrap();
        let ids: Vec<_> = plans.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["free", "plus", "studio"]);

        let free = store.get_plan("free").await.unwrap().unwrap();
        assert_eq!(free.tier_config(), TierConfig::free());
    }

    #[tokio::test]
    async fn test_plan_edits_survive_remigration() {
        let (_temp, store) = make_store().await;
        let mut studio = store.get_plan("studio").await.unwrap().unwrap();
        studio.max_bones = 512;
        studio.updated_at = OffsetDateTime::now_utc();
        store.upsert_plan(&studio).await.unwrap();

        // A restart re-runs migrate; seeded values must not clobber edits.
        store.migrate().await.unwrap();
        let reloaded = store.get_plan("studio").await.unwrap().unwrap();
        assert_eq!(reloaded.max_bones, 512);
    }

    #[tokio::test]
    async fn test_upsert_creates_new_plan() {
        let (_temp, store) = make_store().await;
        let mut custom = store.get_plan("free").await.unwrap().unwrap();
        custom.id = "enterprise".to_string();
        custom.max_bones = 1024;
        store.upsert_plan(&custom).await.unwrap();

        let fetched = store.get_plan("enterprise").await.unwrap().unwrap();
        assert_eq!(fetched.max_bones, 1024);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = SqliteStore::new(":memory:").await.unwrap();
        store.health_check().await.unwrap();
        assert_eq!(store.list_plans().await.unwrap().len(), 3);
    }
}
