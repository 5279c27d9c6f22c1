//! PostgreSQL-based metadata store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{AvatarRow, PlanRow};
use crate::repos::{AvatarRepo, PlanRepo};
use crate::store::MetadataStore;
use armature_core::TierConfig;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Connect to PostgreSQL with a connection URL. Migrations run before
    /// this returns.
    pub async fn from_url(url: &str, max_connections: u32) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    async fn seed_builtin_plans(&self) -> MetadataResult<()> {
        // ON CONFLICT DO NOTHING: operator edits to seeded plans survive restarts.
        for tier in TierConfig::builtin_plans() {
            let plan = PlanRow::from_tier(&tier, OffsetDateTime::now_utc());
            sqlx::query(
                r#"
                INSERT INTO plans (
                    id, max_bones, max_morph_targets, max_file_size_bytes,
                    tracking_precision, face_tracking, body_tracking,
                    hand_tracking, finger_tracking, eye_tracking, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT(id) DO NOTHING
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
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared
        // statement, so we split the schema and execute each one separately.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        self.seed_builtin_plans().await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AvatarRepo for PostgresStore {
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
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
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
        let row = sqlx::query_as::<_, AvatarRow>("SELECT * FROM avatars WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_avatars_for_owner(&self, owner_id: Uuid) -> MetadataResult<Vec<AvatarRow>> {
        let rows = sqlx::query_as::<_, AvatarRow>(
            "SELECT * FROM avatars WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_avatar(&self, id: Uuid) -> MetadataResult<()> {
        let result = sqlx::query("DELETE FROM avatars WHERE id = $1")
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
impl PlanRepo for PostgresStore {
    async fn get_plan(&self, id: &str) -> MetadataResult<Option<PlanRow>> {
        let row = sqlx::query_as::<_, PlanRow>("SELECT * FROM plans WHERE id = $1")
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
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT(id) DO UPDATE SET
                max_bones = EXCLUDED.max_bones,
                max_morph_targets = EXCLUDED.max_morph_targets,
                max_file_size_bytes = EXCLUDED.max_file_size_bytes,
                tracking_precision = EXCLUDED.tracking_precision,
                face_tracking = EXCLUDED.face_tracking,
                body_tracking = EXCLUDED.body_tracking,
                hand_tracking = EXCLUDED.hand_tracking,
                finger_tracking = EXCLUDED.finger_tracking,
                eye_tracking = EXCLUDED.eye_tracking,
                updated_at = EXCLUDED.updated_at
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
