//! Deployment (`VMGroup`) repository: `Create/Update/UpdateReplicas/Delete/Get/List`.

use sqlx::{FromRow, SqlitePool};
use volant_core::config::VmConfigOverride;
use volant_core::deployment::Deployment;
use volant_core::{Error, Result};

use crate::parse_timestamp;

#[derive(FromRow)]
struct DeploymentRow {
    id: i64,
    name: String,
    plugin: String,
    base_config: String,
    desired_replicas: i64,
    created_at: String,
    updated_at: String,
}

const SELECT_DEPLOYMENT: &str =
    "SELECT id, name, plugin, base_config, desired_replicas, created_at, updated_at FROM deployments";

impl DeploymentRow {
    fn into_deployment(self) -> Result<Deployment> {
        let base_config: VmConfigOverride = serde_json::from_str(&self.base_config)
            .map_err(|e| Error::Integrity(format!("corrupt deployment base_config: {e}")))?;
        Ok(Deployment {
            id: self.id,
            name: self.name,
            plugin: self.plugin,
            base_config,
            desired_replicas: self.desired_replicas as u32,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

pub async fn create(
    pool: &SqlitePool,
    name: &str,
    plugin: &str,
    base_config: &VmConfigOverride,
    desired_replicas: u32,
) -> Result<i64> {
    let encoded = serde_json::to_string(base_config)
        .map_err(|e| Error::Internal(format!("encoding deployment base config: {e}")))?;
    let now = chrono::Utc::now().to_rfc3339();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO deployments (name, plugin, base_config, desired_replicas, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(plugin)
    .bind(&encoded)
    .bind(desired_replicas as i64)
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn update_replicas(pool: &SqlitePool, name: &str, desired_replicas: u32) -> Result<()> {
    let updated = sqlx::query("UPDATE deployments SET desired_replicas = ?, updated_at = ? WHERE name = ?")
        .bind(desired_replicas as i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(name)
        .execute(pool)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(Error::not_found(format!("deployment {name}")));
    }
    Ok(())
}

pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Deployment>> {
    let row: Option<DeploymentRow> = sqlx::query_as(&format!("{SELECT_DEPLOYMENT} WHERE name = ?"))
        .bind(name)
        .fetch_optional(pool)
        .await?;
    row.map(DeploymentRow::into_deployment).transpose()
}

pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Deployment>> {
    let row: Option<DeploymentRow> = sqlx::query_as(&format!("{SELECT_DEPLOYMENT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(DeploymentRow::into_deployment).transpose()
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Deployment>> {
    let rows: Vec<DeploymentRow> = sqlx::query_as(&format!("{SELECT_DEPLOYMENT} ORDER BY name ASC"))
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(DeploymentRow::into_deployment).collect()
}

pub async fn delete(pool: &SqlitePool, name: &str) -> Result<()> {
    sqlx::query("DELETE FROM deployments WHERE name = ?")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}
