//! Plugin repository: `Upsert/List/GetByName/SetEnabled/Delete`.

use sqlx::{FromRow, SqlitePool};
use volant_core::manifest::{Plugin, PluginManifest};
use volant_core::{Error, Result};

#[derive(FromRow)]
struct PluginRow {
    name: String,
    version: String,
    enabled: bool,
    manifest: String,
}

impl PluginRow {
    fn into_plugin(self) -> Result<Plugin> {
        let manifest: PluginManifest = serde_json::from_str(&self.manifest)
            .map_err(|e| Error::Integrity(format!("corrupt plugin manifest row: {e}")))?;
        Ok(Plugin {
            name: self.name,
            version: self.version,
            enabled: self.enabled,
            manifest,
        })
    }
}

pub async fn upsert(pool: &SqlitePool, manifest: &PluginManifest) -> Result<()> {
    let encoded = serde_json::to_string(manifest)
        .map_err(|e| Error::Internal(format!("encoding plugin manifest: {e}")))?;
    sqlx::query(
        "INSERT INTO plugins (name, version, enabled, manifest) VALUES (?, ?, ?, ?) \
         ON CONFLICT(name) DO UPDATE SET version = excluded.version, manifest = excluded.manifest",
    )
    .bind(&manifest.name)
    .bind(&manifest.version)
    .bind(manifest.enabled)
    .bind(&encoded)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<Plugin>> {
    let rows: Vec<PluginRow> =
        sqlx::query_as("SELECT name, version, enabled, manifest FROM plugins ORDER BY name ASC")
            .fetch_all(pool)
            .await?;
    rows.into_iter().map(PluginRow::into_plugin).collect()
}

pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Plugin>> {
    let row: Option<PluginRow> =
        sqlx::query_as("SELECT name, version, enabled, manifest FROM plugins WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    row.map(PluginRow::into_plugin).transpose()
}

pub async fn set_enabled(pool: &SqlitePool, name: &str, enabled: bool) -> Result<()> {
    let updated = sqlx::query("UPDATE plugins SET enabled = ? WHERE name = ?")
        .bind(enabled)
        .bind(name)
        .execute(pool)
        .await?
        .rows_affected();
    if updated == 0 {
        return Err(Error::not_found(format!("plugin {name}")));
    }
    Ok(())
}

pub async fn delete(pool: &SqlitePool, name: &str) -> Result<()> {
    sqlx::query("DELETE FROM plugins WHERE name = ?")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}
