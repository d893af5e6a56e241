//! `VMConfig.Upsert`: reads the current version, writes `version+1` into
//! both the current-pointer row and an append-only history row, inside one
//! transaction. Version numbers are strictly monotonic per VM.

use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use volant_core::config::{VmConfigHistoryEntry, VmConfigOverride};
use volant_core::Result;

use crate::parse_timestamp;

#[derive(FromRow)]
struct ConfigRow {
    version: i64,
    override_doc: String,
}

pub async fn get_current(
    pool: &SqlitePool,
    vm_id: i64,
) -> Result<Option<(u32, VmConfigOverride)>> {
    let row: Option<ConfigRow> =
        sqlx::query_as("SELECT version, override_doc FROM vm_config WHERE vm_id = ?")
            .bind(vm_id)
            .fetch_optional(pool)
            .await?;
    match row {
        Some(row) => {
            let doc: VmConfigOverride = serde_json::from_str(&row.override_doc)
                .map_err(|e| volant_core::Error::Integrity(format!("corrupt vm_config row: {e}")))?;
            Ok(Some((row.version as u32, doc)))
        }
        None => Ok(None),
    }
}

/// Upserts the current-version pointer and appends a history row, both
/// inside `tx`. `new_doc` must already be the fully-merged effective config,
/// not a sparse patch.
pub async fn upsert(
    tx: &mut Transaction<'_, Sqlite>,
    vm_id: i64,
    new_version: u32,
    new_doc: &VmConfigOverride,
) -> Result<()> {
    let encoded = serde_json::to_string(new_doc)
        .map_err(|e| volant_core::Error::Internal(format!("encoding vm config: {e}")))?;
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "INSERT INTO vm_config (vm_id, version, override_doc, updated_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(vm_id) DO UPDATE SET version = excluded.version, \
         override_doc = excluded.override_doc, updated_at = excluded.updated_at",
    )
    .bind(vm_id)
    .bind(new_version as i64)
    .bind(&encoded)
    .bind(&now)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "INSERT INTO vm_config_history (vm_id, version, override_doc, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(vm_id)
    .bind(new_version as i64)
    .bind(&encoded)
    .bind(&now)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn history(
    pool: &SqlitePool,
    vm_id: i64,
    vm_name: &str,
    limit: Option<i64>,
) -> Result<Vec<VmConfigHistoryEntry>> {
    #[derive(FromRow)]
    struct HistoryRow {
        version: i64,
        override_doc: String,
        created_at: String,
    }

    let rows: Vec<HistoryRow> = sqlx::query_as(
        "SELECT version, override_doc, created_at FROM vm_config_history \
         WHERE vm_id = ? ORDER BY version DESC LIMIT ?",
    )
    .bind(vm_id)
    .bind(limit.unwrap_or(i64::MAX))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let override_doc: VmConfigOverride = serde_json::from_str(&row.override_doc)
                .map_err(|e| volant_core::Error::Integrity(format!("corrupt config history row: {e}")))?;
            Ok(VmConfigHistoryEntry {
                vm_name: vm_name.to_string(),
                version: row.version as u32,
                override_doc,
                created_at: parse_timestamp(&row.created_at),
            })
        })
        .collect()
}
