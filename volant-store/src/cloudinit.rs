//! Cloud-init record repository: one row per VM.

use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use volant_core::cloudinit::CloudInitRecord;
use volant_core::Result;

#[derive(FromRow)]
struct CloudInitRow {
    vm_id: i64,
    user_data: Option<String>,
    meta_data: Option<String>,
    network_config: Option<String>,
    seed_image_path: String,
}

impl From<CloudInitRow> for CloudInitRecord {
    fn from(row: CloudInitRow) -> Self {
        CloudInitRecord {
            vm_id: row.vm_id,
            user_data: row.user_data,
            meta_data: row.meta_data,
            network_config: row.network_config,
            seed_image_path: row.seed_image_path,
        }
    }
}

pub async fn upsert(tx: &mut Transaction<'_, Sqlite>, record: &CloudInitRecord) -> Result<()> {
    sqlx::query(
        "INSERT INTO cloud_init_records (vm_id, user_data, meta_data, network_config, seed_image_path) \
         VALUES (?, ?, ?, ?, ?) ON CONFLICT(vm_id) DO UPDATE SET \
         user_data = excluded.user_data, meta_data = excluded.meta_data, \
         network_config = excluded.network_config, seed_image_path = excluded.seed_image_path",
    )
    .bind(record.vm_id)
    .bind(&record.user_data)
    .bind(&record.meta_data)
    .bind(&record.network_config)
    .bind(&record.seed_image_path)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn get(pool: &SqlitePool, vm_id: i64) -> Result<Option<CloudInitRecord>> {
    let row: Option<CloudInitRow> = sqlx::query_as(
        "SELECT vm_id, user_data, meta_data, network_config, seed_image_path \
         FROM cloud_init_records WHERE vm_id = ?",
    )
    .bind(vm_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(CloudInitRecord::from))
}

pub async fn delete(tx: &mut Transaction<'_, Sqlite>, vm_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM cloud_init_records WHERE vm_id = ?")
        .bind(vm_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
