//! IP allocation pool: `EnsurePool`, `LeaseNext`, `LeaseSpecific`, `Assign`,
//! `Release`.

use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use volant_core::ip::{IpAllocation, IpStatus};
use volant_core::{Error, Result};

use crate::parse_timestamp;

#[derive(FromRow)]
struct IpRow {
    address: String,
    status: String,
    vm_id: Option<i64>,
    leased_at: Option<String>,
}

impl IpRow {
    fn into_allocation(self) -> IpAllocation {
        IpAllocation {
            address: self.address,
            status: if self.status == "leased" {
                IpStatus::Leased
            } else {
                IpStatus::Available
            },
            vm_id: self.vm_id,
            leased_at: self.leased_at.map(|s| parse_timestamp(&s)),
        }
    }
}

/// Inserts any address in `addresses` missing from the pool as `available`;
/// existing rows (and their leases) are left untouched. Idempotent by
/// construction — re-seeding never duplicates rows.
pub async fn ensure_pool(pool: &SqlitePool, addresses: &[String]) -> Result<()> {
    let mut tx = pool.begin().await.map_err(Error::from)?;
    for address in addresses {
        sqlx::query(
            "INSERT INTO ip_allocations (address, status) VALUES (?, 'available') \
             ON CONFLICT(address) DO NOTHING",
        )
        .bind(address)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await.map_err(Error::from)?;
    Ok(())
}

/// Atomically leases the lowest-addressed `available` row. Fails with
/// `resource-exhausted` on an empty pool.
pub async fn lease_next(tx: &mut Transaction<'_, Sqlite>) -> Result<String> {
    let now = chrono::Utc::now().to_rfc3339();
    let address: Option<String> = sqlx::query_scalar(
        "UPDATE ip_allocations SET status = 'leased', leased_at = ? \
         WHERE address = (SELECT address FROM ip_allocations WHERE status = 'available' ORDER BY address ASC LIMIT 1) \
         RETURNING address",
    )
    .bind(&now)
    .fetch_optional(&mut **tx)
    .await?;

    address.ok_or_else(|| Error::ResourceExhausted("no available IP addresses".to_string()))
}

/// Leases `address` only if it is currently `available`; same error on
/// conflict as an exhausted pool, since the caller's remedy is identical.
pub async fn lease_specific(tx: &mut Transaction<'_, Sqlite>, address: &str) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let leased: Option<String> = sqlx::query_scalar(
        "UPDATE ip_allocations SET status = 'leased', leased_at = ? \
         WHERE address = ? AND status = 'available' RETURNING address",
    )
    .bind(&now)
    .bind(address)
    .fetch_optional(&mut **tx)
    .await?;

    if leased.is_none() {
        return Err(Error::ResourceExhausted(format!(
            "requested address {address} is not available"
        )));
    }
    Ok(())
}

/// Attaches a leased address to a VM row. Requires the address to already
/// be leased (by `lease_next`/`lease_specific` earlier in the same
/// transaction).
pub async fn assign(tx: &mut Transaction<'_, Sqlite>, address: &str, vm_id: i64) -> Result<()> {
    let updated = sqlx::query(
        "UPDATE ip_allocations SET vm_id = ? WHERE address = ? AND status = 'leased'",
    )
    .bind(vm_id)
    .bind(address)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(Error::PreconditionFailed(format!(
            "address {address} must be leased before it can be assigned"
        )));
    }
    Ok(())
}

/// Releases `address` back to `available`, clearing VM association and
/// lease timestamp.
pub async fn release(pool: &SqlitePool, address: &str) -> Result<()> {
    sqlx::query(
        "UPDATE ip_allocations SET status = 'available', vm_id = NULL, leased_at = NULL WHERE address = ?",
    )
    .bind(address)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &SqlitePool, address: &str) -> Result<Option<IpAllocation>> {
    let row: Option<IpRow> = sqlx::query_as(
        "SELECT address, status, vm_id, leased_at FROM ip_allocations WHERE address = ?",
    )
    .bind(address)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(IpRow::into_allocation))
}
