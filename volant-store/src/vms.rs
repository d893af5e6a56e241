//! VM repository: the primitive state transitions `Create`,
//! `UpdateRuntimeState`, `UpdateKernelCmdline`, `UpdateSockets`, `Delete`.

use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use volant_core::vm::{Vm, VmStatus};
use volant_core::{Error, Result};

use crate::parse_timestamp;

#[derive(FromRow)]
struct VmRow {
    id: i64,
    name: String,
    status: String,
    runtime: String,
    plugin: String,
    pid: Option<i64>,
    ip_address: Option<String>,
    mac_address: Option<String>,
    cpu: i64,
    memory_mib: i64,
    kernel_cmdline: Option<String>,
    serial_socket_path: Option<String>,
    deployment_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

const SELECT_VM: &str = "SELECT id, name, status, runtime, plugin, pid, ip_address, mac_address, \
     cpu, memory_mib, kernel_cmdline, serial_socket_path, deployment_id, created_at, updated_at \
     FROM vms";

impl VmRow {
    fn into_vm(self) -> Result<Vm> {
        Ok(Vm {
            id: self.id,
            name: self.name,
            status: parse_status(&self.status)?,
            runtime: self.runtime,
            plugin: self.plugin,
            pid: self.pid.map(|p| p as i32),
            ip_address: self.ip_address,
            mac_address: self.mac_address,
            cpu: self.cpu as u32,
            memory_mib: self.memory_mib as u32,
            kernel_cmdline: self.kernel_cmdline,
            serial_socket_path: self.serial_socket_path,
            deployment_id: self.deployment_id,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

fn parse_status(raw: &str) -> Result<VmStatus> {
    match raw {
        "pending" => Ok(VmStatus::Pending),
        "running" => Ok(VmStatus::Running),
        "stopped" => Ok(VmStatus::Stopped),
        "crashed" => Ok(VmStatus::Crashed),
        "deleting" => Ok(VmStatus::Deleting),
        other => Err(Error::Integrity(format!("unknown vm status in store: {other}"))),
    }
}

/// Inserts a VM row in `pending` with placeholder identity fields, inside an
/// already-open transaction. Returns the new surrogate ID.
pub async fn create(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    runtime: &str,
    plugin: &str,
    cpu: u32,
    memory_mib: u32,
    deployment_id: Option<i64>,
) -> Result<i64> {
    let now = chrono::Utc::now().to_rfc3339();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO vms (name, status, runtime, plugin, cpu, memory_mib, deployment_id, created_at, updated_at) \
         VALUES (?, 'pending', ?, ?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(name)
    .bind(runtime)
    .bind(plugin)
    .bind(cpu as i64)
    .bind(memory_mib as i64)
    .bind(deployment_id)
    .bind(&now)
    .bind(&now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Vm>> {
    let row: Option<VmRow> = sqlx::query_as(&format!("{SELECT_VM} WHERE name = ?"))
        .bind(name)
        .fetch_optional(pool)
        .await?;
    row.map(VmRow::into_vm).transpose()
}

pub struct ListFilter<'a> {
    pub plugin: Option<&'a str>,
    pub status: Option<&'a str>,
    pub runtime: Option<&'a str>,
    pub q: Option<&'a str>,
    pub sort: Option<&'a str>,
    pub order: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

/// Whitelists `sort`/`order` against real columns so they can be
/// interpolated into the query string without risking injection.
fn order_clause(sort: Option<&str>, order: Option<&str>) -> &'static str {
    let column = match sort {
        Some("name") => "name",
        Some("status") => "status",
        Some("created_at") => "created_at",
        Some("updated_at") => "updated_at",
        _ => "id",
    };
    let direction = match order {
        Some("desc") | Some("DESC") => "DESC",
        _ => "ASC",
    };
    match (column, direction) {
        ("name", "ASC") => "ORDER BY name ASC",
        ("name", "DESC") => "ORDER BY name DESC",
        ("status", "ASC") => "ORDER BY status ASC",
        ("status", "DESC") => "ORDER BY status DESC",
        ("created_at", "ASC") => "ORDER BY created_at ASC",
        ("created_at", "DESC") => "ORDER BY created_at DESC",
        ("updated_at", "ASC") => "ORDER BY updated_at ASC",
        ("updated_at", "DESC") => "ORDER BY updated_at DESC",
        (_, "DESC") => "ORDER BY id DESC",
        _ => "ORDER BY id ASC",
    }
}

pub async fn list(pool: &SqlitePool, filter: &ListFilter<'_>) -> Result<(Vec<Vm>, i64)> {
    let mut query = format!("{SELECT_VM} WHERE 1=1");
    let mut count_query = String::from("SELECT COUNT(*) FROM vms WHERE 1=1");
    let mut binds: Vec<String> = Vec::new();

    if let Some(plugin) = filter.plugin {
        query.push_str(" AND plugin = ?");
        count_query.push_str(" AND plugin = ?");
        binds.push(plugin.to_string());
    }
    if let Some(status) = filter.status {
        query.push_str(" AND status = ?");
        count_query.push_str(" AND status = ?");
        binds.push(status.to_string());
    }
    if let Some(runtime) = filter.runtime {
        query.push_str(" AND runtime = ?");
        count_query.push_str(" AND runtime = ?");
        binds.push(runtime.to_string());
    }
    if let Some(q) = filter.q {
        query.push_str(" AND name LIKE ?");
        count_query.push_str(" AND name LIKE ?");
        binds.push(format!("%{q}%"));
    }

    query.push(' ');
    query.push_str(order_clause(filter.sort, filter.order));
    query.push_str(" LIMIT ? OFFSET ?");

    let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
    for bind in &binds {
        count_builder = count_builder.bind(bind);
    }
    let total = count_builder.fetch_one(pool).await?;

    let mut builder = sqlx::query_as::<_, VmRow>(&query);
    for bind in &binds {
        builder = builder.bind(bind);
    }
    builder = builder.bind(filter.limit).bind(filter.offset);
    let rows = builder.fetch_all(pool).await?;

    let vms = rows.into_iter().map(VmRow::into_vm).collect::<Result<Vec<_>>>()?;
    Ok((vms, total))
}

pub async fn update_runtime_state(
    pool: &SqlitePool,
    name: &str,
    status: VmStatus,
    pid: Option<i32>,
) -> Result<()> {
    sqlx::query("UPDATE vms SET status = ?, pid = ?, updated_at = ? WHERE name = ?")
        .bind(status.as_str())
        .bind(pid.map(|p| p as i64))
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_kernel_cmdline(pool: &SqlitePool, name: &str, cmdline: &str) -> Result<()> {
    sqlx::query("UPDATE vms SET kernel_cmdline = ?, updated_at = ? WHERE name = ?")
        .bind(cmdline)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_sockets(pool: &SqlitePool, name: &str, serial_socket_path: &str) -> Result<()> {
    sqlx::query("UPDATE vms SET serial_socket_path = ?, updated_at = ? WHERE name = ?")
        .bind(serial_socket_path)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Updates MAC/IP fields resolved during creation — `UpdateSpec` in the
/// distilled contract. Runs inside the creation transaction.
pub async fn update_spec(
    tx: &mut Transaction<'_, Sqlite>,
    vm_id: i64,
    ip_address: Option<&str>,
    mac_address: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE vms SET ip_address = ?, mac_address = ?, updated_at = ? WHERE id = ?")
        .bind(ip_address)
        .bind(mac_address)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(vm_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, name: &str) -> Result<()> {
    sqlx::query("DELETE FROM vms WHERE name = ?")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_by_deployment(pool: &SqlitePool, deployment_id: i64) -> Result<Vec<Vm>> {
    let rows: Vec<VmRow> = sqlx::query_as(&format!("{SELECT_VM} WHERE deployment_id = ? ORDER BY name ASC"))
        .bind(deployment_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(VmRow::into_vm).collect()
}
