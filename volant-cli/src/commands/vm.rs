use anyhow::Result;
use colored::*;
use dialoguer::Confirm;
use tabled::{Table, Tabled};

use volant_core::config::VmConfigOverride;
use volant_core::vm::CreateVmRequest;

use crate::client::ApiClient;

#[derive(Tabled)]
struct VmRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "PLUGIN")]
    plugin: String,
    #[tabled(rename = "CPU")]
    cpu: u32,
    #[tabled(rename = "MEMORY")]
    memory_mib: u32,
    #[tabled(rename = "IP")]
    ip: String,
}

fn status_label(status: volant_core::vm::VmStatus) -> String {
    use volant_core::vm::VmStatus::*;
    match status {
        Running => status.as_str().green().to_string(),
        Pending => status.as_str().yellow().to_string(),
        Crashed => status.as_str().red().to_string(),
        Stopped | Deleting => status.as_str().to_string(),
    }
}

pub async fn list(client: &ApiClient) -> Result<()> {
    let result = client.list_vms().await?;

    if result.vms.is_empty() {
        println!("No VMs found. Create one with: volant vm create <name> --plugin <plugin>");
        return Ok(());
    }

    let rows: Vec<VmRow> = result
        .vms
        .into_iter()
        .map(|vm| VmRow {
            name: vm.name,
            status: status_label(vm.status),
            plugin: vm.plugin,
            cpu: vm.cpu,
            memory_mib: vm.memory_mib,
            ip: vm.ip_address.unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!("{}", Table::new(rows));
    println!("{}", format!("{} total", result.total).dimmed());
    Ok(())
}

pub async fn create(client: &ApiClient, name: &str, plugin: &str, cpu: Option<u32>, memory_mib: Option<u32>) -> Result<()> {
    let req = CreateVmRequest {
        name: name.to_string(),
        plugin: plugin.to_string(),
        cpu,
        memory_mib,
        kernel_cmdline_extra: None,
        config_override: None,
    };

    let vm = client.create_vm(&req).await?;
    println!("{} vm {}", "created".green(), vm.name.bold());
    Ok(())
}

pub async fn get(client: &ApiClient, name: &str) -> Result<()> {
    let vm = client.get_vm(name).await?;
    println!("{}", serde_json::to_string_pretty(&vm)?);
    Ok(())
}

pub async fn start(client: &ApiClient, name: &str) -> Result<()> {
    let vm = client.start_vm(name).await?;
    println!("{} vm {} ({})", "started".green(), vm.name.bold(), status_label(vm.status));
    Ok(())
}

pub async fn stop(client: &ApiClient, name: &str, force: bool) -> Result<()> {
    let vm = client.stop_vm(name, force).await?;
    println!("{} vm {} ({})", "stopped".green(), vm.name.bold(), status_label(vm.status));
    Ok(())
}

pub async fn restart(client: &ApiClient, name: &str) -> Result<()> {
    let vm = client.restart_vm(name).await?;
    println!("{} vm {} ({})", "restarted".green(), vm.name.bold(), status_label(vm.status));
    Ok(())
}

pub async fn destroy(client: &ApiClient, name: &str, yes: bool) -> Result<()> {
    if !yes {
        let confirm = Confirm::new()
            .with_prompt(format!("destroy vm '{name}'? this cannot be undone"))
            .default(false)
            .interact()?;
        if !confirm {
            println!("aborted");
            return Ok(());
        }
    }

    client.destroy_vm(name).await?;
    println!("{} vm {}", "destroyed".green(), name.bold());
    Ok(())
}

pub async fn config_get(client: &ApiClient, name: &str) -> Result<()> {
    let config = client.get_vm_config(name).await?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub async fn config_set(
    client: &ApiClient,
    name: &str,
    cpu: Option<u32>,
    memory_mib: Option<u32>,
    kernel_cmdline_extra: Option<String>,
) -> Result<()> {
    let patch = VmConfigOverride {
        cpu,
        memory_mib,
        kernel_cmdline_extra,
        network: None,
        cloud_init: None,
        devices: None,
        boot_media: None,
    };

    let update = client.update_vm_config(name, &patch).await?;
    println!(
        "{} config version {} (restart_required: {})",
        "updated".green(),
        update.version,
        if update.restart_required { "yes".yellow() } else { "no".green() }
    );
    Ok(())
}

pub async fn config_history(client: &ApiClient, name: &str, limit: Option<i64>) -> Result<()> {
    let entries = client.vm_config_history(name, limit).await?;
    if entries.is_empty() {
        println!("No config history for '{name}'");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{} version {} at {}",
            "-".dimmed(),
            entry.version,
            entry.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
