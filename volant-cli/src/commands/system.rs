use anyhow::Result;
use colored::*;

use crate::client::ApiClient;

pub async fn info(client: &ApiClient) -> Result<()> {
    let info = client.system_info().await?;

    println!("{}", "volant system info".bold());
    println!("  version:      {}", info.version.cyan());
    println!("  uptime:       {}s", info.uptime_seconds);
    println!("  vms:          {}", info.vm_count);
    println!("  deployments:  {}", info.deployment_count);
    println!("  plugins:      {}", info.plugin_count);
    Ok(())
}

pub async fn health(client: &ApiClient) -> Result<()> {
    if client.health_check().await {
        println!("{}", "healthy".green());
    } else {
        println!("{}", "unreachable".red());
        std::process::exit(1);
    }
    Ok(())
}
