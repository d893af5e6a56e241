use anyhow::{Context, Result};
use colored::*;
use dialoguer::Confirm;
use tabled::{Table, Tabled};

use volant_core::manifest::PluginManifest;

use crate::client::ApiClient;

#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "ENABLED")]
    enabled: String,
}

pub async fn list(client: &ApiClient) -> Result<()> {
    let plugins = client.list_plugins().await?;

    if plugins.is_empty() {
        println!("No plugins installed. Install one with: volant plugin install <manifest.json>");
        return Ok(());
    }

    let rows: Vec<PluginRow> = plugins
        .into_iter()
        .map(|p| PluginRow {
            name: p.name,
            version: p.version,
            enabled: if p.enabled { "yes".green().to_string() } else { "no".to_string() },
        })
        .collect();

    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn install(client: &ApiClient, manifest_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(manifest_path).with_context(|| format!("reading {manifest_path}"))?;
    let manifest: PluginManifest = serde_json::from_str(&content).context("manifest is not valid JSON")?;

    let plugin = client.install_plugin(&manifest).await?;
    println!("{} plugin {} ({})", "installed".green(), plugin.name.bold(), plugin.version);
    Ok(())
}

pub async fn get(client: &ApiClient, name: &str) -> Result<()> {
    let plugin = client.get_plugin(name).await?;
    println!("{}", serde_json::to_string_pretty(&plugin)?);
    Ok(())
}

pub async fn remove(client: &ApiClient, name: &str, yes: bool) -> Result<()> {
    if !yes {
        let confirm = Confirm::new()
            .with_prompt(format!("remove plugin '{name}'?"))
            .default(false)
            .interact()?;
        if !confirm {
            println!("aborted");
            return Ok(());
        }
    }

    client.remove_plugin(name).await?;
    println!("{} plugin {}", "removed".green(), name.bold());
    Ok(())
}

pub async fn set_enabled(client: &ApiClient, name: &str, enabled: bool) -> Result<()> {
    client.set_plugin_enabled(name, enabled).await?;
    let verb = if enabled { "enabled" } else { "disabled" };
    println!("{} plugin {}", verb.green(), name.bold());
    Ok(())
}
