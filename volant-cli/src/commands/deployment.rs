use anyhow::Result;
use colored::*;
use dialoguer::Confirm;
use tabled::{Table, Tabled};

use volant_core::deployment::CreateDeploymentRequest;

use crate::client::ApiClient;

#[derive(Tabled)]
struct DeploymentRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "PLUGIN")]
    plugin: String,
    #[tabled(rename = "REPLICAS")]
    replicas: u32,
}

pub async fn list(client: &ApiClient) -> Result<()> {
    let result = client.list_deployments().await?;

    if result.deployments.is_empty() {
        println!("No deployments found. Create one with: volant deployment create <name> --plugin <plugin> --replicas <n>");
        return Ok(());
    }

    let rows: Vec<DeploymentRow> = result
        .deployments
        .into_iter()
        .map(|d| DeploymentRow {
            name: d.name,
            plugin: d.plugin,
            replicas: d.desired_replicas,
        })
        .collect();

    println!("{}", Table::new(rows));
    println!("{}", format!("{} total", result.total).dimmed());
    Ok(())
}

pub async fn create(client: &ApiClient, name: &str, plugin: &str, replicas: u32) -> Result<()> {
    let req = CreateDeploymentRequest {
        name: name.to_string(),
        plugin: plugin.to_string(),
        replicas,
        base_config: Default::default(),
    };

    let deployment = client.create_deployment(&req).await?;
    println!(
        "{} deployment {} ({} replicas)",
        "created".green(),
        deployment.name.bold(),
        deployment.desired_replicas
    );
    Ok(())
}

pub async fn get(client: &ApiClient, name: &str) -> Result<()> {
    let deployment = client.get_deployment(name).await?;
    println!("{}", serde_json::to_string_pretty(&deployment)?);
    Ok(())
}

pub async fn scale(client: &ApiClient, name: &str, replicas: u32) -> Result<()> {
    let deployment = client.scale_deployment(name, replicas).await?;
    println!("{} deployment {} to {} replicas", "scaled".green(), deployment.name.bold(), deployment.desired_replicas);
    Ok(())
}

pub async fn delete(client: &ApiClient, name: &str, yes: bool) -> Result<()> {
    if !yes {
        let confirm = Confirm::new()
            .with_prompt(format!("delete deployment '{name}' and all its VMs?"))
            .default(false)
            .interact()?;
        if !confirm {
            println!("aborted");
            return Ok(());
        }
    }

    client.delete_deployment(name).await?;
    println!("{} deployment {}", "deleted".green(), name.bold());
    Ok(())
}
