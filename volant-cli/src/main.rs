use anyhow::Result;
use clap::{Parser, Subcommand};
use volant_logging::{LogFormat, LoggingConfig};

mod client;
mod commands;
mod config;

use client::ApiClient;
use commands::{deployment, events, plugin, system, vm};
use config::Config;

#[derive(Parser)]
#[command(name = "volant")]
#[command(about = "Reference CLI for the Volant microVM control plane", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "API base URL", env = "VOLANT_API_URL")]
    api_url: Option<String>,

    #[arg(long, global = true, help = "API key", env = "VOLANT_API_KEY")]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage virtual machines
    #[command(subcommand)]
    Vm(VmCommands),

    /// Manage deployments (replica sets of VMs)
    #[command(subcommand)]
    Deployment(DeploymentCommands),

    /// Manage installed plugins
    #[command(subcommand)]
    Plugin(PluginCommands),

    /// Stream the live VM event feed
    Events,

    /// Show control-plane version and resource counts
    Info,

    /// Check whether the control plane is reachable
    Health,
}

#[derive(Subcommand)]
enum VmCommands {
    /// List all VMs
    List,

    /// Create a new VM from an installed plugin
    Create {
        name: String,
        #[arg(long)]
        plugin: String,
        #[arg(long)]
        cpu: Option<u32>,
        #[arg(long)]
        memory_mib: Option<u32>,
    },

    /// Show a VM's record
    Get { name: String },

    /// Start a stopped VM
    Start { name: String },

    /// Stop a running VM
    Stop {
        name: String,
        #[arg(long, help = "Skip the launcher's grace period and kill immediately")]
        force: bool,
    },

    /// Stop then start a VM
    Restart { name: String },

    /// Destroy a VM and release its resources
    Destroy {
        name: String,
        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    /// Inspect or change a VM's config override
    #[command(subcommand)]
    Config(VmConfigCommands),
}

#[derive(Subcommand)]
enum VmConfigCommands {
    /// Show the current config override
    Get { name: String },

    /// Patch the config override
    Set {
        name: String,
        #[arg(long)]
        cpu: Option<u32>,
        #[arg(long)]
        memory_mib: Option<u32>,
        #[arg(long)]
        kernel_cmdline_extra: Option<String>,
    },

    /// Show the append-only config revision history
    History {
        name: String,
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[derive(Subcommand)]
enum DeploymentCommands {
    /// List all deployments
    List,

    /// Create a deployment
    Create {
        name: String,
        #[arg(long)]
        plugin: String,
        #[arg(long, default_value_t = 1)]
        replicas: u32,
    },

    /// Show a deployment's record
    Get { name: String },

    /// Change a deployment's replica count
    Scale { name: String, replicas: u32 },

    /// Delete a deployment and all of its VMs
    Delete {
        name: String,
        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// List installed plugins
    List,

    /// Install a plugin from a manifest JSON file
    Install { manifest_path: String },

    /// Show a plugin's manifest
    Get { name: String },

    /// Remove an installed plugin
    Remove {
        name: String,
        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    /// Enable a disabled plugin
    Enable { name: String },

    /// Disable an enabled plugin
    Disable { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format = if std::env::var("VOLANT_LOG_JSON").is_ok() { LogFormat::Json } else { LogFormat::Human };
    let logging_config = LoggingConfig::from_env("volant-cli").with_format(log_format).with_level("volant_cli=info,volant_logging=warn");
    if std::env::var("VOLANT_DEBUG").is_ok() {
        volant_logging::init_logging(logging_config)?;
    }

    let mut config = Config::load()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(api_key) = cli.api_key {
        config.api_key = Some(api_key);
    }

    let client = ApiClient::new(&config)?;

    match cli.command {
        Commands::Vm(cmd) => match cmd {
            VmCommands::List => vm::list(&client).await?,
            VmCommands::Create { name, plugin, cpu, memory_mib } => vm::create(&client, &name, &plugin, cpu, memory_mib).await?,
            VmCommands::Get { name } => vm::get(&client, &name).await?,
            VmCommands::Start { name } => vm::start(&client, &name).await?,
            VmCommands::Stop { name, force } => vm::stop(&client, &name, force).await?,
            VmCommands::Restart { name } => vm::restart(&client, &name).await?,
            VmCommands::Destroy { name, yes } => vm::destroy(&client, &name, yes).await?,
            VmCommands::Config(cmd) => match cmd {
                VmConfigCommands::Get { name } => vm::config_get(&client, &name).await?,
                VmConfigCommands::Set { name, cpu, memory_mib, kernel_cmdline_extra } => {
                    vm::config_set(&client, &name, cpu, memory_mib, kernel_cmdline_extra).await?
                }
                VmConfigCommands::History { name, limit } => vm::config_history(&client, &name, limit).await?,
            },
        },
        Commands::Deployment(cmd) => match cmd {
            DeploymentCommands::List => deployment::list(&client).await?,
            DeploymentCommands::Create { name, plugin, replicas } => deployment::create(&client, &name, &plugin, replicas).await?,
            DeploymentCommands::Get { name } => deployment::get(&client, &name).await?,
            DeploymentCommands::Scale { name, replicas } => deployment::scale(&client, &name, replicas).await?,
            DeploymentCommands::Delete { name, yes } => deployment::delete(&client, &name, yes).await?,
        },
        Commands::Plugin(cmd) => match cmd {
            PluginCommands::List => plugin::list(&client).await?,
            PluginCommands::Install { manifest_path } => plugin::install(&client, &manifest_path).await?,
            PluginCommands::Get { name } => plugin::get(&client, &name).await?,
            PluginCommands::Remove { name, yes } => plugin::remove(&client, &name, yes).await?,
            PluginCommands::Enable { name } => plugin::set_enabled(&client, &name, true).await?,
            PluginCommands::Disable { name } => plugin::set_enabled(&client, &name, false).await?,
        },
        Commands::Events => events::stream(&client).await?,
        Commands::Info => system::info(&client).await?,
        Commands::Health => system::health(&client).await?,
    }

    Ok(())
}
