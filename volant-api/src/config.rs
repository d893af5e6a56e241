//! Environment-driven configuration: one `VOLANT_*` variable per field with
//! a sensible default.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use ipnet::Ipv4Net;
use volant_launcher::LauncherConfig;
use volant_orchestrator::EngineConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub subnet: Ipv4Net,
    pub host_ip: Ipv4Addr,
    pub bridge_name: String,
    pub runtime_dir: PathBuf,
    pub log_dir: PathBuf,
    pub hypervisor_binary: PathBuf,
    pub kernel_compressed: PathBuf,
    pub kernel_uncompressed: PathBuf,
    pub api_key: Option<String>,
    pub allowed_cidrs: Vec<ipnet::IpNet>,
    pub vsock_cid_base: u32,
    /// Per-URL deadline for boot-media staging downloads.
    pub download_timeout: Duration,
    /// Port the in-guest agent listens on over a bridged/DHCP attachment.
    /// Not named explicitly in the source material; fixed here so the
    /// reverse proxy has somewhere to dial. See DESIGN.md.
    pub agent_http_port: u16,
    /// vsock port the in-guest agent listens on for vsock-mode VMs.
    pub agent_vsock_port: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let subnet: Ipv4Net = env_or("VOLANT_SUBNET_CIDR", "10.100.0.0/24")
            .parse()
            .context("parsing VOLANT_SUBNET_CIDR")?;
        let host_ip: Ipv4Addr = env_or("VOLANT_HOST_IP", "10.100.0.1")
            .parse()
            .context("parsing VOLANT_HOST_IP")?;

        let allowed_cidrs = match std::env::var("VOLANT_ALLOWED_CIDRS") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|s| s.trim().parse::<ipnet::IpNet>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("parsing VOLANT_ALLOWED_CIDRS")?,
            _ => Vec::new(),
        };

        Ok(Self {
            bind_addr: env_or("VOLANT_BIND_ADDR", "0.0.0.0:7777"),
            database_url: env_or("VOLANT_DATABASE_URL", "sqlite:volant.db"),
            subnet,
            host_ip,
            bridge_name: env_or("VOLANT_BRIDGE_NAME", "vbr0"),
            runtime_dir: PathBuf::from(env_or("VOLANT_RUNTIME_DIR", "./data/run")),
            log_dir: PathBuf::from(env_or("VOLANT_LOG_DIR", "./data/log")),
            hypervisor_binary: PathBuf::from(env_or("VOLANT_HYPERVISOR_BIN", "cloud-hypervisor")),
            kernel_compressed: PathBuf::from(env_or("VOLANT_KERNEL_COMPRESSED", "/var/lib/volant/kernel.gz")),
            kernel_uncompressed: PathBuf::from(env_or("VOLANT_KERNEL_UNCOMPRESSED", "/var/lib/volant/vmlinux")),
            api_key: std::env::var("VOLANT_API_KEY").ok(),
            allowed_cidrs,
            vsock_cid_base: env_or("VOLANT_VSOCK_CID_BASE", "3")
                .parse()
                .context("parsing VOLANT_VSOCK_CID_BASE")?,
            download_timeout: Duration::from_secs(
                env_or("VOLANT_DOWNLOAD_TIMEOUT_SECS", "300")
                    .parse()
                    .context("parsing VOLANT_DOWNLOAD_TIMEOUT_SECS")?,
            ),
            agent_http_port: env_or("VOLANT_AGENT_HTTP_PORT", "8080")
                .parse()
                .context("parsing VOLANT_AGENT_HTTP_PORT")?,
            agent_vsock_port: env_or("VOLANT_AGENT_VSOCK_PORT", "10000")
                .parse()
                .context("parsing VOLANT_AGENT_VSOCK_PORT")?,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            subnet: self.subnet,
            host_ip: self.host_ip,
            bridge_name: self.bridge_name.clone(),
            api_host: self.host_ip.to_string(),
            api_port: self.bind_port(),
            vsock_cid_base: self.vsock_cid_base,
            launch_deadline: Duration::from_secs(60),
        }
    }

    pub fn launcher_config(&self) -> LauncherConfig {
        LauncherConfig {
            hypervisor_binary: self.hypervisor_binary.clone(),
            compressed_kernel_path: self.kernel_compressed.clone(),
            uncompressed_kernel_path: self.kernel_uncompressed.clone(),
            runtime_dir: self.runtime_dir.clone(),
            stop_grace: Duration::from_secs(10),
            download_timeout: self.download_timeout,
        }
    }

    fn bind_port(&self) -> u16 {
        self.bind_addr
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(7777)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
