use anyhow::{bail, Context, Result};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;

use volant_core::config::{ConfigHistoryParams, VmConfig, VmConfigHistoryEntry, VmConfigOverride};
use volant_core::deployment::{CreateDeploymentRequest, Deployment, ListDeploymentsResponse, ScaleDeploymentRequest};
use volant_core::manifest::{Plugin, PluginManifest, SetEnabledRequest};
use volant_core::types::{SuccessResponse, SystemInfo};
use volant_core::vm::{CreateVmRequest, ListVmsResponse, StopVmRequest, UpdateConfigResponse, Vm};

use crate::config::Config;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert("x-volant-api-key", header::HeaderValue::from_str(key)?);
        }

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body.get("error").and_then(|v| v.as_str()).unwrap_or("request failed");
            bail!("{} ({})", message, status);
        }
        resp.json().await.context("failed to parse response body")
    }

    async fn empty(resp: Response) -> Result<()> {
        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body.get("error").and_then(|v| v.as_str()).unwrap_or("request failed");
            bail!("{} ({})", message, status);
        }
        Ok(())
    }

    pub async fn system_info(&self) -> Result<SystemInfo> {
        let resp = self.client.get(self.url("/api/v1/system/info")).send().await?;
        Self::decode(resp).await
    }

    pub async fn list_vms(&self) -> Result<ListVmsResponse> {
        let resp = self.client.get(self.url("/api/v1/vms")).send().await?;
        let status = resp.status();
        let total: i64 = resp
            .headers()
            .get("x-total-count")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body.get("error").and_then(|v| v.as_str()).unwrap_or("request failed");
            bail!("{} ({})", message, status);
        }
        let vms: Vec<Vm> = resp.json().await.context("failed to parse response body")?;
        Ok(ListVmsResponse { vms, total })
    }

    pub async fn create_vm(&self, req: &CreateVmRequest) -> Result<Vm> {
        let resp = self.client.post(self.url("/api/v1/vms")).json(req).send().await?;
        Self::decode(resp).await
    }

    pub async fn get_vm(&self, name: &str) -> Result<Vm> {
        let resp = self.client.get(self.url(&format!("/api/v1/vms/{name}"))).send().await?;
        Self::decode(resp).await
    }

    pub async fn start_vm(&self, name: &str) -> Result<Vm> {
        let resp = self.client.post(self.url(&format!("/api/v1/vms/{name}/start"))).send().await?;
        Self::decode(resp).await
    }

    pub async fn stop_vm(&self, name: &str, force: bool) -> Result<Vm> {
        let resp = self
            .client
            .post(self.url(&format!("/api/v1/vms/{name}/stop")))
            .json(&StopVmRequest { force })
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn restart_vm(&self, name: &str) -> Result<Vm> {
        let resp = self.client.post(self.url(&format!("/api/v1/vms/{name}/restart"))).send().await?;
        Self::decode(resp).await
    }

    pub async fn destroy_vm(&self, name: &str) -> Result<()> {
        let resp = self.client.delete(self.url(&format!("/api/v1/vms/{name}"))).send().await?;
        Self::empty(resp).await
    }

    pub async fn get_vm_config(&self, name: &str) -> Result<VmConfig> {
        let resp = self.client.get(self.url(&format!("/api/v1/vms/{name}/config"))).send().await?;
        Self::decode(resp).await
    }

    pub async fn update_vm_config(&self, name: &str, patch: &VmConfigOverride) -> Result<UpdateConfigResponse> {
        let resp = self
            .client
            .patch(self.url(&format!("/api/v1/vms/{name}/config")))
            .json(patch)
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn vm_config_history(&self, name: &str, limit: Option<i64>) -> Result<Vec<VmConfigHistoryEntry>> {
        let mut req = self.client.get(self.url(&format!("/api/v1/vms/{name}/config/history")));
        if let Some(limit) = limit {
            req = req.query(&ConfigHistoryParams { limit: Some(limit) });
        }
        let resp = req.send().await?;
        Self::decode(resp).await
    }

    pub async fn list_deployments(&self) -> Result<ListDeploymentsResponse> {
        let resp = self.client.get(self.url("/api/v1/deployments")).send().await?;
        Self::decode(resp).await
    }

    pub async fn create_deployment(&self, req: &CreateDeploymentRequest) -> Result<Deployment> {
        let resp = self.client.post(self.url("/api/v1/deployments")).json(req).send().await?;
        Self::decode(resp).await
    }

    pub async fn get_deployment(&self, name: &str) -> Result<Deployment> {
        let resp = self.client.get(self.url(&format!("/api/v1/deployments/{name}"))).send().await?;
        Self::decode(resp).await
    }

    pub async fn scale_deployment(&self, name: &str, replicas: u32) -> Result<Deployment> {
        let resp = self
            .client
            .patch(self.url(&format!("/api/v1/deployments/{name}")))
            .json(&ScaleDeploymentRequest { replicas })
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn delete_deployment(&self, name: &str) -> Result<()> {
        let resp = self.client.delete(self.url(&format!("/api/v1/deployments/{name}"))).send().await?;
        Self::empty(resp).await
    }

    pub async fn list_plugins(&self) -> Result<Vec<Plugin>> {
        let resp = self.client.get(self.url("/api/v1/plugins")).send().await?;
        Self::decode(resp).await
    }

    pub async fn install_plugin(&self, manifest: &PluginManifest) -> Result<Plugin> {
        let resp = self.client.post(self.url("/api/v1/plugins")).json(manifest).send().await?;
        Self::decode(resp).await
    }

    pub async fn get_plugin(&self, name: &str) -> Result<Plugin> {
        let resp = self.client.get(self.url(&format!("/api/v1/plugins/{name}"))).send().await?;
        Self::decode(resp).await
    }

    pub async fn remove_plugin(&self, name: &str) -> Result<()> {
        let resp = self.client.delete(self.url(&format!("/api/v1/plugins/{name}"))).send().await?;
        Self::empty(resp).await
    }

    pub async fn set_plugin_enabled(&self, name: &str, enabled: bool) -> Result<SuccessResponse> {
        let resp = self
            .client
            .post(self.url(&format!("/api/v1/plugins/{name}/enabled")))
            .json(&SetEnabledRequest { enabled })
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Raw byte stream of the `text/event-stream` body for `events stream`
    /// to parse line by line — the stack has no dedicated SSE client crate,
    /// so the framing is read directly off `reqwest`'s chunked body.
    pub async fn events_stream(&self) -> Result<impl futures::Stream<Item = reqwest::Result<bytes::Bytes>>> {
        let resp = self.client.get(self.url("/api/v1/events/vms")).send().await?;
        if !resp.status().is_success() {
            bail!("event stream request failed ({})", resp.status());
        }
        Ok(resp.bytes_stream())
    }

    pub async fn health_check(&self) -> bool {
        self.client
            .get(self.url("/healthz"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
