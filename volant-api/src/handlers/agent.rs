//! `/api/v1/vms/:name/agent/*`: a verbatim reverse proxy to the in-guest
//! agent, dialed over the VM's bridged/DHCP IP or a vsock connection
//! depending on its plugin's declared network mode. A failure to reach the
//! agent maps to 502 rather than a generic 500.

use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_vsock::{VsockAddr, VsockStream};

use volant_core::manifest::{NetworkMode, Plugin};
use volant_core::vm::VmStatus;

use crate::state::AppState;

/// Used when the request path doesn't match any action the manifest declares
/// a `timeout_ms` for.
const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Looks up the manifest action whose path matches the proxied request path
/// (both compared with a leading slash) and returns its declared timeout, or
/// the default when no action matches or it declares none.
fn action_timeout(plugin: &Plugin, path: &str) -> Duration {
    let normalized = format!("/{}", path.trim_start_matches('/'));
    plugin
        .manifest
        .actions
        .as_ref()
        .and_then(|actions| actions.values().find(|action| action.path == normalized))
        .and_then(|action| action.timeout_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_AGENT_TIMEOUT)
}

pub async fn proxy(State(state): State<AppState>, Path((name, path)): Path<(String, String)>, request: Request<Body>) -> Response {
    match proxy_inner(state, name, path, request).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

async fn proxy_inner(state: AppState, name: String, path: String, request: Request<Body>) -> Result<Response, StatusCode> {
    let vm = state.engine.get_vm(&name).await.map_err(|_| StatusCode::NOT_FOUND)?;
    if vm.status != VmStatus::Running {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let plugin = state.engine.registry().get(&vm.plugin).await.ok_or(StatusCode::NOT_FOUND)?;
    let query = request.uri().query().map(|q| format!("?{q}")).unwrap_or_default();
    let method = request.method().clone();
    let headers = request.headers().clone();
    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_GATEWAY)?;
    let timeout = action_timeout(&plugin, &path);

    match plugin.manifest.network.mode {
        NetworkMode::Vsock => {
            let cid = state.config.vsock_cid_base + vm.id as u32;
            proxy_over_vsock(cid, state.config.agent_vsock_port, &method, &path, &query, &headers, &body, timeout).await
        }
        NetworkMode::Bridged | NetworkMode::Dhcp => {
            let ip = vm.ip_address.ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
            proxy_over_http(&state, &ip, state.config.agent_http_port, &method, &path, &query, &headers, &body, timeout).await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn proxy_over_http(
    state: &AppState,
    ip: &str,
    port: u16,
    method: &axum::http::Method,
    path: &str,
    query: &str,
    headers: &HeaderMap,
    body: &[u8],
    timeout: Duration,
) -> Result<Response, StatusCode> {
    let url = format!("http://{ip}:{port}/{path}{query}");
    let mut req = state
        .agent_http
        .request(method.clone(), &url)
        .body(body.to_vec());

    for (name, value) in headers.iter().filter(|(n, _)| !is_hop_by_hop(n.as_str())) {
        req = req.header(name, value);
    }

    let upstream = tokio::time::timeout(timeout, req.send())
        .await
        .map_err(|_| StatusCode::GATEWAY_TIMEOUT)?
        .map_err(|_| StatusCode::BAD_GATEWAY)?;
    let status = upstream.status();
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream.headers().iter().filter(|(n, _)| !is_hop_by_hop(n.as_str())) {
        response_headers.insert(name, value.clone());
    }

    let bytes = tokio::time::timeout(timeout, upstream.bytes())
        .await
        .map_err(|_| StatusCode::GATEWAY_TIMEOUT)?
        .map_err(|_| StatusCode::BAD_GATEWAY)?;
    let mut response = Response::builder().status(status);
    *response.headers_mut().unwrap() = response_headers;
    response.body(Body::from(bytes)).map_err(|_| StatusCode::BAD_GATEWAY)
}

/// vsock has no HTTP library backing it in this stack, so the request and
/// response are framed by hand: a minimal HTTP/1.1 request is written over
/// the raw connection and the response is read back until the connection
/// closes.
#[allow(clippy::too_many_arguments)]
async fn proxy_over_vsock(
    cid: u32,
    port: u32,
    method: &axum::http::Method,
    path: &str,
    query: &str,
    headers: &HeaderMap,
    body: &[u8],
    timeout: Duration,
) -> Result<Response, StatusCode> {
    tokio::time::timeout(timeout, proxy_over_vsock_inner(cid, port, method, path, query, headers, body))
        .await
        .map_err(|_| StatusCode::GATEWAY_TIMEOUT)?
}

#[allow(clippy::too_many_arguments)]
async fn proxy_over_vsock_inner(
    cid: u32,
    port: u32,
    method: &axum::http::Method,
    path: &str,
    query: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, StatusCode> {
    let mut stream = VsockStream::connect(VsockAddr::new(cid, port))
        .await
        .map_err(|_| StatusCode::BAD_GATEWAY)?;

    let mut request = format!("{method} /{path}{query} HTTP/1.1\r\n");
    for (name, value) in headers.iter().filter(|(n, _)| !is_hop_by_hop(n.as_str())) {
        if let Ok(value) = value.to_str() {
            request.push_str(&format!("{name}: {value}\r\n"));
        }
    }
    request.push_str(&format!("content-length: {}\r\nconnection: close\r\n\r\n", body.len()));

    stream.write_all(request.as_bytes()).await.map_err(|_| StatusCode::BAD_GATEWAY)?;
    stream.write_all(body).await.map_err(|_| StatusCode::BAD_GATEWAY)?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.map_err(|_| StatusCode::BAD_GATEWAY)?;

    parse_http_response(&raw).ok_or(StatusCode::BAD_GATEWAY)
}

fn parse_http_response(raw: &[u8]) -> Option<Response> {
    let header_end = raw.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let header_text = std::str::from_utf8(&raw[..header_end]).ok()?;
    let mut lines = header_text.split("\r\n");
    let status_line = lines.next()?;
    let status_code: u16 = status_line.split_whitespace().nth(1)?.parse().ok()?;

    let mut builder = Response::builder().status(StatusCode::from_u16(status_code).ok()?);
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if !is_hop_by_hop(name) {
                builder = builder.header(name, value.trim());
            }
        }
    }

    builder.body(Body::from(raw[header_end..].to_vec())).ok()
}

fn is_hop_by_hop(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection" | "keep-alive" | "proxy-authenticate" | "proxy-authorization" | "te" | "trailer" | "transfer-encoding" | "upgrade" | "host"
    )
}
