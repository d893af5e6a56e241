//! `WS /ws/v1/vms/:name/console`: a raw byte bridge between the caller's
//! WebSocket and the VM's serial Unix socket. Text frames aren't
//! meaningful here — everything is forwarded as bytes in both directions.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::warn;

use crate::state::AppState;

pub async fn bridge(State(state): State<AppState>, Path(name): Path<String>, ws: WebSocketUpgrade) -> Response {
    let vm = match state.engine.get_vm(&name).await {
        Ok(vm) => vm,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let Some(socket_path) = vm.serial_socket_path else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };

    ws.on_upgrade(move |socket| async move {
        if let Err(e) = bridge_socket(socket, &socket_path).await {
            warn!(vm = %name, socket = %socket_path, error = %e, "console bridge terminated");
        }
    })
}

async fn bridge_socket(mut ws: WebSocket, socket_path: &str) -> anyhow::Result<()> {
    let mut serial = UnixStream::connect(socket_path).await?;
    let mut read_buf = [0u8; 4096];

    loop {
        tokio::select! {
            from_serial = serial.read(&mut read_buf) => {
                let n = from_serial?;
                if n == 0 {
                    break;
                }
                if ws.send(Message::Binary(read_buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
            from_ws = ws.recv() => {
                match from_ws {
                    Some(Ok(Message::Binary(data))) => serial.write_all(&data).await?,
                    Some(Ok(Message::Text(text))) => serial.write_all(text.as_bytes()).await?,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }

    Ok(())
}
