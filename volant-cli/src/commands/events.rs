use anyhow::Result;
use colored::*;
use futures::StreamExt;

use crate::client::ApiClient;

/// Streams `/api/v1/events/vms` and prints each event as it arrives. The
/// wire format is plain SSE (`event: <type>\ndata: <json>\n\n`); parsed by
/// hand since the stack carries no dedicated SSE client.
pub async fn stream(client: &ApiClient) -> Result<()> {
    let mut body = client.events_stream().await?;
    let mut buf = String::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        buf.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buf.find("\n\n") {
            let block: String = buf.drain(..pos + 2).collect();
            print_event(&block);
        }
    }

    Ok(())
}

fn print_event(block: &str) {
    let mut event_type = "message";
    let mut data = String::new();

    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event_type = rest.trim();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data = rest.trim().to_string();
        }
    }

    if data.is_empty() || data == "keep-alive" {
        return;
    }

    println!("{} {}", event_type.cyan(), data);
}
