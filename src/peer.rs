//! Diagnostic signaling peer
//!
//! Connects to a relay, announces a role and logs every envelope the relay
//! pushes back. Useful for checking that a relay routes `viewer_connected`,
//! offers, answers and candidates where they belong without a browser.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::config::PeerArgs;
use crate::model::message::Signal;

pub async fn run(args: PeerArgs) -> Result<()> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(args.url.as_str())
        .await
        .with_context(|| format!("connecting to {}", args.url))?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    info!("Connected to signaling relay at {}", args.url);

    let announce = json!({ "type": args.role.as_str() });
    ws_sender.send(Message::Text(announce.to_string())).await?;
    info!("Announced as {}", args.role.as_str());

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => match Signal::parse(&text) {
                    Ok(signal) => info!("Received {} ({} bytes)", signal.kind(), text.len()),
                    Err(e) => warn!("Relay sent an unreadable frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Relay closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("reading from relay"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing");
                ws_sender.send(Message::Close(None)).await?;
                break;
            }
        }
    }

    Ok(())
}
