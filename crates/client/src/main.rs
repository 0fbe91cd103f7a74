//! agora-replay: feed a captured push log through the reconciler.
//!
//! Reads one push envelope per line, dispatches the frames for a channel
//! subscription and prints the resulting feed as JSON.

use agora_common::Config;
use agora_core::models::SessionContext;
use agora_feed::{FeedReconciler, PushDispatcher, SubscriptionKey};
use anyhow::{Context, bail};
use serde_json::json;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: agora-replay <channel-id> <events.jsonl> [user-id]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (channel_id, path, user_id) = match args.as_slice() {
        [channel_id, path] => (channel_id.clone(), path.clone(), "replay".to_string()),
        [channel_id, path, user_id] => (channel_id.clone(), path.clone(), user_id.clone()),
        _ => bail!(USAGE),
    };

    let config = Config::load().context("Failed to load configuration")?;
    info!(%channel_id, %path, %user_id, buffer_size = config.stream.buffer_size, "Replaying push log");

    let file = File::open(&path)
        .await
        .with_context(|| format!("Failed to open {path}"))?;
    let (tx, rx) = mpsc::channel::<String>(config.stream.buffer_size.max(1));

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(file).lines();
        let mut read = 0usize;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    read += 1;
                    if tx.send(line).await.is_err() {
                        warn!("Dispatcher stopped before the log ended");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read push log: {}", e);
                    break;
                }
            }
        }
        read
    });

    let reconciler = FeedReconciler::new(SessionContext::new(user_id.clone()));
    let dispatcher = PushDispatcher::new(
        reconciler.clone(),
        SubscriptionKey::new(channel_id.clone(), user_id),
    );
    let stats = dispatcher.run(ReceiverStream::new(rx)).await;
    let read = reader.await.context("Push log reader panicked")?;
    info!(read, applied = stats.applied, skipped = stats.skipped, "Replay finished");

    let mut feeds = Vec::new();
    for id in reconciler.channel_ids().await {
        let feed = reconciler.channel(&id).await;
        let feed = feed.lock().await;
        feeds.push(json!({
            "channelId": id,
            "feed": feed.cache(),
        }));
    }
    let report = json!({
        "subscription": dispatcher.key(),
        "stats": stats,
        "channels": feeds,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
