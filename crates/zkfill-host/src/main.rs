//! Stdio native-messaging host for the zkfill engine.
//!
//! Speaks the browser native-messaging framing (u32-LE length prefix +
//! JSON) on stdin/stdout and dispatches each inbound operation to the
//! engine. Logs go to stderr — stdout belongs to the protocol.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zkfill_bridge::{NativeError, NativeHostConfig, framing};
use zkfill_engine::{Engine, EngineConfig, JsonFileStore, Request, Response};

#[derive(Parser, Debug)]
#[command(
    name = "zkfill-host",
    about = "Native-messaging host exposing the zkfill credential-resolution engine",
    version
)]
struct Args {
    /// Path of the JSON state file (config, tokens, keypair).
    #[arg(long, default_value = "zkfill-state.json")]
    store: PathBuf,

    /// Downstream native host program used as the fallback lookup path.
    #[arg(long)]
    native_host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::info!(store = %args.store.display(), "zkfill host starting");

    let store = Arc::new(JsonFileStore::new(&args.store));
    let engine = Engine::new(
        store,
        EngineConfig {
            native_host: args.native_host.map(NativeHostConfig::new),
        },
    )
    .await;

    let mut input = tokio::io::stdin();
    let mut output = tokio::io::stdout();

    loop {
        let frame = match framing::read_frame(&mut input).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!("stdin closed, shutting down");
                break;
            }
            // A non-JSON frame was fully consumed; answer and keep going.
            Err(NativeError::Serialization(err)) => {
                tracing::warn!(error = %err, "undecodable request frame");
                let reply = serde_json::to_value(Response::error("bad_request"))?;
                framing::write_frame(&mut output, &reply).await?;
                continue;
            }
            // Anything else leaves the stream in an unknown state.
            Err(err) => {
                tracing::error!(error = %err, "protocol failure, shutting down");
                break;
            }
        };

        let response = match serde_json::from_value::<Request>(frame) {
            Ok(request) => engine.handle(request).await,
            Err(err) => {
                tracing::warn!(error = %err, "unknown or malformed operation");
                Response::error("unknown_action")
            }
        };

        let reply = serde_json::to_value(&response)?;
        framing::write_frame(&mut output, &reply).await?;
    }

    Ok(())
}
