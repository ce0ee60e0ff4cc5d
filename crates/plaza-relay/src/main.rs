//! plaza-relay: WebSocket fan-out relay for plaza sessions.
//!
//! Every accepted connection is assigned a fresh peer identity and greeted
//! with a `welcome` envelope. Text frames are re-stamped with the sender's
//! identity and forwarded to every other connection. The relay never
//! interprets payloads beyond the envelope.

mod connection;
mod hub;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;

use crate::connection::handle_connection;
use crate::hub::PeerHub;

#[derive(Parser)]
#[command(name = "plaza-relay", about = "WebSocket relay for plaza sessions")]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 7878)]
    port: u16,

    /// Address to bind.
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plaza_relay=info".into()),
        )
        .init();

    let args = Args::parse();
    let hub = PeerHub::new();

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    tracing::info!("plaza-relay listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let hub = hub.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, hub).await,
                        Err(e) => {
                            tracing::warn!(remote = %addr, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
