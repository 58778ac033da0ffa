//! Badge Relay
//!
//! Listens for HTTP requests to badge apps in the GNOME Shell dock and relays
//! them to the session bus.

use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use tracing::info;

use badgerelay::config::{
    DEFAULT_DESTINATION, DEFAULT_HOST, DEFAULT_INTERFACE, DEFAULT_MEMBER, DEFAULT_PATH,
    DEFAULT_PORT,
};
use badgerelay::routes::{build_router, cors_layer};
use badgerelay::tracing_init::init_tracing;
use badgerelay::{RelayService, TracingLog};

#[derive(Parser, Debug)]
#[command(name = "badgerelay")]
#[command(
    version,
    about = "Listens for HTTP requests to badge apps in the Gnome Shell dock and relays the requests to dbus"
)]
struct Args {
    /// Port to start the http -> dbus relay service on.
    #[arg(long, env = "GSBADGE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host interface to start the http -> dbus relay service on.
    #[arg(long, env = "GSBADGE_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// D-Bus destination.
    #[arg(long, env = "GSBADGE_DEST", default_value = DEFAULT_DESTINATION)]
    dest: String,

    /// D-Bus object path.
    #[arg(long, env = "GSBADGE_FIELD_PATH", default_value = DEFAULT_PATH)]
    field_path: String,

    /// D-Bus interface name (excluding member name).
    #[arg(long, env = "GSBADGE_FIELD_INTERFACE", default_value = DEFAULT_INTERFACE)]
    field_interface: String,

    /// D-Bus member name (excluding interface name).
    #[arg(long, env = "GSBADGE_FIELD_MEMBER", default_value = DEFAULT_MEMBER)]
    field_member: String,

    /// Allowed CORS origin; repeat or comma-separate. Any origin when unset.
    #[arg(long, env = "GSBADGE_ALLOW_ORIGIN", value_delimiter = ',')]
    allow_origin: Vec<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "GSBADGE_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("badgerelay=info", args.log_json);

    let origins = args
        .allow_origin
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin {origin:?}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let relay = RelayService::builder()
        .log(TracingLog)
        .host(args.host)
        .port(args.port)
        .destination(args.dest)
        .path(args.field_path)
        .interface(args.field_interface)
        .member(args.field_member)
        .build()
        .await
        .context("error creating http -> DBus relay")?;

    let addr = relay.listen_addr();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        "Starting http -> DBus relay"
    );

    let app = build_router(Arc::new(relay), cors_layer(origins));
    let listener = tokio::net::TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Relay stopped");
    Ok(())
}
