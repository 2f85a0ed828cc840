//! presence-ipc demo - publishes a presence and logs peer events.
//!
//! Settings come from the config file and `PRESENCE_IPC_*` variables; the
//! command line overrides both. See the `presence_ipc` library for the
//! client itself.

use anyhow::{Context, Result};
use clap::Parser;
use presence_ipc::{Client, ClientBuilder, Config, Event, JoinReply, RichPresence};

// CLI
#[derive(Parser)]
#[command(name = "presence-ipc")]
#[command(version)]
#[command(about = "Publish a Rich Presence activity over local IPC")]
struct Cli {
    /// Application id (overrides config and PRESENCE_IPC_APP_ID)
    #[arg(long)]
    app_id: Option<String>,
    /// First line of the activity
    #[arg(long, default_value = "Idle")]
    details: String,
    /// Second line of the activity
    #[arg(long)]
    state: Option<String>,
    /// Asset key of the large image
    #[arg(long)]
    large_image: Option<String>,
    /// Skip launch URL scheme registration
    #[arg(long)]
    no_register: bool,
}

impl Cli {
    fn presence(&self) -> RichPresence {
        let mut presence = RichPresence::new()
            .details(self.details.as_str())
            .started_at(chrono::Utc::now());
        if let Some(state) = &self.state {
            presence = presence.state(state.as_str());
        }
        if let Some(key) = &self.large_image {
            presence = presence.large_image(key.as_str(), self.details.as_str());
        }
        presence
    }
}

fn log_event(_client: &Client, event: &Event) {
    log::info!("Event: {event:?}");
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(app_id) = &cli.app_id {
        config.app_id.clone_from(app_id);
    }
    if cli.no_register {
        config.auto_register = false;
    }
    anyhow::ensure!(
        !config.app_id.is_empty(),
        "No application id: pass --app-id or set PRESENCE_IPC_APP_ID"
    );

    let client = ClientBuilder::from_config(&config)
        .observe(log_event)
        .on_join_request(|client: &Client, request, _secret: &str| {
            log::info!(
                "Declining join request from {} ({})",
                request.username(),
                request.user_id()
            );
            client.reply(request, JoinReply::No);
        })
        .on_disconnect(|_client: &Client, code, message| {
            log::warn!("Disconnected: code={code:?} message={message:?}");
        })
        .build();

    client.set_presence(cli.presence());
    client
        .connect()
        .await
        .context("Is the desktop app running?")?;

    tokio::signal::ctrl_c()
        .await
        .context("listen for Ctrl-C")?;
    log::info!("Shutting down");
    client.shutdown().await;

    Ok(())
}
