//! Gateway client entry point
//!
//! Run with:
//! ```bash
//! DISCODE_TOKEN=... cargo run -p discode-gateway
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use discode_common::{try_init_tracing_with_config, GatewayConfig, TracingConfig};
use discode_gateway::{CachedGuild, Gateway, GatewayClient};
use serde_json::Value;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // The tracing preset is picked from the loaded environment
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Gateway client failed");
        std::process::exit(1);
    }
}

async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    info!(
        env = ?config.env,
        intents = config.intents.bits(),
        chunk_guilds = config.chunk_guilds_at_startup,
        "Configuration loaded"
    );

    let (session, client) = Gateway::new(config).build();
    register_listeners(&client);

    let signal_client = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_client.shutdown();
        }
    });

    session.run().await?;
    info!(guilds = client.cache().guild_count(), "Gateway client stopped");
    Ok(())
}

fn register_listeners(client: &GatewayClient) {
    let ready_client = client.clone();
    client.on("ready", move |_| {
        let client = ready_client.clone();
        async move {
            info!(
                session_id = ?client.session_id(),
                user_id = ?client.user_id(),
                "Connected"
            );
            Ok(())
        }
    });

    let guild_client = client.clone();
    client.on("guild_create", move |data: Value| {
        let client = guild_client.clone();
        async move {
            let guild = guild_id(&data).and_then(|id| client.cache().guild(id));
            if let Some(guild) = guild {
                log_guild(&guild);
            }
            Ok(())
        }
    });
}

fn guild_id(data: &Value) -> Option<discode_core::Snowflake> {
    data.get("id")?.as_str()?.parse().ok()
}

fn log_guild(guild: &CachedGuild) {
    info!(
        guild_id = %guild.id,
        name = %guild.name,
        members = ?guild.member_count,
        text_channels = guild.text_channels().len(),
        roles = guild.roles().len(),
        "Guild available"
    );
}
