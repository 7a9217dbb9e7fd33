mod config;
mod display;
mod mqtt;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting mqtt-hdmi-controller (mqtt={}:{}, topic={}, auth={})",
        config.mqtt.broker_host,
        config.mqtt.broker_port,
        config.mqtt.topic,
        config.has_credentials(),
    );

    let mut mqtt_client = mqtt::client::MqttClient::new(&config.mqtt);
    if let Err(e) = mqtt_client.connect().await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    let controller = display::DisplayController::new(&config.display);

    let (message_tx, mut message_rx) = mpsc::channel::<mqtt::MqttMessage>(32);
    let mqtt_handle = tokio::spawn(async move {
        mqtt_client.run(message_tx).await;
    });

    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            std::process::exit(1);
        }
    };

    // Messages are handled one at a time, in arrival order
    loop {
        tokio::select! {
            msg = message_rx.recv() => {
                let Some(msg) = msg else {
                    warn!("MQTT task stopped");
                    break;
                };
                info!("Received message on topic: {}", msg.topic);
                info!("Message payload: {}", msg.payload);
                if let Some(dispatch) = controller.handle_payload(&msg.payload).await {
                    dispatch.log();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }
    }

    mqtt_handle.abort();
    info!("mqtt-hdmi-controller stopped");
}
