use std::time::Duration;

use anyhow::{Context, bail};
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, Publish, QoS, SubAck, SubscribeReasonCode};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;

use super::MqttMessage;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct MqttClient {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    /// Publishes that arrived before the SUBACK was seen.
    pending: Vec<MqttMessage>,
    reconnect_delay: Duration,
}

impl MqttClient {
    pub fn new(config: &MqttConfig) -> Self {
        let mut mqttopts = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        mqttopts.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));
        mqttopts.set_clean_session(true);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            mqttopts.set_credentials(user, pass);
        }

        let (client, eventloop) = AsyncClient::new(mqttopts, 10);

        Self {
            client,
            eventloop,
            topic: config.topic.clone(),
            pending: Vec::new(),
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    /// Connect and subscribe, waiting for the broker to acknowledge both.
    pub async fn connect(&mut self) -> anyhow::Result<()> {
        loop {
            let event = self
                .eventloop
                .poll()
                .await
                .context("Failed to connect to MQTT broker")?;
            if let Event::Incoming(Incoming::ConnAck(_)) = event {
                info!("Connected to MQTT broker");
                break;
            }
        }

        self.client
            .subscribe(&self.topic, QoS::AtMostOnce)
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.topic))?;

        loop {
            let event = self
                .eventloop
                .poll()
                .await
                .with_context(|| format!("Connection lost while subscribing to {}", self.topic))?;
            match event {
                Event::Incoming(Incoming::SubAck(suback)) => {
                    check_suback(&suback).with_context(|| format!("Broker rejected subscription to {}", self.topic))?;
                    info!("Subscribed to {}", self.topic);
                    return Ok(());
                }
                Event::Incoming(Incoming::Publish(publish)) => {
                    self.pending.push(to_message(&publish));
                }
                _ => {}
            }
        }
    }

    /// Run the MQTT event loop forever, forwarding incoming publishes through
    /// `message_tx`. Subscribes again after every reconnect.
    pub async fn run(mut self, message_tx: mpsc::Sender<MqttMessage>) {
        for msg in self.pending.drain(..) {
            if message_tx.send(msg).await.is_err() {
                warn!("Message channel closed");
                return;
            }
        }

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("Reconnected to MQTT broker");
                    if let Err(e) = self.client.subscribe(&self.topic, QoS::AtMostOnce).await {
                        error!("Failed to subscribe to {}: {}", self.topic, e);
                    }
                }
                Ok(Event::Incoming(Incoming::SubAck(suback))) => match check_suback(&suback) {
                    Ok(()) => info!("Subscribed to {}", self.topic),
                    Err(e) => error!("Broker rejected subscription to {}: {}", self.topic, e),
                },
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    if message_tx.send(to_message(&publish)).await.is_err() {
                        warn!("Message channel closed");
                        return;
                    }
                }
                Ok(event) => debug!("MQTT event: {:?}", event),
                Err(e) => {
                    error!("MQTT connection error: {}. Reconnecting...", e);
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}

fn to_message(publish: &Publish) -> MqttMessage {
    MqttMessage {
        topic: publish.topic.clone(),
        payload: String::from_utf8_lossy(&publish.payload).into_owned(),
    }
}

fn check_suback(suback: &SubAck) -> anyhow::Result<()> {
    if suback.return_codes.is_empty() {
        bail!("empty SUBACK");
    }
    if suback
        .return_codes
        .iter()
        .any(|code| matches!(code, SubscribeReasonCode::Failure))
    {
        bail!("SUBACK returned failure");
    }
    Ok(())
}
