//! Message-bus producer.
//!
//! Subscribes to an MQTT topic whose messages are JSON objects of already
//! normalized fields, and feeds each one through [`Station::ingest`] as a
//! partial update. Started from `main.rs` only when a broker is configured.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};

use crate::models::FieldUpdate;
use crate::station::{Payload, Station};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

// ---

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
}

/// Decode one bus message into a field update.
pub fn parse_payload(payload: &[u8]) -> Result<FieldUpdate> {
    // ---
    let value: serde_json::Value =
        serde_json::from_slice(payload).context("Payload is not valid JSON")?;
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("Payload is not a JSON object"))?;
    Ok(FieldUpdate::from_json(object))
}

/// Run the subscriber loop forever, reconnecting after errors.
pub async fn run(station: Arc<Station>, settings: MqttSettings) {
    // ---
    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    options.set_keep_alive(Duration::from_secs(60));

    let (client, mut eventloop) = AsyncClient::new(options, 10);
    tracing::info!(
        "[MQTT] Connecting to {}:{} (topic {})",
        settings.host,
        settings.port,
        settings.topic
    );

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                tracing::info!("[MQTT] Connected to {}:{}", settings.host, settings.port);
                // Subscribe on every (re)connect, the session is not persistent
                if let Err(e) = client.subscribe(&settings.topic, QoS::AtLeastOnce).await {
                    tracing::error!("[MQTT] Subscribe to {} failed: {}", settings.topic, e);
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_message(&station, &publish.payload).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    "[MQTT] Connection error: {}; retrying in {:?}",
                    e,
                    RECONNECT_DELAY
                );
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

async fn handle_message(station: &Station, payload: &[u8]) {
    // ---
    let update = match parse_payload(payload) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!("[MQTT] Dropping message: {:#}", e);
            return;
        }
    };

    let now = Utc::now().timestamp();
    if let Err(e) = station
        .ingest(Payload::Bus(update), station.location(), now)
        .await
    {
        tracing::error!("[MQTT] Failed to store update: {:#}", e);
    }
}
