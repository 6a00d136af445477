use crate::domain::IngestService;
use anyhow::{anyhow, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct MqttSubscriberConfig {
    pub broker_url: String,
    pub username: String,
    pub password: String,
    pub topic: String,
    pub max_retry_attempts: u32,
    pub retry_delay: Duration,
}

/// Run the MQTT subscriber process for the ingestion feed.
///
/// Subscribes to the configured topic and hands every publish to the ingest
/// service. Connection errors are retried up to the configured attempt
/// count; cancellation stops the loop cleanly.
#[instrument(name = "mqtt_subscriber", skip_all, fields(topic = %config.topic))]
pub async fn run_mqtt_subscriber(
    config: MqttSubscriberConfig,
    token: CancellationToken,
    ingest: Arc<IngestService>,
) -> Result<()> {
    info!(broker_url = %config.broker_url, "starting MQTT subscriber");

    let mut retry_count = 0;

    loop {
        if token.is_cancelled() {
            debug!("MQTT subscriber cancelled before connection");
            break;
        }

        match run_mqtt_connection(&config, &token, Arc::clone(&ingest)).await {
            Ok(()) => {
                debug!("MQTT subscriber stopped cleanly");
                break;
            }
            Err(e) => {
                error!(error = %e, "MQTT connection error");

                retry_count += 1;
                if retry_count >= config.max_retry_attempts {
                    error!(
                        max_retries = config.max_retry_attempts,
                        "max retry attempts reached, stopping MQTT subscriber"
                    );
                    return Err(anyhow!("MQTT subscriber gave up after {} attempts", retry_count));
                }

                warn!(
                    attempt = retry_count,
                    max_attempts = config.max_retry_attempts,
                    "retrying MQTT connection"
                );

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(config.retry_delay) => {}
                }
            }
        }
    }

    info!("MQTT subscriber stopped");
    Ok(())
}

/// Run a single MQTT connection session until error or cancellation.
async fn run_mqtt_connection(
    config: &MqttSubscriberConfig,
    token: &CancellationToken,
    ingest: Arc<IngestService>,
) -> Result<()> {
    let (host, port) = parse_broker_url(&config.broker_url)?;

    let mut mqtt_options = MqttOptions::new("ecostream-ingest", host, port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);
    if !config.username.is_empty() {
        mqtt_options.set_credentials(&config.username, &config.password);
    }

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);

    client
        .subscribe(&config.topic, QoS::AtLeastOnce)
        .await
        .map_err(|e| anyhow!("failed to subscribe: {}", e))?;

    info!(topic = %config.topic, "subscribed to MQTT topic");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!("shutdown signal received");
                let _ = client.disconnect().await;
                return Ok(());
            }
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        // Each message is an independent unit of work; keep
                        // the event loop free to accept further messages.
                        let ingest = Arc::clone(&ingest);
                        let payload = publish.payload.to_vec();
                        let topic = publish.topic.clone();
                        tokio::spawn(async move {
                            handle_message(&ingest, &topic, &payload).await;
                        });
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        debug!("subscription acknowledged");
                    }
                    Ok(_) => {
                        // Other events (outgoing, pings, etc.)
                    }
                    Err(e) => {
                        return Err(anyhow!("MQTT event loop error: {}", e));
                    }
                }
            }
        }
    }
}

/// Validate, write and fan out one inbound message.
///
/// The feed is fire-and-forget: a rejected payload is logged and dropped,
/// never surfaced to the publisher.
pub(crate) async fn handle_message(ingest: &IngestService, topic: &str, payload: &[u8]) {
    match ingest.ingest(payload).await {
        Ok(()) => debug!(topic = %topic, "message ingested"),
        Err(e) => warn!(topic = %topic, error = %e, "message rejected"),
    }
}

/// Parse broker URL in format mqtt://host:port or tcp://host:port or host:port
fn parse_broker_url(url: &str) -> Result<(&str, u16)> {
    let url = url.trim_start_matches("mqtt://");
    let url = url.trim_start_matches("tcp://");

    let parts: Vec<&str> = url.split(':').collect();
    match parts.len() {
        1 => Ok((parts[0], 1883)), // Default MQTT port
        2 => {
            let port = parts[1]
                .parse::<u16>()
                .map_err(|_| anyhow!("invalid port in broker URL: {}", parts[1]))?;
            Ok((parts[0], port))
        }
        _ => Err(anyhow!("invalid broker URL format: {}", url)),
    }
}
