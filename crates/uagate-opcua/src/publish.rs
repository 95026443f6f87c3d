// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Telemetry publisher sinks.
//!
//! Monitoring notifications leave the process through a [`Publisher`]
//! selected by the scheme of the caller's broker URL: `mqtt:` delivers to
//! an external broker, `push:` fans out to realtime listeners attached to
//! the API layer. Publishers are constructed once per (scheme, target) and
//! reused for every subscription that names the same sink.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{status, UaError, UaResult, UNSUPPORTED_BROKER_MESSAGE};
use crate::registry::KeyedRegistry;

// =============================================================================
// Broker URL
// =============================================================================

/// Telemetry protocols a broker URL may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerScheme {
    /// External MQTT broker.
    Mqtt,
    /// In-process realtime push hub.
    Push,
}

impl BrokerScheme {
    /// The scheme prefix as it appears in a broker URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mqtt => "mqtt",
            Self::Push => "push",
        }
    }
}

impl std::fmt::Display for BrokerScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `<scheme>:<target>` broker URL.
///
/// The target is everything after the scheme separator and is what
/// monitoring state is keyed on; `mqtt:broker.local` and
/// `push:broker.local` are distinct sinks with the same target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerUrl {
    scheme: BrokerScheme,
    target: String,
}

fn broker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(mqtt|push):(.*)$").expect("broker pattern is valid"))
}

impl BrokerUrl {
    /// Parses a scheme-prefixed broker URL.
    ///
    /// Anything that does not carry a supported scheme is caller input,
    /// including URLs with no scheme separator at all.
    pub fn parse(raw: &str) -> UaResult<Self> {
        let captures = broker_pattern()
            .captures(raw)
            .ok_or_else(|| UaError::caller_input(UNSUPPORTED_BROKER_MESSAGE))?;

        let scheme = match &captures[1] {
            "mqtt" => BrokerScheme::Mqtt,
            "push" => BrokerScheme::Push,
            _ => unreachable!("pattern admits only supported schemes"),
        };

        Ok(Self {
            scheme,
            target: captures[2].to_string(),
        })
    }

    /// The telemetry protocol selected by the URL.
    pub fn scheme(&self) -> BrokerScheme {
        self.scheme
    }

    /// The scheme-stripped broker target.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The registry key for this sink.
    pub fn key(&self) -> (BrokerScheme, String) {
        (self.scheme, self.target.clone())
    }
}

impl std::fmt::Display for BrokerUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.scheme, self.target)
    }
}

// =============================================================================
// Push Hub
// =============================================================================

/// Default capacity of the realtime broadcast channel.
const DEFAULT_PUSH_CAPACITY: usize = 256;

/// A realtime message offered to push listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    /// The monitoring topic the message belongs to.
    pub topic: String,
    /// The formatted payload, `"<node id>: <value>"`.
    pub body: String,
}

/// Process-wide fan-out channel for realtime listeners.
///
/// Every monitoring notification is offered here regardless of the broker
/// scheme; listeners may or may not be connected, and a send with no
/// receivers is not a failure.
#[derive(Debug)]
pub struct PushHub {
    sender: broadcast::Sender<PushMessage>,
}

impl PushHub {
    /// Creates a hub with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes a new listener. Slow listeners lag and drop the oldest
    /// messages rather than applying backpressure to the producer.
    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.sender.subscribe()
    }

    /// Offers a message to whoever is listening. Returns the number of
    /// listeners that received it.
    pub fn publish(&self, topic: &str, body: &str) -> usize {
        self.sender
            .send(PushMessage {
                topic: topic.to_string(),
                body: body.to_string(),
            })
            .unwrap_or(0)
    }

    /// Number of currently attached listeners.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new(DEFAULT_PUSH_CAPACITY)
    }
}

// =============================================================================
// Publisher Trait
// =============================================================================

/// A telemetry sink for monitoring notifications.
///
/// Delivery is fire-and-forget from the caller's perspective: the
/// notification worker logs a failed publish and moves on.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Delivers one formatted message to the sink under the given topic.
    async fn publish(&self, topic: &str, message: &str) -> UaResult<()>;
}

// =============================================================================
// MQTT Publisher
// =============================================================================

const MQTT_DEFAULT_PORT: u16 = 1883;
const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(30);
const MQTT_CHANNEL_CAPACITY: usize = 10;
const MQTT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Splits a broker target into host and port, defaulting the port.
fn split_host_port(target: &str) -> (String, u16) {
    if let Some((host, port)) = target.rsplit_once(':') {
        if let Ok(port) = port.parse() {
            return (host.to_string(), port);
        }
    }
    (target.to_string(), MQTT_DEFAULT_PORT)
}

/// Publisher backed by an MQTT broker connection.
pub struct MqttPublisher {
    client: AsyncClient,
    target: String,
}

impl MqttPublisher {
    /// Connects to the broker named by `target` (`host` or `host:port`)
    /// and starts the background event-loop task that keeps the
    /// connection alive.
    pub fn connect(target: &str) -> Self {
        let (host, port) = split_host_port(target);
        let client_id = format!("uagate-{}", uuid::Uuid::new_v4().simple());

        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(MQTT_KEEP_ALIVE);
        options.set_clean_session(true);

        let (client, mut event_loop) = AsyncClient::new(options, MQTT_CHANNEL_CAPACITY);

        let loop_target = target.to_string();
        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(event) => {
                        debug!(target = %loop_target, ?event, "mqtt event");
                    }
                    Err(error) => {
                        warn!(target = %loop_target, %error, "mqtt connection error, retrying");
                        tokio::time::sleep(MQTT_RECONNECT_DELAY).await;
                    }
                }
            }
        });

        Self {
            client,
            target: target.to_string(),
        }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, message: &str) -> UaResult<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, message)
            .await
            .map_err(|error| UaError::Protocol {
                status_code: status::BAD_COMMUNICATION_ERROR,
                message: format!("mqtt publish to {} failed: {error}", self.target),
            })
    }
}

// =============================================================================
// Push Publisher
// =============================================================================

/// Publisher that forwards into the realtime push hub.
pub struct PushPublisher {
    hub: Arc<PushHub>,
}

impl PushPublisher {
    /// Creates a publisher delivering to the given hub.
    pub fn new(hub: Arc<PushHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Publisher for PushPublisher {
    async fn publish(&self, topic: &str, message: &str) -> UaResult<()> {
        self.hub.publish(topic, message);
        Ok(())
    }
}

// =============================================================================
// Publisher Registry
// =============================================================================

/// Process-wide registry of publisher sinks, one per (scheme, target).
///
/// Resolution is atomic per key; concurrent monitor requests naming the
/// same sink share a single publisher. A failed construction is not
/// cached, so the next request retries.
pub struct PublisherRegistry {
    hub: Arc<PushHub>,
    publishers: KeyedRegistry<(BrokerScheme, String), Arc<dyn Publisher>>,
}

impl PublisherRegistry {
    /// Creates a registry whose `push:` sinks deliver to the given hub.
    pub fn new(hub: Arc<PushHub>) -> Self {
        Self {
            hub,
            publishers: KeyedRegistry::new(),
        }
    }

    /// Returns the publisher for a broker URL, constructing it on first
    /// use.
    pub async fn resolve(&self, broker: &BrokerUrl) -> UaResult<Arc<dyn Publisher>> {
        let hub = self.hub.clone();
        let target = broker.target().to_string();
        let scheme = broker.scheme();

        self.publishers
            .get_or_try_init(&broker.key(), || async move {
                let publisher: Arc<dyn Publisher> = match scheme {
                    BrokerScheme::Mqtt => Arc::new(MqttPublisher::connect(&target)),
                    BrokerScheme::Push => Arc::new(PushPublisher::new(hub)),
                };
                debug!(%scheme, target = %target, "publisher created");
                Ok(publisher)
            })
            .await
    }

    /// The hub that `push:` sinks and realtime listeners share.
    pub fn hub(&self) -> &Arc<PushHub> {
        &self.hub
    }

    /// Number of live publisher sinks.
    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    /// Returns `true` when no publisher has been constructed yet.
    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::UNSUPPORTED_BROKER_MESSAGE;

    #[test]
    fn test_broker_url_parsing() {
        let mqtt = BrokerUrl::parse("mqtt:broker.local:1883").unwrap();
        assert_eq!(mqtt.scheme(), BrokerScheme::Mqtt);
        assert_eq!(mqtt.target(), "broker.local:1883");

        let push = BrokerUrl::parse("push:plant-floor").unwrap();
        assert_eq!(push.scheme(), BrokerScheme::Push);
        assert_eq!(push.target(), "plant-floor");

        // An empty target is still a valid sink.
        assert_eq!(BrokerUrl::parse("push:").unwrap().target(), "");
    }

    #[test]
    fn test_broker_url_rejects_unknown_scheme() {
        for raw in ["amqp:broker.local", "broker.local", "", "MQTT:broker"] {
            let error = BrokerUrl::parse(raw).unwrap_err();
            assert!(error.is_caller_input(), "{raw}");
            assert_eq!(error.to_string(), UNSUPPORTED_BROKER_MESSAGE);
        }
    }

    #[test]
    fn test_host_port_split() {
        assert_eq!(split_host_port("broker.local"), ("broker.local".into(), 1883));
        assert_eq!(split_host_port("broker.local:8883"), ("broker.local".into(), 8883));
        assert_eq!(split_host_port("10.0.0.7:1884"), ("10.0.0.7".into(), 1884));
        // A trailing segment that is not a port stays part of the host.
        assert_eq!(split_host_port("broker:extra"), ("broker:extra".into(), 1883));
    }

    #[tokio::test]
    async fn test_push_hub_fan_out() {
        let hub = PushHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let delivered = hub.publish("plant", "2-1001: 42");
        assert_eq!(delivered, 2);

        assert_eq!(first.recv().await.unwrap().body, "2-1001: 42");
        assert_eq!(second.recv().await.unwrap().topic, "plant");
    }

    #[tokio::test]
    async fn test_push_hub_without_listeners() {
        let hub = PushHub::default();
        assert_eq!(hub.publish("plant", "dropped"), 0);
        assert_eq!(hub.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_registry_reuses_push_publisher() {
        let registry = PublisherRegistry::new(Arc::new(PushHub::default()));
        let broker = BrokerUrl::parse("push:floor").unwrap();

        let first = registry.resolve(&broker).await.unwrap();
        let second = registry.resolve(&broker).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);

        let other = BrokerUrl::parse("push:office").unwrap();
        let third = registry.resolve(&other).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_push_publisher_delivers_to_hub() {
        let hub = Arc::new(PushHub::new(8));
        let mut listener = hub.subscribe();

        let publisher = PushPublisher::new(hub);
        publisher.publish("plant", "2-1001: true").await.unwrap();

        let message = listener.recv().await.unwrap();
        assert_eq!(message.topic, "plant");
        assert_eq!(message.body, "2-1001: true");
    }
}
