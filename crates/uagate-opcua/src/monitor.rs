// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscription and monitored-item lifecycle management.
//!
//! Monitoring state is keyed by (server URL, topic, broker target): the
//! first request for a key creates a subscription at the minimum requested
//! sampling interval, later requests reuse it and may only lower its
//! publishing interval. One worker task per server drains the session's
//! notification stream and forwards formatted values to the realtime hub
//! and the publication's broker sink, so a slow sink never blocks
//! protocol delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conversion;
use crate::error::UaResult;
use crate::publish::{BrokerScheme, BrokerUrl, Publisher, PublisherRegistry, PushHub};
use crate::session::{SessionRegistry, UaSession};
use crate::transport::{
    DataChangeFilter, ItemNotification, MonitoredItemRequest, UaValue, ValueSample,
};
use crate::types::{DeadbandKind, NodeId};

// =============================================================================
// Monitor Requests
// =============================================================================

/// One node of a monitoring request, as received from the caller.
#[derive(Debug, Clone)]
pub struct MonitorItemSpec {
    /// External node id, `"<namespace>-<identifier>"`.
    pub node_id: String,

    /// Requested sampling interval for this node.
    pub sampling_interval: Duration,

    /// Deadband kind as supplied (`"None"`, `"Absolute"`, `"Percent"`).
    pub dead_band: String,

    /// Deadband threshold, interpreted per the kind.
    pub dead_band_value: f64,
}

impl MonitorItemSpec {
    /// An unfiltered item spec.
    pub fn new(node_id: impl Into<String>, sampling_interval: Duration) -> Self {
        Self {
            node_id: node_id.into(),
            sampling_interval,
            dead_band: DeadbandKind::None.to_string(),
            dead_band_value: 0.0,
        }
    }

    /// Sets the deadband kind and threshold.
    pub fn with_dead_band(mut self, kind: impl Into<String>, value: f64) -> Self {
        self.dead_band = kind.into();
        self.dead_band_value = value;
        self
    }
}

// =============================================================================
// Publication State
// =============================================================================

/// Book-keeping for one active (topic, broker target) publication.
pub struct MonitorPublishInfo {
    /// Topic the publication delivers under.
    pub topic: String,

    /// Scheme-stripped broker target.
    pub broker_target: String,

    /// Scheme the publication was created with.
    pub scheme: BrokerScheme,

    /// Server-assigned subscription id.
    pub subscription_id: u32,

    /// Current publishing interval; only ever lowered after creation.
    pub publishing_interval: Duration,

    /// Sink receiving the publication's notifications.
    pub publisher: Arc<dyn Publisher>,
}

// =============================================================================
// MonitoringManager
// =============================================================================

type ServerPublications = Arc<DashMap<String, Arc<Mutex<Vec<MonitorPublishInfo>>>>>;

struct NotificationWorker {
    session_id: Uuid,
    handle: JoinHandle<()>,
}

/// Manages subscriptions, monitored items, and notification forwarding
/// across all connected servers.
pub struct MonitoringManager {
    sessions: Arc<SessionRegistry>,
    publishers: Arc<PublisherRegistry>,
    hub: Arc<PushHub>,
    servers: ServerPublications,
    workers: DashMap<String, NotificationWorker>,
    stats: Arc<MonitorStats>,
}

impl MonitoringManager {
    /// Creates a manager over the given session and publisher registries.
    pub fn new(sessions: Arc<SessionRegistry>, publishers: Arc<PublisherRegistry>) -> Self {
        let hub = publishers.hub().clone();
        Self {
            sessions,
            publishers,
            hub,
            servers: Arc::new(DashMap::new()),
            workers: DashMap::new(),
            stats: Arc::new(MonitorStats::default()),
        }
    }

    /// Starts or extends monitoring of `items` on a server, publishing
    /// notifications for `topic` to the sink named by `broker_url`.
    ///
    /// Returns one flag per input node telling whether its monitored item
    /// was created; items the server refused are removed from the
    /// subscription right away. The caller's broker scheme, node ids, and
    /// deadband kinds are validated before any server state changes.
    pub async fn create_monitored_items(
        &self,
        server_url: &str,
        items: &[MonitorItemSpec],
        broker_url: &str,
        topic: &str,
    ) -> UaResult<Vec<bool>> {
        let broker = BrokerUrl::parse(broker_url)?;

        let mut parsed = Vec::with_capacity(items.len());
        for item in items {
            let node_id = NodeId::from_external(&item.node_id)?;
            let kind = DeadbandKind::parse(&item.dead_band)?;
            parsed.push((node_id, kind));
        }

        let Some(publishing_interval) = items.iter().map(|i| i.sampling_interval).min() else {
            return Ok(Vec::new());
        };

        let session = self.sessions.get_session(server_url).await?;
        let publisher = self.publishers.resolve(&broker).await?;

        let entry = {
            let slot = self
                .servers
                .entry(server_url.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new())));
            slot.value().clone()
        };
        let mut publications = entry.lock().await;

        let subscription_id = match publications
            .iter_mut()
            .find(|info| info.topic == topic && info.broker_target == broker.target())
        {
            Some(info) => {
                if info.publishing_interval > publishing_interval {
                    session
                        .set_publishing_interval(info.subscription_id, publishing_interval)
                        .await?;
                    debug!(
                        url = %server_url,
                        topic,
                        subscription_id = info.subscription_id,
                        from_ms = info.publishing_interval.as_millis() as u64,
                        to_ms = publishing_interval.as_millis() as u64,
                        "publishing interval lowered"
                    );
                    info.publishing_interval = publishing_interval;
                    self.stats.record_interval_lowered();
                }
                info.subscription_id
            }
            None => {
                let subscription_id = session.create_subscription(publishing_interval).await?;
                info!(
                    url = %server_url,
                    topic,
                    target = %broker.target(),
                    subscription_id,
                    interval_ms = publishing_interval.as_millis() as u64,
                    "subscription created"
                );
                publications.push(MonitorPublishInfo {
                    topic: topic.to_string(),
                    broker_target: broker.target().to_string(),
                    scheme: broker.scheme(),
                    subscription_id,
                    publishing_interval,
                    publisher,
                });
                self.stats.record_subscription();
                subscription_id
            }
        };

        let requests: Vec<MonitoredItemRequest> = items
            .iter()
            .zip(&parsed)
            .map(|(item, (node_id, kind))| {
                let mut request = MonitoredItemRequest::new(node_id.clone(), item.sampling_interval)
                    .named(item.node_id.clone());
                if *kind != DeadbandKind::None {
                    request =
                        request.with_filter(DataChangeFilter::deadband(*kind, item.dead_band_value));
                }
                request
            })
            .collect();

        let results = session
            .create_monitored_items(subscription_id, &requests)
            .await?;

        let outcomes: Vec<bool> = results.iter().map(|r| r.is_good()).collect();
        let failed: Vec<u32> = results
            .iter()
            .filter(|r| !r.is_good())
            .map(|r| r.monitored_item_id)
            .collect();

        if !failed.is_empty() {
            warn!(
                url = %server_url,
                topic,
                failed = failed.len(),
                "monitored items refused by server, removing"
            );
            if let Err(error) = session.remove_monitored_items(subscription_id, &failed).await {
                warn!(url = %server_url, %error, "failed to remove refused items");
            }
        }
        self.stats
            .record_items(outcomes.iter().filter(|ok| **ok).count(), failed.len());

        drop(publications);
        self.ensure_worker(server_url, &session);

        Ok(outcomes)
    }

    /// Stops the publication identified by (server, topic, broker target).
    ///
    /// The scheme prefix of `broker_url` is ignored for the lookup, so a
    /// caller may stop a publication without repeating the scheme it was
    /// created with. Returns `false` when no such publication exists or
    /// the subscription could not be deleted.
    pub async fn delete_monitoring(
        &self,
        server_url: &str,
        broker_url: &str,
        topic: &str,
    ) -> bool {
        let target = match BrokerUrl::parse(broker_url) {
            Ok(broker) => broker.target().to_string(),
            Err(_) => broker_url.to_string(),
        };

        let Some(entry) = self.servers.get(server_url).map(|slot| slot.value().clone()) else {
            return false;
        };
        let mut publications = entry.lock().await;

        let Some(index) = publications
            .iter()
            .position(|info| info.topic == topic && info.broker_target == target)
        else {
            return false;
        };

        let session = match self.sessions.get_session(server_url).await {
            Ok(session) => session,
            Err(error) => {
                warn!(url = %server_url, %error, "cannot reach server to delete subscription");
                return false;
            }
        };

        let subscription_id = publications[index].subscription_id;
        if let Err(error) = session.delete_subscription(subscription_id).await {
            warn!(url = %server_url, subscription_id, %error, "failed to delete subscription");
            return false;
        }

        publications.remove(index);
        if publications.is_empty() {
            self.servers.remove(server_url);
        }
        info!(url = %server_url, topic, target = %target, "monitoring publication removed");
        true
    }

    /// Number of active publications on a server.
    pub async fn publication_count(&self, server_url: &str) -> usize {
        match self.servers.get(server_url).map(|slot| slot.value().clone()) {
            Some(entry) => entry.lock().await.len(),
            None => 0,
        }
    }

    /// Counters for monitoring activity.
    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// Aborts all notification workers. Subscriptions on the servers are
    /// left to die with their sessions.
    pub fn stop_workers(&self) {
        self.workers.retain(|_, worker| {
            worker.handle.abort();
            false
        });
    }

    /// Ensures exactly one worker drains the given session's
    /// notifications. A worker bound to an evicted session is replaced.
    fn ensure_worker(&self, server_url: &str, session: &Arc<UaSession>) {
        match self.workers.entry(server_url.to_string()) {
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if current.session_id == session.id && !current.handle.is_finished() {
                    return;
                }
                let replaced = slot.insert(self.spawn_worker(session));
                replaced.handle.abort();
            }
            Entry::Vacant(slot) => {
                slot.insert(self.spawn_worker(session));
            }
        }
    }

    fn spawn_worker(&self, session: &Arc<UaSession>) -> NotificationWorker {
        let session = session.clone();
        let session_id = session.id;
        // Subscribe before the task runs so nothing sent in the meantime
        // is missed.
        let receiver = session.notifications();
        let servers = self.servers.clone();
        let hub = self.hub.clone();
        let stats = self.stats.clone();

        debug!(url = %session.endpoint_url, %session_id, "notification worker started");
        let handle = tokio::spawn(drain_notifications(session, receiver, servers, hub, stats));
        NotificationWorker { session_id, handle }
    }
}

// =============================================================================
// Notification Forwarding
// =============================================================================

async fn drain_notifications(
    session: Arc<UaSession>,
    mut receiver: broadcast::Receiver<ItemNotification>,
    servers: ServerPublications,
    hub: Arc<PushHub>,
    stats: Arc<MonitorStats>,
) {
    loop {
        match receiver.recv().await {
            Ok(notification) => {
                forward_notification(&session, &servers, &hub, &stats, notification).await;
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(url = %session.endpoint_url, missed, "notification stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!(url = %session.endpoint_url, "notification worker stopped");
}

async fn forward_notification(
    session: &Arc<UaSession>,
    servers: &ServerPublications,
    hub: &PushHub,
    stats: &MonitorStats,
    notification: ItemNotification,
) {
    let Some((topic, scheme, publisher)) =
        lookup_publication(servers, &session.endpoint_url, notification.subscription_id).await
    else {
        debug!(
            url = %session.endpoint_url,
            subscription_id = notification.subscription_id,
            "notification without matching publication"
        );
        return;
    };

    let rendered = render_value(session, &notification.node_id, &notification.value).await;
    let message = format!("{}: {rendered}", notification.node_id.to_external());

    // A push publication delivers through the hub itself; every other
    // scheme gets the realtime offer here so listeners see each
    // notification exactly once.
    if scheme != BrokerScheme::Push {
        hub.publish(&topic, &message);
    }
    if let Err(error) = publisher.publish(&topic, &message).await {
        warn!(topic = %topic, %error, "publisher delivery failed");
        stats.record_publish_failure();
    }
    stats.record_forwarded();
}

async fn lookup_publication(
    servers: &ServerPublications,
    server_url: &str,
    subscription_id: u32,
) -> Option<(String, BrokerScheme, Arc<dyn Publisher>)> {
    let entry = servers.get(server_url).map(|slot| slot.value().clone())?;
    let publications = entry.lock().await;
    publications
        .iter()
        .find(|info| info.subscription_id == subscription_id)
        .map(|info| (info.topic.clone(), info.scheme, info.publisher.clone()))
}

/// Re-reads the node so the forwarded value reflects its current typed
/// form; the value carried by the notification is the fallback when the
/// server refuses the read.
async fn render_value(session: &Arc<UaSession>, node_id: &NodeId, carried: &UaValue) -> String {
    match session.read_node(node_id).await {
        Ok(snapshot) => {
            let sample = match session.read_value(node_id).await {
                Ok(sample) => sample,
                Err(_) => ValueSample::good(node_id.clone(), carried.clone()),
            };
            match conversion::to_external_value(&sample, &snapshot).value {
                JsonValue::String(text) => text,
                other => other.to_string(),
            }
        }
        Err(error) => {
            debug!(node = %node_id, %error, "metadata re-read failed, forwarding carried value");
            carried.to_string()
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Counters describing monitoring activity since process start.
#[derive(Debug, Default)]
pub struct MonitorStats {
    subscriptions: AtomicU64,
    intervals_lowered: AtomicU64,
    items_created: AtomicU64,
    items_failed: AtomicU64,
    forwarded: AtomicU64,
    publish_failures: AtomicU64,
}

impl MonitorStats {
    fn record_subscription(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    fn record_interval_lowered(&self) {
        self.intervals_lowered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_items(&self, created: usize, failed: usize) {
        self.items_created.fetch_add(created as u64, Ordering::Relaxed);
        self.items_failed.fetch_add(failed as u64, Ordering::Relaxed);
    }

    fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Subscriptions created.
    pub fn subscriptions(&self) -> u64 {
        self.subscriptions.load(Ordering::Relaxed)
    }

    /// Publishing intervals lowered on reused subscriptions.
    pub fn intervals_lowered(&self) -> u64 {
        self.intervals_lowered.load(Ordering::Relaxed)
    }

    /// Monitored items the servers accepted.
    pub fn items_created(&self) -> u64 {
        self.items_created.load(Ordering::Relaxed)
    }

    /// Monitored items the servers refused.
    pub fn items_failed(&self) -> u64 {
        self.items_failed.load(Ordering::Relaxed)
    }

    /// Notifications forwarded to sinks.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Publisher deliveries that failed.
    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================
