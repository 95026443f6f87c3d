// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Gateway Integration Tests
//!
//! These tests drive the full orchestration stack against an in-memory
//! transport that models a small plant address space, including reference
//! pagination, type hierarchies, and notification delivery.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p uagate-opcua --test gateway_integration
//!
//! # Run a specific flow
//! cargo test -p uagate-opcua --test gateway_integration -- test_monitor_flow
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;

use uagate_opcua::{
    status, BrowseBatch, BrowseDirection, BrowseRequest, ClientOptions, DeadbandCapability,
    EndpointSummary, Gateway, ItemNotification, MonitorItemSpec, MonitoredItemRequest,
    MonitoredItemResult, NodeClass, NodeId, NodeInfo, NodeKind, NodeSnapshot,
    ReferenceDescription, TransportFactory, UaError, UaResult, UaTransport, UaValue, ValueSample,
};

// =============================================================================
// Test Configuration
// =============================================================================

const SERVER_URL: &str = "opc.tcp://plant:4840";

/// References per browse response before the mock hands out a
/// continuation point. Small on purpose so every multi-child browse
/// exercises the resume loop.
const PAGE_SIZE: usize = 2;

// =============================================================================
// Mock Transport
// =============================================================================

struct Edge {
    source: NodeId,
    reference: NodeId,
    target: NodeId,
}

/// In-memory OPC UA server: nodes, references, values, subscriptions.
pub struct PlantTransport {
    url: String,
    nodes: RwLock<HashMap<String, NodeSnapshot>>,
    edges: RwLock<Vec<Edge>>,
    values: RwLock<HashMap<String, UaValue>>,
    continuations: Mutex<HashMap<Vec<u8>, Vec<ReferenceDescription>>>,
    next_token: AtomicU32,
    next_subscription: AtomicU32,
    next_item: AtomicU32,
    created_intervals: Mutex<Vec<Duration>>,
    revised_intervals: Mutex<Vec<(u32, Duration)>>,
    writes: Mutex<Vec<(NodeId, UaValue)>>,
    healthy: AtomicBool,
    closed: AtomicUsize,
    notify_tx: broadcast::Sender<ItemNotification>,
}

fn organizes() -> NodeId {
    NodeId::numeric(0, 35)
}

fn has_component() -> NodeId {
    NodeId::numeric(0, 47)
}

fn has_property() -> NodeId {
    NodeId::numeric(0, 46)
}

fn has_type_definition() -> NodeId {
    NodeId::numeric(0, 40)
}

fn has_subtype() -> NodeId {
    NodeId::numeric(0, 45)
}

fn hierarchical_references() -> NodeId {
    NodeId::numeric(0, 33)
}

fn is_hierarchical(reference: &NodeId) -> bool {
    *reference == organizes() || *reference == has_component() || *reference == has_property()
}

impl PlantTransport {
    fn empty(url: &str) -> Self {
        let (notify_tx, _) = broadcast::channel(32);
        let transport = Self {
            url: url.to_string(),
            nodes: RwLock::new(HashMap::new()),
            edges: RwLock::new(Vec::new()),
            values: RwLock::new(HashMap::new()),
            continuations: Mutex::new(HashMap::new()),
            next_token: AtomicU32::new(1),
            next_subscription: AtomicU32::new(1),
            next_item: AtomicU32::new(1),
            created_intervals: Mutex::new(Vec::new()),
            revised_intervals: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
            closed: AtomicUsize::new(0),
            notify_tx,
        };
        transport.add_object(NodeId::OBJECTS_FOLDER, "Objects");
        transport
    }

    fn add_node(&self, snapshot: NodeSnapshot) {
        self.nodes
            .write()
            .unwrap()
            .insert(snapshot.node_id.to_opc_string(), snapshot);
    }

    fn add_object(&self, node_id: NodeId, name: &str) {
        self.add_node(NodeSnapshot {
            node_id,
            display_name: name.into(),
            browse_name: format!("2:{name}"),
            info: NodeInfo::Object { event_notifier: 0 },
        });
    }

    fn add_typed(&self, node_id: NodeId, name: &str, node_class: NodeClass) {
        self.add_node(NodeSnapshot {
            node_id,
            display_name: name.into(),
            browse_name: format!("0:{name}"),
            info: NodeInfo::Other { node_class },
        });
    }

    fn add_variable(&self, node_id: NodeId, name: &str, data_type: u32, access: u8, value: UaValue) {
        self.add_node(NodeSnapshot {
            node_id: node_id.clone(),
            display_name: name.into(),
            browse_name: format!("2:{name}"),
            info: NodeInfo::Variable {
                data_type: NodeId::numeric(0, data_type),
                value_rank: -1,
                user_access_level: access,
                minimum_sampling_interval: Some(100.0),
                historizing: false,
            },
        });
        self.values
            .write()
            .unwrap()
            .insert(node_id.to_opc_string(), value);
    }

    fn add_method(&self, node_id: NodeId, name: &str) {
        self.add_node(NodeSnapshot {
            node_id,
            display_name: name.into(),
            browse_name: format!("2:{name}"),
            info: NodeInfo::Method {
                user_executable: true,
            },
        });
    }

    fn link(&self, source: NodeId, reference: NodeId, target: NodeId) {
        self.edges.write().unwrap().push(Edge {
            source,
            reference,
            target,
        });
    }

    fn type_definition_of(&self, node_id: &NodeId) -> Option<NodeId> {
        self.edges
            .read()
            .unwrap()
            .iter()
            .find(|e| e.source == *node_id && e.reference == has_type_definition())
            .map(|e| e.target.clone())
    }

    fn describe(&self, node_id: &NodeId, reference: &NodeId) -> Option<ReferenceDescription> {
        let nodes = self.nodes.read().unwrap();
        let snapshot = nodes.get(&node_id.to_opc_string())?;
        Some(ReferenceDescription {
            node_id: snapshot.node_id.clone(),
            browse_name: snapshot.browse_name.clone(),
            display_name: snapshot.display_name.clone(),
            node_class: snapshot.node_class(),
            reference_type: Some(reference.clone()),
            type_definition: self.type_definition_of(node_id),
        })
    }

    fn paginate(&self, mut references: Vec<ReferenceDescription>) -> BrowseBatch {
        if references.len() <= PAGE_SIZE {
            return BrowseBatch::complete(references);
        }
        let rest = references.split_off(PAGE_SIZE);
        let token = self
            .next_token
            .fetch_add(1, Ordering::SeqCst)
            .to_be_bytes()
            .to_vec();
        self.continuations
            .lock()
            .unwrap()
            .insert(token.clone(), rest);
        BrowseBatch::partial(references, token)
    }
}

/// Builds the plant model used by most tests.
///
/// ```text
/// Objects (0-85)
/// ├── ProductionLine (2-1000, LineType)
/// │   ├── Speed    (2-1001, Double, EURange property 2-1003)
/// │   ├── Flow     (2-1004, Float)
/// │   ├── Pressure (2-1002, String)
/// │   └── Start    (2-3000, method)
/// └── Recipes (2-1010, AreaFolderType -> FolderType)
/// ```
pub fn plant_transport() -> Arc<PlantTransport> {
    let t = PlantTransport::empty(SERVER_URL);

    // Reference-type nodes, read for relationship names.
    t.add_typed(organizes(), "Organizes", NodeClass::ReferenceType);
    t.add_typed(has_component(), "HasComponent", NodeClass::ReferenceType);
    t.add_typed(has_property(), "HasProperty", NodeClass::ReferenceType);

    // Object type hierarchy: BaseObjectType -> FolderType -> AreaFolderType,
    // and a LineType descending straight from the base.
    t.add_typed(NodeId::numeric(0, 58), "BaseObjectType", NodeClass::ObjectType);
    t.add_typed(NodeId::numeric(0, 61), "FolderType", NodeClass::ObjectType);
    t.add_typed(NodeId::numeric(2, 2000), "AreaFolderType", NodeClass::ObjectType);
    t.add_typed(NodeId::numeric(2, 2100), "LineType", NodeClass::ObjectType);
    t.link(NodeId::numeric(0, 58), has_subtype(), NodeId::numeric(0, 61));
    t.link(NodeId::numeric(0, 61), has_subtype(), NodeId::numeric(2, 2000));
    t.link(NodeId::numeric(0, 58), has_subtype(), NodeId::numeric(2, 2100));

    // Data type hierarchy: BaseDataType -> {Number -> {Float, Double}, String}.
    t.add_typed(NodeId::numeric(0, 24), "BaseDataType", NodeClass::DataType);
    t.add_typed(NodeId::numeric(0, 26), "Number", NodeClass::DataType);
    t.add_typed(NodeId::numeric(0, 10), "Float", NodeClass::DataType);
    t.add_typed(NodeId::numeric(0, 11), "Double", NodeClass::DataType);
    t.add_typed(NodeId::numeric(0, 12), "String", NodeClass::DataType);
    t.link(NodeId::numeric(0, 24), has_subtype(), NodeId::numeric(0, 26));
    t.link(NodeId::numeric(0, 26), has_subtype(), NodeId::numeric(0, 10));
    t.link(NodeId::numeric(0, 26), has_subtype(), NodeId::numeric(0, 11));
    t.link(NodeId::numeric(0, 24), has_subtype(), NodeId::numeric(0, 12));

    // Instances.
    t.add_object(NodeId::numeric(2, 1000), "ProductionLine");
    t.add_object(NodeId::numeric(2, 1010), "Recipes");
    t.link(NodeId::numeric(2, 1000), has_type_definition(), NodeId::numeric(2, 2100));
    t.link(NodeId::numeric(2, 1010), has_type_definition(), NodeId::numeric(2, 2000));
    t.link(NodeId::OBJECTS_FOLDER, organizes(), NodeId::numeric(2, 1000));
    t.link(NodeId::OBJECTS_FOLDER, organizes(), NodeId::numeric(2, 1010));

    t.add_variable(NodeId::numeric(2, 1001), "Speed", 11, 0x3, UaValue::Double(21.5));
    t.add_variable(NodeId::numeric(2, 1004), "Flow", 10, 0x7, UaValue::Float(3.5));
    t.add_variable(
        NodeId::numeric(2, 1002),
        "Pressure",
        12,
        0x1,
        UaValue::String("stable".into()),
    );
    t.add_variable(
        NodeId::numeric(2, 1003),
        "EURange",
        12,
        0x1,
        UaValue::String("0..100".into()),
    );
    t.add_method(NodeId::numeric(2, 3000), "Start");
    t.link(NodeId::numeric(2, 1000), has_component(), NodeId::numeric(2, 1001));
    t.link(NodeId::numeric(2, 1000), has_component(), NodeId::numeric(2, 1004));
    t.link(NodeId::numeric(2, 1000), has_component(), NodeId::numeric(2, 1002));
    t.link(NodeId::numeric(2, 1000), has_component(), NodeId::numeric(2, 3000));
    t.link(NodeId::numeric(2, 1001), has_property(), NodeId::numeric(2, 1003));

    Arc::new(t)
}

#[async_trait]
impl UaTransport for PlantTransport {
    async fn browse(&self, request: &BrowseRequest) -> UaResult<BrowseBatch> {
        let matches: Vec<(NodeId, NodeId)> = {
            let edges = self.edges.read().unwrap();
            edges
                .iter()
                .filter_map(|edge| {
                    let described = match request.direction {
                        BrowseDirection::Forward if edge.source == request.node_id => &edge.target,
                        BrowseDirection::Inverse if edge.target == request.node_id => &edge.source,
                        BrowseDirection::Both if edge.source == request.node_id => &edge.target,
                        BrowseDirection::Both if edge.target == request.node_id => &edge.source,
                        _ => return None,
                    };
                    let wanted = match &request.reference_type {
                        None => true,
                        Some(filter) if *filter == hierarchical_references() => {
                            request.include_subtypes && is_hierarchical(&edge.reference)
                        }
                        Some(filter) => edge.reference == *filter,
                    };
                    wanted.then(|| (described.clone(), edge.reference.clone()))
                })
                .collect()
        };

        let references: Vec<ReferenceDescription> = matches
            .iter()
            .filter_map(|(node, reference)| self.describe(node, reference))
            .filter(|description| {
                request.node_class_mask == 0
                    || description.node_class.mask() & request.node_class_mask != 0
            })
            .collect();

        Ok(self.paginate(references))
    }

    async fn browse_next(&self, continuation_point: &[u8]) -> UaResult<BrowseBatch> {
        let rest = self
            .continuations
            .lock()
            .unwrap()
            .remove(continuation_point)
            .ok_or_else(|| UaError::from_status(status::BAD_CONTINUATION_POINT_INVALID))?;
        Ok(self.paginate(rest))
    }

    async fn read_node(&self, node_id: &NodeId) -> UaResult<NodeSnapshot> {
        self.nodes
            .read()
            .unwrap()
            .get(&node_id.to_opc_string())
            .cloned()
            .ok_or_else(|| UaError::from_status(status::BAD_NODE_ID_UNKNOWN))
    }

    async fn read_value(&self, node_id: &NodeId) -> UaResult<ValueSample> {
        match self.values.read().unwrap().get(&node_id.to_opc_string()) {
            Some(value) => Ok(ValueSample::good(node_id.clone(), value.clone())),
            None => Err(UaError::from_status(status::BAD_NOT_READABLE)),
        }
    }

    async fn write_value(&self, node_id: &NodeId, value: UaValue) -> UaResult<u32> {
        if !self.nodes.read().unwrap().contains_key(&node_id.to_opc_string()) {
            return Ok(status::BAD_NODE_ID_UNKNOWN);
        }
        self.values
            .write()
            .unwrap()
            .insert(node_id.to_opc_string(), value.clone());
        self.writes.lock().unwrap().push((node_id.clone(), value));
        Ok(status::GOOD)
    }

    async fn create_subscription(&self, publishing_interval: Duration) -> UaResult<u32> {
        self.created_intervals
            .lock()
            .unwrap()
            .push(publishing_interval);
        Ok(self.next_subscription.fetch_add(1, Ordering::SeqCst))
    }

    async fn set_publishing_interval(
        &self,
        subscription_id: u32,
        publishing_interval: Duration,
    ) -> UaResult<()> {
        self.revised_intervals
            .lock()
            .unwrap()
            .push((subscription_id, publishing_interval));
        Ok(())
    }

    async fn create_monitored_items(
        &self,
        _subscription_id: u32,
        items: &[MonitoredItemRequest],
    ) -> UaResult<Vec<MonitoredItemResult>> {
        Ok(items
            .iter()
            .map(|item| {
                let known = self
                    .nodes
                    .read()
                    .unwrap()
                    .contains_key(&item.node_id.to_opc_string());
                MonitoredItemResult {
                    node_id: item.node_id.clone(),
                    status_code: if known {
                        status::GOOD
                    } else {
                        status::BAD_NODE_ID_UNKNOWN
                    },
                    monitored_item_id: self.next_item.fetch_add(1, Ordering::SeqCst),
                }
            })
            .collect())
    }

    async fn remove_monitored_items(
        &self,
        _subscription_id: u32,
        _monitored_item_ids: &[u32],
    ) -> UaResult<()> {
        Ok(())
    }

    async fn delete_subscription(&self, _subscription_id: u32) -> UaResult<()> {
        Ok(())
    }

    fn notifications(&self) -> broadcast::Receiver<ItemNotification> {
        self.notify_tx.subscribe()
    }

    async fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn close(&self) -> UaResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn endpoint_url(&self) -> &str {
        &self.url
    }
}

/// Factory handing out one shared plant transport.
pub struct PlantFactory {
    transport: Arc<PlantTransport>,
    connects: AtomicUsize,
}

#[async_trait]
impl TransportFactory for PlantFactory {
    async fn connect(
        &self,
        _endpoint_url: &str,
        _secure: bool,
        _options: &ClientOptions,
    ) -> UaResult<Arc<dyn UaTransport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.transport.clone())
    }

    async fn discover_endpoints(
        &self,
        _server_url: &str,
        _timeout: Duration,
    ) -> UaResult<Vec<EndpointSummary>> {
        Ok(vec![EndpointSummary {
            endpoint_url: SERVER_URL.into(),
            security_policy_uri: "http://opcfoundation.org/UA/SecurityPolicy#None".into(),
            security_mode: "None".into(),
            security_level: 0,
        }])
    }
}

fn gateway_over(transport: Arc<PlantTransport>) -> (Gateway, Arc<PlantFactory>) {
    let factory = Arc::new(PlantFactory {
        transport,
        connects: AtomicUsize::new(0),
    });
    (
        Gateway::new(factory.clone(), ClientOptions::default()),
        factory,
    )
}

// =============================================================================
// Browse Flows
// =============================================================================

#[tokio::test]
async fn test_root_listing() {
    let (gateway, _factory) = gateway_over(plant_transport());

    let view = gateway.get_root_node(SERVER_URL).await.unwrap();
    assert_eq!(view.current_view.len(), 1);

    let root = &view.current_view[0];
    assert_eq!(root.id, "0-85");
    assert_eq!(root.name, "Root");
    assert!(root.has_children);
}

#[tokio::test]
async fn test_root_of_empty_address_space() {
    let (gateway, _factory) = gateway_over(Arc::new(PlantTransport::empty(SERVER_URL)));

    let view = gateway.get_root_node(SERVER_URL).await.unwrap();
    assert_eq!(view.current_view.len(), 1);
    assert!(!view.current_view[0].has_children);
}

#[tokio::test]
async fn test_children_drained_across_continuations() {
    let (gateway, _factory) = gateway_over(plant_transport());

    // Four children behind a page size of two forces two resumes.
    let view = gateway.get_children(SERVER_URL, "2-1000").await.unwrap();
    assert_eq!(view.current_view.len(), 4);

    let speed = view
        .current_view
        .iter()
        .find(|n| n.id == "2-1001")
        .expect("speed entry");
    assert_eq!(speed.node_class, NodeClass::Variable);
    assert_eq!(speed.access_level, Some(0x1));
    assert_eq!(speed.image.as_deref(), Some("folderOpen.jpg"));
    assert!(speed.has_children);

    // The history-read bit is masked out of the tree view.
    let flow = view
        .current_view
        .iter()
        .find(|n| n.id == "2-1004")
        .expect("flow entry");
    assert_eq!(flow.access_level, Some(0x5));

    let start = view
        .current_view
        .iter()
        .find(|n| n.id == "2-3000")
        .expect("method entry");
    assert_eq!(start.node_class, NodeClass::Method);
    assert_eq!(start.executable, Some(true));
    assert_eq!(start.image.as_deref(), Some("folder.jpg"));
}

#[tokio::test]
async fn test_leaf_browse_returns_node_itself() {
    let (gateway, _factory) = gateway_over(plant_transport());

    let view = gateway.get_children(SERVER_URL, "2-1002").await.unwrap();
    assert_eq!(view.current_view.len(), 1);

    let leaf = &view.current_view[0];
    assert_eq!(leaf.id, "2-1002");
    assert_eq!(leaf.name, "Pressure");
    assert!(!leaf.has_children);
    assert!(leaf.image.is_none());
}

#[tokio::test]
async fn test_browse_of_unknown_node_reports_unknown_id() {
    let (gateway, _factory) = gateway_over(plant_transport());

    let error = gateway
        .get_children(SERVER_URL, "2-12331")
        .await
        .unwrap_err();
    assert_eq!(error.status_code(), Some(status::BAD_NODE_ID_UNKNOWN));
}

#[tokio::test]
async fn test_malformed_id_never_reaches_the_server() {
    let transport = plant_transport();
    let (gateway, factory) = gateway_over(transport);

    let error = gateway
        .get_children(SERVER_URL, "not-an-id-with spaces")
        .await
        .unwrap_err();
    assert!(error.is_caller_input());
    assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Classification Flows
// =============================================================================

#[tokio::test]
async fn test_folder_and_object_classification() {
    let (gateway, _factory) = gateway_over(plant_transport());

    // Recipes: type chain AreaFolderType -> FolderType.
    let recipes = gateway.node_detail(SERVER_URL, "2-1010").await.unwrap();
    assert_eq!(recipes.kind, NodeKind::Folder);

    // ProductionLine: type chain LineType -> BaseObjectType, never Folder.
    let line = gateway.node_detail(SERVER_URL, "2-1000").await.unwrap();
    assert_eq!(line.kind, NodeKind::Object);
    assert_eq!(line.name, "ProductionLine");
    assert!(line.variable.is_none());
}

#[tokio::test]
async fn test_deadband_capability_matrix() {
    let (gateway, _factory) = gateway_over(plant_transport());

    // Double descends from Number and the variable carries an EURange.
    let speed = gateway.node_detail(SERVER_URL, "2-1001").await.unwrap();
    let speed_var = speed.variable.expect("variable detail");
    assert_eq!(speed_var.dead_band, DeadbandCapability::AbsolutePercent);
    assert_eq!(speed_var.dead_band.to_string(), "Absolute, Percentage");

    // Float descends from Number, no EURange.
    let flow = gateway.node_detail(SERVER_URL, "2-1004").await.unwrap();
    assert_eq!(
        flow.variable.expect("variable detail").dead_band,
        DeadbandCapability::Absolute
    );

    // String never reaches Number, no EURange.
    let pressure = gateway.node_detail(SERVER_URL, "2-1002").await.unwrap();
    assert_eq!(
        pressure.variable.expect("variable detail").dead_band,
        DeadbandCapability::None
    );
}

#[tokio::test]
async fn test_detail_edges_carry_relationship_names() {
    let (gateway, _factory) = gateway_over(plant_transport());

    let detail = gateway.node_detail(SERVER_URL, "2-1000").await.unwrap();
    assert_eq!(detail.edges.len(), 4);

    let speed_edge = detail
        .edges
        .iter()
        .find(|e| e.node_id == "2-1001")
        .expect("speed edge");
    assert_eq!(speed_edge.name, "Speed");
    assert_eq!(speed_edge.relationship, "HasComponent");
    assert_eq!(speed_edge.kind, NodeKind::Variable);
}

#[tokio::test]
async fn test_detail_edges_resolve_folder_targets() {
    let (gateway, _factory) = gateway_over(plant_transport());

    let detail = gateway.node_detail(SERVER_URL, "0-85").await.unwrap();

    let kind_of = |id: &str| {
        detail
            .edges
            .iter()
            .find(|e| e.node_id == id)
            .map(|e| e.kind)
            .expect("edge present")
    };
    assert_eq!(kind_of("2-1000"), NodeKind::Object);
    assert_eq!(kind_of("2-1010"), NodeKind::Folder);
}

#[tokio::test]
async fn test_detail_value_payload() {
    let (gateway, _factory) = gateway_over(plant_transport());

    let detail = gateway.node_detail(SERVER_URL, "2-1001").await.unwrap();
    assert_eq!(detail.kind, NodeKind::Variable);

    let variable = detail.variable.expect("variable detail");
    assert_eq!(variable.value.value, json!(21.5));
    assert_eq!(variable.value.schema.type_name, "Double");
    assert_eq!(variable.value.status, "Good");
    assert_eq!(variable.minimum_sampling_interval, Some(100.0));
}

// =============================================================================
// Write Flows
// =============================================================================

#[tokio::test]
async fn test_write_coerces_string_to_declared_type() {
    let transport = plant_transport();
    let (gateway, _factory) = gateway_over(transport.clone());

    let written = gateway
        .write_value(SERVER_URL, "2-1001", &json!("42.5"))
        .await
        .unwrap();
    assert!(written);

    let writes = transport.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1, UaValue::Double(42.5));
}

#[tokio::test]
async fn test_write_to_object_is_rejected_with_node_id_in_message() {
    let transport = plant_transport();
    let (gateway, _factory) = gateway_over(transport.clone());

    let error = gateway
        .write_value(SERVER_URL, "2-1000", &json!(1))
        .await
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "There is no Value for the Node specified by the NodeId 2-1000"
    );
    assert!(transport.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_write_incompatible_value_is_caller_input() {
    let transport = plant_transport();
    let (gateway, _factory) = gateway_over(transport.clone());

    // Speed is a Double; an arbitrary word cannot be coerced.
    let error = gateway
        .write_value(SERVER_URL, "2-1001", &json!("not a number"))
        .await
        .unwrap_err();
    assert!(error.is_caller_input());
    assert!(transport.writes.lock().unwrap().is_empty());
}

// =============================================================================
// Monitoring Flows
// =============================================================================

#[tokio::test]
async fn test_monitor_flow_single_subscription_and_lowering() {
    let transport = plant_transport();
    let (gateway, _factory) = gateway_over(transport.clone());

    let first = vec![
        MonitorItemSpec::new("2-1001", Duration::from_millis(1000)),
        MonitorItemSpec::new("2-1004", Duration::from_millis(500)),
    ];
    let outcomes = gateway
        .create_monitored_items(SERVER_URL, &first, "push:floor", "plant")
        .await
        .unwrap();
    assert_eq!(outcomes, vec![true, true]);
    assert_eq!(
        *transport.created_intervals.lock().unwrap(),
        vec![Duration::from_millis(500)]
    );

    // A faster follow-up only revises the existing subscription.
    let second = vec![MonitorItemSpec::new("2-1002", Duration::from_millis(250))];
    gateway
        .create_monitored_items(SERVER_URL, &second, "push:floor", "plant")
        .await
        .unwrap();
    assert_eq!(transport.created_intervals.lock().unwrap().len(), 1);
    assert_eq!(
        *transport.revised_intervals.lock().unwrap(),
        vec![(1, Duration::from_millis(250))]
    );
}

#[tokio::test]
async fn test_monitor_unknown_node_flagged_per_position() {
    let (gateway, _factory) = gateway_over(plant_transport());

    let items = vec![
        MonitorItemSpec::new("2-1001", Duration::from_millis(500)),
        MonitorItemSpec::new("2-9999", Duration::from_millis(500)),
    ];
    let outcomes = gateway
        .create_monitored_items(SERVER_URL, &items, "push:floor", "plant")
        .await
        .unwrap();
    assert_eq!(outcomes, vec![true, false]);
}

#[tokio::test]
async fn test_notifications_flow_to_push_listeners() {
    let transport = plant_transport();
    let (gateway, _factory) = gateway_over(transport.clone());
    let mut listener = gateway.subscribe_push();

    gateway
        .create_monitored_items(
            SERVER_URL,
            &[MonitorItemSpec::new("2-1001", Duration::from_millis(500))],
            "push:floor",
            "plant",
        )
        .await
        .unwrap();

    transport
        .notify_tx
        .send(ItemNotification {
            subscription_id: 1,
            node_id: NodeId::numeric(2, 1001),
            value: UaValue::Double(21.5),
            status_code: status::GOOD,
            source_timestamp: Some(chrono::Utc::now()),
        })
        .unwrap();

    let message = tokio::time::timeout(Duration::from_secs(1), listener.recv())
        .await
        .expect("notification forwarded")
        .unwrap();
    assert_eq!(message.topic, "plant");
    assert_eq!(message.body, "2-1001: 21.5");
}

#[tokio::test]
async fn test_stop_monitoring_round_trip() {
    let (gateway, _factory) = gateway_over(plant_transport());

    gateway
        .create_monitored_items(
            SERVER_URL,
            &[MonitorItemSpec::new("2-1001", Duration::from_millis(500))],
            "push:floor",
            "plant",
        )
        .await
        .unwrap();

    assert!(gateway.delete_monitoring(SERVER_URL, "push:floor", "plant").await);
    assert!(!gateway.delete_monitoring(SERVER_URL, "push:floor", "plant").await);
}

// =============================================================================
// Session Flows
// =============================================================================

#[tokio::test]
async fn test_disconnect_is_idempotent_and_reconnects_lazily() {
    let transport = plant_transport();
    let (gateway, factory) = gateway_over(transport.clone());

    gateway.get_root_node(SERVER_URL).await.unwrap();
    assert_eq!(factory.connects.load(Ordering::SeqCst), 1);

    assert!(gateway.disconnect(SERVER_URL).await);
    assert!(!gateway.disconnect(SERVER_URL).await);
    assert_eq!(transport.closed.load(Ordering::SeqCst), 1);

    // The next browse transparently reconnects.
    gateway.get_root_node(SERVER_URL).await.unwrap();
    assert_eq!(factory.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_availability_probe_recreates_dead_session() {
    let transport = plant_transport();
    let (gateway, factory) = gateway_over(transport.clone());

    assert!(gateway.is_available(SERVER_URL).await);
    assert_eq!(factory.connects.load(Ordering::SeqCst), 1);

    // Kill the session; the probe evicts it and recreates once.
    transport.healthy.store(false, Ordering::SeqCst);
    assert!(gateway.is_available(SERVER_URL).await);
    assert_eq!(factory.connects.load(Ordering::SeqCst), 2);
}
