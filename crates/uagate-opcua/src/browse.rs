// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address-space tree browsing.
//!
//! Produces the tree view consumed by the REST layer: one level at a time,
//! forward hierarchical references only, continuation points drained before
//! classification. Node ids on this surface always use the external
//! `"<ns>-<identifier>"` form.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::UaResult;
use crate::session::UaSession;
use crate::transport::{BrowseRequest, NodeInfo, ReferenceDescription};
use crate::types::{NodeClass, NodeId};

// =============================================================================
// Standard Reference Type Node IDs (OPC UA Part 5)
// =============================================================================

/// Standard OPC UA reference type node IDs.
pub mod reference_types {
    use crate::types::NodeId;

    /// HierarchicalReferences (abstract) - i=33.
    pub fn hierarchical_references() -> NodeId {
        NodeId::numeric(0, 33)
    }

    /// HasProperty - i=46.
    pub fn has_property() -> NodeId {
        NodeId::numeric(0, 46)
    }

    /// HasTypeDefinition - i=40.
    pub fn has_type_definition() -> NodeId {
        NodeId::numeric(0, 40)
    }

    /// HasSubtype - i=45.
    pub fn has_subtype() -> NodeId {
        NodeId::numeric(0, 45)
    }
}

/// This bit of the user access level is masked out of tree views; clients
/// only see current read/write capability.
const HISTORY_ACCESS_BIT: u8 = 0x2;

/// Image hint for variable entries.
const VARIABLE_IMAGE: &str = "folderOpen.jpg";

/// Image hint for non-variable entries.
const CONTAINER_IMAGE: &str = "folder.jpg";

// =============================================================================
// TreeNode / BrowseView
// =============================================================================

/// One entry of a single-level tree view.
///
/// Serialized field names follow the platform's tree wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// External node id, e.g. `"2-1001"`.
    pub id: String,

    /// Display name.
    #[serde(rename = "nodeName")]
    pub name: String,

    /// Node class.
    #[serde(rename = "nodeClass")]
    pub node_class: NodeClass,

    /// Masked user access level, variables only.
    #[serde(rename = "accessLevel", skip_serializing_if = "Option::is_none")]
    pub access_level: Option<u8>,

    /// Event notifier byte, objects and views only.
    #[serde(rename = "eventNotifier", skip_serializing_if = "Option::is_none")]
    pub event_notifier: Option<u8>,

    /// User-executable flag, methods only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,

    /// Whether the entry is presented as expandable.
    #[serde(rename = "children")]
    pub has_children: bool,

    /// UI image hint, absent for self-leaf fallback entries.
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl TreeNode {
    /// The synthetic root entry over the objects folder.
    pub fn root(has_children: bool) -> Self {
        Self {
            id: NodeId::OBJECTS_FOLDER.to_external(),
            name: "Root".to_string(),
            node_class: NodeClass::Object,
            access_level: None,
            event_notifier: None,
            executable: None,
            has_children,
            image: None,
        }
    }

    /// Builds an entry from a node's class-specific attributes.
    fn classified(
        id: String,
        name: String,
        info: &NodeInfo,
        has_children: bool,
        with_image: bool,
    ) -> Self {
        let node_class = info.node_class();

        let image = with_image.then(|| {
            if node_class == NodeClass::Variable {
                VARIABLE_IMAGE.to_string()
            } else {
                CONTAINER_IMAGE.to_string()
            }
        });

        let mut node = Self {
            id,
            name,
            node_class,
            access_level: None,
            event_notifier: None,
            executable: None,
            has_children,
            image,
        };

        match info {
            NodeInfo::Variable {
                user_access_level, ..
            } => {
                node.access_level = Some(user_access_level & !HISTORY_ACCESS_BIT);
            }
            NodeInfo::Object { event_notifier } | NodeInfo::View { event_notifier } => {
                node.event_notifier = Some(*event_notifier);
            }
            NodeInfo::Method { user_executable } => {
                node.executable = Some(*user_executable);
            }
            NodeInfo::Other { .. } => {}
        }

        node
    }
}

/// A single-level view of the address-space tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowseView {
    /// Entries at this level.
    #[serde(rename = "currentView")]
    pub current_view: Vec<TreeNode>,
}

impl BrowseView {
    fn single(node: TreeNode) -> Self {
        Self {
            current_view: vec![node],
        }
    }
}

// =============================================================================
// BrowseEdge
// =============================================================================

/// One outgoing hierarchical reference of a node, with its relationship
/// name resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowseEdge {
    /// Target node id.
    pub target: NodeId,

    /// Target display name.
    pub display_name: String,

    /// Target node class.
    pub node_class: NodeClass,

    /// Display name of the reference type connecting the two nodes.
    pub relationship: String,
}

// =============================================================================
// TreeBrowser
// =============================================================================

/// Browses one server's address space through an established session.
pub struct TreeBrowser {
    session: Arc<UaSession>,
}

impl TreeBrowser {
    /// Creates a browser over a session.
    pub fn new(session: Arc<UaSession>) -> Self {
        Self { session }
    }

    /// Returns the root view: a single entry named "Root" standing for the
    /// objects folder, expandable when the folder has any hierarchical
    /// reference.
    pub async fn get_root(&self) -> UaResult<BrowseView> {
        let request = BrowseRequest::hierarchical(NodeId::OBJECTS_FOLDER);
        let batch = self.session.browse(&request).await?;
        Ok(BrowseView::single(TreeNode::root(
            !batch.references.is_empty(),
        )))
    }

    /// Returns the one-level view under `node_id`.
    ///
    /// All continuation points are drained before classification, so the
    /// view is complete even for servers that page aggressively. A child
    /// whose attributes cannot be read is skipped. When the node has no
    /// hierarchical references at all, the node itself is returned as a
    /// single non-expandable leaf.
    pub async fn get_children(&self, node_id: &NodeId) -> UaResult<BrowseView> {
        let request = BrowseRequest::hierarchical(node_id.clone());
        let references = self.browse_all(&request).await?;

        if references.is_empty() {
            let snapshot = self.session.read_node(node_id).await?;
            let leaf = TreeNode::classified(
                node_id.to_external(),
                snapshot.display_name.clone(),
                &snapshot.info,
                false,
                false,
            );
            return Ok(BrowseView::single(leaf));
        }

        // TODO: probe each child's own forward references instead of
        // reporting sibling presence; needs sign-off on the tree contract
        // before the flag can change meaning.
        let any_siblings = !references.is_empty();

        let mut view = BrowseView::default();
        for reference in &references {
            let snapshot = match self.session.read_node(&reference.node_id).await {
                Ok(snapshot) => snapshot,
                Err(error) => {
                    tracing::debug!(
                        node_id = %reference.node_id,
                        %error,
                        "skipping unreadable child"
                    );
                    continue;
                }
            };

            view.current_view.push(TreeNode::classified(
                reference.node_id.to_external(),
                reference.display_name.clone(),
                &snapshot.info,
                any_siblings,
                true,
            ));
        }

        Ok(view)
    }

    /// Lists the outgoing hierarchical references of `node_id` restricted
    /// to method, object, and variable targets, resolving each reference
    /// type to its display name.
    pub async fn browse_edges(&self, node_id: &NodeId) -> UaResult<Vec<BrowseEdge>> {
        let request = BrowseRequest::hierarchical(node_id.clone()).with_node_classes(&[
            NodeClass::Method,
            NodeClass::Object,
            NodeClass::Variable,
        ]);
        let references = self.browse_all(&request).await?;

        let mut edges = Vec::with_capacity(references.len());
        for reference in references {
            let relationship = self.relationship_name(&reference).await;
            edges.push(BrowseEdge {
                target: reference.node_id,
                display_name: reference.display_name,
                node_class: reference.node_class,
                relationship,
            });
        }
        Ok(edges)
    }

    /// Browses and drains every continuation point.
    async fn browse_all(&self, request: &BrowseRequest) -> UaResult<Vec<ReferenceDescription>> {
        let mut batch = self.session.browse(request).await?;
        let mut references = std::mem::take(&mut batch.references);
        let mut continuation = batch.continuation_point;

        while let Some(token) = continuation {
            let next = self.session.browse_next(&token).await?;
            references.extend(next.references);
            continuation = next.continuation_point;
        }

        Ok(references)
    }

    async fn relationship_name(&self, reference: &ReferenceDescription) -> String {
        let Some(reference_type) = &reference.reference_type else {
            return String::new();
        };
        match self.session.read_node(reference_type).await {
            Ok(snapshot) => snapshot.display_name,
            Err(_) => reference_type.to_opc_string(),
        }
    }
}

impl fmt::Debug for TreeBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeBrowser")
            .field("endpoint_url", &self.session.endpoint_url)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_entry() {
        let root = TreeNode::root(true);
        assert_eq!(root.id, "0-85");
        assert_eq!(root.name, "Root");
        assert_eq!(root.node_class, NodeClass::Object);
        assert!(root.has_children);
        assert!(root.image.is_none());
    }

    #[test]
    fn test_variable_entry_masks_history_bit() {
        let info = NodeInfo::Variable {
            data_type: NodeId::numeric(0, 11),
            value_rank: -1,
            user_access_level: 0x7,
            minimum_sampling_interval: None,
            historizing: true,
        };
        let node =
            TreeNode::classified("2-1001".into(), "Speed".into(), &info, true, true);

        assert_eq!(node.access_level, Some(0x5));
        assert_eq!(node.image.as_deref(), Some(VARIABLE_IMAGE));
        assert!(node.event_notifier.is_none());
        assert!(node.executable.is_none());
    }

    #[test]
    fn test_object_and_method_entries() {
        let object = NodeInfo::Object { event_notifier: 1 };
        let node =
            TreeNode::classified("2-5".into(), "Plant".into(), &object, true, true);
        assert_eq!(node.event_notifier, Some(1));
        assert_eq!(node.image.as_deref(), Some(CONTAINER_IMAGE));

        let method = NodeInfo::Method {
            user_executable: true,
        };
        let node =
            TreeNode::classified("2-6".into(), "Start".into(), &method, false, false);
        assert_eq!(node.executable, Some(true));
        assert!(node.image.is_none());
        assert!(!node.has_children);
    }

    #[test]
    fn test_tree_node_wire_shape() {
        let info = NodeInfo::Variable {
            data_type: NodeId::numeric(0, 11),
            value_rank: -1,
            user_access_level: 0x3,
            minimum_sampling_interval: None,
            historizing: false,
        };
        let view = BrowseView::single(TreeNode::classified(
            "2-1001".into(),
            "Speed".into(),
            &info,
            true,
            true,
        ));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["currentView"][0]["id"], "2-1001");
        assert_eq!(json["currentView"][0]["nodeClass"], "Variable");
        assert_eq!(json["currentView"][0]["accessLevel"], 1);
        assert_eq!(json["currentView"][0]["children"], true);
        assert!(json["currentView"][0].get("executable").is_none());
    }

    #[test]
    fn test_reference_type_ids() {
        assert_eq!(
            reference_types::hierarchical_references(),
            NodeId::numeric(0, 33)
        );
        assert_eq!(reference_types::has_subtype(), NodeId::numeric(0, 45));
        assert_eq!(
            reference_types::has_type_definition(),
            NodeId::numeric(0, 40)
        );
        assert_eq!(reference_types::has_property(), NodeId::numeric(0, 46));
    }
}
