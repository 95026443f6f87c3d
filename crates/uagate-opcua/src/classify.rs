// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Type-hierarchy classification.
//!
//! Two walks over the server's type space: folder detection for objects
//! (HasTypeDefinition, then HasSubtype upward until an anchor type) and
//! deadband capability for variables (data-type ancestry plus an EURange
//! property probe).

use std::fmt;
use std::sync::Arc;

use crate::browse::reference_types;
use crate::error::UaResult;
use crate::session::UaSession;
use crate::transport::{BrowseRequest, NodeSnapshot};
use crate::types::{DeadbandCapability, NodeId};

/// Standard type node IDs anchoring the hierarchy walks.
pub mod type_nodes {
    use crate::types::NodeId;

    /// FolderType - i=61.
    pub fn folder_type() -> NodeId {
        NodeId::numeric(0, 61)
    }

    /// BaseObjectType - i=58.
    pub fn base_object_type() -> NodeId {
        NodeId::numeric(0, 58)
    }

    /// Number - i=26.
    pub fn number() -> NodeId {
        NodeId::numeric(0, 26)
    }

    /// BaseDataType - i=24.
    pub fn base_data_type() -> NodeId {
        NodeId::numeric(0, 24)
    }
}

/// The browse name that marks a range-bounded variable.
const EU_RANGE: &str = "EURange";

fn is_eu_range(browse_name: &str) -> bool {
    browse_name.rsplit(':').next() == Some(EU_RANGE)
}

// =============================================================================
// TypeResolver
// =============================================================================

/// Classifies nodes by walking the server's type hierarchy.
pub struct TypeResolver {
    session: Arc<UaSession>,
}

impl TypeResolver {
    /// Creates a resolver over a session.
    pub fn new(session: Arc<UaSession>) -> Self {
        Self { session }
    }

    /// Returns whether an object node's type derives from FolderType.
    ///
    /// The node's first HasTypeDefinition target starts the walk; HasSubtype
    /// is then followed inverse (subtype to supertype) until FolderType or
    /// BaseObjectType is reached. No type definition, or a chain that runs
    /// out of supertypes before an anchor, classifies as not-folder.
    pub async fn is_folder(&self, node_id: &NodeId) -> UaResult<bool> {
        let request =
            BrowseRequest::forward(node_id.clone(), reference_types::has_type_definition());
        let batch = self.session.browse(&request).await?;

        let Some(definition) = batch.references.first() else {
            return Ok(false);
        };

        self.walk_to_anchor(
            definition.node_id.clone(),
            &type_nodes::folder_type(),
            &type_nodes::base_object_type(),
        )
        .await
    }

    /// Derives the deadband capability of a variable.
    ///
    /// Absolute support requires the declared data type to descend from
    /// Number; percent support requires an EURange property on the node.
    /// The probes are independent.
    pub async fn dead_band_capability(
        &self,
        snapshot: &NodeSnapshot,
    ) -> UaResult<DeadbandCapability> {
        let Some(data_type) = snapshot.data_type() else {
            return Ok(DeadbandCapability::None);
        };

        let absolute = self
            .walk_to_anchor(
                data_type.clone(),
                &type_nodes::number(),
                &type_nodes::base_data_type(),
            )
            .await?;
        let percent = self.has_eu_range(&snapshot.node_id).await?;

        Ok(DeadbandCapability::from_probes(absolute, percent))
    }

    /// Follows HasSubtype inverse from `target` until `wanted` or `base`.
    ///
    /// The walk holds the subtype invariant of the standard type space:
    /// every type chain terminates in its base type. Returns `false` if a
    /// sparse server runs out of supertypes first.
    async fn walk_to_anchor(
        &self,
        mut target: NodeId,
        wanted: &NodeId,
        base: &NodeId,
    ) -> UaResult<bool> {
        loop {
            if target == *wanted {
                return Ok(true);
            }
            if target == *base {
                return Ok(false);
            }

            let request = BrowseRequest::inverse(target, reference_types::has_subtype());
            let parents = self.session.browse(&request).await?;
            match parents.references.first() {
                Some(parent) => target = parent.node_id.clone(),
                None => return Ok(false),
            }
        }
    }

    async fn has_eu_range(&self, node_id: &NodeId) -> UaResult<bool> {
        let request = BrowseRequest::forward(node_id.clone(), reference_types::has_property());
        let batch = self.session.browse(&request).await?;
        Ok(batch
            .references
            .iter()
            .any(|reference| is_eu_range(&reference.browse_name)))
    }
}

impl fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeResolver")
            .field("endpoint_url", &self.session.endpoint_url)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
