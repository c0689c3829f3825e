//! Core data types and structures for the diagram document.
//!
//! This module defines the recursive document model: a [`Project`] is the root
//! of a tree of [`FlowData`] levels, each holding nodes, edges and a map of
//! nested [`ProcessFlow`]s keyed by process id. Child processes are held behind
//! [`Arc`] so that copies of a project share untouched subtrees; a shared
//! subtree is never mutated in place (see [`crate::flow::mutator`]).
//!
//! The JSON shape follows the browser editor's storage format (camelCase keys,
//! `type`/`data` on nodes, ISO-8601 timestamps), and any field this crate does
//! not model is carried through unchanged.

use crate::constants::{CUSTOM_NODE_TYPE, PROCESS_NODE_TYPE};
use crate::ids::{generate_node_id, generate_process_id, generate_project_id};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Unique identifier for nodes.
pub type NodeId = String;

/// Identifier of a nested process; also its key in the parent's process map.
pub type ProcessId = String;

/// Sequence of process ids addressing one level of the document tree.
pub type ProcessPath = Vec<ProcessId>;

/// Nested processes of one level, in insertion order.
pub type ProcessMap = IndexMap<ProcessId, Arc<ProcessFlow>>;

/// A 2D canvas coordinate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    /// Horizontal coordinate, growing to the right
    pub x: f64,
    /// Vertical coordinate, growing downward
    pub y: f64,
}

impl Position {
    /// Creates a position from its coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Direction tag of a custom node type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The node feeds data into the diagram
    In,
    /// The node carries data out of the diagram
    Out,
}

impl Direction {
    /// Parses the `in` / `out` tag used in palette identifiers.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            _ => None,
        }
    }
}

/// Data carried by a process node: the portal into a nested process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessNodeData {
    /// Display label, kept in sync with the process name
    #[serde(default)]
    pub label: String,
    /// Key of the linked process in the owning level's process map
    pub process_id: ProcessId,
    /// Millisecond stamp changed on data-only edits so renderers notice them
    #[serde(
        rename = "_forceUpdate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub force_update: Option<i64>,
    /// Fields not modeled by this crate
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Data carried by a node of a user-defined custom type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomNodeData {
    /// Display label, initially the type name
    #[serde(default)]
    pub label: String,
    /// Name of the custom node type this node instantiates
    pub custom_name: String,
    /// Direction copied from the type when the node was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<Direction>,
    /// Millisecond stamp changed on data-only edits
    #[serde(
        rename = "_forceUpdate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub force_update: Option<i64>,
    /// Fields not modeled by this crate
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Data carried by any built-in palette node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StandardNodeData {
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Millisecond stamp changed on data-only edits
    #[serde(
        rename = "_forceUpdate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub force_update: Option<i64>,
    /// Fields not modeled by this crate (description, icon, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The kind of a node together with the data valid for that kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `type: "process"`, links to a nested process
    Process(ProcessNodeData),
    /// `type: "custom"`, an instance of a user-defined node type
    Custom(CustomNodeData),
    /// Any other type tag (event, command, decision, andGate, task, ...)
    Standard {
        /// The wire `type` tag
        node_type: String,
        /// Label and passthrough fields
        data: StandardNodeData,
    },
}

/// Represents a single node on a canvas level.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    /// Identifier, expected to be unique across the whole document
    pub id: NodeId,
    /// Position on the canvas
    pub position: Position,
    /// Type tag and typed data
    pub kind: NodeKind,
    /// Top-level fields not modeled by this crate (width, height, selected, ...)
    pub extra: Map<String, Value>,
}

/// Wire shape of a node before its data is checked against its type tag.
#[derive(Deserialize)]
struct RawNode {
    id: NodeId,
    #[serde(rename = "type", default)]
    node_type: Option<String>,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    data: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawNode> for Node {
    type Error = String;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let node_type = raw.node_type.unwrap_or_else(|| "default".to_string());
        let data = raw.data.unwrap_or_else(|| Value::Object(Map::new()));
        let kind = match node_type.as_str() {
            PROCESS_NODE_TYPE => NodeKind::Process(
                serde_json::from_value(data)
                    .map_err(|e| format!("invalid data on process node '{}': {e}", raw.id))?,
            ),
            CUSTOM_NODE_TYPE => NodeKind::Custom(
                serde_json::from_value(data)
                    .map_err(|e| format!("invalid data on custom node '{}': {e}", raw.id))?,
            ),
            _ => NodeKind::Standard {
                data: serde_json::from_value(data)
                    .map_err(|e| format!("invalid data on node '{}': {e}", raw.id))?,
                node_type,
            },
        };
        Ok(Node {
            id: raw.id,
            position: raw.position,
            kind,
            extra: raw.extra,
        })
    }
}

#[derive(Serialize)]
struct NodeRef<'a, D: Serialize> {
    id: &'a str,
    #[serde(rename = "type")]
    node_type: &'a str,
    position: &'a Position,
    data: &'a D,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node_type = self.node_type();
        match &self.kind {
            NodeKind::Process(data) => NodeRef {
                id: &self.id,
                node_type,
                position: &self.position,
                data,
                extra: &self.extra,
            }
            .serialize(serializer),
            NodeKind::Custom(data) => NodeRef {
                id: &self.id,
                node_type,
                position: &self.position,
                data,
                extra: &self.extra,
            }
            .serialize(serializer),
            NodeKind::Standard { data, .. } => NodeRef {
                id: &self.id,
                node_type,
                position: &self.position,
                data,
                extra: &self.extra,
            }
            .serialize(serializer),
        }
    }
}

impl Node {
    /// Creates the process node that links a level to the process `process_id`.
    ///
    /// The node id is derived from the process id (`process-node-{id}`) so the
    /// pair can be found again from either side.
    pub fn process(process_id: &str, label: &str, position: Position) -> Self {
        Self {
            id: format!("process-node-{process_id}"),
            position,
            kind: NodeKind::Process(ProcessNodeData {
                label: label.to_string(),
                process_id: process_id.to_string(),
                force_update: None,
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    /// Creates an instance of the custom node type `custom_name`.
    pub fn custom(custom_name: &str, dir: Option<Direction>, position: Position) -> Self {
        Self {
            id: generate_node_id(),
            position,
            kind: NodeKind::Custom(CustomNodeData {
                label: custom_name.to_string(),
                custom_name: custom_name.to_string(),
                dir,
                force_update: None,
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    /// Creates a built-in node of the given type tag.
    pub fn standard(node_type: &str, label: &str, position: Position) -> Self {
        Self {
            id: generate_node_id(),
            position,
            kind: NodeKind::Standard {
                node_type: node_type.to_string(),
                data: StandardNodeData {
                    label: label.to_string(),
                    ..Default::default()
                },
            },
            extra: Map::new(),
        }
    }

    /// Returns a copy of this node with another id.
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    /// The type tag as stored on the wire.
    pub fn node_type(&self) -> &str {
        match &self.kind {
            NodeKind::Process(_) => PROCESS_NODE_TYPE,
            NodeKind::Custom(_) => CUSTOM_NODE_TYPE,
            NodeKind::Standard { node_type, .. } => node_type,
        }
    }

    /// The display label, whatever the kind.
    pub fn label(&self) -> &str {
        match &self.kind {
            NodeKind::Process(data) => &data.label,
            NodeKind::Custom(data) => &data.label,
            NodeKind::Standard { data, .. } => &data.label,
        }
    }

    /// Replaces the label and stamps the force-update marker.
    pub fn set_label(&mut self, label: &str, stamp: i64) {
        let (slot, force_update) = match &mut self.kind {
            NodeKind::Process(data) => (&mut data.label, &mut data.force_update),
            NodeKind::Custom(data) => (&mut data.label, &mut data.force_update),
            NodeKind::Standard { data, .. } => (&mut data.label, &mut data.force_update),
        };
        *slot = label.to_string();
        *force_update = Some(stamp);
    }

    /// The linked process id, if this is a process node.
    pub fn process_id(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Process(data) => Some(&data.process_id),
            _ => None,
        }
    }

    /// The custom type name, if this is a custom node.
    pub fn custom_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Custom(data) => Some(&data.custom_name),
            _ => None,
        }
    }

    /// True if this is a process node linking to `process_id`.
    pub fn is_process_for(&self, process_id: &str) -> bool {
        self.process_id() == Some(process_id)
    }

    /// True if this node instantiates the custom type `custom_name`.
    pub fn is_custom_of(&self, custom_name: &str) -> bool {
        self.custom_name() == Some(custom_name)
    }
}

/// Whether an edge carries data or execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Values flow from source to target
    Data,
    /// Target runs after source
    Execution,
}

/// Optional data bag on an edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    /// Set when the edge was classified at connection time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<ConnectionType>,
    /// Fields not modeled by this crate
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Represents a directional connection between two nodes of the same level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Identifier, unique within the owning level
    pub id: String,
    /// ID of the source node
    pub source: NodeId,
    /// ID of the destination node
    pub target: NodeId,
    /// Handle on the source node, if it has several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Handle on the target node, if it has several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Text drawn along the edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Connection classification and extra data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EdgeData>,
    /// Fields not modeled by this crate (type, className, animated, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    /// Creates a plain edge between two nodes.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            label: None,
            data: None,
            extra: Map::new(),
        }
    }

    /// True if either endpoint is `node_id`.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// One level of the document tree: nodes, edges and nested processes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FlowData {
    /// Nodes in z-order
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges between nodes of this level
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Nested processes keyed by process id
    #[serde(default)]
    pub processes: ProcessMap,
}

/// A consistency problem found by [`FlowData::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A process is stored under a key different from its id
    ProcessKeyMismatch {
        /// Level holding the process
        path: ProcessPath,
        /// Key in the process map
        key: ProcessId,
        /// Id stored in the process itself
        id: ProcessId,
    },
    /// A process node points at a process missing from its level
    DanglingProcessNode {
        /// Level holding the node
        path: ProcessPath,
        /// The process node
        node_id: NodeId,
        /// The process it points at
        process_id: ProcessId,
    },
    /// An edge names a node missing from its level
    DanglingEdge {
        /// Level holding the edge
        path: ProcessPath,
        /// The edge
        edge_id: String,
        /// The missing endpoint
        node_id: NodeId,
    },
}

impl FlowData {
    /// Finds a node of this level by id.
    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Finds a direct child process by id.
    pub fn process(&self, process_id: &str) -> Option<&ProcessFlow> {
        self.processes.get(process_id).map(Arc::as_ref)
    }

    /// Visits this level and every nested level, depth first.
    ///
    /// The visitor receives the path of each level relative to `self`.
    pub fn visit<F>(&self, f: &mut F)
    where
        F: FnMut(&[ProcessId], &FlowData),
    {
        let mut path = Vec::new();
        self.visit_at(&mut path, f);
    }

    fn visit_at<F>(&self, path: &mut ProcessPath, f: &mut F)
    where
        F: FnMut(&[ProcessId], &FlowData),
    {
        f(path, self);
        for (key, child) in &self.processes {
            path.push(key.clone());
            child.flow.visit_at(path, f);
            path.pop();
        }
    }

    /// Total number of levels in this subtree, including this one.
    pub fn level_count(&self) -> usize {
        let mut count = 0;
        self.visit(&mut |_, _| count += 1);
        count
    }

    /// Checks the structural invariants of this subtree.
    ///
    /// # Returns
    ///
    /// Every violation found; an empty list means the subtree is consistent.
    pub fn check_invariants(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        self.visit(&mut |path, flow| {
            for (key, child) in &flow.processes {
                if *key != child.id {
                    violations.push(InvariantViolation::ProcessKeyMismatch {
                        path: path.to_vec(),
                        key: key.clone(),
                        id: child.id.clone(),
                    });
                }
            }
            for node in &flow.nodes {
                if let Some(pid) = node.process_id() {
                    if !flow.processes.contains_key(pid) {
                        violations.push(InvariantViolation::DanglingProcessNode {
                            path: path.to_vec(),
                            node_id: node.id.clone(),
                            process_id: pid.to_string(),
                        });
                    }
                }
            }
            for edge in &flow.edges {
                for end in [&edge.source, &edge.target] {
                    if flow.node(end).is_none() {
                        violations.push(InvariantViolation::DanglingEdge {
                            path: path.to_vec(),
                            edge_id: edge.id.clone(),
                            node_id: end.clone(),
                        });
                    }
                }
            }
        });
        violations
    }
}

/// A named, nested sub-diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessFlow {
    /// Identical to the key under which the process is stored
    pub id: ProcessId,
    /// Display name, editable independently of the id
    pub name: String,
    /// Optional free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Content of the process
    #[serde(flatten)]
    pub flow: FlowData,
}

impl ProcessFlow {
    /// Creates an empty process with a fresh id.
    pub fn new(name: &str, description: Option<&str>) -> Self {
        Self {
            id: generate_process_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            flow: FlowData::default(),
        }
    }
}

/// The root of a document tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique project id (`project_...`)
    pub id: String,
    /// Display name, also the first breadcrumb
    pub name: String,
    /// Optional free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation time, never changed afterwards
    pub created_at: DateTime<Utc>,
    /// Refreshed by every mutation
    pub updated_at: DateTime<Utc>,
    /// The root level
    #[serde(flatten)]
    pub flow: FlowData,
}

impl Project {
    /// Creates an empty project with a fresh id and both timestamps set to now.
    ///
    /// # Arguments
    ///
    /// * `name` - The display name of the project
    /// * `description` - Optional free-form description
    pub fn new(name: &str, description: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_project_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
            flow: FlowData::default(),
        }
    }

    /// Serialize the project to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a project from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A user-defined node kind usable anywhere in a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomNodeType {
    /// Unique name of the type
    pub name: String,
    /// Optional data direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<Direction>,
}

impl CustomNodeType {
    /// Creates a custom node type definition.
    pub fn new(name: &str, dir: Option<Direction>) -> Self {
        Self {
            name: name.to_string(),
            dir,
        }
    }
}
