//! Canvas-level editing helpers.
//!
//! These functions compute the complete replacement node or edge list for a
//! single level, the shape [`crate::store::Action::UpdateNodes`] and
//! [`crate::store::Action::UpdateEdges`] expect. They never touch nested
//! processes; process creation and deletion go through the mutator.

use super::mutator::remove_nodes_where;
use crate::constants::{CUSTOM_PALETTE_PREFIX, EXECUTION_HANDLE_MARKER, PROCESS_NODE_TYPE};
use crate::ids::generate_edge_id;
use crate::types::*;
use chrono::Utc;

/// What a palette entry dropped on the canvas should create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteItem {
    /// `custom::name::dir`
    Custom {
        /// Name of the custom node type
        name: String,
        /// Direction tag, if the identifier carried a valid one
        dir: Option<Direction>,
    },
    /// `process`, which creates a nested process
    Process,
    /// Any built-in type tag
    Standard(String),
}

impl PaletteItem {
    /// Parses a palette identifier as produced by the drag source.
    pub fn parse(item: &str) -> Self {
        if let Some(rest) = item.strip_prefix(CUSTOM_PALETTE_PREFIX) {
            let mut parts = rest.splitn(2, "::");
            let name = parts.next().unwrap_or_default().to_string();
            let dir = parts.next().and_then(Direction::parse);
            PaletteItem::Custom { name, dir }
        } else if item == PROCESS_NODE_TYPE {
            PaletteItem::Process
        } else {
            PaletteItem::Standard(item.to_string())
        }
    }
}

/// Default label for a freshly dropped node of a built-in type.
pub fn default_label(node_type: &str) -> &'static str {
    match node_type {
        "event" => "New Event",
        "command" => "New Command",
        "query" => "New Query",
        "aggregate" => "New Aggregate",
        "service" => "New Service",
        "messageBus" => "New Message Bus",
        "process" => "New Process",
        "start" => "Start",
        "end" => "End",
        "decision" => "Decision",
        "inputOutput" => "Input/Output",
        "textInput" => "Text Input",
        "document" => "Document",
        "database" => "Database",
        "connector" => "Connector",
        // Logic gates are drawn by shape alone.
        "andGate" | "orGate" | "xorGate" | "notGate" => "",
        "task" => "Task",
        "milestone" => "Milestone",
        _ => "New Node",
    }
}

/// Name given to the next process created from the palette on a level.
pub fn next_process_name(flow: &FlowData) -> String {
    let count = flow.nodes.iter().filter(|n| n.process_id().is_some()).count();
    format!("Process {}", count + 1)
}

/// Builds the node for a non-process palette item.
///
/// # Returns
///
/// `None` for [`PaletteItem::Process`], which needs a process to link to and
/// is created through [`crate::flow::mutator::create_process`] instead.
pub fn new_palette_node(item: &PaletteItem, position: Position) -> Option<Node> {
    match item {
        PaletteItem::Custom { name, dir } => Some(Node::custom(name, *dir, position)),
        PaletteItem::Standard(node_type) => {
            Some(Node::standard(node_type, default_label(node_type), position))
        }
        PaletteItem::Process => None,
    }
}

/// Removes a node and every edge of the level touching it.
pub fn delete_node(flow: &FlowData, node_id: &str) -> (Vec<Node>, Vec<Edge>) {
    let mut level = FlowData {
        nodes: flow.nodes.clone(),
        edges: flow.edges.clone(),
        processes: Default::default(),
    };
    remove_nodes_where(&mut level, |n| n.id == node_id);
    (level.nodes, level.edges)
}

/// Removes one edge by id.
pub fn delete_edge(edges: &[Edge], edge_id: &str) -> Vec<Edge> {
    edges.iter().filter(|e| e.id != edge_id).cloned().collect()
}

/// Sets a node's label, stamping the force-update marker.
pub fn relabel_node(nodes: &[Node], node_id: &str, label: &str) -> Vec<Node> {
    let stamp = Utc::now().timestamp_millis();
    nodes
        .iter()
        .map(|n| {
            let mut n = n.clone();
            if n.id == node_id {
                n.set_label(label, stamp);
            }
            n
        })
        .collect()
}

/// Sets the label of one edge.
pub fn relabel_edge(edges: &[Edge], edge_id: &str, label: &str) -> Vec<Edge> {
    edges
        .iter()
        .map(|e| {
            let mut e = e.clone();
            if e.id == edge_id {
                e.label = Some(label.to_string());
            }
            e
        })
        .collect()
}

/// A requested connection between two node handles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connection {
    /// Node the connection starts at
    pub source: NodeId,
    /// Node the connection ends at
    pub target: NodeId,
    /// Handle id on the source node
    pub source_handle: Option<String>,
    /// Handle id on the target node
    pub target_handle: Option<String>,
}

fn is_execution_handle(handle: Option<&str>) -> bool {
    handle.is_some_and(|h| h.contains(EXECUTION_HANDLE_MARKER))
}

/// Execution handles only connect to execution handles, data to data.
pub fn is_valid_connection(connection: &Connection) -> bool {
    is_execution_handle(connection.source_handle.as_deref())
        == is_execution_handle(connection.target_handle.as_deref())
}

/// True if the edge belongs to the execution flow rather than the data flow.
pub fn is_execution_edge(edge: &Edge) -> bool {
    edge.data
        .as_ref()
        .and_then(|d| d.connection_type)
        .is_some_and(|t| t == ConnectionType::Execution)
        || is_execution_handle(edge.source_handle.as_deref())
        || is_execution_handle(edge.target_handle.as_deref())
}

/// Adds an edge for `connection`, classified as execution or data flow.
///
/// Invalid connections and exact duplicates leave the list unchanged.
pub fn connect(edges: &[Edge], connection: Connection) -> Vec<Edge> {
    let mut next = edges.to_vec();
    if !is_valid_connection(&connection) {
        return next;
    }
    let duplicate = edges.iter().any(|e| {
        e.source == connection.source
            && e.target == connection.target
            && e.source_handle == connection.source_handle
            && e.target_handle == connection.target_handle
    });
    if duplicate {
        return next;
    }

    let execution = is_execution_handle(connection.source_handle.as_deref())
        || is_execution_handle(connection.target_handle.as_deref());
    let (connection_type, class_name) = if execution {
        (ConnectionType::Execution, "execution-edge")
    } else {
        (ConnectionType::Data, "data-edge")
    };

    let mut edge = Edge::new(generate_edge_id(), connection.source, connection.target);
    edge.source_handle = connection.source_handle;
    edge.target_handle = connection.target_handle;
    edge.data = Some(EdgeData {
        connection_type: Some(connection_type),
        ..Default::default()
    });
    edge.extra
        .insert("className".to_string(), class_name.into());
    next.push(edge);
    next
}

/// Filters out execution edges unless they are shown.
pub fn visible_edges(edges: &[Edge], show_execution_flow: bool) -> Vec<Edge> {
    edges
        .iter()
        .filter(|e| show_execution_flow || !is_execution_edge(e))
        .cloned()
        .collect()
}
