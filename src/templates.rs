//! Starter documents offered when creating a project.
//!
//! Each template seeds the root level with a few nodes of one palette
//! category so a new project is not an empty canvas.

use crate::flow::canvas::{self, Connection};
use crate::types::*;
use std::sync::Arc;

/// Kinds of project templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Nothing at all
    Blank,
    /// Command -> Aggregate -> Event, with the handling inside a nested process
    EventDriven,
    /// Start -> Decision -> End
    Flowchart,
    /// Two inputs feeding an AND gate
    LogicGates,
}

/// Metadata for a single template.
pub struct TemplateInfo {
    /// Stable identifier for the template
    pub kind: TemplateKind,
    /// Human-friendly display name
    pub name: &'static str,
}

/// Returns all templates with their display names.
pub const fn all_templates() -> &'static [TemplateInfo] {
    const TEMPLATES: &[TemplateInfo] = &[
        TemplateInfo {
            kind: TemplateKind::Blank,
            name: "Blank Project",
        },
        TemplateInfo {
            kind: TemplateKind::EventDriven,
            name: "Event-Driven Architecture",
        },
        TemplateInfo {
            kind: TemplateKind::Flowchart,
            name: "Flowchart",
        },
        TemplateInfo {
            kind: TemplateKind::LogicGates,
            name: "Logic Gates",
        },
    ];
    TEMPLATES
}

/// Builds a new project named `name` from a template.
pub fn build_template(kind: TemplateKind, name: &str, description: Option<&str>) -> Project {
    let mut project = Project::new(name, description);
    project.flow = match kind {
        TemplateKind::Blank => FlowData::default(),
        TemplateKind::EventDriven => build_event_driven(),
        TemplateKind::Flowchart => build_flowchart(),
        TemplateKind::LogicGates => build_logic_gates(),
    };
    project
}

fn link(flow: &mut FlowData, source: &Node, target: &Node) {
    flow.edges = canvas::connect(
        &flow.edges,
        Connection {
            source: source.id.clone(),
            target: target.id.clone(),
            ..Default::default()
        },
    );
}

fn build_event_driven() -> FlowData {
    let mut flow = FlowData::default();

    let command = Node::standard("command", "Place Order", Position::new(100.0, 200.0));
    let aggregate = Node::standard("aggregate", "Order", Position::new(350.0, 200.0));
    let event = Node::standard("event", "Order Placed", Position::new(600.0, 200.0));

    // The aggregate's internals live one level down
    let mut handling = ProcessFlow::new("Handle Order", Some("Validation and persistence"));
    let validate = Node::standard("service", "Validate Order", Position::new(100.0, 150.0));
    let store = Node::standard("database", "Orders", Position::new(350.0, 150.0));
    link(&mut handling.flow, &validate, &store);
    handling.flow.nodes = vec![validate, store];

    let process_node = Node::process(&handling.id, &handling.name, Position::new(350.0, 350.0));
    link(&mut flow, &command, &aggregate);
    link(&mut flow, &aggregate, &event);
    flow.nodes = vec![command, aggregate, event, process_node];
    flow.processes.insert(handling.id.clone(), Arc::new(handling));

    flow
}

fn build_flowchart() -> FlowData {
    let mut flow = FlowData::default();

    let start = Node::standard("start", "Start", Position::new(250.0, 50.0));
    let decision = Node::standard("decision", "Approved?", Position::new(250.0, 200.0));
    let end = Node::standard("end", "End", Position::new(250.0, 350.0));

    link(&mut flow, &start, &decision);
    link(&mut flow, &decision, &end);
    flow.nodes = vec![start, decision, end];
    flow
}

fn build_logic_gates() -> FlowData {
    let mut flow = FlowData::default();

    let a = Node::standard("textInput", "A", Position::new(50.0, 100.0));
    let b = Node::standard("textInput", "B", Position::new(50.0, 250.0));
    let gate = Node::standard("andGate", "AND Gate", Position::new(300.0, 175.0));

    link(&mut flow, &a, &gate);
    link(&mut flow, &b, &gate);
    flow.nodes = vec![a, b, gate];
    flow
}
