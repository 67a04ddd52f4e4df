//! Pure graph operations: each takes the current flow and returns a new one,
//! so callers can keep old versions around for undo.

use tracing::{debug, warn};

use super::changes::{ConnectionRejected, EdgeChange, EdgeChangeOutcome, NewEdge, NodeChange};
use super::{Edge, Flow, Node};
use crate::nodes::registry::{find_port, FanOut, PortDirection};
use crate::nodes::{DataPatch, NodeData, NodeRegistry, NodeType};
use crate::types::{EdgeId, FlowId, NodeId, PortId, Position};

pub const DEFAULT_TRIGGER_POSITION: Position = Position { x: 250.0, y: 50.0 };

const FIRST_NODE_POSITION: Position = Position { x: 80.0, y: 80.0 };
const NODE_SPACING_Y: f64 = 150.0;

/// A new, clean flow with a temporary id and a single trigger node.
pub fn create_flow(name: impl Into<String>) -> Flow {
    let mut flow = Flow::empty(FlowId::temporary(), name);
    let id = flow.next_node_id();
    flow.nodes.push(Node::new(
        id,
        DEFAULT_TRIGGER_POSITION,
        NodeData::default_for(NodeType::Trigger),
    ));
    flow
}

pub fn rename_flow(flow: &Flow, name: impl Into<String>) -> Flow {
    let mut next = flow.clone();
    next.name = name.into();
    next.dirty = true;
    next
}

/// Appends a node seeded with the type's default data and returns its id.
/// Without a position the node is stacked below the last one.
pub fn add_node(
    flow: &Flow,
    registry: &NodeRegistry,
    node_type: NodeType,
    position: Option<Position>,
) -> (Flow, NodeId) {
    let mut next = flow.clone();
    let position = position.unwrap_or_else(|| match next.nodes.last() {
        Some(last) => Position::new(last.position.x, last.position.y + NODE_SPACING_Y),
        None => FIRST_NODE_POSITION,
    });
    let id = next.next_node_id();
    let data = registry.definition(node_type).default_data();
    next.nodes.push(Node::new(id.clone(), position, data));
    next.dirty = true;
    debug!(node = %id, %node_type, "node added");
    (next, id)
}

/// Removes the node and every edge touching it. Unknown ids are a no-op.
pub fn remove_node(flow: &Flow, id: &NodeId) -> Flow {
    let mut next = flow.clone();
    next.remove_node_in_place(id);
    next
}

/// Shallow-merges `patch` into the node's data. Does not validate; unknown
/// ids and patches that do not fit the node type leave the flow unchanged.
pub fn update_node_data(flow: &Flow, id: &NodeId, patch: &DataPatch) -> Flow {
    let mut next = flow.clone();
    let Some(current) = next.get_node(id).map(|node| node.data.clone()) else {
        warn!(node = %id, "update for unknown node ignored");
        return next;
    };

    let merged = match current.merged(patch) {
        Ok(merged) => merged,
        Err(err) => {
            warn!(node = %id, error = %err, "patch does not fit node data");
            return next;
        }
    };
    if merged == current {
        return next;
    }

    if let Some(node) = next.get_node_mut(id) {
        node.data = merged;
    }
    next.dirty = true;
    next.prune_undefined_ports(id);
    next
}

/// Applies canvas node changes in order. Removals cascade like [`remove_node`].
pub fn apply_node_changes(flow: &Flow, changes: &[NodeChange]) -> Flow {
    let mut next = flow.clone();
    for change in changes {
        match change {
            NodeChange::Position { id, position } => {
                let moved = match next.get_node_mut(id) {
                    Some(node) => {
                        let moved = node.position != *position;
                        node.position = *position;
                        moved
                    }
                    None => {
                        debug!(node = %id, "position change for unknown node");
                        false
                    }
                };
                if moved {
                    next.dirty = true;
                }
            }
            NodeChange::Select { id, selected } => match next.get_node_mut(id) {
                Some(node) => node.selected = *selected,
                None => debug!(node = %id, "selection change for unknown node"),
            },
            NodeChange::Remove { id } => next.remove_node_in_place(id),
        }
    }
    next
}

/// Applies canvas edge changes in order. Adds that would break an invariant
/// are skipped and reported in the outcome.
pub fn apply_edge_changes(flow: &Flow, changes: &[EdgeChange]) -> EdgeChangeOutcome {
    let mut next = flow.clone();
    let mut rejected = Vec::new();
    for change in changes {
        match change {
            EdgeChange::Add { edge } => {
                if let Err(reason) = next.insert_edge(edge.clone()) {
                    warn!(%reason, "connection rejected");
                    rejected.push(reason);
                }
            }
            EdgeChange::Remove { id } => {
                let before = next.edges.len();
                next.edges.retain(|edge| &edge.id != id);
                if next.edges.len() != before {
                    next.dirty = true;
                }
            }
            EdgeChange::Select { id, selected } => {
                if let Some(edge) = next.edges.iter_mut().find(|edge| &edge.id == id) {
                    edge.selected = *selected;
                }
            }
        }
    }
    EdgeChangeOutcome {
        flow: next,
        rejected,
    }
}

/// Connects two ports through a freshly generated edge.
pub fn connect(
    flow: &Flow,
    source: &NodeId,
    source_port: Option<PortId>,
    target: &NodeId,
    target_port: Option<PortId>,
) -> Result<(Flow, EdgeId), ConnectionRejected> {
    let mut next = flow.clone();
    let id = next.insert_edge(NewEdge {
        id: None,
        source: source.clone(),
        source_port,
        target: target.clone(),
        target_port,
    })?;
    Ok((next, id))
}

impl Flow {
    fn remove_node_in_place(&mut self, id: &NodeId) {
        let before = self.nodes.len();
        self.nodes.retain(|node| &node.id != id);
        if self.nodes.len() == before {
            debug!(node = %id, "remove for unknown node ignored");
            return;
        }
        self.edges.retain(|edge| !edge.touches(id));
        self.dirty = true;
    }

    fn insert_edge(&mut self, request: NewEdge) -> Result<EdgeId, ConnectionRejected> {
        if request.source == request.target {
            return Err(ConnectionRejected::SelfLoop(request.source));
        }
        let source = self
            .get_node(&request.source)
            .ok_or_else(|| ConnectionRejected::UnknownNode(request.source.clone()))?;
        let target = self
            .get_node(&request.target)
            .ok_or_else(|| ConnectionRejected::UnknownNode(request.target.clone()))?;

        let source_spec = find_port(&source.data, PortDirection::Out, request.source_port.as_ref())
            .ok_or_else(|| ConnectionRejected::UnknownPort {
                node: request.source.clone(),
                port: describe_port(request.source_port.as_ref()),
                direction: "source",
            })?;
        find_port(&target.data, PortDirection::In, request.target_port.as_ref()).ok_or_else(
            || ConnectionRejected::UnknownPort {
                node: request.target.clone(),
                port: describe_port(request.target_port.as_ref()),
                direction: "target",
            },
        )?;

        if let Some(id) = &request.id {
            if self.get_edge(id).is_some() {
                return Err(ConnectionRejected::DuplicateEdgeId(id.clone()));
            }
        }
        if source_spec.fan_out == FanOut::Single
            && !self
                .outgoing_from_port(&request.source, Some(&source_spec.id))
                .is_empty()
        {
            return Err(ConnectionRejected::FanOutExceeded {
                node: request.source,
                port: source_spec.id,
            });
        }

        let id = match request.id {
            Some(id) => id,
            None => self.next_edge_id(),
        };
        self.edges.push(
            Edge::new(id.clone(), request.source, request.target)
                .with_ports(request.source_port, request.target_port),
        );
        self.dirty = true;
        Ok(id)
    }

    /// Drops edges leaving `id` through ports its current data no longer defines.
    fn prune_undefined_ports(&mut self, id: &NodeId) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        let data = node.data.clone();
        let before = self.edges.len();
        self.edges.retain(|edge| {
            &edge.source != id
                || find_port(&data, PortDirection::Out, edge.source_port.as_ref()).is_some()
        });
        let pruned = before - self.edges.len();
        if pruned > 0 {
            debug!(node = %id, pruned, "removed edges from deleted ports");
        }
    }
}

fn describe_port(port: Option<&PortId>) -> String {
    port.map(ToString::to_string)
        .unwrap_or_else(|| "(default)".to_string())
}
