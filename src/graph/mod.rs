//! In-memory flow graph: nodes, edges and the invariants tying them together.

use std::collections::HashSet;

use crate::nodes::registry::{find_port, FanOut, PortDirection};
use crate::nodes::{NodeData, NodeType};
use crate::types::{EdgeId, FlowId, NodeId, PortId, Position};

pub mod changes;
pub mod history;
pub mod mutations;
pub mod validate;

pub use changes::{ConnectionRejected, EdgeChange, EdgeChangeOutcome, NewEdge, NodeChange};
pub use history::History;
pub use mutations::{
    add_node, apply_edge_changes, apply_node_changes, connect, create_flow, remove_node, rename_flow,
    update_node_data,
};
pub use validate::{validate_flow, FlowValidationReport};

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub data: NodeData,
    /// Canvas selection; never persisted and never marks the flow dirty.
    pub selected: bool,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, position: Position, data: NodeData) -> Self {
        Self {
            id: id.into(),
            position,
            data,
            selected: false,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.data.node_type()
    }

    fn content_eq(&self, other: &Node) -> bool {
        self.id == other.id && self.position == other.position && self.data == other.data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub source_port: Option<PortId>,
    pub target: NodeId,
    pub target_port: Option<PortId>,
    pub selected: bool,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            source_port: None,
            target: target.into(),
            target_port: None,
            selected: false,
        }
    }

    pub fn with_ports(mut self, source_port: Option<PortId>, target_port: Option<PortId>) -> Self {
        self.source_port = source_port;
        self.target_port = target_port;
        self
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    /// Source port id with `None` read as the default output port.
    pub fn resolved_source_port(&self) -> PortId {
        self.source_port.clone().unwrap_or_else(PortId::output)
    }

    fn content_eq(&self, other: &Edge) -> bool {
        self.id == other.id
            && self.source == other.source
            && self.source_port == other.source_port
            && self.target == other.target
            && self.target_port == other.target_port
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("duplicate edge id: {0}")]
    DuplicateEdge(EdgeId),

    #[error("edge {edge} references missing node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },

    #[error("edge {edge} uses undefined port {port} on {node}")]
    UndefinedPort {
        edge: EdgeId,
        node: NodeId,
        port: String,
    },

    #[error("port {node}:{port} has more than one outgoing edge")]
    FanOutExceeded { node: NodeId, port: PortId },
}

/// One automation flow document.
#[derive(Debug, Clone)]
pub struct Flow {
    pub id: FlowId,
    pub name: String,
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    pub dirty: bool,
    node_seq: u64,
    edge_seq: u64,
}

impl PartialEq for Flow {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.nodes == other.nodes
            && self.edges == other.edges
            && self.dirty == other.dirty
    }
}

impl Flow {
    pub(crate) fn empty(id: FlowId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            dirty: false,
            node_seq: 0,
            edge_seq: 0,
        }
    }

    /// Assembles a flow from already-existing parts (e.g. a backend document),
    /// rejecting duplicate ids, edges whose endpoints are missing, edges on
    /// ports the node does not define and overused single fan-out ports.
    pub fn from_parts(
        id: FlowId,
        name: impl Into<String>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<Self, GraphError> {
        let mut node_ids = HashSet::new();
        for node in &nodes {
            if !node_ids.insert(&node.id) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }
        let mut edge_ids = HashSet::new();
        for edge in &edges {
            if !edge_ids.insert(&edge.id) {
                return Err(GraphError::DuplicateEdge(edge.id.clone()));
            }
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint) {
                    return Err(GraphError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }

        let mut flow = Self::empty(id, name);
        flow.nodes = nodes;
        flow.edges = edges;
        match flow.port_errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(flow),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    pub(crate) fn get_node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| &node.id == id)
    }

    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|edge| &edge.id == id)
    }

    pub fn edges_for_node(&self, id: &NodeId) -> Vec<&Edge> {
        self.edges.iter().filter(|edge| edge.touches(id)).collect()
    }

    /// Edges leaving `node` through `port` (`None` = default output port).
    pub fn outgoing_from_port(&self, node: &NodeId, port: Option<&PortId>) -> Vec<&Edge> {
        let wanted = port.cloned().unwrap_or_else(PortId::output);
        self.edges
            .iter()
            .filter(|edge| &edge.source == node && edge.resolved_source_port() == wanted)
            .collect()
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |node| node.node_type() == node_type)
    }

    /// Equality over name, nodes and edges, ignoring selection and the dirty flag.
    pub fn content_eq(&self, other: &Flow) -> bool {
        self.name == other.name
            && self.nodes.len() == other.nodes.len()
            && self.edges.len() == other.edges.len()
            && self.nodes.iter().zip(&other.nodes).all(|(a, b)| a.content_eq(b))
            && self.edges.iter().zip(&other.edges).all(|(a, b)| a.content_eq(b))
    }

    pub(crate) fn next_node_id(&mut self) -> NodeId {
        loop {
            self.node_seq += 1;
            let candidate = NodeId::new(format!("node_{}", self.node_seq));
            if self.get_node(&candidate).is_none() {
                return candidate;
            }
        }
    }

    pub(crate) fn next_edge_id(&mut self) -> EdgeId {
        loop {
            self.edge_seq += 1;
            let candidate = EdgeId::new(format!("edge_{}", self.edge_seq));
            if self.get_edge(&candidate).is_none() {
                return candidate;
            }
        }
    }

    /// Describes every broken invariant; empty for a consistent graph.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(&node.id) {
                problems.push(format!("duplicate node id {}", node.id));
            }
        }

        let mut edge_ids = HashSet::new();
        for edge in &self.edges {
            if !edge_ids.insert(&edge.id) {
                problems.push(format!("duplicate edge id {}", edge.id));
            }
            if self.get_node(&edge.source).is_none() {
                problems.push(format!("edge {} has missing source {}", edge.id, edge.source));
            }
            if self.get_node(&edge.target).is_none() {
                problems.push(format!("edge {} has missing target {}", edge.id, edge.target));
            }
        }
        problems.extend(self.port_errors().iter().map(ToString::to_string));

        problems
    }

    /// Port problems of edges whose endpoints both exist: undefined source or
    /// target ports, and single fan-out ports used more than once.
    fn port_errors(&self) -> Vec<GraphError> {
        let mut errors = Vec::new();
        let mut used_ports = HashSet::new();
        for edge in &self.edges {
            let (Some(source), Some(target)) = (self.get_node(&edge.source), self.get_node(&edge.target))
            else {
                continue;
            };

            match find_port(&source.data, PortDirection::Out, edge.source_port.as_ref()) {
                Some(spec) => {
                    if spec.fan_out == FanOut::Single
                        && !used_ports.insert((edge.source.clone(), spec.id.clone()))
                    {
                        errors.push(GraphError::FanOutExceeded {
                            node: edge.source.clone(),
                            port: spec.id,
                        });
                    }
                }
                None => errors.push(GraphError::UndefinedPort {
                    edge: edge.id.clone(),
                    node: edge.source.clone(),
                    port: edge.resolved_source_port().to_string(),
                }),
            }

            if find_port(&target.data, PortDirection::In, edge.target_port.as_ref()).is_none() {
                errors.push(GraphError::UndefinedPort {
                    edge: edge.id.clone(),
                    node: edge.target.clone(),
                    port: edge
                        .target_port
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| PortId::DEFAULT_INPUT.to_string()),
                });
            }
        }
        errors
    }
}
